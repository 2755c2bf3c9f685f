use chrono::Duration;
use std::sync::Arc;

use interview_sim_api::{
    config::Config,
    error::{InterviewError, MISSING_CREDENTIAL_MESSAGE},
    models::SessionState,
    services::{
        llm_service::{ChatCompletionProvider, DEFAULT_QUESTION},
        result_sink::ResultSink,
        results_log::{ResultsLog, RESULTS_LOG_HEADER},
        session_service::SessionService,
    },
    utils::time::ManualClock,
};

mod common;

use common::{FailingSink, FakeProvider, RecordingSink, TestHarness, FAKE_FEEDBACK};

#[tokio::test]
async fn test_fresh_status_reports_full_budget() {
    let harness = TestHarness::quiet();
    let status = harness.state.sessions.status_of(None);

    assert_eq!(status.state, SessionState::Fresh);
    assert_eq!(status.elapsed_seconds(), 0);
    assert_eq!(status.remaining_seconds(), 3600);
}

#[tokio::test]
async fn test_session_expires_exactly_at_time_limit() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    assert_eq!(session.question, DEFAULT_QUESTION);
    assert_eq!(session.started_at, common::start_time());

    harness.clock.advance(Duration::seconds(3599));
    let status = sessions.status(&session);
    assert_eq!(status.state, SessionState::Active);
    assert_eq!(status.remaining_seconds(), 1);

    harness.clock.advance(Duration::seconds(1));
    assert_eq!(sessions.status(&session).state, SessionState::Expired);
    assert_eq!(sessions.status(&session).remaining_seconds(), 0);
}

#[tokio::test]
async fn test_submit_just_before_expiry_is_evaluated() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    harness.clock.advance(Duration::seconds(3599));
    let submission = sessions
        .submit(&session, "def solve(): return 1", None)
        .await
        .unwrap();

    assert!(submission.feedback_available);
    assert_eq!(submission.feedback, FAKE_FEEDBACK);
    assert_eq!(harness.provider.evaluations(), 1);
}

#[tokio::test]
async fn test_expired_session_rejects_without_calling_provider() {
    let sink = Arc::new(RecordingSink::default());
    let harness = TestHarness::new(
        common::quiet_config(),
        FakeProvider::new(),
        vec![sink.clone() as Arc<dyn ResultSink>],
    );
    let sessions = &harness.state.sessions;
    let mut session = sessions.start_session().await.unwrap();

    harness.clock.advance(Duration::seconds(3601));

    let result = sessions.submit(&session, "print(42)", None).await;
    assert!(matches!(result, Err(InterviewError::SessionExpired)));

    let result = sessions.request_new_question(&mut session).await;
    assert!(matches!(result, Err(InterviewError::SessionExpired)));

    assert_eq!(harness.provider.evaluations(), 0);
    assert_eq!(harness.provider.generations(), 0);
    assert_eq!(sink.count(), 0);
    assert_eq!(session.question, DEFAULT_QUESTION);
}

#[tokio::test]
async fn test_expired_check_runs_before_empty_check() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    harness.clock.advance(Duration::hours(2));

    let result = sessions.submit(&session, "   ", None).await;
    assert!(matches!(result, Err(InterviewError::SessionExpired)));
}

#[tokio::test]
async fn test_blank_code_is_rejected_before_evaluation() {
    let sink = Arc::new(RecordingSink::default());
    let harness = TestHarness::new(
        common::quiet_config(),
        FakeProvider::new(),
        vec![sink.clone() as Arc<dyn ResultSink>],
    );
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    for code in ["", "   ", "\n\t  \n"] {
        let result = sessions.submit(&session, code, Some("dev@example.com")).await;
        match result {
            Err(InterviewError::EmptySubmission) => {}
            other => panic!("expected EmptySubmission for {:?}, got {:?}", code, other),
        }
    }

    assert_eq!(harness.provider.evaluations(), 0);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_required_email_is_enforced() {
    let mut config = common::quiet_config();
    config.require_email = true;
    let harness = TestHarness::new(config, FakeProvider::new(), Vec::new());
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    let result = sessions.submit(&session, "x = 1", Some("  ")).await;
    assert!(matches!(result, Err(InterviewError::MissingEmail)));
    assert_eq!(harness.provider.evaluations(), 0);

    let submission = sessions
        .submit(&session, "x = 1", Some(" dev@example.com "))
        .await
        .unwrap();
    assert_eq!(submission.email.as_deref(), Some("dev@example.com"));
}

#[tokio::test]
async fn test_new_question_keeps_the_clock_running() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let mut session = sessions.start_session().await.unwrap();
    let started_at = session.started_at;

    harness.clock.advance(Duration::minutes(10));
    let question = sessions.request_new_question(&mut session).await.unwrap();

    assert_eq!(question, "Generated question #1");
    assert_eq!(session.question, question);
    assert_eq!(session.started_at, started_at);
    assert_eq!(sessions.status(&session).remaining_seconds(), 3000);
}

#[tokio::test]
async fn test_failed_new_question_keeps_current_question() {
    let harness = TestHarness::new(
        common::quiet_config(),
        FakeProvider::failing_generation(),
        Vec::new(),
    );
    let sessions = &harness.state.sessions;
    let mut session = sessions.start_session().await.unwrap();

    let result = sessions.request_new_question(&mut session).await;

    assert!(matches!(result, Err(InterviewError::ProviderUnavailable(_))));
    assert_eq!(session.question, DEFAULT_QUESTION);
}

#[tokio::test]
async fn test_submission_keeps_question_it_was_evaluated_against() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let mut session = sessions.start_session().await.unwrap();

    let submission = sessions.submit(&session, "return 1", None).await.unwrap();
    sessions.request_new_question(&mut session).await.unwrap();

    assert_eq!(submission.question, DEFAULT_QUESTION);
    assert_ne!(session.question, submission.question);
    assert_eq!(
        harness.provider.evaluated_questions.lock().unwrap().as_slice(),
        &[DEFAULT_QUESTION.to_string()]
    );
}

#[tokio::test]
async fn test_provider_failure_becomes_feedback_and_skips_sinks() {
    let sink = Arc::new(RecordingSink::default());
    let harness = TestHarness::new(
        common::quiet_config(),
        FakeProvider::failing_evaluation(),
        vec![sink.clone() as Arc<dyn ResultSink>],
    );
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    let submission = sessions
        .submit(&session, "fn main() {}", Some("dev@example.com"))
        .await
        .unwrap();

    assert!(!submission.feedback_available);
    assert_eq!(submission.feedback, MISSING_CREDENTIAL_MESSAGE);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_missing_api_key_degrades_to_fixed_message() {
    common::init_tracing();
    let config = Config::default();
    assert!(config.llm.api_key.is_none());

    let clock = Arc::new(ManualClock::new(common::start_time()));
    let sink = Arc::new(RecordingSink::default());
    let sessions = SessionService::new(
        Arc::new(ChatCompletionProvider::new(&config.llm)),
        vec![sink.clone() as Arc<dyn ResultSink>],
        clock,
        config.session_duration_seconds,
    );

    let mut session = sessions.start_session().await.unwrap();
    assert_eq!(session.question, DEFAULT_QUESTION);

    let submission = sessions.submit(&session, "print(1)", None).await.unwrap();
    assert_eq!(submission.feedback, MISSING_CREDENTIAL_MESSAGE);
    assert!(!submission.feedback_available);
    assert_eq!(sink.count(), 0);

    let err = sessions.request_new_question(&mut session).await.unwrap_err();
    assert!(matches!(err, InterviewError::ConfigMissing("API_KEY")));
    assert_eq!(err.to_string(), MISSING_CREDENTIAL_MESSAGE);
    assert_eq!(session.question, DEFAULT_QUESTION);
}

#[tokio::test]
async fn test_failing_sink_does_not_block_results_log() {
    let path = common::temp_path("results").with_extension("csv");
    let recording = Arc::new(RecordingSink::default());
    let sinks: Vec<Arc<dyn ResultSink>> = vec![
        Arc::new(FailingSink),
        Arc::new(ResultsLog::new(path.clone())),
        recording.clone(),
    ];
    let harness = TestHarness::new(common::quiet_config(), FakeProvider::new(), sinks);
    let sessions = &harness.state.sessions;
    let session = sessions.start_session().await.unwrap();

    let submission = sessions
        .submit(&session, "def f(x):\n    return x", Some("dev@example.com"))
        .await
        .unwrap();

    assert!(submission.feedback_available);
    assert_eq!(recording.count(), 1);

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(RESULTS_LOG_HEADER));
    assert!(contents.contains("dev@example.com"));
    assert!(contents.contains("\"def f(x):\n    return x\""));
    assert!(contents.contains(FAKE_FEEDBACK));

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let harness = TestHarness::quiet();
    let sessions = &harness.state.sessions;
    let mut first = sessions.start_session().await.unwrap();

    harness.clock.advance(Duration::minutes(30));
    let second = sessions.start_session().await.unwrap();
    sessions.request_new_question(&mut first).await.unwrap();

    assert_eq!(second.question, DEFAULT_QUESTION);
    assert_eq!(sessions.status(&first).remaining_seconds(), 1800);
    assert_eq!(sessions.status(&second).remaining_seconds(), 3600);
}
