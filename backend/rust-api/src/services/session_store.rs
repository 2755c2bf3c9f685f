use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::InterviewError,
    metrics::SESSIONS_ACTIVE,
    models::{Session, Submission},
};

#[derive(Debug, Clone)]
struct SessionEntry {
    session: Session,
    submissions: Vec<Submission>,
}

/// In-process session registry. Lost on restart; every session is independent.
///
/// Callers get clones back, so no lock is held across provider or sink calls.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        let mut entries = self.entries.write().await;
        entries.insert(
            session.id,
            SessionEntry {
                session,
                submissions: Vec::new(),
            },
        );
        SESSIONS_ACTIVE.set(entries.len() as i64);
    }

    pub async fn get(&self, id: Uuid) -> Result<Session, InterviewError> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| entry.session.clone())
            .ok_or(InterviewError::SessionNotFound(id))
    }

    /// Replaces only the question; the start time is never touched.
    pub async fn replace_question(&self, id: Uuid, question: String) -> Result<(), InterviewError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or(InterviewError::SessionNotFound(id))?;
        entry.session.question = question;
        Ok(())
    }

    pub async fn push_submission(&self, submission: Submission) -> Result<(), InterviewError> {
        let id = submission.session_id;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or(InterviewError::SessionNotFound(id))?;
        entry.submissions.push(submission);
        Ok(())
    }

    pub async fn submissions(&self, id: Uuid) -> Result<Vec<Submission>, InterviewError> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| entry.submissions.clone())
            .ok_or(InterviewError::SessionNotFound(id))
    }

    /// Drops sessions whose budget ran out before `now`. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.session.is_expired_at(now));
        SESSIONS_ACTIVE.set(entries.len() as i64);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session(start: DateTime<Utc>, limit: u64) -> Session {
        Session::new(start, "Merge two sorted arrays".into(), limit)
    }

    #[tokio::test]
    async fn replace_question_keeps_start_time() {
        let store = SessionStore::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let s = session(start, 3600);
        let id = s.id;
        store.insert(s).await;

        store.replace_question(id, "Rotate a matrix".into()).await.unwrap();

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.question, "Rotate a matrix");
        assert_eq!(stored.started_at, start);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(InterviewError::SessionNotFound(missing)) if missing == id
        ));
        assert!(store.replace_question(id, "q".into()).await.is_err());
        assert!(store.submissions(id).await.is_err());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() {
        let store = SessionStore::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let short = session(start, 60);
        let long = session(start, 3600);
        let long_id = long.id;
        store.insert(short).await;
        store.insert(long).await;

        let removed = store.purge_expired(start + Duration::seconds(120)).await;

        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(long_id).await.is_ok());
    }

    #[tokio::test]
    async fn submissions_are_kept_in_order() {
        let store = SessionStore::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let s = session(start, 3600);
        let id = s.id;
        store.insert(s).await;

        for code in ["first()", "second()"] {
            store
                .push_submission(Submission {
                    id: Uuid::new_v4(),
                    session_id: id,
                    question: "Merge two sorted arrays".into(),
                    user_code: code.into(),
                    feedback: "ok".into(),
                    feedback_available: true,
                    email: None,
                    submitted_at: start,
                })
                .await
                .unwrap();
        }

        let codes: Vec<String> = store
            .submissions(id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.user_code)
            .collect();
        assert_eq!(codes, vec!["first()", "second()"]);
    }
}
