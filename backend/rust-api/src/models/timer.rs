use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Session, SessionState, SessionStatus};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    TimeExpired(TimeExpired),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerTick {
    pub session_id: Uuid,
    pub remaining_seconds: i64,
    pub elapsed_seconds: i64,
    pub total_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeExpired {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl TimerEvent {
    /// Event describing `status` for `session`, observed at `now`.
    pub fn observe(session: &Session, status: &SessionStatus, now: DateTime<Utc>) -> Self {
        match status.state {
            SessionState::Expired => TimerEvent::TimeExpired(TimeExpired {
                session_id: session.id,
                timestamp: now,
                message: "Time limit exceeded".to_string(),
            }),
            SessionState::Active | SessionState::Fresh => TimerEvent::TimerTick(TimerTick {
                session_id: session.id,
                remaining_seconds: status.remaining_seconds(),
                elapsed_seconds: status.elapsed_seconds(),
                total_seconds: status.time_limit.num_seconds(),
                timestamp: now,
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerEvent::TimeExpired(_))
    }

    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
        }
    }
}
