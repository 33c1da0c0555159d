//! Outcome model: the recorded result of one `run`.
//!
//! This is a report shape only. It never changes what `run` returns; the
//! scheduler builds it after the fact for logs and the CLI's JSON output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{RunId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub status: RunStatus,
    /// Error text as reported, when `status` is `Failed`.
    pub error: Option<String>,
    pub payload_len: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outcome(status: RunStatus, error: Option<String>) -> RunOutcome {
        let started_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        RunOutcome {
            task_id: TaskId::generate(),
            run_id: RunId::generate(),
            status,
            error,
            payload_len: 3,
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(250),
        }
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_value(outcome(RunStatus::Failed, Some("boom".into()))).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["payload_len"], 3);
    }

    #[test]
    fn elapsed_is_computed_from_timestamps() {
        let o = outcome(RunStatus::Succeeded, None);
        assert!(o.is_success());
        assert_eq!(o.elapsed_ms(), 250);
    }
}
