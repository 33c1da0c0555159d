//! Domain model (snapshot, ids, errors, outcomes).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod snapshot;

pub use self::errors::{EngineError, SchedulerError};
pub use self::ids::{RunId, TaskId};
pub use self::outcome::{RunOutcome, RunStatus};
pub use self::snapshot::Snapshot;
