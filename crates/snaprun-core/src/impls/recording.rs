//! RecordingEngine - 開発・テスト用のエンジン
//!
//! 受け取ったスナップショットをそのまま記録します。スナップショットを
//! 実際には実行しないので、CLI の `--dry-run` とテストで使います。

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::EngineError;
use crate::ports::SnapshotEngine;

#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<Vec<u8>>>,
    /// Fail every call with this message.
    failure: Option<String>,
    /// Fail only calls whose payload equals this.
    fail_on: Option<(Vec<u8>, String)>,
    /// Block this long inside each call.
    delay: Option<Duration>,
    panic_on: Option<Vec<u8>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, payload: impl Into<Vec<u8>>, message: impl Into<String>) -> Self {
        self.fail_on = Some((payload.into(), message.into()));
        self
    }

    pub fn panic_on(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.panic_on = Some(payload.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Payloads received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SnapshotEngine for RecordingEngine {
    fn run_snapshot(&self, snapshot: &[u8]) -> Result<(), EngineError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.to_vec());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panic_on.as_deref() == Some(snapshot) {
            panic!("recording engine asked to panic");
        }
        if let Some(message) = &self.failure {
            return Err(EngineError::new(message.clone()));
        }
        match &self.fail_on {
            Some((payload, message)) if payload.as_slice() == snapshot => {
                Err(EngineError::new(message.clone()))
            }
            _ => Ok(()),
        }
    }
}
