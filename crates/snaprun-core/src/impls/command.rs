//! CommandEngine - 外部プログラムとしてのスナップショットエンジン
//!
//! 設定されたプログラムを起動し、スナップショットを stdin に書き込んで
//! 終了を待ちます。stdout はそのまま継承し、stderr はエラー報告用に回収します。
//! タイムアウトはありません（エンジンが止まるまで待つ）。

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::errors::EngineError;
use crate::ports::SnapshotEngine;

#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build from config; `None` when no program is configured.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let program = config.program.as_ref()?;
        let engine = config
            .args
            .iter()
            .fold(Self::new(program), |engine, a| engine.arg(a));
        Some(engine)
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl SnapshotEngine for CommandEngine {
    fn run_snapshot(&self, snapshot: &[u8]) -> Result<(), EngineError> {
        let program = self.program.display().to_string();
        debug!(%program, bytes = snapshot.len(), "spawning engine");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::with_source(format!("failed to start {program}"), e))?;

        // stdin は別スレッドで書き込み、こちらは stderr を読みながら終了を待つ。
        // 同じスレッドで順番にやると、両方のパイプが詰まったときに互いを待ち続ける。
        let stdin = child.stdin.take();
        let (write_result, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                // 書き終えたら drop して EOF を送る
                Some(mut stdin) => stdin.write_all(snapshot),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let write_result = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (write_result, output)
        });

        let output = output
            .map_err(|e| EngineError::with_source(format!("failed to wait for {program}"), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("{program} exited with {}", output.status)
            } else {
                format!("{program} exited with {}: {stderr}", output.status)
            };
            return Err(EngineError::new(message));
        }

        write_result.map_err(|e| {
            EngineError::with_source(format!("failed to write snapshot to {program}"), e)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandEngine {
        CommandEngine::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn passes_snapshot_bytes_on_stdin() {
        let engine = sh(r#"[ "$(od -An -tx1 | tr -d ' \n')" = "010203" ]"#);
        engine.run_snapshot(&[0x01, 0x02, 0x03]).unwrap();
    }

    #[test]
    fn empty_snapshot_is_passed_as_empty_stdin() {
        let engine = sh(r#"[ "$(wc -c | tr -d ' ')" = "0" ]"#);
        engine.run_snapshot(&[]).unwrap();
    }

    #[test]
    fn non_zero_exit_reports_status_and_stderr() {
        let engine = sh("cat > /dev/null; echo 'bad snapshot' >&2; exit 3");
        let err = engine.run_snapshot(&[0xff]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad snapshot"), "{msg}");
        assert!(msg.contains('3'), "{msg}");
    }

    #[test]
    fn large_snapshot_with_chatty_stderr_completes() {
        // 256 KiB を stderr に書いてから stdin を読むエンジン
        let engine = sh("head -c 262144 /dev/zero >&2; cat > /dev/null");
        let snapshot = vec![0x5a; 1024 * 1024];

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(engine.run_snapshot(&snapshot));
        });

        let result = rx
            .recv_timeout(std::time::Duration::from_secs(30))
            .expect("engine call did not finish");
        result.unwrap();
    }

    #[test]
    fn large_snapshot_reaches_engine_intact() {
        let engine = sh(r#"[ "$(wc -c | tr -d ' ')" = "2097152" ]"#);
        engine.run_snapshot(&vec![0xa5; 2 * 1024 * 1024]).unwrap();
    }

    #[test]
    fn missing_program_is_engine_error() {
        let engine = CommandEngine::new("/nonexistent/snaprun-engine");
        let err = engine.run_snapshot(&[1]).unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn from_config_requires_program() {
        assert!(CommandEngine::from_config(&EngineConfig::default()).is_none());

        let config = EngineConfig {
            program: Some(PathBuf::from("vm")),
            args: vec!["--run".into(), "-".into()],
        };
        let engine = CommandEngine::from_config(&config).unwrap();
        assert_eq!(engine.program(), &PathBuf::from("vm"));
        assert_eq!(engine.args, vec![OsString::from("--run"), OsString::from("-")]);
    }
}
