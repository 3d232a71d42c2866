// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes a shell script in its own process group so a cancelled or timed
//! out run can be torn down along with every descendant it spawned, not just
//! the immediate child.

use async_trait::async_trait;
use breeze_dispatch::CommandHandler;
use breeze_platform::Platform;
use breeze_pool::CancellationScope;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

const DEADLINE: Duration = Duration::from_secs(900);
const OUTPUT_LIMIT: usize = 64 * 1024;

#[cfg(unix)]
const SHELL: &str = "/bin/sh";
#[cfg(unix)]
const SHELL_ARG: &str = "-c";
#[cfg(windows)]
const SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_ARG: &str = "/C";

pub struct RunScript {
    platform: Arc<dyn Platform>,
}

impl RunScript {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl CommandHandler for RunScript {
    fn deadline(&self) -> Duration {
        DEADLINE
    }

    async fn invoke(
        &self,
        payload: serde_json::Map<String, serde_json::Value>,
        scope: CancellationScope,
    ) -> Result<serde_json::Value, String> {
        let script = payload
            .get("script")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required field 'script'".to_string())?;

        let mut cmd = Command::new(SHELL);
        cmd.arg(SHELL_ARG)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.platform
            .new_process_group(&mut cmd)
            .map_err(|err| err.to_string())?;

        let mut child = cmd.spawn().map_err(|err| format!("failed to spawn script: {err}"))?;
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let stdout_task = tokio::spawn(async move { read_capped(&mut stdout).await });
        let stderr_task = tokio::spawn(async move { read_capped(&mut stderr).await });

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|err| format!("failed to wait on script: {err}"))?;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(serde_json::json!({
                    "exitCode": status.code(),
                    "stdout": stdout,
                    "stderr": stderr,
                }))
            }
            _ = scope.cancelled() => {
                if let Err(err) = self.platform.kill_process_group(&mut child) {
                    tracing::warn!(error = %err, "failed to kill script process group");
                }
                let _ = child.wait().await;
                Err("script execution cancelled".to_string())
            }
        }
    }
}

async fn read_capped(source: &mut Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    let Some(source) = source else {
        return String::new();
    };
    let mut buf = Vec::new();
    let mut limited = source.take(OUTPUT_LIMIT as u64);
    let _ = limited.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use breeze_platform::PlatformError;
    use std::path::PathBuf;

    struct NoopPlatform;
    impl Platform for NoopPlatform {
        fn is_service_mode(&self) -> bool {
            false
        }
        fn data_dir(&self) -> Result<PathBuf, PlatformError> {
            Ok(PathBuf::from("/tmp"))
        }
        fn new_process_group(&self, _cmd: &mut Command) -> Result<(), PlatformError> {
            Ok(())
        }
        fn kill_process_group(&self, _child: &mut tokio::process::Child) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn handler() -> RunScript {
        RunScript::new(Arc::new(NoopPlatform))
    }

    #[tokio::test]
    async fn missing_script_field_is_a_handler_error() {
        let err = handler()
            .invoke(serde_json::Map::new(), CancellationScope::new())
            .await
            .unwrap_err();
        assert!(err.contains("script"));
    }

    #[tokio::test]
    async fn successful_script_reports_exit_code_and_stdout() {
        let mut payload = serde_json::Map::new();
        payload.insert("script".into(), serde_json::json!("echo hello"));
        let result = handler()
            .invoke(payload, CancellationScope::new())
            .await
            .unwrap();
        assert_eq!(result["exitCode"], serde_json::json!(0));
        assert_eq!(result["stdout"].as_str().unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_still_a_completed_result() {
        let mut payload = serde_json::Map::new();
        payload.insert("script".into(), serde_json::json!("exit 7"));
        let result = handler()
            .invoke(payload, CancellationScope::new())
            .await
            .unwrap();
        assert_eq!(result["exitCode"], serde_json::json!(7));
    }

    #[tokio::test]
    async fn cancellation_kills_the_script_and_reports_an_error() {
        let mut payload = serde_json::Map::new();
        payload.insert("script".into(), serde_json::json!("sleep 5"));
        let scope = CancellationScope::new();
        let scope_clone = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            scope_clone.cancel();
        });
        let err = handler().invoke(payload, scope).await.unwrap_err();
        assert!(err.contains("cancelled"));
    }
}
