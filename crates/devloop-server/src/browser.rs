//! Default browser launching.

use std::process::Stdio;

use tokio::process::Command;

/// Open `url` in the platform's default browser. Failures are only logged.
pub(crate) async fn open(url: &str) {
    let mut command = launcher(url);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match command.status().await {
        Ok(status) if status.success() => tracing::debug!(url, "Opened browser"),
        Ok(status) => tracing::debug!(url, %status, "Browser launcher failed"),
        Err(err) => tracing::debug!(url, error = %err, "Browser launcher not available"),
    }
}

fn launcher(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/c", "start", url]);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    }
}
