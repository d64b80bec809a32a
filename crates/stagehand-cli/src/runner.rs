//! Spawns the host test runner for one test, with skip variables applied.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use stagehand_core::store::SKIP_STAGE_ENV_VAR_PREFIX;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

const GO_TEST_TIMEOUT: &str = "2h";

/// Runs `go test` filtered to exactly `test_name` in `package_dir`, exporting
/// `SKIP_<stage>=true` for every stage in `stages_to_skip`. Output streams to
/// the terminal as it arrives and is returned once the child exits. The exit
/// status of the child is the sole success signal; its output is not parsed.
pub async fn run_test(
    package_dir: &Path,
    test_name: &str,
    stages_to_skip: &[String],
) -> Result<String> {
    let test_filter = format!("^{test_name}$");
    debug!(test = test_name, filter = %test_filter, "running go test");

    let mut cmd = tokio::process::Command::new("go");
    cmd.args([
        "test",
        "-count",
        "1",
        "-v",
        "-run",
        &test_filter,
        "-timeout",
        GO_TEST_TIMEOUT,
    ])
    .arg(package_dir)
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());
    for stage in stages_to_skip {
        cmd.env(format!("{SKIP_STAGE_ENV_VAR_PREFIX}{stage}"), "true");
    }

    let mut child = cmd.spawn().context("failed to spawn go test")?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr was not captured"))?;

    // Both readers drain before we inspect the exit status; lines from the
    // two streams may interleave but each stream stays in emission order.
    let output = Arc::new(Mutex::new(Vec::<String>::new()));
    let stdout_task = tokio::spawn(read_lines(stdout, Arc::clone(&output), false));
    let stderr_task = tokio::spawn(read_lines(stderr, Arc::clone(&output), true));
    stdout_task.await??;
    stderr_task.await??;

    let status = child.wait().await.context("failed to wait for go test")?;
    let lines = Arc::try_unwrap(output)
        .map_err(|_| anyhow!("output readers still running"))?
        .into_inner();
    if !status.success() {
        bail!("go test exited with {status}");
    }
    Ok(lines.join("\n"))
}

async fn read_lines<R: AsyncRead + Unpin>(
    reader: R,
    buffer: Arc<Mutex<Vec<String>>>,
    to_stderr: bool,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
        buffer.lock().await.push(line);
    }
    Ok(())
}
