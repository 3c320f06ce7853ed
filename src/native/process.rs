use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};

use crate::core::registry::CommandSpec;
use crate::core::traits::runner::ExitState;

/// How long pipe readers may keep draining once the child has exited or
/// its process group was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug)]
pub struct Captured {
    pub status: ExitState,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum SupervisionError {
    Launch(io::Error),
    TimedOut { stdout: String, stderr: String },
    Wait(io::Error),
}

type PipeReader = JoinHandle<io::Result<Vec<u8>>>;

/// Runs `spec` to completion or until `limit` elapses.
///
/// The child leads its own process group so that on expiry everything it
/// spawned is killed with it. `stdin` of `None` attaches `/dev/null`.
pub async fn run_with_deadline(
    spec: &CommandSpec,
    stdin: Option<&str>,
    limit: Duration,
    max_output_bytes: usize,
) -> Result<Captured, SupervisionError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.current_dir)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let deadline = started + limit;
    let mut child = cmd.spawn().map_err(SupervisionError::Launch)?;
    let pid = child.id();
    tracing::debug!("Spawned {} as pid {:?}", spec, pid);

    let stdin_writer = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(payload)) => {
            let payload = payload.as_bytes().to_vec();
            Some(tokio::spawn(async move {
                // A program that never reads its input closes the pipe early.
                if let Err(e) = pipe.write_all(&payload).await {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        tracing::warn!("Failed to write stdin: {}", e);
                    }
                }
                drop(pipe);
            }))
        }
        _ => None,
    };
    let stdout_reader = spawn_reader(child.stdout.take(), max_output_bytes, "stdout");
    let stderr_reader = spawn_reader(child.stderr.take(), max_output_bytes, "stderr");

    let waited = timeout_at(deadline, child.wait()).await;
    if let Some(writer) = stdin_writer {
        writer.abort();
    }

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            terminate(&mut child, pid).await;
            stdout_reader.abort();
            stderr_reader.abort();
            return Err(SupervisionError::Wait(e));
        }
        Err(_) => {
            tracing::debug!("Deadline of {:?} exceeded by pid {:?}", limit, pid);
            terminate(&mut child, pid).await;
            return Err(timed_out(stdout_reader, stderr_reader).await);
        }
    };

    // Descendants that outlive the child keep the pipes open; they are
    // bounded by the deadline, but output still in flight from a child that
    // exited near it gets at least the drain grace.
    let drain_until = deadline.max(Instant::now() + DRAIN_GRACE);
    let stdout = drain(stdout_reader, drain_until.saturating_duration_since(Instant::now())).await;
    let stderr = drain(stderr_reader, drain_until.saturating_duration_since(Instant::now())).await;
    let (stdout, stderr) = match (stdout, stderr) {
        (Drained::Done(stdout), Drained::Done(stderr)) => (stdout, stderr),
        (stdout, stderr) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            return Err(SupervisionError::TimedOut {
                stdout: stdout.finish(),
                stderr: stderr.finish(),
            });
        }
    };

    Ok(Captured {
        status: exit_state(status),
        stdout: lossy(stdout),
        stderr: lossy(stderr),
        elapsed: started.elapsed(),
    })
}

async fn timed_out(stdout: PipeReader, stderr: PipeReader) -> SupervisionError {
    let stdout = drain(stdout, DRAIN_GRACE).await.finish();
    let stderr = drain(stderr, DRAIN_GRACE).await.finish();
    SupervisionError::TimedOut { stdout, stderr }
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_process_group(pid);
    }
    // kill() also reaps, so no zombie is left behind.
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill pid {:?}: {}", pid, e);
    }
}

pub fn kill_process_group(pid: u32) {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        unsafe {
            let _ = libc::kill(-pid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

fn spawn_reader<R>(pipe: Option<R>, cap: usize, name: &'static str) -> PipeReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return Ok(Vec::new());
        };
        let mut captured = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut discarded = 0usize;
        loop {
            let n = pipe.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            let room = cap.saturating_sub(captured.len());
            captured.extend_from_slice(&chunk[..n.min(room)]);
            discarded += n.saturating_sub(room);
        }
        if discarded > 0 {
            tracing::warn!(
                "Truncated {}: kept {} bytes, discarded {}",
                name,
                captured.len(),
                discarded
            );
        }
        Ok(captured)
    })
}

enum Drained {
    Done(Vec<u8>),
    Abandoned,
}

impl Drained {
    fn finish(self) -> String {
        match self {
            Drained::Done(bytes) => lossy(bytes),
            Drained::Abandoned => String::new(),
        }
    }
}

async fn drain(mut reader: PipeReader, limit: Duration) -> Drained {
    match timeout(limit, &mut reader).await {
        Ok(Ok(Ok(bytes))) => Drained::Done(bytes),
        Ok(Ok(Err(e))) => {
            tracing::warn!("Failed to read child output: {}", e);
            Drained::Done(Vec::new())
        }
        Ok(Err(e)) => {
            tracing::warn!("Output reader task failed: {}", e);
            Drained::Done(Vec::new())
        }
        Err(_) => {
            reader.abort();
            Drained::Abandoned
        }
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn exit_state(status: ExitStatus) -> ExitState {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return ExitState::Signal(signal);
        }
    }
    ExitState::Code(status.code().unwrap_or(-1))
}
