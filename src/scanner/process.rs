//! Deadline-bounded execution of the scan program.

use futures::future::join_all;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long pipe readers may keep draining once the child has ended.
const READER_GRACE: Duration = Duration::from_secs(2);

const PIPE_CHUNK: usize = 8 * 1024;

/// How the scan program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// The program exited on its own.
    Exited(ExitStatus),
    /// The program was killed at the deadline.
    TimedOut,
    /// The program was killed because the caller cancelled.
    Cancelled,
}

/// What a finished (or killed) scan program left behind.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    /// Stdout and stderr, interleaved in arrival order.
    pub output: Vec<u8>,
    pub termination: Termination,
    /// Time from spawn until the program ended or was killed.
    pub elapsed: Duration,
}

/// A started scan program with its output being collected.
#[derive(Debug)]
pub(crate) struct RunningProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
    output: Arc<Mutex<Vec<u8>>>,
    started: Instant,
}

/// Starts `program args... target` in its own process group.
///
/// The child is killed if the returned handle is dropped before it
/// ends.
pub(crate) fn spawn(program: &Path, args: &[String], target: &Path) -> io::Result<RunningProcess> {
    let mut command = Command::new(program);
    command
        .args(args)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn()?;
    let started = Instant::now();

    let output = Arc::new(Mutex::new(Vec::new()));
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(collect(stdout, Arc::clone(&output))));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(collect(stderr, Arc::clone(&output))));
    }

    Ok(RunningProcess {
        child,
        readers,
        output,
        started,
    })
}

impl RunningProcess {
    /// Waits for the program to end, killing it once `deadline` passes
    /// or `cancel` fires.
    ///
    /// Output produced before the kill is kept.
    pub(crate) async fn wait(
        mut self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> io::Result<ProcessOutput> {
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            waited = tokio::time::timeout(deadline, self.child.wait()) => Some(waited),
        };
        let termination = match waited {
            Some(Ok(Ok(status))) => Termination::Exited(status),
            Some(Ok(Err(e))) => {
                self.kill().await;
                return Err(e);
            }
            Some(Err(_)) => {
                self.kill().await;
                Termination::TimedOut
            }
            None => {
                self.kill().await;
                Termination::Cancelled
            }
        };
        let elapsed = self.started.elapsed();

        let aborts: Vec<_> = self.readers.iter().map(JoinHandle::abort_handle).collect();
        let readers = std::mem::take(&mut self.readers);
        if tokio::time::timeout(READER_GRACE, join_all(readers)).await.is_err() {
            tracing::debug!("scan program output still open after exit, abandoning readers");
            aborts.iter().for_each(|a| a.abort());
        }

        let output = std::mem::take(&mut *self.output.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(ProcessOutput {
            output,
            termination,
            elapsed,
        })
    }

    /// Kills the program and everything it started, then reaps it.
    async fn kill(&mut self) {
        self.signal_group();
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "failed to kill scan program");
        }
    }

    /// Sends SIGKILL to the program's process group, if it is still
    /// running.
    fn signal_group(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id().and_then(|id| i32::try_from(id).ok()) {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // ESRCH just means the group is already gone.
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        // A reaped child reports no id, so this only fires when the scan
        // future is dropped mid-run.
        self.signal_group();
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn collect<R>(mut pipe: R, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; PIPE_CHUNK];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&buf[..n]),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".into(), script.into(), "sh".into()]
    }

    #[tokio::test]
    async fn test_captures_both_streams_and_status() {
        let process = spawn(
            Path::new("/bin/sh"),
            &sh("echo \"out: $1\"; echo 'err: line' >&2; exit 3"),
            Path::new("/tmp/target"),
        )
        .unwrap();
        let result = process
            .wait(Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();

        let text = String::from_utf8(result.output).unwrap();
        assert!(text.contains("out: /tmp/target\n"), "{text}");
        assert!(text.contains("err: line\n"), "{text}");
        match result.termination {
            Termination::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected termination {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_kills_and_keeps_partial_output() {
        let process = spawn(
            Path::new("/bin/sh"),
            &sh("echo 'Engine version: 1'; sleep 30"),
            Path::new("/tmp/target"),
        )
        .unwrap();
        let result = process
            .wait(Duration::from_millis(300), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::TimedOut);
        assert!(result.elapsed < Duration::from_secs(5));
        assert_eq!(result.output, b"Engine version: 1\n");
    }

    #[tokio::test]
    async fn test_deadline_kills_grandchildren() {
        let started = Instant::now();
        let process = spawn(
            Path::new("/bin/sh"),
            &sh("sleep 30 & wait"),
            Path::new("/tmp/target"),
        )
        .unwrap();
        let result = process
            .wait(Duration::from_millis(300), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::TimedOut);
        assert!(started.elapsed() < READER_GRACE + Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cancel_kills_program() {
        let process = spawn(
            Path::new("/bin/sh"),
            &sh("echo started; sleep 30"),
            Path::new("/tmp/target"),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = process.wait(Duration::from_secs(60), &cancel).await.unwrap();
        assert_eq!(result.termination, Termination::Cancelled);
        assert!(result.elapsed < Duration::from_secs(5));
        assert_eq!(result.output, b"started\n");
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let err = spawn(
            Path::new("/nonexistent/clamscan"),
            &[],
            Path::new("/tmp/target"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
