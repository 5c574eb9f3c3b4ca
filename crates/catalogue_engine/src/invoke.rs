use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use catalogue_logging::{catalogue_debug, catalogue_warn};
use wait_timeout::ChildExt;

/// Result of running a binary to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output followed by standard error.
    pub combined_output: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("binary not found: {0:?}")]
    NotFound(PathBuf),
    #[error("failed to start {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("binary did not exit within {0:?}")]
    Timeout(Duration),
    #[error("io error while waiting for binary: {0}")]
    Io(#[from] io::Error),
}

pub trait BinaryInvoker: Send + Sync {
    fn invoke(&self, path: &Path, args: &[&str], timeout: Duration)
        -> Result<Invocation, InvokeError>;
}

/// Runs binaries as child processes with a hard time limit.
///
/// On Linux the binary's directory is put on `LD_LIBRARY_PATH` so bundled
/// shared libraries next to it are found.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

impl BinaryInvoker for ProcessInvoker {
    fn invoke(
        &self,
        path: &Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Invocation, InvokeError> {
        if !path.is_file() {
            return Err(InvokeError::NotFound(path.to_path_buf()));
        }

        let mut cmd = Command::new(path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if cfg!(target_os = "linux") {
            if let Some(dir) = path.parent() {
                cmd.env("LD_LIBRARY_PATH", dir);
            }
        }

        let mut child = cmd.spawn().map_err(|source| InvokeError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;
        catalogue_debug!("Started {:?} {:?} (pid {})", path, args, child.id());
        let deadline = Instant::now() + timeout;

        // Drained on their own threads so a chatty binary cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        match child.wait_timeout(timeout)? {
            Some(status) => {
                // A grandchild that inherited the pipes may hold them open past exit.
                let mut combined_output = collect_reader(stdout, deadline);
                combined_output.push_str(&collect_reader(stderr, deadline));
                Ok(Invocation {
                    exit_code: status.code(),
                    combined_output,
                })
            }
            None => {
                if let Err(err) = child.kill() {
                    catalogue_warn!("Could not kill {:?}: {}", path, err);
                }
                let _ = child.wait();
                Err(InvokeError::Timeout(timeout))
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        let _ = tx.send(buffer);
    });
    rx
}

/// Output of a reader thread, or nothing if it has not hit end of file by `deadline`.
fn collect_reader(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(reader) = reader else {
        return String::new();
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => {
            catalogue_warn!("Output pipe still open at the deadline, dropping its contents");
            String::new()
        }
    }
}
