//! External command execution with a time budget.
//!
//! Clone, fetch and line-count tools are all run through [`run`], which takes
//! a fully built [`Command`] (structured argument list, optional working
//! directory and environment), captures its output, and kills the child when
//! it exceeds the timeout.

use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

/// Default time budget for a single external command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `command` to completion or until `timeout` elapses.
///
/// Returns the captured output regardless of exit status; use
/// [`run_checked`] to turn a non-zero exit into an error.
pub fn run(command: &mut Command, timeout: Duration) -> Result<Output> {
    let program = program_name(command);
    debug!("Running {:?}", command);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout)? {
        Some(status) => status,
        None => {
            // The readers are left detached: grandchildren may still hold the pipes.
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::CommandTimeout {
                program,
                seconds: timeout.as_secs(),
            });
        }
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
    })
}

/// Like [`run`], but a non-zero exit becomes [`Error::Command`].
pub fn run_checked(command: &mut Command, timeout: Duration) -> Result<Output> {
    let program = program_name(command);
    let output = run(command, timeout)?;
    if !output.status.success() {
        return Err(Error::Command {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
