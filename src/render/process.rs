//! Runs an external program with piped standard streams and a deadline.

use super::{Error, Result};
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `command`, feeding it `stdin` (if any), and returns its standard
/// output. Fails if the program can't be started, exits unsuccessfully, or is
/// still running after `timeout`, in which case it is killed.
pub fn run(mut command: Command, stdin: Option<&[u8]>, timeout: Duration) -> Result<Vec<u8>> {
    let program = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(match stdin {
            Some(_) => Stdio::piped(),
            None => Stdio::null(),
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|err| Error::Spawn {
        program: program.clone(),
        err,
    })?;

    // Feed and drain the pipes on their own threads so a chatty child can't
    // block on a full pipe while we poll for its exit.
    let writer = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(input)) => {
            let input = input.to_vec();
            Some(thread::spawn(move || pipe.write_all(&input)))
        }
        _ => None,
    };
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout { program, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(Error::Io { program, err }),
        }
    };

    let stdout = join(stdout).map_err(|err| Error::Io {
        program: program.clone(),
        err,
    })?;
    let stderr = join(stderr).unwrap_or_default();

    if !status.success() {
        return Err(Error::Exit {
            program,
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_owned(),
        });
    }

    if let Some(writer) = writer {
        match writer.join() {
            Ok(Err(err)) if err.kind() != io::ErrorKind::BrokenPipe => {
                return Err(Error::Io { program, err });
            }
            _ => {}
        }
    }

    Ok(stdout)
}

/// Like [`run`] but decodes the output as UTF-8.
pub fn run_to_string(command: Command, stdin: Option<&[u8]>, timeout: Duration) -> Result<String> {
    let program = command.get_program().to_string_lossy().into_owned();
    String::from_utf8(run(command, stdin, timeout)?).map_err(|_| Error::Utf8 { program })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "pipe reader panicked"))),
    }
}
