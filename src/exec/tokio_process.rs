// src/exec/tokio_process.rs

//! Real process spawner on top of `tokio::process::Command`.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::process::{DataCallback, ExitCallback, ProcessHandle, ProcessSpawner, SpawnRequest};

/// Spawns commands with piped stdout/stderr.
///
/// Output is forwarded as it is read, without waiting for a newline, so
/// `\r` progress redraws reach the listener live. There is no
/// pseudo-terminal, so [`ProcessHandle::resize`] is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessSpawner;

impl ProcessSpawner for TokioProcessSpawner {
    fn spawn(&self, request: SpawnRequest) -> Result<Box<dyn ProcessHandle>> {
        let mut cmd = if request.wsl {
            let mut c = Command::new("wsl.exe");
            c.arg("-e").arg(&request.program).args(&request.args);
            c
        } else {
            let mut c = Command::new(&request.program);
            c.args(&request.args);
            c
        };

        cmd.current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning process for command '{}'", request.name))?;

        info!(
            command = %request.name,
            program = %request.program,
            dry_run = request.dry_run,
            "started command process"
        );

        Ok(Box::new(TokioProcess {
            name: request.name,
            display_label: request.display_label,
            child: Some(child),
            on_data: None,
            cancel: None,
        }))
    }
}

/// Handle for one child process.
///
/// The child is pumped once the exit listener is attached; until then it
/// simply runs with its output buffered by the OS pipe.
pub struct TokioProcess {
    name: String,
    display_label: String,
    child: Option<Child>,
    on_data: Option<DataCallback>,
    cancel: Option<oneshot::Sender<()>>,
}

impl ProcessHandle for TokioProcess {
    fn on_data(&mut self, callback: DataCallback) -> bool {
        self.on_data = Some(callback);
        true
    }

    fn on_exit(&mut self, callback: ExitCallback) {
        let Some(child) = self.child.take() else {
            warn!(command = %self.name, "exit listener attached twice; ignoring");
            return;
        };

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.cancel = Some(cancel_tx);

        let pump = Pump {
            name: self.name.clone(),
            display_label: self.display_label.clone(),
            on_data: self.on_data.take(),
            on_exit: callback,
        };
        tokio::spawn(pump.run(child, cancel_rx));
    }

    fn kill(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(command = %self.name, "process already finished while killing");
            }
        } else if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(command = %self.name, error = %e, "failed to kill unpumped process");
            }
        }
    }
}

struct Pump {
    name: String,
    display_label: String,
    on_data: Option<DataCallback>,
    on_exit: ExitCallback,
}

impl Pump {
    async fn run(mut self, mut child: Child, mut cancel_rx: oneshot::Receiver<()>) {
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, &self.name, "stdout", chunk_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, &self.name, "stderr", chunk_tx.clone());
        }
        drop(chunk_tx);

        self.emit(format!("{}\n\n", self.display_label));

        // Drain output until both pipes close, or until cancelled.
        loop {
            tokio::select! {
                chunk = chunk_rx.recv() => match chunk {
                    Some(chunk) => self.emit(chunk),
                    None => break,
                },
                _ = &mut cancel_rx => {
                    self.cancelled(&mut child).await;
                    return;
                }
            }
        }

        tokio::select! {
            status = child.wait() => {
                let code = match status {
                    Ok(status) => status.code().unwrap_or(-1),
                    Err(e) => {
                        warn!(command = %self.name, error = %e, "waiting for process failed");
                        -1
                    }
                };
                info!(command = %self.name, exit_code = code, "command process exited");
                self.emit(if code == 0 {
                    "\nProcess completed\n".to_string()
                } else {
                    "\nProcess failed\n".to_string()
                });
                (self.on_exit)(code);
            }
            _ = &mut cancel_rx => {
                self.cancelled(&mut child).await;
            }
        }
    }

    fn emit(&mut self, chunk: String) {
        if let Some(cb) = self.on_data.as_mut() {
            cb(chunk);
        }
    }

    /// A killed process reports no exit: its record is already `terminated`.
    async fn cancelled(&mut self, child: &mut Child) {
        info!(command = %self.name, "kill requested; stopping process");
        if let Err(e) = child.kill().await {
            warn!(command = %self.name, error = %e, "failed to kill child process");
        }
    }
}

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Forward whatever the pipe yields, decoded lossily.
///
/// Invalid UTF-8 never stops the reader: closing the pipe early would
/// SIGPIPE the child. A multi-byte sequence cut by a read boundary is held
/// back until the rest of it arrives.
fn spawn_reader<R>(
    mut reader: R,
    name: &str,
    stream: &'static str,
    tx: mpsc::UnboundedSender<String>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let name = name.to_string();
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut pending: Vec<u8> = Vec::new();
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let text = take_decodable(&mut pending);
                    if !text.is_empty() && tx.send(text).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(command = %name, stream, error = %e, "reading process output failed");
                    break;
                }
            }
        }
        if !pending.is_empty() {
            let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
        }
    });
}

/// Drain `pending` up to any incomplete UTF-8 sequence at its end.
fn take_decodable(pending: &mut Vec<u8>) -> String {
    let ready_len = pending.len() - incomplete_utf8_suffix(pending);
    let ready: Vec<u8> = pending.drain(..ready_len).collect();
    String::from_utf8_lossy(&ready).into_owned()
}

/// Length of a truncated multi-byte sequence at the end of `bytes`, or 0.
fn incomplete_utf8_suffix(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

