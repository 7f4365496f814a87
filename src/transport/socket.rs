// SPDX-License-Identifier: GPL-3.0-only
//! Unix-socket transport speaking line-delimited JSON.
//!
//! Two connections to the device daemon: a control connection carrying
//! request/reply pairs in lockstep, and a notify connection the daemon
//! pushes notifications down. Each frame is one JSON value on one line.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::Serialize;

use crate::notify::Notification;
use crate::protocol::{Reply, Request};

use super::{NotifySink, Transport, TransportError};

#[derive(Serialize)]
struct Hello<'a> {
    role: &'a str,
}

struct ControlChannel {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

/// Transport over a device daemon's Unix socket.
pub struct SocketTransport {
    path: PathBuf,
    control: Mutex<ControlChannel>,
    sink: Arc<Mutex<Option<NotifySink>>>,
}

impl SocketTransport {
    /// Connect both channels and start the notification reader thread.
    pub fn connect(path: &Path) -> Result<Self, TransportError> {
        let connect = |role: &str| -> Result<UnixStream, TransportError> {
            let mut stream = UnixStream::connect(path).map_err(|source| {
                TransportError::Connect {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            let mut hello = serde_json::to_string(&Hello { role })
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            hello.push('\n');
            stream
                .write_all(hello.as_bytes())
                .map_err(TransportError::Send)?;
            Ok(stream)
        };

        let control_stream = connect("control")?;
        let control_read = control_stream
            .try_clone()
            .map_err(TransportError::Send)?;
        let notify_stream = connect("notify")?;

        let sink: Arc<Mutex<Option<NotifySink>>> = Arc::new(Mutex::new(None));
        let thread_sink = Arc::clone(&sink);
        thread::Builder::new()
            .name("tv-notify".into())
            .spawn(move || notify_loop(notify_stream, thread_sink))
            .map_err(TransportError::Send)?;

        debug!("connected to device daemon at {}", path.display());

        Ok(SocketTransport {
            path: path.to_path_buf(),
            control: Mutex::new(ControlChannel {
                writer: control_stream,
                reader: BufReader::new(control_read),
            }),
            sink,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for SocketTransport {
    fn submit(&self, request: Request) -> Result<Reply, TransportError> {
        let expects_reply = request.expects_reply();
        let mut frame = serde_json::to_string(&request)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        frame.push('\n');

        let mut channel = self.control.lock().unwrap_or_else(|e| e.into_inner());
        channel
            .writer
            .write_all(frame.as_bytes())
            .map_err(TransportError::Send)?;

        if !expects_reply {
            return Ok(Reply::Code(0));
        }

        let mut line = String::new();
        let n = channel
            .reader
            .read_line(&mut line)
            .map_err(TransportError::Receive)?;
        if n == 0 {
            return Err(TransportError::Closed);
        }
        serde_json::from_str(line.trim_end())
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    fn set_notify_sink(&self, sink: NotifySink) {
        let mut slot = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sink);
    }
}

/// Reads notification frames until the daemon closes the connection.
fn notify_loop(stream: UnixStream, sink: Arc<Mutex<Option<NotifySink>>>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("notify channel closed by daemon");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("notify channel read failed: {e}");
                return;
            }
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        let notification: Notification = match serde_json::from_str(trimmed) {
            Ok(n) => n,
            Err(e) => {
                warn!("dropping malformed notification frame: {e}");
                continue;
            }
        };
        let target = {
            let slot = sink.lock().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        match target {
            Some(deliver) => deliver(notification),
            None => debug!("dropping '{}': no sink installed", notification.name()),
        }
    }
}
