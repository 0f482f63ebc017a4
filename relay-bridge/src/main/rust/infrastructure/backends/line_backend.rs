use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ChatBackend, InboundText};
use crate::domain::value_objects::EndpointConfig;

/// Read timeouts in a row without any inbound traffic before the peer is declared gone
const MAX_SILENT_INTERVALS: u32 = 2;

/// Timeouts for the TCP line transport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTimeouts {
    pub connect: Duration,
    pub keepalive: Duration,
}

impl Default for LineTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            keepalive: Duration::from_secs(60),
        }
    }
}

/// Line-oriented TCP backend.
///
/// Handshake: optional `PASS <password>`, then `HELLO <identity> <channel>`.
/// Inbound: `MSG <sender> <text>` and `PING <token>`; anything else is ignored.
/// Outbound: `MSG <text>`, `STATUS [text]`, `PONG <token>`, `QUIT` on close.
pub struct LineBackend {
    endpoint: EndpointConfig,
    timeouts: LineTimeouts,
    reader: Mutex<Option<BufReader<TcpStream>>>,
    writer: Mutex<Option<TcpStream>>,
    /// Separate handle so `close` never waits on a blocked reader
    control: Mutex<Option<TcpStream>>,
    silent_intervals: AtomicU32,
}

impl LineBackend {
    pub fn new(endpoint: EndpointConfig, timeouts: LineTimeouts) -> Self {
        Self {
            endpoint,
            timeouts,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            control: Mutex::new(None),
            silent_intervals: AtomicU32::new(0),
        }
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in self.endpoint.address().to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeouts.connect) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }

    fn handle_line(&self, line: &str) -> Result<Option<InboundText>> {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "MSG" => {
                let (sender, text) = rest.split_once(' ').unwrap_or((rest, ""));
                Ok(Some(InboundText::new(sender, text)))
            }
            "PING" => {
                self.send_raw(&format!("PONG {}", rest))?;
                Ok(None)
            }
            _ => {
                tracing::trace!(endpoint = %self.endpoint.address(), "ignoring line: {}", line);
                Ok(None)
            }
        }
    }

    fn on_read_timeout(&self) -> Result<Option<InboundText>> {
        let silent = self.silent_intervals.fetch_add(1, Ordering::SeqCst) + 1;
        if silent >= MAX_SILENT_INTERVALS {
            return Err(DomainError::TransportLost(format!(
                "no traffic for {} keepalive intervals",
                silent
            )));
        }
        self.send_raw(&format!("PING {}", self.endpoint.identity()))?;
        Ok(None)
    }
}

impl ChatBackend for LineBackend {
    fn open(&self) -> Result<()> {
        let stream = self
            .connect()
            .map_err(|e| DomainError::OpenFailure(format!("{}: {}", self.endpoint.address(), e)))?;

        let io_failure = |e: io::Error| DomainError::OpenFailure(e.to_string());
        stream.set_nodelay(true).map_err(io_failure)?;
        stream
            .set_read_timeout(Some(self.timeouts.keepalive))
            .map_err(io_failure)?;
        let reader = stream.try_clone().map_err(io_failure)?;
        let control = stream.try_clone().map_err(io_failure)?;

        *lock(&self.reader) = Some(BufReader::new(reader));
        *lock(&self.writer) = Some(stream);
        *lock(&self.control) = Some(control);
        self.silent_intervals.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        let handshake = |e: DomainError| DomainError::InitFailure(e.to_string());
        if let Some(password) = self.endpoint.password() {
            self.send_raw(&format!("PASS {}", password))
                .map_err(handshake)?;
        }
        self.send_raw(&format!(
            "HELLO {} {}",
            self.endpoint.identity(),
            self.endpoint.channel()
        ))
        .map_err(handshake)
    }

    fn close(&self) {
        if let Some(mut writer) = lock(&self.writer).take() {
            let _ = writer.write_all(b"QUIT\n");
        }
        if let Some(control) = lock(&self.control).take() {
            let _ = control.shutdown(Shutdown::Both);
        }
    }

    fn receive(&self) -> Result<Option<InboundText>> {
        let mut raw = Vec::new();
        let read = match lock(&self.reader).as_mut() {
            Some(reader) => reader.read_until(b'\n', &mut raw),
            None => return Err(DomainError::TransportLost("not connected".to_string())),
        };

        match read {
            Ok(0) => Err(DomainError::TransportLost(
                "connection closed by peer".to_string(),
            )),
            Ok(_) => {
                self.silent_intervals.store(0, Ordering::SeqCst);
                // peers are not required to speak UTF-8
                let line = String::from_utf8_lossy(&raw);
                self.handle_line(line.trim_end_matches(['\r', '\n']))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                self.on_read_timeout()
            }
            Err(e) => Err(DomainError::TransportLost(e.to_string())),
        }
    }

    fn send_raw(&self, line: &str) -> Result<()> {
        let mut writer = lock(&self.writer);
        let stream = writer
            .as_mut()
            .ok_or_else(|| DomainError::TransportLost("not connected".to_string()))?;

        stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .and_then(|()| stream.flush())
            .map_err(|e| DomainError::TransportLost(e.to_string()))
    }

    fn send_text(&self, text: &str) -> Result<()> {
        for line in text.lines() {
            self.send_raw(&format!("MSG {}", line))?;
        }
        Ok(())
    }

    fn set_status_text(&self, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) => self.send_raw(&format!("STATUS {}", text.replace('\n', " "))),
            None => self.send_raw("STATUS"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
