use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ChatBackend, InboundText};

/// The local terminal as a backend: lines in from a reader, lines out to a writer.
///
/// There is nothing to open or close. End of input counts as a lost transport,
/// which ends `Connection::run`.
pub struct ConsoleBackend<R, W> {
    sender: String,
    input: Mutex<R>,
    output: Mutex<W>,
}

impl ConsoleBackend<BufReader<Stdin>, Stdout> {
    pub fn stdio(sender: impl Into<String>) -> Self {
        Self::new(sender, BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> ConsoleBackend<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(sender: impl Into<String>, input: R, output: W) -> Self {
        Self {
            sender: sender.into(),
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Consume the backend and hand back the writer (used to inspect output)
    pub fn into_output(self) -> W {
        self.output
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn output(&self) -> MutexGuard<'_, W> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R, W> ChatBackend for ConsoleBackend<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn open(&self) -> Result<()> {
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) {}

    fn receive(&self) -> Result<Option<InboundText>> {
        let mut raw = Vec::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_until(b'\n', &mut raw)
            .map_err(|e| DomainError::TransportLost(format!("console read failed: {}", e)))?;

        if read == 0 {
            return Err(DomainError::TransportLost("end of console input".to_string()));
        }

        let line = String::from_utf8_lossy(&raw).into_owned();
        Ok(Some(InboundText::new(self.sender.clone(), line)))
    }

    fn send_raw(&self, line: &str) -> Result<()> {
        let mut output = self.output();
        writeln!(output, "{}", line)
            .and_then(|()| output.flush())
            .map_err(|e| DomainError::TransportLost(format!("console write failed: {}", e)))
    }

    fn transform_inbound(&self, text: &str) -> String {
        text.trim_end_matches(['\r', '\n']).to_string()
    }
}
