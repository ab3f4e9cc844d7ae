//! Async readers for a child's output streams (non-UTF8-safe).
//!
//! llama-cli is C/C++ tooling and can emit invalid UTF-8, and the token
//! boundaries it flushes on need not fall on character boundaries. Standard
//! output is forwarded chunk by chunk, carrying incomplete multi-byte
//! sequences over to the next read. Standard error is forwarded line by line
//! with lossy decoding; partial lines are reported as progress.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

const READ_BUFFER_SIZE: usize = 4096;

/// Longest standard-error line kept whole.
pub const MAX_LINE_BYTES: usize = 8192;

/// One unit of captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A chunk of standard output, exactly as flushed (modulo UTF-8 carry).
    Stdout(String),
    /// One line of standard error, without its line terminator.
    Stderr(String),
    /// Standard-error bytes that did not yet complete a line.
    Progress,
}

/// Incremental UTF-8 decoder that never splits a character.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Decode `bytes` after any carried-over prefix.
    ///
    /// Invalid sequences become U+FFFD; a truncated sequence at the end is
    /// held back until the next call.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Truncated sequence: wait for more bytes.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}

/// Forward standard output chunks to `tx` until EOF.
pub fn spawn_stdout_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::UnboundedSender<Output>,
    process_id: String,
) {
    tokio::spawn(async move {
        let mut stream = stream;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut carry = Utf8Carry::default();

        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    let text = carry.push(&buf[..n]);
                    if !text.is_empty() && tx.send(Output::Stdout(text)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(%process_id, error = %e, "stdout reader exiting due to read error");
                    break;
                }
            }
        }

        let tail = carry.finish();
        if !tail.is_empty() {
            let _ = tx.send(Output::Stdout(tail));
        }
        debug!(%process_id, "stdout reader task exiting");
    });
}

/// Forward standard error to `tx` until EOF.
///
/// Complete lines go out as [`Output::Stderr`]. A read that ends mid-line
/// sends [`Output::Progress`] instead, so progress text written without a
/// newline still counts as activity.
pub fn spawn_stderr_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::UnboundedSender<Output>,
    process_id: String,
) {
    tokio::spawn(async move {
        let mut stream = stream;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut lines = LineSplitter::default();

        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    let complete = lines.push(&buf[..n]);
                    let mut outputs: Vec<Output> =
                        complete.into_iter().map(Output::Stderr).collect();
                    if outputs.is_empty() {
                        outputs.push(Output::Progress);
                    }
                    if outputs.into_iter().any(|out| tx.send(out).is_err()) {
                        break;
                    }
                }
                Err(e) => {
                    debug!(%process_id, error = %e, "stderr reader exiting due to read error");
                    break;
                }
            }
        }

        if let Some(tail) = lines.finish() {
            let _ = tx.send(Output::Stderr(tail));
        }
        debug!(%process_id, "stderr reader task exiting");
    });
}

/// Splits a byte stream into lossily decoded lines, without terminators.
///
/// A line longer than [`MAX_LINE_BYTES`] is emitted in pieces.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Append `bytes` and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                lines.push(self.take_line());
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    lines.push(self.take_line());
                }
            }
        }
        lines
    }

    /// The unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| self.take_line())
    }

    fn take_line(&mut self) -> String {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_holds_back_split_character() {
        let mut carry = Utf8Carry::default();
        let bytes = "héllo".as_bytes();
        // 'é' is two bytes at index 1..3; split inside it.
        assert_eq!(carry.push(&bytes[..2]), "h");
        assert_eq!(carry.push(&bytes[2..]), "éllo");
        assert_eq!(carry.finish(), "");
    }

    #[test]
    fn carry_replaces_invalid_bytes() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn carry_flushes_truncated_tail_lossily() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(carry.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn readers_forward_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_stdout_reader(&b"hello world"[..], tx.clone(), "t".into());
        spawn_stderr_reader(&b"line one\r\nline two\n"[..], tx, "t".into());

        let mut stdout = String::new();
        let mut stderr = Vec::new();
        while let Some(out) = rx.recv().await {
            match out {
                Output::Stdout(s) => stdout.push_str(&s),
                Output::Stderr(l) => stderr.push(l),
                Output::Progress => {}
            }
        }
        assert_eq!(stdout, "hello world");
        assert_eq!(stderr, vec!["line one", "line two"]);
    }

    #[test]
    fn splitter_joins_lines_across_reads() {
        let mut lines = LineSplitter::default();
        assert!(lines.push(b"loading mo").is_empty());
        assert_eq!(lines.push(b"del\r\nerror: x\npartial"), vec!["loading model", "error: x"]);
        assert_eq!(lines.finish().as_deref(), Some("partial"));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn splitter_caps_runaway_lines() {
        let mut lines = LineSplitter::default();
        let dots = vec![b'.'; MAX_LINE_BYTES + 10];
        let out = lines.push(&dots);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), MAX_LINE_BYTES);
        assert_eq!(lines.finish().map(|l| l.len()), Some(10));
    }

    #[tokio::test]
    async fn unterminated_stderr_reports_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_stderr_reader(&b"llama_load: ....."[..], tx, "t".into());

        assert_eq!(rx.recv().await, Some(Output::Progress));
        assert_eq!(rx.recv().await, Some(Output::Stderr("llama_load: .....".into())));
        assert_eq!(rx.recv().await, None);
    }
}
