//! Line splitting for the encoder's merged output stream.
//!
//! ffmpeg terminates its periodic status line with `\r` so that terminals
//! redraw it in place, while everything else ends with `\n`. Both count as
//! line terminators here. Bytes are decoded lossily: invalid UTF-8 becomes
//! U+FFFD rather than an error.

use std::io::{self, Read};

const READ_CHUNK: usize = 8 * 1024;

/// Reads `\r`/`\n`-terminated lines from a byte stream, skipping blank ones.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Returns the next non-blank line, or `Ok(None)` once the stream is closed.
    ///
    /// A read error leaves any buffered partial line in place, so the caller
    /// may simply call again to retry.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.take_remainder());
            }

            let mut chunk = [0_u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&chunk[..n]);
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = decode(&raw[..pos]);
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
        None
    }

    fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode(&self.pending);
        self.pending.clear();
        (!line.trim().is_empty()).then_some(line)
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
