//! Incremental frame decoding: raw byte chunks to complete protocol lines.

/// Splits an arbitrarily chunked byte stream into newline-delimited lines.
///
/// The fragment after the last `\n` is held back until more bytes arrive —
/// it may be the start of a line whose remainder has not been delivered yet.
/// Bytes are buffered raw and each complete line is decoded on emission, so
/// a multi-byte character split across chunk boundaries survives intact.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, returning every line it completes, in order.
    ///
    /// An empty chunk is a no-op. A chunk without a newline only grows the
    /// buffer. A chunk ending exactly on `\n` leaves an empty buffer.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            self.buffer.pop(); // the newline itself
            if self.buffer.last() == Some(&b'\r') {
                self.buffer.pop();
            }
            lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
            self.buffer = rest;
        }
        lines
    }

    /// Bytes after the last newline, pending completion.
    ///
    /// At stream end a non-empty residue is a truncated line; it is dropped
    /// rather than parsed, since it cannot be trusted to be complete JSON.
    pub fn residue(&self) -> &[u8] {
        &self.buffer
    }
}
