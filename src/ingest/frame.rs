//! Byte decoding and line framing
//!
//! [`Utf8Decoder`] turns raw chunks into text, replacing invalid sequences
//! with U+FFFD and carrying an incomplete trailing sequence over to the next
//! chunk. [`FrameAssembler`] splits the text into lines on `\n` or `\r`.
//!
//! Both are owned by the reader thread alone.

/// Incremental, lossy UTF-8 decoder
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of a sequence split across chunks
    pending: Vec<u8>,
}

/// Output of one [`Utf8Decoder::decode`] call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// Decoded text
    pub text: String,
    /// Invalid sequences replaced by U+FFFD
    pub errors: usize,
}

impl Utf8Decoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, prefixed by any incomplete sequence left from the last call
    pub fn decode(&mut self, bytes: &[u8]) -> Decoded {
        self.pending.extend_from_slice(bytes);

        let mut out = Decoded {
            text: String::with_capacity(self.pending.len()),
            errors: 0,
        };
        let mut pos = 0;
        while pos < self.pending.len() {
            match std::str::from_utf8(&self.pending[pos..]) {
                Ok(text) => {
                    out.text.push_str(text);
                    pos = self.pending.len();
                }
                Err(e) => {
                    let valid_end = pos + e.valid_up_to();
                    out.text
                        .push_str(std::str::from_utf8(&self.pending[pos..valid_end]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.text.push(char::REPLACEMENT_CHARACTER);
                            out.errors += 1;
                            pos = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            pos = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..pos);
        out
    }

    /// Bytes held back waiting for the rest of a sequence
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any held-back bytes
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

fn is_terminator(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Splits decoded text into trimmed, non-empty lines
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Text not yet terminated
    pending: String,
    /// Start of the undrained part of `pending`
    cursor: usize,
    /// Cap on a single line, in bytes
    max_line_len: Option<usize>,
    /// Where a discarded line resumes; text from here up to and including
    /// the next terminator is dropped
    skip_at: Option<usize>,
    /// Lines dropped for exceeding the cap
    discarded: u64,
}

impl FrameAssembler {
    /// Create an assembler without a line-length cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler that drops any line longer than `max_line_len`
    /// bytes, however it was chunked
    pub fn with_max_line_len(max_line_len: Option<usize>) -> Self {
        Self {
            max_line_len,
            ..Self::default()
        }
    }

    /// Append `text` and iterate over the lines it completes.
    ///
    /// Lines not consumed before the iterator is dropped stay buffered and
    /// come out of the next call.
    pub fn feed(&mut self, text: &str) -> Lines<'_> {
        self.pending.push_str(text);
        self.enforce_cap();
        Lines { assembler: self }
    }

    /// Length of the buffered, unterminated text in bytes
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.cursor
    }

    /// Number of lines discarded by the cap
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop all buffered text
    pub fn clear(&mut self) {
        self.pending.clear();
        self.cursor = 0;
        self.skip_at = None;
    }

    /// Bound the unterminated tail so a missing terminator cannot grow the buffer
    fn enforce_cap(&mut self) {
        let Some(cap) = self.max_line_len else {
            return;
        };
        if let Some(at) = self.skip_at {
            match self.pending[at..].find(is_terminator) {
                Some(idx) => {
                    self.pending.replace_range(at..at + idx + 1, "");
                    self.skip_at = None;
                }
                // Still inside the discarded line
                None => {
                    self.pending.truncate(at);
                    return;
                }
            }
        }

        let tail_start = self.pending[self.cursor..]
            .rfind(is_terminator)
            .map_or(self.cursor, |i| self.cursor + i + 1);
        let tail_len = self.pending.len() - tail_start;
        if tail_len > cap {
            tracing::warn!(
                "Discarding line longer than {} bytes ({} bytes so far, unterminated)",
                cap,
                tail_len
            );
            self.pending.truncate(tail_start);
            self.skip_at = Some(tail_start);
            self.discarded += 1;
        }
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let rest = &self.pending[self.cursor..];
            let idx = rest.find(is_terminator)?;
            let raw = &rest[..idx];
            // Both terminators are single-byte
            self.cursor += idx + 1;

            if let Some(cap) = self.max_line_len.filter(|cap| raw.len() > *cap) {
                tracing::warn!("Discarding line of {} bytes (limit {})", raw.len(), cap);
                self.discarded += 1;
                continue;
            }
            let line = raw.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.pending.drain(..self.cursor);
            self.skip_at = self.skip_at.map(|at| at - self.cursor);
            self.cursor = 0;
        }
    }
}

/// Lazy iterator over the complete lines of a [`FrameAssembler`]
pub struct Lines<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.assembler.next_line()
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.assembler.compact();
    }
}
