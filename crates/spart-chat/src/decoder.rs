//! Byte → text → line decoding for the reply stream.
//!
//! Chunks from the transport are not aligned to code points or lines, so both
//! layers keep whatever they could not finish and prepend it to the next chunk.

const DATA_MARKER: &str = "data:";

/// Literal payload the backend sends to end a batch of events.
pub(crate) const DONE_TOKEN: &str = "[DONE]";

/// Incremental UTF-8 decoder that keeps an incomplete trailing sequence
/// until its continuation bytes arrive.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes as much of `pending + chunk` as possible.
    ///
    /// Invalid sequences become U+FFFD; an incomplete sequence at the end is
    /// held back.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.pending);
        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Emits whatever is still pending at end of stream.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Splits decoded text on `\n`, retaining the unterminated tail.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        complete[..last_newline]
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect()
    }

    /// Takes the unterminated tail, if any.
    pub fn take_tail(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        let tail = tail.trim_end_matches('\r');
        (!tail.is_empty()).then(|| tail.to_string())
    }
}

/// Both decoding layers chained together.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    utf8: Utf8Decoder,
    lines: LineBuffer,
}

impl LineDecoder {
    /// Returns the complete lines made available by `chunk`.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        if text.is_empty() {
            return Vec::new();
        }
        self.lines.push(&text)
    }

    /// Flushes both layers at end of stream and returns the remaining lines.
    pub fn finish(&mut self) -> Vec<String> {
        let text = self.utf8.flush();
        let mut lines = self.lines.push(&text);
        lines.extend(self.lines.take_tail());
        lines
    }
}

/// Returns the payload of a `data:` line with one optional leading space
/// removed, or `None` for any other line.
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DATA_MARKER)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

pub(crate) fn is_done_token(payload: &str) -> bool {
    payload.trim() == DONE_TOKEN
}
