//! Incremental decoding of a watch stream.
//!
//! The server answers a watch with one JSON array that stays open for as long
//! as the query runs, each element being one change batch. Network chunks cut
//! that array at arbitrary byte offsets, so the decoder buffers the element in
//! progress and hands out every batch as soon as its closing brace arrives.

use tracing::trace;

use crate::{change::ChangeMsg, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeArray,
    Between,
    InElement,
    Done,
}

/// Splits a byte stream holding one JSON array of objects into change batches.
///
/// # Examples
///
/// ```rust
/// use dq_results::WatchDecoder;
///
/// let mut decoder = WatchDecoder::new();
/// assert!(decoder.push(br#"[{"addedResults":[{"id"#).unwrap().is_empty());
/// let batches = decoder.push(br#"":1}]}, {}]"#).unwrap();
/// assert_eq!(batches.len(), 2);
/// decoder.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct WatchDecoder {
    state: State,
    element: Vec<u8>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Default for WatchDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchDecoder {
    pub fn new() -> Self {
        Self {
            state: State::BeforeArray,
            element: Vec::new(),
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Feed the next chunk and return every batch it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ChangeMsg>> {
        let mut batches = Vec::new();
        for &byte in chunk {
            match self.state {
                State::BeforeArray => match byte {
                    b'[' => self.state = State::Between,
                    b if b.is_ascii_whitespace() => {}
                    b => return Err(Error::NotAnArray(char::from(b))),
                },
                State::Between => match byte {
                    b']' => self.state = State::Done,
                    b',' => {}
                    b if b.is_ascii_whitespace() => {}
                    b'{' => {
                        self.state = State::InElement;
                        self.element.push(byte);
                        self.depth = 1;
                    }
                    b => return Err(Error::NotABatch(char::from(b))),
                },
                State::InElement => {
                    if let Some(batch) = self.element_byte(byte)? {
                        batches.push(batch);
                    }
                }
                State::Done => {
                    if !byte.is_ascii_whitespace() {
                        return Err(Error::TrailingData(char::from(byte)));
                    }
                }
            }
        }
        Ok(batches)
    }

    /// Check the stream ended on the closing bracket.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::Done => Ok(()),
            _ => Err(Error::UnterminatedStream),
        }
    }

    /// True once the closing bracket was read.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    fn element_byte(&mut self, byte: u8) -> Result<Option<ChangeMsg>> {
        self.element.push(byte);

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return Ok(None);
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    return self.complete().map(Some);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn complete(&mut self) -> Result<ChangeMsg> {
        let bytes = std::mem::take(&mut self.element);
        self.state = State::Between;
        trace!("Decoding watch batch of {} bytes", bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }
}
