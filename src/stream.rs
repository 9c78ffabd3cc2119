//! Incremental input adapters: drive the dispatch engine from streaming
//! JSON text or bytes instead of a materialized tree.
//!
//! The scanner walks one top-level JSON array and emits the byte span of
//! each completed element; the adapters slice those spans out of a bounded
//! accumulation buffer, decode them, and yield one outcome per element in
//! source order.

use std::io;
use std::pin::Pin;

use async_stream::stream;
use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};

use crate::options::FailurePolicy;
use crate::outcome::{FailureKind, ParseFailure, ParseOutcome};
use crate::parser::Parser;

/// Byte range of one completed array element. `start` is absolute from the
/// beginning of the stream; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Skipping whitespace before the opening `[`.
    BeforeArray,
    /// Inside the array, expecting an element or the closing `]`.
    ExpectElement,
    /// An element just ended; expecting `,` or `]`.
    AfterElement,
    /// Inside an object or array element; `depth` tracks nesting.
    InContainer,
    /// Inside a top-level string element.
    InString,
    /// Inside a number/boolean/null element.
    InScalar,
    /// The array's closing `]` was consumed; trailing input is ignored.
    Done,
    /// The input is not an array, or an element separator is malformed.
    Broken,
}

/// Chunk-fed scanner over one top-level JSON array.
///
/// Feed successive text chunks; each call returns the spans of elements
/// that closed within that chunk. Element content is not validated here,
/// only delimited: string and escape state is tracked so brackets inside
/// strings do not count, and scalar elements end at `,`, `]`, or
/// whitespace.
#[derive(Debug)]
pub struct ArrayScanner {
    state: ScanState,
    depth: usize,
    in_string: bool,
    escape: bool,
    element_start: usize,
    /// Absolute offset of the start of the next chunk.
    offset: usize,
}

impl Default for ArrayScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::BeforeArray,
            depth: 0,
            in_string: false,
            escape: false,
            element_start: 0,
            offset: 0,
        }
    }

    /// Feed a new chunk. Returns the spans of elements completed by it.
    #[instrument(target = "variant_stream::stream", skip(self, chunk), fields(chunk_len = chunk.len(), offset = self.offset))]
    pub fn feed(&mut self, chunk: &str) -> Vec<ElementSpan> {
        let mut spans = Vec::new();

        for (i, &b) in chunk.as_bytes().iter().enumerate() {
            let idx = self.offset + i;
            match self.state {
                ScanState::BeforeArray => match b {
                    b' ' | b'\t' | b'\n' | b'\r' => {}
                    b'[' => self.state = ScanState::ExpectElement,
                    _ => self.state = ScanState::Broken,
                },
                ScanState::ExpectElement => match b {
                    b' ' | b'\t' | b'\n' | b'\r' => {}
                    b']' => self.state = ScanState::Done,
                    b',' => self.state = ScanState::Broken,
                    b'{' | b'[' => {
                        self.element_start = idx;
                        self.depth = 1;
                        self.in_string = false;
                        self.escape = false;
                        self.state = ScanState::InContainer;
                    }
                    b'"' => {
                        self.element_start = idx;
                        self.escape = false;
                        self.state = ScanState::InString;
                    }
                    _ => {
                        self.element_start = idx;
                        self.state = ScanState::InScalar;
                    }
                },
                ScanState::AfterElement => match b {
                    b' ' | b'\t' | b'\n' | b'\r' => {}
                    b',' => self.state = ScanState::ExpectElement,
                    b']' => self.state = ScanState::Done,
                    _ => self.state = ScanState::Broken,
                },
                ScanState::InContainer => {
                    if self.in_string {
                        if self.escape {
                            self.escape = false;
                        } else {
                            match b {
                                b'\\' => self.escape = true,
                                b'"' => self.in_string = false,
                                _ => {}
                            }
                        }
                    } else {
                        match b {
                            b'"' => self.in_string = true,
                            b'{' | b'[' => self.depth += 1,
                            b'}' | b']' => {
                                self.depth -= 1;
                                if self.depth == 0 {
                                    spans.push(ElementSpan {
                                        start: self.element_start,
                                        end: idx + 1,
                                    });
                                    self.state = ScanState::AfterElement;
                                }
                            }
                            _ => {}
                        }
                    }
                }
                ScanState::InString => {
                    if self.escape {
                        self.escape = false;
                    } else {
                        match b {
                            b'\\' => self.escape = true,
                            b'"' => {
                                spans.push(ElementSpan {
                                    start: self.element_start,
                                    end: idx + 1,
                                });
                                self.state = ScanState::AfterElement;
                            }
                            _ => {}
                        }
                    }
                }
                ScanState::InScalar => match b {
                    b',' => {
                        spans.push(ElementSpan {
                            start: self.element_start,
                            end: idx,
                        });
                        self.state = ScanState::ExpectElement;
                    }
                    b']' => {
                        spans.push(ElementSpan {
                            start: self.element_start,
                            end: idx,
                        });
                        self.state = ScanState::Done;
                    }
                    b' ' | b'\t' | b'\n' | b'\r' => {
                        spans.push(ElementSpan {
                            start: self.element_start,
                            end: idx,
                        });
                        self.state = ScanState::AfterElement;
                    }
                    _ => {}
                },
                ScanState::Done | ScanState::Broken => break,
            }
        }

        self.offset += chunk.len();
        debug!(
            target: "variant_stream::stream",
            spans = spans.len(),
            new_offset = self.offset,
            "feed complete"
        );
        spans
    }

    /// The array's closing bracket has been consumed.
    pub fn finished(&self) -> bool {
        self.state == ScanState::Done
    }

    /// The input cannot be an array; no further spans will be produced.
    pub fn broken(&self) -> bool {
        self.state == ScanState::Broken
    }
}

/// Type alias for fallible byte streams, such as an HTTP response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

fn element_outcome<O>(parser: &Parser<O>, index: usize, slice: &str) -> ParseOutcome<O> {
    match serde_json::from_str::<Value>(slice) {
        Ok(element) => parser.parse_element(index, &element),
        Err(source) => ParseOutcome::Failed(ParseFailure {
            index,
            kind: FailureKind::Malformed { source },
        }),
    }
}

fn malformed<O>(index: usize, kind: io::ErrorKind, message: &str) -> ParseOutcome<O> {
    ParseOutcome::Failed(ParseFailure {
        index,
        kind: FailureKind::Malformed {
            source: serde_json::Error::io(io::Error::new(kind, message.to_owned())),
        },
    })
}

fn truncated<O>(index: usize) -> ParseOutcome<O> {
    malformed(
        index,
        io::ErrorKind::UnexpectedEof,
        "input ended before the array was closed",
    )
}

fn bad_structure<O>(index: usize) -> ParseOutcome<O> {
    malformed(
        index,
        io::ErrorKind::InvalidData,
        "input is not a JSON array or has malformed element separators",
    )
}

/// Split the valid UTF-8 prefix out of `pending`, leaving any trailing
/// incomplete sequence in place for the next chunk to finish.
fn take_valid_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(text) => text.len(),
        Err(error) => error.valid_up_to(),
    };
    let rest = pending.split_off(valid);
    let head = std::mem::replace(pending, rest);
    String::from_utf8_lossy(&head).into_owned()
}

/// Stream outcomes from an `AsyncRead` of JSON array text.
///
/// One outcome per element, in source order, honoring the parser's
/// [`FailurePolicy`]. A span that is not valid JSON yields a `Malformed`
/// failure; so do read errors and input that ends before the array is
/// closed. Input after the closing `]` is ignored. UTF-8 sequences split
/// across read boundaries are carried over to the next chunk.
pub fn outcomes_from_async_read<R, O>(
    parser: Parser<O>,
    mut reader: R,
    buf_size: usize,
) -> impl Stream<Item = ParseOutcome<O>>
where
    R: AsyncRead + Unpin + Send + 'static,
    O: Send + 'static,
{
    stream! {
        let halt = parser.options().failure_policy == FailurePolicy::Halt;
        let mut scanner = ArrayScanner::new();
        let mut accum = String::new();
        let mut base = 0usize;
        let mut pending: Vec<u8> = Vec::new();
        let mut index = 0usize;
        let mut concluded = false;
        let mut buf = vec![0u8; buf_size.max(1024)];

        'read: loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let text = take_valid_utf8(&mut pending);
                    if text.is_empty() {
                        continue;
                    }
                    accum.push_str(&text);

                    let mut consumed = base;
                    for span in scanner.feed(&text) {
                        let outcome = {
                            let slice = &accum[span.start - base..span.end - base];
                            element_outcome(&parser, index, slice)
                        };
                        index += 1;
                        consumed = span.end;
                        let failed = outcome.is_failed();
                        yield outcome;
                        if failed && halt {
                            concluded = true;
                            break 'read;
                        }
                    }
                    // Drop the consumed prefix so the buffer stays bounded
                    // by the largest single element.
                    if consumed > base {
                        accum.drain(..consumed - base);
                        base = consumed;
                    }

                    if scanner.broken() {
                        yield bad_structure(index);
                        concluded = true;
                        break;
                    }
                    if scanner.finished() {
                        concluded = true;
                        break;
                    }
                }
                Err(error) => {
                    debug!(target: "variant_stream::stream", error = %error, "read error");
                    yield malformed(index, error.kind(), "read error while streaming array");
                    concluded = true;
                    break;
                }
            }
        }

        if !concluded && !scanner.finished() {
            yield truncated(index);
        }
    }
}

/// Stream outcomes from a fallible byte stream of JSON array text.
///
/// Transport errors surface as `Err` and end the stream; element-level
/// problems surface as `Ok(ParseOutcome::Failed(..))` exactly like the
/// reader variant.
pub fn outcomes_from_bytes<O>(
    parser: Parser<O>,
    byte_stream: ByteStream,
) -> impl Stream<Item = Result<ParseOutcome<O>, io::Error>>
where
    O: Send + 'static,
{
    stream! {
        let halt = parser.options().failure_policy == FailurePolicy::Halt;
        let mut scanner = ArrayScanner::new();
        let mut accum = String::new();
        let mut base = 0usize;
        let mut pending: Vec<u8> = Vec::new();
        let mut index = 0usize;
        let mut concluded = false;
        let mut byte_stream = byte_stream;

        'read: while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    pending.extend_from_slice(&bytes);
                    let text = take_valid_utf8(&mut pending);
                    if text.is_empty() {
                        continue;
                    }
                    accum.push_str(&text);

                    let mut consumed = base;
                    for span in scanner.feed(&text) {
                        let outcome = {
                            let slice = &accum[span.start - base..span.end - base];
                            element_outcome(&parser, index, slice)
                        };
                        index += 1;
                        consumed = span.end;
                        let failed = outcome.is_failed();
                        yield Ok(outcome);
                        if failed && halt {
                            concluded = true;
                            break 'read;
                        }
                    }
                    if consumed > base {
                        accum.drain(..consumed - base);
                        base = consumed;
                    }

                    if scanner.broken() {
                        yield Ok(bad_structure(index));
                        concluded = true;
                        break;
                    }
                    if scanner.finished() {
                        concluded = true;
                        break;
                    }
                }
                Err(error) => {
                    debug!(target: "variant_stream::stream", error = %error, "byte stream error");
                    yield Err(error);
                    concluded = true;
                    break;
                }
            }
        }

        if !concluded && !scanner.finished() {
            yield Ok(truncated(index));
        }
    }
}
