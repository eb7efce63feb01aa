//! Incremental accumulation of generated text.
//!
//! The chat endpoint streams newline-delimited JSON objects. Each carries
//! a text fragment; the object with `done: true` is the end marker.
//! Fragments are appended in arrival order. A stream that ends without
//! the marker is an error.

use crate::error::{Result, SurveyError};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

/// One event of a generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Done,
}

/// Streamed chat response line.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Decode one NDJSON line into stream events.
///
/// Blank lines yield nothing. A final chunk carrying text yields the
/// fragment before the end marker.
pub fn parse_chunk_line(line: &str) -> Result<Vec<StreamEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| SurveyError::summary(format!("malformed stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(SurveyError::summary(error));
    }

    let mut events = Vec::with_capacity(2);
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            events.push(StreamEvent::Fragment(message.content));
        }
    }
    if chunk.done {
        events.push(StreamEvent::Done);
    }
    Ok(events)
}

/// Splits a byte stream into lines.
///
/// Network chunks can end mid-line or mid-character, so bytes are buffered
/// until a newline arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Return the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Decode a raw response body into stream events.
///
/// The unterminated tail of the body is decoded once the body ends.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut buffer = LineBuffer::new();

    body.map(Some)
        .chain(stream::once(async { None }))
        .flat_map(move |item| {
            let lines = match item {
                Some(Ok(bytes)) => buffer.push(bytes.as_ref()),
                Some(Err(e)) => {
                    let err = SurveyError::summary(format!("response body error: {}", e));
                    return stream::iter(vec![Err(err)]);
                }
                None => buffer.finish().into_iter().collect(),
            };

            let mut events: Vec<Result<StreamEvent>> = Vec::new();
            for line in lines {
                match parse_chunk_line(&line) {
                    Ok(decoded) => events.extend(decoded.into_iter().map(Ok)),
                    Err(e) => events.push(Err(e)),
                }
            }
            stream::iter(events)
        })
}

/// Appends fragments until the end marker.
#[derive(Debug, Default)]
pub struct SummaryAccumulator {
    text: String,
    fragments: usize,
    finished: bool,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event. Returns `true` once the end marker has been seen;
    /// later events are ignored.
    pub fn push(&mut self, event: StreamEvent) -> bool {
        if self.finished {
            return true;
        }
        match event {
            StreamEvent::Fragment(fragment) => {
                self.fragments += 1;
                self.text.push_str(&fragment);
            }
            StreamEvent::Done => self.finished = true,
        }
        self.finished
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The complete text, or an error if the end marker never arrived.
    pub fn finish(self) -> Result<String> {
        if !self.finished {
            return Err(SurveyError::summary(format!(
                "stream ended without end marker after {} fragments",
                self.fragments
            )));
        }
        debug!("Summary complete: {} fragments", self.fragments);
        Ok(self.text)
    }
}

/// Drain an event stream into the accumulated text.
///
/// `on_fragment` sees each fragment as it arrives. Consumption stops at
/// the end marker.
pub async fn collect_stream<S, F>(events: S, mut on_fragment: F) -> Result<String>
where
    S: Stream<Item = Result<StreamEvent>>,
    F: FnMut(&str),
{
    futures::pin_mut!(events);
    let mut accumulator = SummaryAccumulator::new();

    while !accumulator.is_finished() {
        let Some(event) = events.next().await else {
            break;
        };
        let event = event?;
        if let StreamEvent::Fragment(ref fragment) = event {
            on_fragment(fragment);
        }
        accumulator.push(event);
        debug!("Summary so far: {} bytes", accumulator.text().len());
    }

    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_line() {
        let events =
            parse_chunk_line(r#"{"message":{"role":"assistant","content":"- Punkt"},"done":false}"#)
                .unwrap();
        assert_eq!(events, vec![StreamEvent::Fragment("- Punkt".to_string())]);

        let events =
            parse_chunk_line(r#"{"message":{"role":"assistant","content":""},"done":true}"#)
                .unwrap();
        assert_eq!(events, vec![StreamEvent::Done]);

        assert!(parse_chunk_line("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_chunk_line_errors() {
        assert!(parse_chunk_line("not json").is_err());
        let err = parse_chunk_line(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_line_buffer_handles_split_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"a\":").is_empty());
        assert_eq!(buffer.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(buffer.push(b":2}\n"), vec!["{\"b\":2}"]);
        assert_eq!(buffer.finish(), None);

        // Multi-byte character split across chunks
        let bytes = "Vård\n".as_bytes();
        assert!(buffer.push(&bytes[..2]).is_empty());
        assert_eq!(buffer.push(&bytes[2..]), vec!["Vård"]);
    }

    #[test]
    fn test_accumulator_appends_in_order() {
        let mut acc = SummaryAccumulator::new();
        assert!(!acc.push(StreamEvent::Fragment("- Kommunen ".to_string())));
        assert!(!acc.push(StreamEvent::Fragment("konkurrerar".to_string())));
        assert_eq!(acc.text(), "- Kommunen konkurrerar");
        assert!(acc.push(StreamEvent::Done));
        assert!(acc.push(StreamEvent::Fragment("ignored".to_string())));
        assert_eq!(acc.finish().unwrap(), "- Kommunen konkurrerar");
    }

    #[test]
    fn test_accumulator_requires_end_marker() {
        let mut acc = SummaryAccumulator::new();
        acc.push(StreamEvent::Fragment("halv".to_string()));
        assert!(!acc.is_finished());
        assert!(acc.finish().is_err());
    }

    #[test]
    fn test_collect_stream_stops_at_done() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Fragment("a".to_string())),
            Ok(StreamEvent::Fragment("b".to_string())),
            Ok(StreamEvent::Done),
            Ok(StreamEvent::Fragment("c".to_string())),
        ]);
        let mut seen = Vec::new();
        let text = tokio_test::block_on(collect_stream(events, |f| seen.push(f.to_string())))
            .unwrap();
        assert_eq!(text, "ab");
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_events_from_split_body() {
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(b"{\"message\":{\"content\":\"- Hyr\"},\"done\":false}\n{\"mess".to_vec()),
            Ok(b"age\":{\"content\":\"a lokaler\"},\"done\":false}\n".to_vec()),
            Ok(b"{\"message\":{\"content\":\"\"},\"done\":true}".to_vec()),
        ]);
        let text = tokio_test::block_on(collect_stream(decode_events(body), |_| {})).unwrap();
        assert_eq!(text, "- Hyra lokaler");
    }

    #[test]
    fn test_decode_events_without_done_fails() {
        let body = stream::iter(vec![Ok::<_, std::io::Error>(
            b"{\"message\":{\"content\":\"x\"},\"done\":false}\n".to_vec(),
        )]);
        let result = tokio_test::block_on(collect_stream(decode_events(body), |_| {}));
        assert!(result.is_err());
    }

    #[test]
    fn test_collect_stream_propagates_errors() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Fragment("a".to_string())),
            Err(SurveyError::summary("connection reset")),
        ]);
        let result = tokio_test::block_on(collect_stream(events, |_| {}));
        assert!(result.is_err());
    }
}
