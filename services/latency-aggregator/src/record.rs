//! Record parser
//!
//! Turns one raw log line into a candidate tick event. A line is a
//! comma-separated list of `tag:value` tokens in any order. Three tags carry
//! meaning:
//!
//! - `tickSource:<id>`
//! - `EVENT_TIME:[label:]...<epoch-micros>`
//! - `tick_stamp:[label:]...<epoch-micros>`
//!
//! Timestamp values may carry a colon-delimited label prefix; the epoch
//! microseconds are always the final segment. Every other tag is ignored.
//! Double quotes group text the way CSV does, so a quoted token or value
//! may contain the delimiter.
//! A token that fails to parse is dropped on its own and never aborts the
//! rest of the line.

use tick_types::ids::SourceId;
use tick_types::tick::TickEvent;
use tracing::debug;

pub const TAG_TICK_SOURCE: &str = "tickSource";
pub const TAG_EVENT_TIME: &str = "EVENT_TIME";
pub const TAG_TICK_STAMP: &str = "tick_stamp";

/// Token delimiter within a line.
pub const TOKEN_DELIMITER: char = ',';

/// Errors for a single malformed token. Recovered: the token is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid timestamp for tag {tag}: {value:?}")]
    InvalidTimestamp { tag: &'static str, value: String },

    #[error("empty tickSource value")]
    EmptySource,
}

/// A record that did not resolve every field. Recovered: the record is
/// dropped and never reaches a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteEventError {
    #[error("record has no tickSource")]
    MissingSource,

    #[error("record has no EVENT_TIME")]
    MissingEventTime,

    #[error("record has no tick_stamp")]
    MissingTickStamp,
}

/// Closed set of token kinds produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    TickSource(SourceId),
    EventTime(i64),
    TickStamp(i64),
    Unknown,
}

/// Classify one `tag:value` token.
pub fn parse_token(raw: &str) -> Result<Token, ParseError> {
    let raw = raw.trim().trim_matches('"');
    let Some((tag, value)) = raw.split_once(':') else {
        return Ok(Token::Unknown);
    };

    match tag.trim() {
        TAG_TICK_SOURCE => SourceId::try_new(value.trim().trim_matches('"'))
            .map(Token::TickSource)
            .ok_or(ParseError::EmptySource),
        TAG_EVENT_TIME => parse_timestamp(TAG_EVENT_TIME, value).map(Token::EventTime),
        TAG_TICK_STAMP => parse_timestamp(TAG_TICK_STAMP, value).map(Token::TickStamp),
        _ => Ok(Token::Unknown),
    }
}

fn parse_timestamp(tag: &'static str, value: &str) -> Result<i64, ParseError> {
    let digits = value
        .rsplit(':')
        .next()
        .unwrap_or(value)
        .trim()
        .trim_matches('"');
    digits
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidTimestamp {
            tag,
            value: value.to_string(),
        })
}

/// Splits on `TOKEN_DELIMITER` outside double quotes.
struct QuotedSplit<'a> {
    rest: Option<&'a str>,
}

impl<'a> Iterator for QuotedSplit<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        let mut in_quotes = false;
        for (i, c) in rest.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                TOKEN_DELIMITER if !in_quotes => {
                    self.rest = Some(&rest[i + c.len_utf8()..]);
                    return Some(&rest[..i]);
                }
                _ => {}
            }
        }
        self.rest = None;
        Some(rest)
    }
}

/// Tokenize a whole line.
pub fn tokenize(line: &str) -> impl Iterator<Item = Result<Token, ParseError>> + '_ {
    QuotedSplit { rest: Some(line) }
        .filter(|t| !t.trim().is_empty())
        .map(parse_token)
}

/// Fields resolved from one line. Later occurrences of a tag win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateEvent {
    pub source: Option<SourceId>,
    pub event_timestamp_micros: Option<i64>,
    pub tick_timestamp_micros: Option<i64>,
}

impl CandidateEvent {
    /// Promote to a `TickEvent` once every field is present.
    pub fn complete(self) -> Result<TickEvent, IncompleteEventError> {
        let source = self.source.ok_or(IncompleteEventError::MissingSource)?;
        let event = self
            .event_timestamp_micros
            .ok_or(IncompleteEventError::MissingEventTime)?;
        let tick = self
            .tick_timestamp_micros
            .ok_or(IncompleteEventError::MissingTickStamp)?;
        Ok(TickEvent::new(source, event, tick))
    }
}

/// Result of parsing one line.
#[derive(Debug, Clone, Default)]
pub struct ParsedRecord {
    pub candidate: CandidateEvent,
    /// Tokens that were recognized but malformed.
    pub rejected: Vec<ParseError>,
}

/// Parse one raw line into a candidate event.
pub fn parse_record(line: &str) -> ParsedRecord {
    let mut parsed = ParsedRecord::default();

    for token in tokenize(line) {
        match token {
            Ok(Token::TickSource(source)) => parsed.candidate.source = Some(source),
            Ok(Token::EventTime(ts)) => parsed.candidate.event_timestamp_micros = Some(ts),
            Ok(Token::TickStamp(ts)) => parsed.candidate.tick_timestamp_micros = Some(ts),
            Ok(Token::Unknown) => {}
            Err(err) => {
                debug!(error = %err, "Skipping malformed token");
                parsed.rejected.push(err);
            }
        }
    }

    parsed
}
