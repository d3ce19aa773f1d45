//! Forward-only pull decoder for JSON documents.
//!
//! Tokenizing is done by [`picojson::StreamParser`], which works over a
//! fixed-size buffer, so memory is bounded by the buffer and the nesting
//! limit rather than by document size. This layer turns its event stream
//! into a cursor: enter and exit containers, read names and scalars, and
//! skip anything the caller does not care about.

use picojson::{ArrayBitStack, Event, ParseError, PullParser, Reader, StreamParser};
use std::{
    cell::{Cell, RefCell},
    io::{self, ErrorKind, Read},
};

use crate::error::ForecastError;

type Result<T> = std::result::Result<T, ForecastError>;

/// Default size of the parser buffer. The longest single token (a name or
/// string value, after unescaping) must fit in it.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// 256 bits of container state under a `u8` depth counter: documents may
/// nest 255 levels deep. Deeper input fails as malformed.
type NestingLimit = ArrayBitStack<8, u32, u8>;

/// Kind of the next token in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name,
    String,
    Number,
    Bool,
    Null,
    EndDocument,
}

impl Token {
    fn describe(self) -> &'static str {
        match self {
            Token::BeginObject => "'{'",
            Token::EndObject => "'}'",
            Token::BeginArray => "'['",
            Token::EndArray => "']'",
            Token::Name => "a field name",
            Token::String => "a string",
            Token::Number => "a number",
            Token::Bool => "a boolean",
            Token::Null => "null",
            Token::EndDocument => "end of document",
        }
    }

    fn of(event: &Event<'_, '_>) -> Self {
        match event {
            Event::StartObject => Token::BeginObject,
            Event::EndObject => Token::EndObject,
            Event::StartArray => Token::BeginArray,
            Event::EndArray => Token::EndArray,
            Event::Key(_) => Token::Name,
            Event::String(_) => Token::String,
            Event::Number(_) => Token::Number,
            Event::Bool(_) => Token::Bool,
            Event::Null => Token::Null,
            Event::EndDocument => Token::EndDocument,
        }
    }
}

/// A looked-ahead event, detached from the parser buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Peeked {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name(String),
    Text(String),
    Number(String),
    Bool(bool),
    Null,
    EndDocument,
}

impl Peeked {
    fn from_event(event: Event<'_, '_>) -> Self {
        match event {
            Event::StartObject => Peeked::BeginObject,
            Event::EndObject => Peeked::EndObject,
            Event::StartArray => Peeked::BeginArray,
            Event::EndArray => Peeked::EndArray,
            Event::Key(name) => Peeked::Name(name.as_str().to_owned()),
            Event::String(text) => Peeked::Text(text.as_str().to_owned()),
            Event::Number(number) => Peeked::Number(number.as_str().to_owned()),
            Event::Bool(flag) => Peeked::Bool(flag),
            Event::Null => Peeked::Null,
            Event::EndDocument => Peeked::EndDocument,
        }
    }

    fn token(&self) -> Token {
        match self {
            Peeked::BeginObject => Token::BeginObject,
            Peeked::EndObject => Token::EndObject,
            Peeked::BeginArray => Token::BeginArray,
            Peeked::EndArray => Token::EndArray,
            Peeked::Name(_) => Token::Name,
            Peeked::Text(_) => Token::String,
            Peeked::Number(_) => Token::Number,
            Peeked::Bool(_) => Token::Bool,
            Peeked::Null => Token::Null,
            Peeked::EndDocument => Token::EndDocument,
        }
    }
}

/// What the stream adapter observed: bytes handed to the parser and the
/// I/O error that stopped it, if any.
#[derive(Debug, Default)]
struct StreamTap {
    pulled: Cell<u64>,
    failure: RefCell<Option<io::Error>>,
}

/// Backing storage for one [`StreamingDecoder`].
#[derive(Debug)]
pub struct DecodeBuffer {
    bytes: Vec<u8>,
    tap: StreamTap,
}

impl DecodeBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(size: usize) -> Self {
        Self { bytes: vec![0; size], tap: StreamTap::default() }
    }
}

impl Default for DecodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds a [`Read`] into the parser, recording what it pulled.
struct TappedReader<'b, R> {
    inner: R,
    tap: &'b StreamTap,
}

impl<R: Read> Reader for TappedReader<'_, R> {
    type Error = ErrorKind;

    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, ErrorKind> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    self.tap.pulled.set(self.tap.pulled.get() + n as u64);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    let kind = err.kind();
                    self.tap.failure.replace(Some(err));
                    return Err(kind);
                }
            }
        }
    }
}

pub struct StreamingDecoder<'b, R: Read> {
    parser: StreamParser<'b, TappedReader<'b, R>, NestingLimit>,
    tap: &'b StreamTap,
    peeked: Option<Peeked>,
    depth: usize,
}

impl<'b, R: Read> StreamingDecoder<'b, R> {
    pub fn new(reader: R, buffer: &'b mut DecodeBuffer) -> Self {
        let DecodeBuffer { bytes, tap } = buffer;
        tap.pulled.set(0);
        *tap.failure.get_mut() = None;

        let tap: &'b StreamTap = tap;
        let reader = TappedReader { inner: reader, tap };

        Self {
            parser: StreamParser::with_config(reader, bytes.as_mut_slice()),
            tap,
            peeked: None,
            depth: 0,
        }
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn peek(&mut self) -> Result<Token> {
        self.peeked().map(Peeked::token)
    }

    pub fn enter_object(&mut self) -> Result<()> {
        self.expect(Token::BeginObject)?;
        self.depth += 1;
        Ok(())
    }

    pub fn exit_object(&mut self) -> Result<()> {
        self.expect(Token::EndObject)?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    pub fn enter_array(&mut self) -> Result<()> {
        self.expect(Token::BeginArray)?;
        self.depth += 1;
        Ok(())
    }

    pub fn exit_array(&mut self) -> Result<()> {
        self.expect(Token::EndArray)?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    /// Whether the current container has another element or field.
    pub fn has_next(&mut self) -> Result<bool> {
        let next = self.peek()?;
        Ok(!matches!(next, Token::EndObject | Token::EndArray | Token::EndDocument))
    }

    pub fn next_field_name(&mut self) -> Result<String> {
        match self.take()? {
            Peeked::Name(name) => Ok(name),
            other => Err(self.reject("a field name", other)),
        }
    }

    /// Current scalar as text. Strings come back verbatim, numbers as their
    /// literal text, booleans as `true`/`false`.
    pub fn next_string_value(&mut self) -> Result<String> {
        match self.take()? {
            Peeked::Text(text) | Peeked::Number(text) => Ok(text),
            Peeked::Bool(flag) => Ok(flag.to_string()),
            other => Err(self.reject("a string", other)),
        }
    }

    /// Consume the next value whatever its shape, including everything
    /// nested inside it. Nested names and strings are never copied out of
    /// the parser buffer.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek()? {
            Token::BeginObject | Token::BeginArray => {}
            Token::String | Token::Number | Token::Bool | Token::Null => {
                self.peeked = None;
                return Ok(());
            }
            other => return Err(self.unexpected("a value", other)),
        }

        let mut open = 0usize;
        loop {
            match self.take_token()? {
                Token::BeginObject | Token::BeginArray => open += 1,
                Token::EndObject | Token::EndArray => open = open.saturating_sub(1),
                Token::EndDocument => {
                    return Err(self.malformed("document ended inside a skipped value"));
                }
                Token::Name | Token::String | Token::Number | Token::Bool | Token::Null => {}
            }

            if open == 0 {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, wanted: Token) -> Result<()> {
        let next = self.take()?;
        if next.token() == wanted {
            Ok(())
        } else {
            Err(self.reject(wanted.describe(), next))
        }
    }

    fn peeked(&mut self) -> Result<&Peeked> {
        let next = match self.peeked.take() {
            Some(next) => next,
            None => self.pull(Peeked::from_event)?,
        };
        let next: &Peeked = self.peeked.insert(next);
        Ok(next)
    }

    fn take(&mut self) -> Result<Peeked> {
        match self.peeked.take() {
            Some(next) => Ok(next),
            None => self.pull(Peeked::from_event),
        }
    }

    fn take_token(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(next) => Ok(next.token()),
            None => self.pull(|event| Token::of(&event)),
        }
    }

    fn pull<T>(&mut self, convert: impl FnOnce(Event<'_, '_>) -> T) -> Result<T> {
        let pulled = self.parser.next_event().map(convert);
        pulled.map_err(|err| self.failure(err))
    }

    fn failure(&self, err: ParseError) -> ForecastError {
        match self.tap.failure.take() {
            Some(io) => ForecastError::Transport(io),
            None => self.malformed(err.to_string()),
        }
    }

    /// Put `found` back and describe the mismatch.
    fn reject(&mut self, wanted: &str, found: Peeked) -> ForecastError {
        let err = self.unexpected(wanted, found.token());
        self.peeked = Some(found);
        err
    }

    fn malformed(&self, message: impl Into<String>) -> ForecastError {
        ForecastError::malformed(self.tap.pulled.get(), message)
    }

    fn unexpected(&self, wanted: &str, found: Token) -> ForecastError {
        self.malformed(format!("expected {wanted} but found {}", found.describe()))
    }
}
