//! Pull-based token scanning over html5ever's push tokenizer.
//!
//! html5ever hands tokens to a [`TokenSink`] as input is fed in. The
//! [`Scanner`] feeds one chunk at a time and queues whatever the sink
//! receives, so callers can pull tokens one by one without the document
//! ever being held in memory.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{ErrorKind as IoErrorKind, Read};

use exn::ResultExt;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token as RawToken, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tendril::StrTendril;

use crate::error::{Error, ErrorKind, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// A single markup token.
///
/// Tag names are ASCII lower-cased by the tokenizer. Adjacent character data
/// is always delivered as one [`Text`](Token::Text) token.
///
/// The tokenizer follows HTML rules, so a `<![CDATA[...]]>` section is read
/// as a comment and arrives as [`Other`](Token::Other), not as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// An opening tag, `<name>`.
    Start(String),
    /// A closing tag, `</name>`. Self-closing tags produce a `Start`
    /// immediately followed by an `End`.
    End(String),
    /// Character data with entities and character references decoded.
    Text(String),
    /// Doctypes, comments, processing instructions and anything else that
    /// carries no structure.
    Other,
}
impl Token {
    pub fn is_start(&self, name: &str) -> bool {
        matches!(self, Self::Start(n) if n == name)
    }

    pub fn is_end(&self, name: &str) -> bool {
        matches!(self, Self::End(n) if n == name)
    }
}

#[derive(Default)]
struct Collector {
    tokens: RefCell<VecDeque<(Token, u64)>>,
    parse_errors: Cell<u64>,
}
impl TokenSink for Collector {
    type Handle = ();

    fn process_token(&self, token: RawToken, line_number: u64) -> TokenSinkResult<()> {
        let mut tokens = self.tokens.borrow_mut();
        match token {
            RawToken::TagToken(tag) => {
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag if tag.self_closing => {
                        tokens.push_back((Token::Start(name.clone()), line_number));
                        tokens.push_back((Token::End(name), line_number));
                    },
                    TagKind::StartTag => tokens.push_back((Token::Start(name), line_number)),
                    TagKind::EndTag => tokens.push_back((Token::End(name), line_number)),
                }
            },
            RawToken::CharacterTokens(text) => match tokens.back_mut() {
                Some((Token::Text(run), _)) => run.push_str(&text),
                _ => tokens.push_back((Token::Text(text.to_string()), line_number)),
            },
            RawToken::ParseError(reason) => {
                // The XML declaration alone trips a couple of these; none of
                // them stop the tokenizer.
                self.parse_errors.set(self.parse_errors.get() + 1);
                tracing::trace!(line = line_number, %reason, "Recoverable tokenizer error");
            },
            RawToken::EOFToken => {},
            _ => tokens.push_back((Token::Other, line_number)),
        }
        TokenSinkResult::Continue
    }
}

enum State {
    /// More input may follow.
    Streaming,
    /// The reader is exhausted and the tokenizer flushed; only queued tokens remain.
    Draining,
    /// Reading or decoding failed; the error is returned once queued tokens are consumed.
    Failing(Error),
    /// Nothing more will be produced.
    Finished,
}

/// A forward-only token stream over any [`Read`]er.
///
/// [`next_token`](Self::next_token) distinguishes the three outcomes of a
/// read explicitly:
///
/// - `Ok(Some(token))`: the next token,
/// - `Ok(None)`: the input is exhausted,
/// - `Err(_)`: the input could not be read or decoded.
///
/// Both end-of-input and errors are terminal: every call after them returns
/// `Ok(None)`. The scanner is not seekable or restartable.
///
/// # Examples
///
/// ```
/// use tunecheck_plist::{Scanner, Token};
///
/// let mut scanner = Scanner::new("<key>Kind</key>".as_bytes());
/// assert_eq!(scanner.next_token().unwrap(), Some(Token::Start("key".into())));
/// assert_eq!(scanner.next_token().unwrap(), Some(Token::Text("Kind".into())));
/// assert_eq!(scanner.next_token().unwrap(), Some(Token::End("key".into())));
/// assert_eq!(scanner.next_token().unwrap(), None);
/// ```
pub struct Scanner<R> {
    reader: R,
    tokenizer: Tokenizer<Collector>,
    input: BufferQueue,
    chunk: Box<[u8]>,
    /// Bytes of an incomplete UTF-8 sequence carried over to the next chunk.
    pending: Vec<u8>,
    state: State,
    line: u64,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    /// Construct a scanner that reads at most `chunk_size` bytes at a time.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            tokenizer: Tokenizer::new(Collector::default(), TokenizerOpts::default()),
            input: BufferQueue::default(),
            chunk: vec![0; chunk_size.max(1)].into_boxed_slice(),
            pending: Vec::new(),
            state: State::Streaming,
            line: 1,
        }
    }

    /// Pull the next token from the stream.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            if let Some((token, line)) = self.pop_ready() {
                self.line = line;
                return Ok(Some(token));
            }
            match std::mem::replace(&mut self.state, State::Finished) {
                State::Streaming => self.state = self.fill().unwrap_or_else(State::Failing),
                State::Failing(err) => return Err(err),
                State::Draining | State::Finished => return Ok(None),
            }
        }
    }

    /// Source line of the most recently returned token.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Number of recoverable errors the tokenizer has reported so far.
    pub fn parse_errors(&self) -> u64 {
        self.tokenizer.sink.parse_errors.get()
    }

    fn pop_ready(&mut self) -> Option<(Token, u64)> {
        let mut tokens = self.tokenizer.sink.tokens.borrow_mut();
        // A trailing run of text may continue in the next chunk, so hold on
        // to it until something follows it or the input ends.
        let waiting_on_text = tokens.len() == 1
            && matches!(self.state, State::Streaming)
            && matches!(tokens.front(), Some((Token::Text(_), _)));
        if waiting_on_text { None } else { tokens.pop_front() }
    }

    /// Read and tokenize one more chunk, returning the state to continue in.
    ///
    /// Valid text preceding an invalid byte sequence is still tokenized, so
    /// everything up to the failure point is delivered before the error.
    fn fill(&mut self) -> Result<State> {
        let read = match self.reader.read(&mut self.chunk) {
            Ok(read) => read,
            Err(err) if err.kind() == IoErrorKind::Interrupted => return Ok(State::Streaming),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io),
        };
        if read == 0 {
            if !self.pending.is_empty() {
                exn::bail!(ErrorKind::Decode { line: self.last_line() });
            }
            self.tokenizer.end();
            tracing::trace!(parse_errors = self.parse_errors(), "Catalog stream exhausted");
            return Ok(State::Draining);
        }
        self.pending.extend_from_slice(&self.chunk[..read]);
        let (valid, invalid) = match std::str::from_utf8(&self.pending) {
            Ok(text) => (text.len(), false),
            // No error length means the sequence was cut short by the chunk
            // boundary; the rest arrives with the next read.
            Err(err) => (err.valid_up_to(), err.error_len().is_some()),
        };
        let tail = self.pending.split_off(valid);
        let head = std::mem::replace(&mut self.pending, tail);
        let text = String::from_utf8(head).or_raise(|| ErrorKind::Decode { line: self.line })?;
        if !text.is_empty() {
            self.input.push_back(StrTendril::from_slice(&text));
            let _ = self.tokenizer.feed(&self.input);
        }
        if invalid {
            exn::bail!(ErrorKind::Decode { line: self.last_line() });
        }
        Ok(State::Streaming)
    }

    /// Line of the most recently tokenized (not necessarily returned) token.
    fn last_line(&self) -> u64 {
        self.tokenizer.sink.tokens.borrow().back().map_or(self.line, |(_, line)| *line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Error as IoError, Result as IoResult};

    fn start(name: &str) -> Token {
        Token::Start(name.to_string())
    }

    fn end(name: &str) -> Token {
        Token::End(name.to_string())
    }

    fn text(value: &str) -> Token {
        Token::Text(value.to_string())
    }

    fn collect<R: Read>(mut scanner: Scanner<R>) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = scanner.next_token().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    /// Fails with an I/O error after handing out its data.
    struct Broken<'a>(&'a [u8]);
    impl Read for Broken<'_> {
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            if self.0.is_empty() {
                return Err(IoError::other("device went away"));
            }
            let n = self.0.len().min(buf.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(CHUNK_SIZE)]
    fn tokenizes_dictionary(#[case] chunk_size: usize) {
        let doc = "<plist><dict><key>Tracks</key><dict></dict></dict></plist>";
        let scanner = Scanner::with_chunk_size(doc.as_bytes(), chunk_size);
        assert_eq!(
            collect(scanner),
            vec![
                start("plist"),
                start("dict"),
                start("key"),
                text("Tracks"),
                end("key"),
                start("dict"),
                end("dict"),
                end("dict"),
                end("plist"),
            ]
        );
    }

    #[test]
    fn self_closing_tag_emits_start_and_end() {
        let scanner = Scanner::new("<key>Compilation</key><true/>".as_bytes());
        assert_eq!(collect(scanner), vec![start("key"), text("Compilation"), end("key"), start("true"), end("true")]);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(CHUNK_SIZE)]
    fn coalesces_character_data(#[case] chunk_size: usize) {
        let doc = "<string>Rock &amp; Roll &#38; Caf\u{e9}</string>";
        let scanner = Scanner::with_chunk_size(doc.as_bytes(), chunk_size);
        assert_eq!(collect(scanner), vec![start("string"), text("Rock & Roll & Caf\u{e9}"), end("string")]);
    }

    #[test]
    fn declarations_are_other() {
        let doc = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<!DOCTYPE plist PUBLIC \"-//Apple Computer//DTD PLIST 1.0//EN\" ",
            "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">",
            "<plist version=\"1.0\"></plist>",
        );
        let tokens = collect(Scanner::new(doc.as_bytes()));
        assert_eq!(tokens, vec![Token::Other, Token::Other, start("plist"), end("plist")]);
    }

    #[test]
    fn cdata_sections_carry_no_text() {
        let tokens = collect(Scanner::new("<string><![CDATA[a.mp3]]></string>".as_bytes()));
        assert_eq!(tokens, vec![start("string"), Token::Other, end("string")]);
    }

    #[test]
    fn tag_names_are_lowercased() {
        let tokens = collect(Scanner::new("<DICT></Dict>".as_bytes()));
        assert_eq!(tokens, vec![start("dict"), end("dict")]);
    }

    #[test]
    fn tracks_line_numbers() {
        let mut scanner = Scanner::new("<plist>\n<dict>\n<key>".as_bytes());
        assert_eq!(scanner.next_token().unwrap(), Some(start("plist")));
        assert_eq!(scanner.line(), 1);
        assert_eq!(scanner.next_token().unwrap(), Some(text("\n")));
        assert_eq!(scanner.next_token().unwrap(), Some(start("dict")));
        assert_eq!(scanner.line(), 2);
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut scanner = Scanner::new("<a>".as_bytes());
        assert_eq!(scanner.next_token().unwrap(), Some(start("a")));
        assert_eq!(scanner.next_token().unwrap(), None);
        assert_eq!(scanner.next_token().unwrap(), None);
    }

    #[test]
    fn empty_input() {
        let mut scanner = Scanner::new(&b""[..]);
        assert_eq!(scanner.next_token().unwrap(), None);
    }

    #[rstest]
    #[case(&b"<key>\xff\xfe</key>"[..])]
    #[case(&b"<key>\xe2\x82"[..])]
    fn invalid_utf8_is_a_decode_error(#[case] bytes: &[u8]) {
        let mut scanner = Scanner::new(bytes);
        let err = loop {
            match scanner.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a decode error"),
                Err(err) => break err,
            }
        };
        assert!(matches!(&*err, ErrorKind::Decode { .. }));
        assert_eq!(scanner.next_token().unwrap(), None);
    }

    #[test]
    fn read_failure_is_an_io_error() {
        let mut scanner = Scanner::new(Broken(b"<plist>"));
        assert_eq!(scanner.next_token().unwrap(), Some(start("plist")));
        let err = scanner.next_token().unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
        assert_eq!(scanner.next_token().unwrap(), None);
    }

    #[test]
    fn token_predicates() {
        assert!(start("dict").is_start("dict"));
        assert!(!start("dict").is_end("dict"));
        assert!(end("dict").is_end("dict"));
        assert!(!text("dict").is_start("dict"));
    }
}
