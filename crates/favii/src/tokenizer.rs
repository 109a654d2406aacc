//! Streaming HTML tokenizer
//!
//! Pulls bytes from any [`Read`] source and yields one [`Token`] at a time.
//! Only the token currently being built is held in memory, so a page can be
//! scanned without buffering the whole document.
//!
//! This is a lenient tokenizer, not a validating parser: it never reports
//! malformed markup. The only errors are I/O failures from the reader and
//! tokens that outgrow the configured size limit.

use crate::error::TokenizeError;
use std::io::{self, BufReader, Read};

/// Elements whose content is text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Raw text elements whose content still has character references decoded
const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// A single `key=value` pair on a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub key: String,
    /// Decoded attribute value, empty when the attribute has no value
    pub value: String,
}

/// Name and attributes of a start or self-closing tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order, duplicates included
    pub attributes: Vec<Attribute>,
}

impl Tag {
    /// Create a tag with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Iterate `(key, value)` pairs in source order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|attr| (attr.key.as_str(), attr.value.as_str()))
    }
}

/// A lexical HTML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>`
    StartTag(Tag),
    /// `<name ... />`
    SelfClosingTag(Tag),
    /// `</name>`
    EndTag(String),
    /// Character data between tags
    Text(String),
    /// `<!-- ... -->` or a bogus `<? ... >` declaration
    Comment(String),
    /// `<!DOCTYPE ...>` and other `<! ... >` declarations
    Doctype(String),
}

impl Token {
    /// The tag carried by a start or self-closing tag token
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Token::StartTag(tag) | Token::SelfClosingTag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Pull-based tokenizer over a byte stream
///
/// Iterating yields `Ok(token)` until the input is exhausted, then `None`.
/// Input that ends in the middle of a tag or comment simply ends the stream.
/// After the first `Err` the iterator is fused.
pub struct Tokenizer<R> {
    reader: BufReader<R>,
    peeked: Option<u8>,
    max_token_len: Option<usize>,
    token_len: usize,
    raw_text_end: Option<String>,
    pending: Option<Token>,
    done: bool,
}

impl<R: Read> Tokenizer<R> {
    /// Create a tokenizer reading from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            peeked: None,
            max_token_len: None,
            token_len: 0,
            raw_text_end: None,
            pending: None,
            done: false,
        }
    }

    /// Fail with [`TokenizeError::TokenTooLarge`] once a single token
    /// consumes more than `limit` bytes of input
    pub fn with_max_token_len(mut self, limit: usize) -> Self {
        self.max_token_len = Some(limit);
        self
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TokenizeError> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TokenizeError::Io(e)),
            }
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, TokenizeError> {
        if self.peeked.is_none() {
            self.peeked = self.read_byte()?;
        }
        Ok(self.peeked)
    }

    fn next_byte(&mut self) -> Result<Option<u8>, TokenizeError> {
        let byte = match self.peeked.take() {
            Some(b) => Some(b),
            None => self.read_byte()?,
        };
        if byte.is_some() {
            self.token_len += 1;
            if let Some(limit) = self.max_token_len {
                if self.token_len > limit {
                    return Err(TokenizeError::TokenTooLarge { limit });
                }
            }
        }
        Ok(byte)
    }

    fn skip_whitespace(&mut self) -> Result<(), TokenizeError> {
        while matches!(self.peek_byte()?, Some(b) if b.is_ascii_whitespace()) {
            self.next_byte()?;
        }
        Ok(())
    }

    /// Consume bytes into `buf` until `stop` matches the next byte.
    /// Returns false if input ended first.
    fn read_until(
        &mut self,
        buf: &mut Vec<u8>,
        stop: impl Fn(u8) -> bool,
    ) -> Result<bool, TokenizeError> {
        loop {
            match self.peek_byte()? {
                None => return Ok(false),
                Some(b) if stop(b) => return Ok(true),
                Some(_) => {
                    if let Some(b) = self.next_byte()? {
                        buf.push(b);
                    }
                }
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        if let Some(token) = self.pending.take() {
            return Ok(Some(token));
        }
        self.token_len = 0;
        if let Some(name) = self.raw_text_end.take() {
            return self.read_raw_text(name);
        }

        let mut text = Vec::new();
        loop {
            let Some(b) = self.next_byte()? else {
                self.done = true;
                return Ok(text_token(text, true));
            };
            if b != b'<' {
                text.push(b);
                continue;
            }
            match self.peek_byte()? {
                Some(next) if next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?') => {
                    self.token_len = 1;
                    let markup = self.read_markup()?;
                    if markup.is_none() {
                        self.done = true;
                    }
                    if text.is_empty() {
                        return Ok(markup);
                    }
                    self.pending = markup;
                    return Ok(text_token(text, true));
                }
                _ => text.push(b),
            }
        }
    }

    /// Parse markup after the opening `<`. `None` means input ended inside it.
    fn read_markup(&mut self) -> Result<Option<Token>, TokenizeError> {
        match self.peek_byte()? {
            Some(b'/') => {
                self.next_byte()?;
                match self.peek_byte()? {
                    Some(b) if b.is_ascii_alphabetic() => self.read_end_tag(),
                    _ => self.read_bogus_comment(),
                }
            }
            Some(b'!') => {
                self.next_byte()?;
                self.read_declaration()
            }
            Some(b'?') => self.read_bogus_comment(),
            Some(_) => self.read_tag(),
            None => Ok(None),
        }
    }

    fn read_tag(&mut self) -> Result<Option<Token>, TokenizeError> {
        let mut name = Vec::new();
        if !self.read_until(&mut name, |b| {
            b.is_ascii_whitespace() || b == b'/' || b == b'>'
        })? {
            return Ok(None);
        }
        let mut tag = Tag::new(lowercase(name));

        loop {
            self.skip_whitespace()?;
            let Some(b) = self.next_byte()? else {
                return Ok(None);
            };
            match b {
                b'>' => {
                    if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                        self.raw_text_end = Some(tag.name.clone());
                    }
                    return Ok(Some(Token::StartTag(tag)));
                }
                b'/' => {
                    if self.peek_byte()? == Some(b'>') {
                        self.next_byte()?;
                        return Ok(Some(Token::SelfClosingTag(tag)));
                    }
                }
                first => {
                    let mut key = vec![first];
                    if !self.read_until(&mut key, |b| {
                        b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/')
                    })? {
                        return Ok(None);
                    }
                    self.skip_whitespace()?;
                    let value = if self.peek_byte()? == Some(b'=') {
                        self.next_byte()?;
                        self.skip_whitespace()?;
                        match self.read_attribute_value()? {
                            Some(value) => value,
                            None => return Ok(None),
                        }
                    } else {
                        String::new()
                    };
                    tag.attributes.push(Attribute {
                        key: lowercase(key),
                        value,
                    });
                }
            }
        }
    }

    fn read_attribute_value(&mut self) -> Result<Option<String>, TokenizeError> {
        let mut value = Vec::new();
        match self.peek_byte()? {
            None => return Ok(None),
            Some(quote @ (b'"' | b'\'')) => {
                self.next_byte()?;
                if !self.read_until(&mut value, |b| b == quote)? {
                    return Ok(None);
                }
                self.next_byte()?;
            }
            Some(_) => {
                if !self.read_until(&mut value, |b| b.is_ascii_whitespace() || b == b'>')? {
                    return Ok(None);
                }
            }
        }
        Ok(Some(decode_entities(&String::from_utf8_lossy(&value))))
    }

    fn read_end_tag(&mut self) -> Result<Option<Token>, TokenizeError> {
        let mut name = Vec::new();
        if !self.read_until(&mut name, |b| {
            b.is_ascii_whitespace() || b == b'/' || b == b'>'
        })? {
            return Ok(None);
        }
        if !self.skip_past(b'>')? {
            return Ok(None);
        }
        Ok(Some(Token::EndTag(lowercase(name))))
    }

    /// Consume through the next `end` byte. Returns false if input ended first.
    fn skip_past(&mut self, end: u8) -> Result<bool, TokenizeError> {
        loop {
            match self.next_byte()? {
                None => return Ok(false),
                Some(b) if b == end => return Ok(true),
                Some(_) => {}
            }
        }
    }

    fn read_bogus_comment(&mut self) -> Result<Option<Token>, TokenizeError> {
        let mut content = Vec::new();
        if !self.read_until(&mut content, |b| b == b'>')? {
            return Ok(None);
        }
        self.next_byte()?;
        Ok(Some(Token::Comment(
            String::from_utf8_lossy(&content).into_owned(),
        )))
    }

    /// Parse after `<!`: either a `--` comment or a declaration like DOCTYPE
    fn read_declaration(&mut self) -> Result<Option<Token>, TokenizeError> {
        let mut content = Vec::new();
        if self.peek_byte()? == Some(b'-') {
            self.next_byte()?;
            if self.peek_byte()? == Some(b'-') {
                self.next_byte()?;
                return self.read_comment();
            }
            content.push(b'-');
        }
        if !self.read_until(&mut content, |b| b == b'>')? {
            return Ok(None);
        }
        self.next_byte()?;
        Ok(Some(Token::Doctype(
            String::from_utf8_lossy(&content).trim().to_string(),
        )))
    }

    fn read_comment(&mut self) -> Result<Option<Token>, TokenizeError> {
        let mut content = Vec::new();
        loop {
            let Some(b) = self.next_byte()? else {
                return Ok(None);
            };
            content.push(b);
            // `<!-->` and `<!--->` close immediately
            if content == b">" || content == b"->" {
                return Ok(Some(Token::Comment(String::new())));
            }
            let close = if content.ends_with(b"-->") {
                3
            } else if content.ends_with(b"--!>") {
                4
            } else {
                continue;
            };
            content.truncate(content.len() - close);
            return Ok(Some(Token::Comment(
                String::from_utf8_lossy(&content).into_owned(),
            )));
        }
    }

    /// Read the content of a raw text element up to its end tag
    fn read_raw_text(&mut self, name: String) -> Result<Option<Token>, TokenizeError> {
        let closing = format!("</{}", name).into_bytes();
        let decode = RCDATA_ELEMENTS.contains(&name.as_str());
        let mut text = Vec::new();

        loop {
            let Some(b) = self.next_byte()? else {
                self.done = true;
                return Ok(text_token(text, decode));
            };
            text.push(b);
            if !ends_with_ignore_case(&text, &closing) {
                continue;
            }
            let terminated = match self.peek_byte()? {
                Some(next) => next.is_ascii_whitespace() || next == b'/' || next == b'>',
                None => true,
            };
            if !terminated {
                continue;
            }
            text.truncate(text.len() - closing.len());
            let end_tag = if self.skip_past(b'>')? {
                Some(Token::EndTag(name))
            } else {
                self.done = true;
                None
            };
            if text.is_empty() {
                return Ok(end_tag);
            }
            self.pending = end_tag;
            return Ok(text_token(text, decode));
        }
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done && self.pending.is_none() {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                self.pending = None;
                Some(Err(e))
            }
        }
    }
}

fn text_token(bytes: Vec<u8>, decode: bool) -> Option<Token> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(&bytes);
    let text = if decode {
        decode_entities(&text)
    } else {
        text.into_owned()
    };
    Some(Token::Text(text))
}

fn lowercase(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).to_ascii_lowercase()
}

fn ends_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len()
        && haystack[haystack.len() - needle.len()..].eq_ignore_ascii_case(needle)
}

/// Decode character references, leaving unknown ones untouched
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut output = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        rest = &rest[start..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_entity(&rest[1..=end]).map(|c| (c, end + 2)));

        match decoded {
            Some((c, consumed)) => {
                output.push(c);
                rest = &rest[consumed..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let hex = num.strip_prefix('x').or_else(|| num.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
