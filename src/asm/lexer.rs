//! Line lexer for AMF+1 assembly.
//!
//! A line is scanned left to right by repeated calls to [`next_token`],
//! each resuming at an external cursor. Nothing is looked ahead past the
//! token being returned.

/// Character classes used by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// End of line (end of input or NUL).
    Terminator,
    /// Space, tab, or newline.
    Whitespace,
    /// `0`-`9`
    Digit,
    /// `a`-`z`, `A`-`Z`
    Letter,
    /// Other printable ASCII such as `&` or `+`.
    Printable,
    /// Anything else: control characters and non-ASCII bytes.
    Control,
}

impl CharClass {
    /// Can this character start a symbol?
    #[inline]
    fn starts_symbol(self) -> bool {
        matches!(self, CharClass::Letter | CharClass::Printable)
    }

    /// Can this character continue a symbol?
    #[inline]
    fn continues_symbol(self) -> bool {
        matches!(self, CharClass::Letter | CharClass::Printable | CharClass::Digit)
    }
}

pub fn char_class(byte: u8) -> CharClass {
    match byte {
        0 => CharClass::Terminator,
        b' ' | b'\t' | b'\n' => CharClass::Whitespace,
        b'0'..=b'9' => CharClass::Digit,
        b'a'..=b'z' | b'A'..=b'Z' => CharClass::Letter,
        0x20..=0x7E => CharClass::Printable,
        _ => CharClass::Control,
    }
}

/// A token scanned from one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// A mnemonic or register name, verbatim.
    Symbol(&'a str),
    /// A non-negative decimal literal. Saturates at `u32::MAX`.
    Number(u32),
    /// A character that can start neither a symbol nor a number.
    Stray(char),
    /// The line terminator was reached before any token.
    End,
}

/// Scan the next token of `line` starting at `*cursor`.
///
/// On return `*cursor` is just past the token, or at the terminator for
/// [`Token::End`], so calling again with the same cursor continues the scan.
pub fn next_token<'a>(line: &'a str, cursor: &mut usize) -> Token<'a> {
    let bytes = line.as_bytes();
    let class_at = |i: usize| bytes.get(i).map_or(CharClass::Terminator, |&b| char_class(b));

    let mut i = *cursor;
    while class_at(i) == CharClass::Whitespace {
        i += 1;
    }
    *cursor = i;

    let class = class_at(i);
    if class == CharClass::Terminator {
        return Token::End;
    }

    if class.starts_symbol() {
        let start = i;
        while class_at(i).continues_symbol() {
            i += 1;
        }
        *cursor = i;
        return Token::Symbol(&line[start..i]);
    }

    if class == CharClass::Digit {
        let mut value: u32 = 0;
        while class_at(i) == CharClass::Digit {
            let digit = (bytes[i] - b'0') as u32;
            value = value.saturating_mul(10).saturating_add(digit);
            i += 1;
        }
        *cursor = i;
        return Token::Number(value);
    }

    // Control byte: consume the whole character so the cursor stays on a
    // char boundary.
    let stray = line[i..].chars().next().unwrap_or('\0');
    *cursor = i + stray.len_utf8();
    Token::Stray(stray)
}

/// Iterator over the tokens of one line. Stops before [`Token::End`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    line: &'a str,
    cursor: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, cursor: 0 }
    }

    /// Next token, returning [`Token::End`] once the line is exhausted.
    pub fn next_token(&mut self) -> Token<'a> {
        next_token(self.line, &mut self.cursor)
    }

    /// Byte offset of the scan position.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Token::End => None,
            token => Some(token),
        }
    }
}
