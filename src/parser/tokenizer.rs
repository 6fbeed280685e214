//! Tokenizer for FHIRPath expressions
//!
//! Scans the source left-to-right with a byte cursor, producing spanned
//! tokens. Whitespace and `//` line comments are discarded but advance the
//! spans of adjacent tokens. String and delimited-identifier escapes are
//! decoded here; numeric, date and time literals keep their source text and
//! are decoded when the literal is evaluated.

use super::error::{ParseError, ParseResult};
use super::span::{Span, Spanned};
use smallvec::SmallVec;

/// A single token with decoded payload where applicable
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Integer literal (e.g. 42)
    Integer(i64),
    /// Decimal literal kept as source text to preserve precision (e.g. 3.14)
    Decimal(&'input str),
    /// String literal with escapes decoded
    String(std::string::String),
    /// Date literal text without the `@` (e.g. 2023-01-01, 2023-01, 2023)
    Date(&'input str),
    /// DateTime literal text without the `@` (e.g. 2023-01-01T12:00:00Z)
    DateTime(&'input str),
    /// Time literal text without the `@T` (e.g. 12:30:00)
    Time(&'input str),
    /// Quantity literal: numeric text plus unit. Calendar-word units keep
    /// their pluralization (`3 days` keeps "days"); quoted units are decoded.
    Quantity {
        /// Numeric value as written
        value: &'input str,
        /// Unit text
        unit: std::string::String,
    },

    /// Identifier (property names, function names, type names)
    Identifier(&'input str),
    /// Backtick-delimited identifier with escapes decoded
    DelimitedIdentifier(std::string::String),
    /// `$`-variable name without the sigil (`this`, `index`, `total`, user names)
    Variable(&'input str),
    /// `%`-environment variable name, bare or quoted form, decoded
    EnvVariable(std::string::String),

    // Keyword tokens. Only words that act as operators or literals are
    // reserved; everything else lexes as an identifier. The parser may
    // re-interpret these as identifiers after a dot or as a function head.
    /// `true` literal
    True,
    /// `false` literal
    False,
    /// `and` operator
    And,
    /// `or` operator
    Or,
    /// `xor` operator
    Xor,
    /// `implies` operator
    Implies,
    /// `is` type-test operator
    Is,
    /// `as` type-cast operator
    As,
    /// `in` membership operator
    In,
    /// `contains` containership operator
    Contains,
    /// `div` integer division operator
    Div,
    /// `mod` remainder operator
    Mod,

    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `.`
    Dot,
    /// `,`
    Comma,

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `&` string concatenation
    Ampersand,
    /// `|` union
    Pipe,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `~` equivalence
    Equivalent,
    /// `!~` non-equivalence
    NotEquivalent,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,

    /// End-of-stream marker
    Eof,
}

impl<'input> Token<'input> {
    /// Keyword lookup; only true operator/literal words are reserved
    fn from_keyword(word: &str) -> Option<Token<'input>> {
        match word {
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "xor" => Some(Token::Xor),
            "implies" => Some(Token::Implies),
            "is" => Some(Token::Is),
            "as" => Some(Token::As),
            "in" => Some(Token::In),
            "contains" => Some(Token::Contains),
            "div" => Some(Token::Div),
            "mod" => Some(Token::Mod),
            _ => None,
        }
    }

    /// The surface text of a keyword token, for re-interpretation as an
    /// identifier in member position
    pub fn keyword_text(&self) -> Option<&'static str> {
        match self {
            Token::True => Some("true"),
            Token::False => Some("false"),
            Token::And => Some("and"),
            Token::Or => Some("or"),
            Token::Xor => Some("xor"),
            Token::Implies => Some("implies"),
            Token::Is => Some("is"),
            Token::As => Some("as"),
            Token::In => Some("in"),
            Token::Contains => Some("contains"),
            Token::Div => Some("div"),
            Token::Mod => Some("mod"),
            _ => None,
        }
    }

    /// Short description for error messages
    pub fn describe(&self) -> std::string::String {
        match self {
            Token::Integer(n) => format!("integer '{n}'"),
            Token::Decimal(s) => format!("decimal '{s}'"),
            Token::String(s) => format!("string '{s}'"),
            Token::Date(s) => format!("date '@{s}'"),
            Token::DateTime(s) => format!("datetime '@{s}'"),
            Token::Time(s) => format!("time '@T{s}'"),
            Token::Quantity { value, unit } => format!("quantity '{value} {unit}'"),
            Token::Identifier(s) => format!("identifier '{s}'"),
            Token::DelimitedIdentifier(s) => format!("identifier `{s}`"),
            Token::Variable(s) => format!("variable '${s}'"),
            Token::EnvVariable(s) => format!("environment variable '%{s}'"),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.surface()),
        }
    }

    /// Surface syntax for punctuation, operator and keyword tokens
    fn surface(&self) -> &'static str {
        match self {
            Token::True => "true",
            Token::False => "false",
            Token::And => "and",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::Implies => "implies",
            Token::Is => "is",
            Token::As => "as",
            Token::In => "in",
            Token::Contains => "contains",
            Token::Div => "div",
            Token::Mod => "mod",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Equal => "=",
            Token::NotEqual => "!=",
            Token::Equivalent => "~",
            Token::NotEquivalent => "!~",
            Token::LessThan => "<",
            Token::LessThanOrEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterThanOrEqual => ">=",
            _ => "",
        }
    }
}

/// Calendar duration words recognized as quantity units after a number.
/// Pluralization is preserved in the resulting token.
const CALENDAR_WORDS: &[&str] = &[
    "year",
    "years",
    "month",
    "months",
    "week",
    "weeks",
    "day",
    "days",
    "hour",
    "hours",
    "minute",
    "minutes",
    "second",
    "seconds",
    "millisecond",
    "milliseconds",
];

/// Byte-cursor tokenizer
pub struct Tokenizer<'input> {
    source: &'input str,
    bytes: &'input [u8],
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer over `input`
    pub fn new(input: &'input str) -> Self {
        Self {
            source: input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn slice(&self, start: usize, end: usize) -> &'input str {
        &self.source[start..end]
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline]
    fn is_id_start(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'_')
    }

    #[inline]
    fn is_id_continue(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.peek().is_some_and(Self::is_id_continue) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// Decode the body of a quoted construct up to `close`, handling the
    /// shared escape set. `self.pos` must sit just past the opening quote.
    fn scan_quoted(&mut self, close: u8, open: usize) -> ParseResult<std::string::String> {
        let mut out = std::string::String::new();
        loop {
            match self.peek() {
                None => {
                    let span = Span::new(open, self.pos);
                    return Err(if close == b'`' {
                        ParseError::UnterminatedIdentifier { span }
                    } else {
                        ParseError::UnterminatedString { span }
                    });
                }
                Some(ch) if ch == close => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    let esc_start = self.pos;
                    self.pos += 1;
                    match self.peek() {
                        Some(b'`') => out.push('`'),
                        Some(b'\'') => out.push('\''),
                        Some(b'"') => out.push('"'),
                        Some(b'\\') => out.push('\\'),
                        Some(b'/') => out.push('/'),
                        Some(b'f') => out.push('\u{000C}'),
                        Some(b'n') => out.push('\n'),
                        Some(b'r') => out.push('\r'),
                        Some(b't') => out.push('\t'),
                        Some(b'u') => {
                            self.pos += 1;
                            let hex_start = self.pos;
                            while self.pos < hex_start + 4
                                && self.peek().is_some_and(|c| c.is_ascii_hexdigit())
                            {
                                self.pos += 1;
                            }
                            if self.pos != hex_start + 4 {
                                return Err(ParseError::InvalidEscape {
                                    sequence: self.slice(esc_start, self.pos).to_string(),
                                    span: Span::new(esc_start, self.pos),
                                });
                            }
                            let code = u32::from_str_radix(self.slice(hex_start, self.pos), 16)
                                .ok()
                                .and_then(char::from_u32);
                            match code {
                                Some(c) => out.push(c),
                                None => {
                                    return Err(ParseError::InvalidEscape {
                                        sequence: self.slice(esc_start, self.pos).to_string(),
                                        span: Span::new(esc_start, self.pos),
                                    });
                                }
                            }
                            continue;
                        }
                        other => {
                            let end = self.pos + other.map_or(0, |_| 1);
                            return Err(ParseError::InvalidEscape {
                                sequence: self.slice(esc_start, end).to_string(),
                                span: Span::new(esc_start, end),
                            });
                        }
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    // Consume a full UTF-8 scalar
                    let ch = self.source[self.pos..].chars().next().unwrap();
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    /// Scan an integer or decimal literal, then look ahead for a quantity
    /// unit (calendar word or quoted string)
    fn scan_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        let mut is_decimal = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        // Optional scientific exponent
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut probe = self.pos + 1;
            if matches!(self.bytes.get(probe), Some(b'+' | b'-')) {
                probe += 1;
            }
            if self.bytes.get(probe).is_some_and(|c| c.is_ascii_digit()) {
                is_decimal = true;
                self.pos = probe;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text = self.slice(start, self.pos);

        // A number directly followed (whitespace only) by a calendar word or
        // a quoted unit is a single quantity literal
        let saved = self.pos;
        self.skip_trivia();
        match self.peek() {
            Some(b'\'') => {
                let open = self.pos;
                self.pos += 1;
                let unit = self.scan_quoted(b'\'', open)?;
                return Ok(Token::Quantity { value: text, unit });
            }
            Some(ch) if Self::is_id_start(ch) => {
                let word_start = self.pos;
                let word = self.scan_identifier();
                if CALENDAR_WORDS.contains(&word) {
                    return Ok(Token::Quantity {
                        value: text,
                        unit: word.to_string(),
                    });
                }
                self.pos = word_start;
            }
            _ => {}
        }
        self.pos = saved;

        if is_decimal {
            Ok(Token::Decimal(text))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| ParseError::InvalidLiteral {
                    text: text.to_string(),
                    span: Span::new(start, self.pos),
                })
        }
    }

    /// Scan the `@`-introduced date, datetime or time literal tiers
    fn scan_temporal(&mut self) -> ParseResult<Token<'input>> {
        let at = self.pos;
        self.pos += 1; // '@'

        if self.peek() == Some(b'T') {
            self.pos += 1;
            let start = self.pos;
            self.scan_time_tier();
            if self.pos == start {
                return Err(ParseError::InvalidLiteral {
                    text: self.slice(at, self.pos).to_string(),
                    span: Span::new(at, self.pos),
                });
            }
            return Ok(Token::Time(self.slice(start, self.pos)));
        }

        let start = self.pos;
        if !self.scan_date_tier() {
            return Err(ParseError::InvalidLiteral {
                text: self.slice(at, self.pos.max(at + 1)).to_string(),
                span: Span::new(at, self.pos.max(at + 1)),
            });
        }

        if self.peek() == Some(b'T') {
            self.pos += 1;
            self.scan_time_tier();
            self.scan_timezone();
            Ok(Token::DateTime(self.slice(start, self.pos)))
        } else {
            Ok(Token::Date(self.slice(start, self.pos)))
        }
    }

    /// `YYYY(-MM(-DD)?)?`; returns false when no year digits were found
    fn scan_date_tier(&mut self) -> bool {
        let year_start = self.pos;
        while self.pos < year_start + 4 && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos != year_start + 4 {
            self.pos = year_start;
            return false;
        }
        for _ in 0..2 {
            if self.peek() == Some(b'-')
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += 3;
            } else {
                break;
            }
        }
        true
    }

    /// `hh(:mm(:ss(.fff+)?)?)?`
    fn scan_time_tier(&mut self) {
        let hour_start = self.pos;
        while self.pos < hour_start + 2 && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == hour_start {
            return;
        }
        for _ in 0..2 {
            if self.peek() == Some(b':')
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += 3;
            } else {
                return;
            }
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
    }

    /// `Z` or `±hh:mm`
    fn scan_timezone(&mut self) {
        match self.peek() {
            Some(b'Z') => self.pos += 1,
            Some(b'+' | b'-') => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                    && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())
                    && self.peek_at(3) == Some(b':')
                    && self.peek_at(4).is_some_and(|c| c.is_ascii_digit())
                    && self.peek_at(5).is_some_and(|c| c.is_ascii_digit())
                {
                    self.pos += 6;
                }
            }
            _ => {}
        }
    }

    /// Scan the next token; `None` at end of input
    fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_trivia();

        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            b'.' => {
                self.pos += 1;
                Token::Dot
            }
            b',' => {
                self.pos += 1;
                Token::Comma
            }
            b'(' => {
                self.pos += 1;
                Token::LeftParen
            }
            b')' => {
                self.pos += 1;
                Token::RightParen
            }
            b'[' => {
                self.pos += 1;
                Token::LeftBracket
            }
            b']' => {
                self.pos += 1;
                Token::RightBracket
            }
            b'{' => {
                self.pos += 1;
                Token::LeftBrace
            }
            b'}' => {
                self.pos += 1;
                Token::RightBrace
            }
            b'+' => {
                self.pos += 1;
                Token::Plus
            }
            b'-' => {
                self.pos += 1;
                Token::Minus
            }
            b'*' => {
                self.pos += 1;
                Token::Star
            }
            b'/' => {
                self.pos += 1;
                Token::Slash
            }
            b'&' => {
                self.pos += 1;
                Token::Ampersand
            }
            b'|' => {
                self.pos += 1;
                Token::Pipe
            }
            b'~' => {
                self.pos += 1;
                Token::Equivalent
            }
            b'=' => {
                self.pos += 1;
                Token::Equal
            }
            b'!' => match self.peek_at(1) {
                Some(b'=') => {
                    self.pos += 2;
                    Token::NotEqual
                }
                Some(b'~') => {
                    self.pos += 2;
                    Token::NotEquivalent
                }
                _ => {
                    self.pos += 1;
                    return Err(ParseError::UnexpectedCharacter {
                        ch: '!',
                        span: Span::new(start, self.pos),
                    });
                }
            },
            b'<' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Token::LessThanOrEqual
                } else {
                    self.pos += 1;
                    Token::LessThan
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Token::GreaterThanOrEqual
                } else {
                    self.pos += 1;
                    Token::GreaterThan
                }
            }
            b'\'' => {
                self.pos += 1;
                Token::String(self.scan_quoted(b'\'', start)?)
            }
            b'`' => {
                self.pos += 1;
                Token::DelimitedIdentifier(self.scan_quoted(b'`', start)?)
            }
            b'@' => self.scan_temporal()?,
            b'$' => {
                self.pos += 1;
                if !self.peek().is_some_and(Self::is_id_start) {
                    return Err(ParseError::UnexpectedCharacter {
                        ch: '$',
                        span: Span::new(start, self.pos),
                    });
                }
                Token::Variable(self.scan_identifier())
            }
            b'%' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'\'') => {
                        let open = self.pos;
                        self.pos += 1;
                        Token::EnvVariable(self.scan_quoted(b'\'', open)?)
                    }
                    Some(c) if Self::is_id_start(c) => {
                        Token::EnvVariable(self.scan_identifier().to_string())
                    }
                    _ => {
                        return Err(ParseError::UnexpectedCharacter {
                            ch: '%',
                            span: Span::new(start, self.pos),
                        });
                    }
                }
            }
            b'0'..=b'9' => self.scan_number()?,
            c if Self::is_id_start(c) => {
                let word = self.scan_identifier();
                Token::from_keyword(word).unwrap_or(Token::Identifier(word))
            }
            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap();
                self.pos += ch.len_utf8();
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    span: Span::new(start, self.pos),
                });
            }
        };

        Ok(Some(Spanned::new(token, Span::new(start, self.pos))))
    }

    /// Tokenize the whole input, appending the end-of-stream marker
    pub fn tokenize(mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens: SmallVec<[Spanned<Token<'input>>; 16]> = SmallVec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        tokens.push(Spanned::new(Token::Eof, Span::point(self.pos)));
        Ok(tokens.into_vec())
    }
}

/// Tokenize an expression string
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_path_expression() {
        let tokens = kinds("Patient.name");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("Patient"),
                Token::Dot,
                Token::Identifier("name"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_skip_trivia() {
        let tokens = tokenize("  a // comment\n + b").unwrap();
        assert_eq!(tokens[0].span, Span::new(2, 3));
        assert_eq!(tokens[1].span, Span::new(16, 17));
        assert_eq!(tokens[2].span, Span::new(18, 19));
        assert_eq!(tokens[3].span, Span::point(19));
    }

    #[test]
    fn test_operators_greedy() {
        let tokens = kinds("<= >= != !~ ~ = < >");
        assert_eq!(
            tokens,
            vec![
                Token::LessThanOrEqual,
                Token::GreaterThanOrEqual,
                Token::NotEqual,
                Token::NotEquivalent,
                Token::Equivalent,
                Token::Equal,
                Token::LessThan,
                Token::GreaterThan,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        let tokens = kinds("a and where not div");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a"),
                Token::And,
                Token::Identifier("where"),
                Token::Identifier("not"),
                Token::Div,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r"'a\'b\\c\ndA'");
        assert_eq!(tokens[0], Token::String("a'b\\c\ndA".to_string()));
    }

    #[test]
    fn test_unicode_escape() {
        let tokens = kinds(r"'snow \u2603'");
        assert_eq!(tokens[0], Token::String("snow \u{2603}".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { .. }));
        assert_eq!(err.span(), Span::new(0, 4));
    }

    #[test]
    fn test_invalid_escape() {
        let err = tokenize(r"'a\qb'").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEscape { .. }));
    }

    #[test]
    fn test_delimited_identifier() {
        let tokens = kinds("`div`.`PID-1`");
        assert_eq!(tokens[0], Token::DelimitedIdentifier("div".to_string()));
        assert_eq!(tokens[2], Token::DelimitedIdentifier("PID-1".to_string()));
    }

    #[test]
    fn test_empty_delimited_identifier_is_legal() {
        let tokens = kinds("``");
        assert_eq!(tokens[0], Token::DelimitedIdentifier(std::string::String::new()));
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("42 3.14 0.5 1e3");
        assert_eq!(tokens[0], Token::Integer(42));
        assert_eq!(tokens[1], Token::Decimal("3.14"));
        assert_eq!(tokens[2], Token::Decimal("0.5"));
        assert_eq!(tokens[3], Token::Decimal("1e3"));
    }

    #[test]
    fn test_calendar_quantity_preserves_plural() {
        let tokens = kinds("3 days + 1 day");
        assert_eq!(
            tokens[0],
            Token::Quantity {
                value: "3",
                unit: "days".to_string()
            }
        );
        assert_eq!(
            tokens[2],
            Token::Quantity {
                value: "1",
                unit: "day".to_string()
            }
        );
    }

    #[test]
    fn test_quoted_unit_quantity() {
        let tokens = kinds("4.5 'mg'");
        assert_eq!(
            tokens[0],
            Token::Quantity {
                value: "4.5",
                unit: "mg".to_string()
            }
        );
    }

    #[test]
    fn test_number_then_keyword_is_not_quantity() {
        let tokens = kinds("5 div 2");
        assert_eq!(tokens[0], Token::Integer(5));
        assert_eq!(tokens[1], Token::Div);
    }

    #[test]
    fn test_date_tiers() {
        assert_eq!(kinds("@2020")[0], Token::Date("2020"));
        assert_eq!(kinds("@2020-03")[0], Token::Date("2020-03"));
        assert_eq!(kinds("@2020-03-14")[0], Token::Date("2020-03-14"));
    }

    #[test]
    fn test_datetime_and_time() {
        assert_eq!(
            kinds("@2020-03-14T13:45:30.123Z")[0],
            Token::DateTime("2020-03-14T13:45:30.123Z")
        );
        assert_eq!(
            kinds("@2020-03-14T13:45+02:00")[0],
            Token::DateTime("2020-03-14T13:45+02:00")
        );
        assert_eq!(kinds("@T14:30")[0], Token::Time("14:30"));
    }

    #[test]
    fn test_variables() {
        let tokens = kinds("$this $index $total $acc %resource %'us-zip'");
        assert_eq!(tokens[0], Token::Variable("this"));
        assert_eq!(tokens[1], Token::Variable("index"));
        assert_eq!(tokens[2], Token::Variable("total"));
        assert_eq!(tokens[3], Token::Variable("acc"));
        assert_eq!(tokens[4], Token::EnvVariable("resource".to_string()));
        assert_eq!(tokens[5], Token::EnvVariable("us-zip".to_string()));
    }

    #[test]
    fn test_stray_character() {
        let err = tokenize("a # b").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedCharacter { ch: '#', .. }));
    }
}
