//! Template tokenizer
//!
//! Splits template source into text runs and action tokens. Delimiters are
//! configurable; trim markers (`((- ` and ` -))`) remove adjacent whitespace
//! from the neighbouring text, and `((/* ... */))` comments produce no tokens.

use crate::templates::error::TemplateError;

/// Keywords recognised inside actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Block,
    Break,
    Continue,
    Define,
    Else,
    End,
    If,
    Range,
    Template,
    With,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "block" => Keyword::Block,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "define" => Keyword::Define,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "if" => Keyword::If,
            "range" => Keyword::Range,
            "template" => Keyword::Template,
            "with" => Keyword::With,
            _ => return None,
        })
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Keyword::Block => "block",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Define => "define",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::If => "if",
            Keyword::Range => "range",
            Keyword::Template => "template",
            Keyword::With => "with",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Text(String),
    LeftDelim,
    RightDelim,
    Space,
    Keyword(Keyword),
    Identifier(String),
    /// `.Name`, stored without the leading dot
    Field(String),
    Dot,
    /// `$` or `$name`, stored with the leading `$`
    Variable(String),
    Bool(bool),
    Nil,
    Number(String),
    /// Quoted or raw string, already unquoted
    String(String),
    Char(char),
    Declare,
    Assign,
    Pipe,
    Comma,
    LeftParen,
    RightParen,
    Eof,
}

impl TokenKind {
    /// Short description used in "unexpected ..." errors
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Text(t) => format!("text {:?}", t),
            TokenKind::LeftDelim => "left delimiter".to_string(),
            TokenKind::RightDelim => "right delimiter".to_string(),
            TokenKind::Space => "space".to_string(),
            TokenKind::Keyword(k) => format!("<{}>", k.as_str()),
            TokenKind::Identifier(name) => format!("{:?}", name),
            TokenKind::Field(name) => format!("<.{}>", name),
            TokenKind::Dot => "<.>".to_string(),
            TokenKind::Variable(name) => format!("{:?}", name),
            TokenKind::Bool(b) => format!("{:?}", b.to_string()),
            TokenKind::Nil => "<nil>".to_string(),
            TokenKind::Number(n) => format!("number {:?}", n),
            TokenKind::String(s) => format!("{:?}", s),
            TokenKind::Char(c) => format!("{:?}", c),
            TokenKind::Declare => "\":=\"".to_string(),
            TokenKind::Assign => "\"=\"".to_string(),
            TokenKind::Pipe => "\"|\"".to_string(),
            TokenKind::Comma => "\",\"".to_string(),
            TokenKind::LeftParen => "\"(\"".to_string(),
            TokenKind::RightParen => "\")\"".to_string(),
            TokenKind::Eof => "EOF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

/// Tokenize `input` using the given delimiter pair.
pub(crate) fn lex(
    name: &str,
    input: &str,
    left: &str,
    right: &str,
) -> Result<Vec<Token>, TemplateError> {
    Lexer {
        name,
        input,
        left,
        right,
        pos: 0,
        line: 1,
        paren_depth: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    name: &'a str,
    input: &'a str,
    left: &'a str,
    right: &'a str,
    pos: usize,
    line: usize,
    paren_depth: usize,
    tokens: Vec<Token>,
}

/// Whitespace as understood by trim markers and action spacing
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn has_left_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

fn has_right_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_space) && chars.next() == Some('-')
}

fn count_lines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        loop {
            self.lex_text();
            if self.pos >= self.input.len() {
                self.emit(TokenKind::Eof, self.line);
                return Ok(self.tokens);
            }
            self.lex_left_delim()?;
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.name, self.line, message)
    }

    fn emit(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token { kind, line });
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Emit the text up to the next left delimiter (or EOF).
    fn lex_text(&mut self) {
        let rest = self.rest();
        let start_line = self.line;
        let (raw, consumed) = match rest.find(self.left) {
            Some(offset) => {
                let raw = &rest[..offset];
                let after = &rest[offset + self.left.len()..];
                if has_left_trim_marker(after) {
                    (raw.trim_end_matches(is_space), offset)
                } else {
                    (raw, offset)
                }
            }
            None => (rest, rest.len()),
        };
        if !raw.is_empty() {
            self.emit(TokenKind::Text(raw.to_string()), start_line);
        }
        self.line += count_lines(&rest[..consumed]);
        self.pos += consumed;
    }

    fn lex_left_delim(&mut self) -> Result<(), TemplateError> {
        self.pos += self.left.len();
        let trim = has_left_trim_marker(self.rest());
        let marker_len = if trim { 2 } else { 0 };
        if self.rest()[marker_len..].starts_with(LEFT_COMMENT) {
            self.line += count_lines(&self.rest()[..marker_len]);
            self.pos += marker_len;
            return self.lex_comment();
        }
        self.emit(TokenKind::LeftDelim, self.line);
        self.line += count_lines(&self.rest()[..marker_len]);
        self.pos += marker_len;
        self.paren_depth = 0;
        self.lex_inside_action()
    }

    fn lex_comment(&mut self) -> Result<(), TemplateError> {
        self.pos += LEFT_COMMENT.len();
        let rest = self.rest();
        let end = rest
            .find(RIGHT_COMMENT)
            .ok_or_else(|| self.error("unclosed comment"))?;
        self.line += count_lines(&rest[..end]);
        self.pos += end + RIGHT_COMMENT.len();
        match self.at_right_delim() {
            Some(trim) => {
                self.skip_right_delim(trim);
                Ok(())
            }
            None => Err(self.error("comment ends before closing delimiter")),
        }
    }

    /// `Some(trim)` when positioned on a right delimiter
    fn at_right_delim(&self) -> Option<bool> {
        let rest = self.rest();
        if has_right_trim_marker(rest) && rest[2..].starts_with(self.right) {
            return Some(true);
        }
        if rest.starts_with(self.right) {
            return Some(false);
        }
        None
    }

    fn skip_right_delim(&mut self, trim: bool) {
        if trim {
            self.line += count_lines(&self.rest()[..2]);
            self.pos += 2;
        }
        self.pos += self.right.len();
        if trim {
            let rest = self.rest();
            let trimmed = rest.trim_start_matches(is_space);
            let skipped = rest.len() - trimmed.len();
            self.line += count_lines(&rest[..skipped]);
            self.pos += skipped;
        }
    }

    fn at_terminator(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) if is_space(c) => true,
            Some('.' | ',' | '|' | ':' | ')' | '(') => true,
            Some(c) => self.right.starts_with(c),
        }
    }

    fn lex_inside_action(&mut self) -> Result<(), TemplateError> {
        loop {
            if let Some(trim) = self.at_right_delim() {
                if self.paren_depth > 0 {
                    return Err(self.error("unclosed left paren"));
                }
                let line = self.line;
                self.skip_right_delim(trim);
                self.emit(TokenKind::RightDelim, line);
                return Ok(());
            }
            let line = self.line;
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(self.error("unclosed action")),
            };
            match c {
                c if is_space(c) => self.lex_space(),
                '=' => {
                    self.advance();
                    self.emit(TokenKind::Assign, line);
                }
                ':' => {
                    self.advance();
                    if self.advance() != Some('=') {
                        return Err(self.error("expected :="));
                    }
                    self.emit(TokenKind::Declare, line);
                }
                '|' => {
                    self.advance();
                    self.emit(TokenKind::Pipe, line);
                }
                ',' => {
                    self.advance();
                    self.emit(TokenKind::Comma, line);
                }
                '"' => self.lex_quote()?,
                '`' => self.lex_raw_quote()?,
                '\'' => self.lex_char()?,
                '$' => self.lex_variable()?,
                '.' => {
                    let next = self.rest()[1..].chars().next();
                    if next.is_some_and(|n| n.is_ascii_digit()) {
                        self.lex_number()?;
                    } else {
                        self.lex_field()?;
                    }
                }
                '+' | '-' | '0'..='9' => self.lex_number()?,
                c if is_alphanumeric(c) => self.lex_identifier()?,
                '(' => {
                    self.advance();
                    self.paren_depth += 1;
                    self.emit(TokenKind::LeftParen, line);
                }
                ')' => {
                    if self.paren_depth == 0 {
                        return Err(self.error("unexpected right paren"));
                    }
                    self.advance();
                    self.paren_depth -= 1;
                    self.emit(TokenKind::RightParen, line);
                }
                other => {
                    return Err(self.error(format!(
                        "unrecognized character in action: {:?}",
                        other
                    )))
                }
            }
        }
    }

    fn lex_space(&mut self) {
        let line = self.line;
        let mut consumed = false;
        while let Some(c) = self.peek() {
            if !is_space(c) {
                break;
            }
            // leave the space of a trim-marked right delimiter in place
            let rest = self.rest();
            if has_right_trim_marker(rest) && rest[2..].starts_with(self.right) {
                break;
            }
            self.advance();
            consumed = true;
        }
        if consumed {
            self.emit(TokenKind::Space, line);
        }
    }

    fn lex_quote(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => return Err(self.error("unterminated quoted string")),
                Some('"') => break,
                Some('\\') => value.push(self.lex_escape()?),
                Some(c) => value.push(c),
            }
        }
        self.emit(TokenKind::String(value), line);
        Ok(())
    }

    fn lex_escape(&mut self) -> Result<char, TemplateError> {
        let c = self
            .advance()
            .ok_or_else(|| self.error("unterminated quoted string"))?;
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'v' => '\u{0B}',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'x' => self.lex_hex_escape(2)?,
            'u' => self.lex_hex_escape(4)?,
            'U' => self.lex_hex_escape(8)?,
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let digit = self
                        .advance()
                        .and_then(|d| d.to_digit(8))
                        .ok_or_else(|| self.error("invalid syntax"))?;
                    code = code * 8 + digit;
                }
                char::from_u32(code).ok_or_else(|| self.error("invalid syntax"))?
            }
            _ => return Err(self.error("invalid syntax")),
        };
        Ok(escaped)
    }

    fn lex_hex_escape(&mut self, digits: usize) -> Result<char, TemplateError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .advance()
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| self.error("invalid syntax"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid syntax"))
    }

    fn lex_raw_quote(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let rest = self.rest();
        let end = rest
            .find('`')
            .ok_or_else(|| self.error("unterminated raw quoted string"))?;
        let value = rest[..end].replace('\r', "");
        self.line += count_lines(&rest[..end]);
        self.pos += end + 1;
        self.emit(TokenKind::String(value), line);
        Ok(())
    }

    fn lex_char(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let c = match self.advance() {
            None | Some('\n') | Some('\'') => {
                return Err(self.error("unterminated character constant"))
            }
            Some('\\') => self.lex_escape()?,
            Some(c) => c,
        };
        if self.advance() != Some('\'') {
            return Err(self.error("unterminated character constant"));
        }
        self.emit(TokenKind::Char(c), line);
        Ok(())
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_alphanumeric(c) {
                break;
            }
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn lex_variable(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let name = self.take_word();
        if !self.at_terminator() {
            return Err(self.bad_character());
        }
        self.emit(TokenKind::Variable(format!("${}", name)), line);
        Ok(())
    }

    fn lex_field(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        self.advance();
        let name = self.take_word();
        if name.is_empty() {
            self.emit(TokenKind::Dot, line);
            return Ok(());
        }
        if !self.at_terminator() {
            return Err(self.bad_character());
        }
        self.emit(TokenKind::Field(name.to_string()), line);
        Ok(())
    }

    fn lex_identifier(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        let word = self.take_word();
        if !self.at_terminator() {
            return Err(self.bad_character());
        }
        let kind = match word {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "nil" => TokenKind::Nil,
            _ => match Keyword::from_word(word) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(word.to_string()),
            },
        };
        self.emit(kind, line);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), TemplateError> {
        let line = self.line;
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.advance();
        }
        let mut digits: fn(char) -> bool = |c| c.is_ascii_digit() || c == '_';
        let mut exponent = ['e', 'E'];
        if self.rest().starts_with('0') {
            let prefix = self.rest()[1..].chars().next();
            match prefix {
                Some('x' | 'X') => {
                    self.advance();
                    self.advance();
                    digits = |c| c.is_ascii_hexdigit() || c == '_';
                    exponent = ['p', 'P'];
                }
                Some('o' | 'O') => {
                    self.advance();
                    self.advance();
                    digits = |c| c.is_digit(8) || c == '_';
                }
                Some('b' | 'B') => {
                    self.advance();
                    self.advance();
                    digits = |c| c.is_digit(2) || c == '_';
                }
                _ => {}
            }
        }
        self.accept_run(digits);
        if self.peek() == Some('.') {
            self.advance();
            self.accept_run(digits);
        }
        if self.peek().is_some_and(|c| exponent.contains(&c)) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.accept_run(|c| c.is_ascii_digit() || c == '_');
        }
        if self.peek().is_some_and(is_alphanumeric) {
            self.advance();
            return Err(self.error(format!(
                "bad number syntax: {:?}",
                &self.input[start..self.pos]
            )));
        }
        self.emit(
            TokenKind::Number(self.input[start..self.pos].to_string()),
            line,
        );
        Ok(())
    }

    fn accept_run(&mut self, valid: fn(char) -> bool) {
        while self.peek().is_some_and(valid) {
            self.advance();
        }
    }

    fn bad_character(&self) -> TemplateError {
        let c = self.peek().unwrap_or(' ');
        self.error(format!("bad character {:?}", c))
    }
}
