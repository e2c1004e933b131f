//! Lexer shared by the SIMPLE and PQL front ends.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use std::iter::Peekable;
use std::str::Chars;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing SIMPLE or PQL text.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            at_eof: false,
        }
    }

    /// Get the current location.
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    /// Create a span from token start to current location.
    fn make_span(&self) -> Span {
        Span::new(self.token_start, self.current_location())
    }

    /// Peek at the current character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consume and return the current character.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace. Neither SIMPLE nor PQL has comments.
    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
    }

    /// Create a token with the given kind.
    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start.offset..span.end.offset].to_string();
        Token::new(kind, span, lexeme)
    }

    /// Create an error.
    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    /// Scan an integer literal. Leading zeros are rejected (`0` itself is fine).
    fn scan_number(&mut self, first: char) -> Result<Token, LexerError> {
        let mut more_digits = false;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
            more_digits = true;
        }

        if first == '0' && more_digits {
            return Err(self.make_error(
                "integer literal has a leading zero",
                LexerErrorKind::InvalidNumber,
            ));
        }

        Ok(self.make_token(TokenKind::Integer))
    }

    /// Scan a name. Names start with a letter; later characters may include
    /// digits and underscores.
    fn scan_name(&mut self) -> Token {
        while self
            .peek()
            .map(|c| c.is_xid_continue() || c == '_')
            .unwrap_or(false)
        {
            self.advance();
        }
        self.make_token(TokenKind::Name)
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        match c {
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            '_' => Ok(self.make_token(TokenKind::Underscore)),
            '"' => Ok(self.make_token(TokenKind::Quote)),
            '.' => Ok(self.make_token(TokenKind::Dot)),
            '#' => Ok(self.make_token(TokenKind::Hash)),

            '+' => Ok(self.make_token(TokenKind::Plus)),
            '-' => Ok(self.make_token(TokenKind::Minus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '%' => Ok(self.make_token(TokenKind::Percent)),

            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Bang))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::AmpAmp))
                } else {
                    Err(self.make_error("expected '&&', found single '&'", LexerErrorKind::UnexpectedChar))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::PipePipe))
                } else {
                    Err(self.make_error("expected '||', found single '|'", LexerErrorKind::UnexpectedChar))
                }
            }

            c if c.is_ascii_digit() => self.scan_number(c),
            c if c.is_xid_start() => Ok(self.scan_name()),

            _ => Err(self.make_error(
                &format!("unexpected character: '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Check if we've reached EOF.
    pub fn is_at_end(&self) -> bool {
        self.at_eof
    }

    /// Collect all tokens, including the trailing EOF token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_eof {
            None
        } else {
            let result = self.next_token();
            if result.as_ref().map(|t| t.is_eof()).unwrap_or(false) {
                self.at_eof = true;
            }
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_names_are_not_keywords() {
        let tokens = lex("procedure while Select stmt");
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Name));
        assert_eq!(tokens[0].lexeme, "procedure");
        assert_eq!(tokens[2].lexeme, "Select");
    }

    #[test]
    fn test_name_with_underscore_and_digits() {
        let tokens = lex("some_var x123");
        assert_eq!(tokens[0].lexeme, "some_var");
        assert_eq!(tokens[1].lexeme, "x123");
    }

    #[test]
    fn test_bare_underscore_is_wildcard_token() {
        let kinds = token_kinds("_ _\"x\"_");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Underscore,
                TokenKind::Underscore,
                TokenKind::Quote,
                TokenKind::Name,
                TokenKind::Quote,
                TokenKind::Underscore,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("0 42 1000");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Integer));
        assert_eq!(tokens[1].lexeme, "42");
    }

    #[test]
    fn test_leading_zero_rejected() {
        assert!(Lexer::new("007").tokenize().is_err());
        assert!(Lexer::new("0").tokenize().is_ok());
    }

    #[test]
    fn test_operators() {
        let kinds = token_kinds("= == != ! && || < <= > >= + - * / %");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Bang,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_single_ampersand_rejected() {
        assert!(Lexer::new("a & b").tokenize().is_err());
        assert!(Lexer::new("a | b").tokenize().is_err());
    }

    #[test]
    fn test_attribute_tokens() {
        let kinds = token_kinds("c.procName s.stmt#");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::Dot,
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Dot,
                TokenKind::Name,
                TokenKind::Hash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_location_tracking() {
        let tokens = lex("x\ny");
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[1].span.start.line, 2);
    }

    #[test]
    fn test_simple_snippet() {
        let source = r#"
            procedure main {
                while (y == 3) {
                    gucci = 1;
                }
            }
        "#;
        assert!(Lexer::new(source).tokenize().is_ok());
    }
}
