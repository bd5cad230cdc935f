//! Handle Scarab's lexical analysis.
//!
//! Contains the [Lexer], an [Iterator] that yields [Lexeme]s, each of which
//! wraps a [Token] together with its surface text and source line. The
//! iterator ends (yields `None`) at the end of input.
//!
//! # Example
//!
//! ```
//! use scarab::lexer::{Lexer, Token};
//! let tokens: Vec<_> = Lexer::new("print 1 + 2").map(|lexeme| lexeme.token()).collect();
//!
//! use scarab::lexer::Keyword::Print;
//! assert_eq!(
//!     vec![Token::Keyword(Print), Token::Int(1), Token::Op("+"), Token::Int(2)],
//!     tokens
//! );
//! ```

use thiserror::Error;

/// Single characters that form a [Token::Sym] on their own.
const SYMBOL_CHARS: &str = ".,:(){}";

/// Characters that clump together into a [Token::Op].
const OPERATOR_CHARS: &str = "!@#$%^&*-+?_=<>/";

/// A lexeme from one contiguous string of Scarab source code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lexeme<'a> {
    /// The [Token] of this lexeme.
    token: Token<'a>,
    /// The actual text from the source code.
    text: &'a str,
    /// The line where this lexeme came from.
    line: usize,
}

/// What kind of [Lexeme] you have, including its parsed payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token<'a> {
    /// An integer literal.
    Int(i64),
    /// A string literal; the payload excludes the surrounding quotes.
    Str(&'a str),
    /// A name.
    Ident(&'a str),
    /// A reserved word.
    Keyword(Keyword),
    /// A maximal run of operator characters, e.g. `+`, `<=`, `:=`.
    Op(&'a str),
    /// A single punctuation character from `.,:(){}`.
    Sym(char),
    /// Something the lexer could not make sense of. The lexer never fails;
    /// it is the compiler's job to turn this into a syntax error.
    Error(LexError),
}

/// The reserved words of Scarab. An identifier matches case-insensitively:
/// `print`, `Print`, and `PRINT` all lex as [Keyword::Print].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Print,
    If,
    Else,
    While,
    Do,
    End,
    And,
    Or,
    Not,
}

/// Why a [Token::Error] was produced. The offending text is on the
/// surrounding [Lexeme].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unclosed string literal")]
    UnclosedString,
    #[error("integer literal out of range")]
    IntegerOverflow,
}

/// Scans Scarab source code and iteratively yields [Lexeme]s.
///
/// The lexer is stateful and does a single pass over the source string,
/// borrowing every payload from it.
#[derive(Debug)]
pub struct Lexer<'a> {
    start: &'a str,
    current: &'a str,
    line: usize,
}

impl<'a> Lexer<'a> {
    /// Start scanning the given string of source code.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            start: source,
            current: source,
            line: 1,
        }
    }

    /// Returns `true` if we've reached the end of the source code.
    pub fn is_at_end(&self) -> bool {
        self.current.is_empty()
    }

    /// Scan one token. Assumes whitespace has been skipped and that we are
    /// not at the end of input.
    fn scan_token(&mut self) -> Lexeme<'a> {
        match self.advance() {
            ':' if self.peek() == '=' => {
                self.advance();
                self.make_lexeme(Token::Op(self.token_text()))
            }
            c if SYMBOL_CHARS.contains(c) => self.make_lexeme(Token::Sym(c)),
            c if OPERATOR_CHARS.contains(c) => self.operator(),
            c if c.is_ascii_alphabetic() => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            '"' => self.string(),
            _ => self.make_lexeme(Token::Error(LexError::UnexpectedCharacter)),
        }
    }

    /// Scan an operator: the maximal run of operator characters.
    fn operator(&mut self) -> Lexeme<'a> {
        while OPERATOR_CHARS.contains(self.peek()) {
            self.advance();
        }
        self.make_lexeme(Token::Op(self.token_text()))
    }

    /// Scan an identifier or keyword.
    fn identifier(&mut self) -> Lexeme<'a> {
        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }

        let text = self.token_text();
        match Keyword::from_ident(text) {
            Some(keyword) => self.make_lexeme(Token::Keyword(keyword)),
            None => self.make_lexeme(Token::Ident(text)),
        }
    }

    /// Scan an integer literal: the maximal run of ASCII digits.
    fn number(&mut self) -> Lexeme<'a> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        match self.token_text().parse() {
            Ok(value) => self.make_lexeme(Token::Int(value)),
            Err(_) => self.make_lexeme(Token::Error(LexError::IntegerOverflow)),
        }
    }

    /// Scan a string literal. Expects the opening quote to have been
    /// consumed. There are no escape sequences; the literal runs to the next
    /// `"`, newlines included.
    fn string(&mut self) -> Lexeme<'a> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.make_lexeme(Token::Error(LexError::UnclosedString));
        }

        self.advance(); // the closing quote
        let text = self.token_text();
        self.make_lexeme(Token::Str(&text[1..text.len() - 1]))
    }

    /// Skips whitespace, counting newlines.
    fn skip_whitespace(&mut self) {
        while self.peek().is_whitespace() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
    }

    /// Advances self.current past one code point and returns it.
    ///
    /// # Panics
    ///
    /// If this is called at the end of input.
    fn advance(&mut self) -> char {
        let c = match self.current.chars().next() {
            Some(c) => c,
            None => panic!("called advance() at end of input"),
        };
        self.current = &self.current[c.len_utf8()..];
        c
    }

    /// Peek at the next code point without consuming it. Returns `'\0'` at
    /// the end of input.
    fn peek(&self) -> char {
        self.current.chars().next().unwrap_or('\0')
    }

    /// The surface text scanned so far for the token in progress.
    fn token_text(&self) -> &'a str {
        let extent = self.start.len() - self.current.len();
        &self.start[..extent]
    }

    /// Wrap a [Token] with the span between self.start and self.current.
    fn make_lexeme(&self, token: Token<'a>) -> Lexeme<'a> {
        Lexeme {
            token,
            text: self.token_text(),
            line: self.line,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Lexeme<'a>> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return None;
        }

        Some(self.scan_token())
    }
}

impl<'a> Lexeme<'a> {
    /// Return the [Token] of this lexeme.
    pub fn token(&self) -> Token<'a> {
        self.token
    }

    /// Return the literal text of this token. For string literals, this
    /// includes the quotes.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Return the 1-based line number this token was found on.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl Keyword {
    /// Match an identifier's spelling against the reserved words. Matching
    /// is on the ASCII-uppercased spelling.
    fn from_ident(text: &str) -> Option<Keyword> {
        use Keyword::*;
        match text.to_ascii_uppercase().as_str() {
            "PRINT" => Some(Print),
            "IF" => Some(If),
            "ELSE" => Some(Else),
            "WHILE" => Some(While),
            "DO" => Some(Do),
            "END" => Some(End),
            "AND" => Some(And),
            "OR" => Some(Or),
            "NOT" => Some(Not),
            _ => None,
        }
    }
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source).map(|lexeme| lexeme.token()).collect()
    }

    #[test]
    fn scanning_every_keyword() {
        use Keyword::*;
        let all = "print if else while do end and or not";
        let expected: Vec<_> = [Print, If, Else, While, Do, End, And, Or, Not]
            .into_iter()
            .map(Token::Keyword)
            .collect();
        assert_eq!(expected, tokens(all));
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert_eq!(vec![Token::Keyword(Keyword::While)], tokens("WHILE"));
        assert_eq!(vec![Token::Keyword(Keyword::Print)], tokens("Print"));
        // ...but an embedded keyword is still an identifier.
        assert_eq!(vec![Token::Ident("printer")], tokens("printer"));
        assert_eq!(vec![Token::Ident("ifx")], tokens("ifx"));
    }

    #[test]
    fn integers_and_identifiers() {
        assert_eq!(vec![Token::Int(543)], tokens("543"));
        assert_eq!(vec![Token::Ident("x1")], tokens("x1"));
        // A digit ends an integer run; the rest lexes separately.
        assert_eq!(vec![Token::Int(1), Token::Ident("x")], tokens("1x"));
    }

    #[test]
    fn string_literals_drop_their_quotes() {
        let lexemes: Vec<_> = Lexer::new("\"Hello, World\"").collect();
        assert_eq!(1, lexemes.len());
        assert_eq!(Token::Str("Hello, World"), lexemes[0].token());
        assert_eq!("\"Hello, World\"", lexemes[0].text());
    }

    #[test]
    fn unclosed_string_literal() {
        assert_eq!(
            vec![Token::Error(LexError::UnclosedString)],
            tokens("\"no closing quote")
        );
    }

    #[test]
    fn operators_are_maximal_runs() {
        assert_eq!(vec![Token::Op("+")], tokens("+"));
        assert_eq!(vec![Token::Op("==")], tokens("=="));
        assert_eq!(vec![Token::Op("<="), Token::Op(">=")], tokens("<= >="));
        // Whatever clump appears is one token; the compiler sorts out
        // whether it means anything.
        assert_eq!(vec![Token::Op("+-*")], tokens("+-*"));
        assert_eq!(vec![Token::Op("="), Token::Sym(':')], tokens("=:"));
    }

    #[test]
    fn walrus_is_one_operator() {
        assert_eq!(
            vec![Token::Ident("x"), Token::Op(":="), Token::Int(5)],
            tokens("x := 5")
        );
        // A lone colon stays a symbol.
        assert_eq!(vec![Token::Sym(':')], tokens(":"));
        assert_eq!(vec![Token::Sym(':'), Token::Op("==")], tokens(": =="));
    }

    #[test]
    fn symbols_are_single_characters() {
        assert_eq!(
            vec![
                Token::Sym('('),
                Token::Sym(')'),
                Token::Sym('{'),
                Token::Sym('}'),
                Token::Sym('.'),
                Token::Sym(','),
            ],
            tokens("(){}.,")
        );
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        for source in ["'", "`", "~", ";"] {
            assert_eq!(
                vec![Token::Error(LexError::UnexpectedCharacter)],
                tokens(source),
                "lexing {source:?}"
            );
        }
    }

    #[test]
    fn huge_integer_literal() {
        assert_eq!(
            vec![Token::Error(LexError::IntegerOverflow)],
            tokens("99999999999999999999")
        );
    }

    #[test]
    fn whitespace_and_line_numbers() {
        let lexemes: Vec<_> = Lexer::new("   x = 5     \n  \n   y =\n6 \n ")
            .map(|lexeme| (lexeme.token(), lexeme.line()))
            .collect();
        assert_eq!(
            vec![
                (Token::Ident("x"), 1),
                (Token::Op("="), 1),
                (Token::Int(5), 1),
                (Token::Ident("y"), 3),
                (Token::Op("="), 3),
                (Token::Int(6), 4),
            ],
            lexemes
        );
    }

    #[test]
    fn newlines_inside_strings_count_lines() {
        let lexemes: Vec<_> = Lexer::new("\"a\nb\" x").collect();
        assert_eq!(Token::Str("a\nb"), lexemes[0].token());
        assert_eq!(2, lexemes[1].line());
    }

    #[test]
    fn expression_token_count() {
        assert_eq!(5, tokens("1 + 2 * 3").len());
    }
}
