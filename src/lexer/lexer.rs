use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

/// Called with the text a pattern matched at the current position.
pub type RegexHandler = fn(&mut Lexer, &str);

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

macro_rules! pattern {
    ($regex:literal, $handler:expr) => {
        RegexPattern {
            regex: Regex::new(concat!("^", $regex)).unwrap(),
            handler: $handler,
        }
    };
}

lazy_static! {
    /// Tried in order; the first pattern matching at the current position wins.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        pattern!(r"\s+", skip_handler),
        pattern!(r"//[^\n]*", skip_handler),
        pattern!(r"/\*(?s:.*?)\*/", skip_handler),
        // Preprocessor directives are ignored.
        pattern!(r"#[^\n]*", skip_handler),
        pattern!(r"[a-zA-Z_][a-zA-Z0-9_]*", symbol_handler),
        pattern!(
            r"(?:[0-9]+\.[0-9]*(?:[eE][+-]?[0-9]+)?|\.[0-9]+(?:[eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+|0[xX][0-9a-fA-F]+|[0-9]+)",
            number_handler
        ),
        pattern!(r"\[", MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[")),
        pattern!(r"\]", MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]")),
        pattern!(r"\{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        pattern!(r"\}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
        pattern!(r"\(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        pattern!(r"\)", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        pattern!(r"==", MK_DEFAULT_HANDLER!(TokenKind::Equals, "==")),
        pattern!(r"!=", MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=")),
        pattern!(r"!", MK_DEFAULT_HANDLER!(TokenKind::Not, "!")),
        pattern!(r"=", MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=")),
        pattern!(r"<=", MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=")),
        pattern!(r"<", MK_DEFAULT_HANDLER!(TokenKind::Less, "<")),
        pattern!(r">=", MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=")),
        pattern!(r">", MK_DEFAULT_HANDLER!(TokenKind::Greater, ">")),
        pattern!(r"\|\|", MK_DEFAULT_HANDLER!(TokenKind::Or, "||")),
        pattern!(r"&&", MK_DEFAULT_HANDLER!(TokenKind::And, "&&")),
        pattern!(r"\.", MK_DEFAULT_HANDLER!(TokenKind::Dot, ".")),
        pattern!(r";", MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";")),
        pattern!(r":", MK_DEFAULT_HANDLER!(TokenKind::Colon, ":")),
        pattern!(r"\?", MK_DEFAULT_HANDLER!(TokenKind::Question, "?")),
        pattern!(r",", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        pattern!(r"\+\+", MK_DEFAULT_HANDLER!(TokenKind::PlusPlus, "++")),
        pattern!(r"--", MK_DEFAULT_HANDLER!(TokenKind::MinusMinus, "--")),
        pattern!(r"\+=", MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=")),
        pattern!(r"-=", MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=")),
        pattern!(r"\*=", MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=")),
        pattern!(r"/=", MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=")),
        pattern!(r"\+", MK_DEFAULT_HANDLER!(TokenKind::Plus, "+")),
        pattern!(r"-", MK_DEFAULT_HANDLER!(TokenKind::Dash, "-")),
        pattern!(r"/", MK_DEFAULT_HANDLER!(TokenKind::Slash, "/")),
        pattern!(r"\*", MK_DEFAULT_HANDLER!(TokenKind::Star, "*")),
    ];
}

pub struct Lexer<'a> {
    tokens: Vec<Token>,
    source: &'a str,
    pos: usize,
    line: u32,
    file: Rc<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: Rc<String>) -> Lexer<'a> {
        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            line: 1,
            file,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos as u32, self.line, Rc::clone(&self.file))
    }

    /// Moves past `n` bytes, counting the newlines crossed.
    pub fn advance_n(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        self.line += self.source[self.pos..end].matches('\n').count() as u32;
        self.pos = end;
    }

    /// Pushes a token spelled `value` at the current position and moves past it.
    pub fn push(&mut self, kind: TokenKind, value: String) {
        let start = self.position();
        let length = value.len();
        let end = Position::new((self.pos + length) as u32, self.line, Rc::clone(&self.file));
        self.tokens.push(MK_TOKEN!(kind, value, Span { start, end }));
        self.advance_n(length);
    }

    pub fn remainder(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn at(&self) -> Option<char> {
        self.remainder().chars().next()
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn skip_handler(lexer: &mut Lexer, matched: &str) {
    lexer.advance_n(matched.len());
}

fn number_handler(lexer: &mut Lexer, matched: &str) {
    lexer.push(TokenKind::Number, matched.to_string());
}

fn symbol_handler(lexer: &mut Lexer, matched: &str) {
    let kind = RESERVED_LOOKUP
        .get(matched)
        .copied()
        .unwrap_or(TokenKind::Identifier);
    lexer.push(kind, matched.to_string());
}

pub fn tokenize(source: &str, file: Rc<String>) -> Result<Vec<Token>, Error> {
    let mut lex = Lexer::new(source, file);

    while !lex.at_eof() {
        let remainder = lex.remainder();
        let matched = PATTERNS
            .iter()
            .find_map(|pattern| pattern.regex.find(remainder).map(|m| (pattern.handler, m.as_str())));

        match matched {
            Some((handler, text)) if !text.is_empty() => handler(&mut lex, text),
            _ => {
                return Err(Error::new(
                    ErrorImpl::UnrecognisedToken {
                        token: lex.at().map(String::from).unwrap_or_default(),
                    },
                    lex.position(),
                ))
            }
        }
    }

    let end = lex.position();
    lex.tokens.push(MK_TOKEN!(
        TokenKind::EOF,
        String::from("EOF"),
        Span {
            start: end.clone(),
            end
        }
    ));
    tracing::trace!(tokens = lex.tokens.len(), lines = lex.line, "tokenized source");
    Ok(lex.tokens)
}
