use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("const", TokenKind::Const);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("while", TokenKind::While);
        map.insert("do", TokenKind::Do);
        map.insert("for", TokenKind::For);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("return", TokenKind::Return);
        map.insert("discard", TokenKind::Discard);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("struct", TokenKind::Struct);
        map.insert("precision", TokenKind::Precision);

        for name in ["lowp", "mediump", "highp"] {
            map.insert(name, TokenKind::PrecisionQualifier);
        }
        for name in ["uniform", "attribute", "varying", "invariant"] {
            map.insert(name, TokenKind::StorageQualifier);
        }
        for name in ["in", "out", "inout"] {
            map.insert(name, TokenKind::ParameterQualifier);
        }
        for name in [
            "void", "bool", "int", "float", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4",
            "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4",
        ] {
            map.insert(name, TokenKind::Type);
        }
        for name in ["sampler2D", "samplerCube"] {
            map.insert(name, TokenKind::Sampler);
        }
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Number,
    Identifier,
    /// A built-in type name such as `vec3`.
    Type,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment, // =
    Equals,     // ==
    Not,        // !
    NotEquals,  // !=

    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    Or,
    And,

    Dot,
    Semicolon,
    Colon,
    Question,
    Comma,

    PlusPlus,
    MinusMinus,
    PlusEquals,
    MinusEquals,
    SlashEquals,
    StarEquals,

    Plus,
    Dash,
    Slash,
    Star,

    // Reserved
    Const,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Return,
    Discard,
    True,
    False,
    Struct,
    Precision,
    PrecisionQualifier,
    StorageQualifier,
    ParameterQualifier,
    Sampler,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind, self.value)
    }
}

impl Token {
    pub fn is_one_of(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }
}
