use crate::ast::SourceSpan;
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Numbers take priority over words and the dash rest
    #[regex(r"-?[0-9]+\.?[0-9]*([eE][+-]?[0-9]+)?", parse_number, priority = 10)]
    Number(f64),

    // Sound and note names; may embed digits, '#' and "'" for notes
    #[regex(r"[a-zA-Z][a-zA-Z0-9_'#.-]*", priority = 5)]
    Word,

    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[token(",")]
    Comma,
    #[token("|")]
    Pipe,

    #[token("@")]
    At,
    #[token("_")]
    Underscore,
    #[token("!")]
    Bang,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("%")]
    Percent,
    #[token("..")]
    DotDot,

    #[token("~")]
    Tilde,
    #[token("-")]
    Dash,

    #[regex(r"//[^\n]*")]
    Comment,

    Error,
}

fn parse_number(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Word => write!(f, "word"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Pipe => write!(f, "|"),
            Token::At => write!(f, "@"),
            Token::Underscore => write!(f, "_"),
            Token::Bang => write!(f, "!"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Percent => write!(f, "%"),
            Token::DotDot => write!(f, ".."),
            Token::Tilde => write!(f, "~"),
            Token::Dash => write!(f, "-"),
            Token::Comment => write!(f, "comment"),
            Token::Error => write!(f, "error"),
        }
    }
}

/// Lexer wrapper with one-token lookahead and byte-span tracking
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<(Token, SourceSpan)>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Lexer {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    pub fn next_token(&mut self) -> Option<(Token, SourceSpan)> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        loop {
            let token = self.inner.next()?;
            let span = SourceSpan::from(self.inner.span());
            if matches!(token, Ok(Token::Comment)) {
                continue;
            }
            return Some((token.unwrap_or(Token::Error), span));
        }
    }

    pub fn peek_token(&mut self) -> Option<(Token, SourceSpan)> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_token());
        }
        self.peeked.as_ref().and_then(|t| t.clone())
    }

    pub fn source(&self) -> &'source str {
        self.inner.source()
    }

    pub fn slice(&self, span: SourceSpan) -> &'source str {
        &self.source()[span.to_range()]
    }
}
