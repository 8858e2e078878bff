use arch::reg::{FReg, Reg};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};

/// Source provenance of a token or line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    pub file: Arc<str>,
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(file: &Arc<str>, line: usize, col: usize) -> Self {
        Self {
            file: Arc::clone(file),
            line,
            col,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Directive {
    #[strum(serialize = ".eqv")]
    Eqv,
    #[strum(serialize = ".macro")]
    Macro,
    #[strum(serialize = ".end_macro")]
    EndMacro,
    #[strum(serialize = ".include")]
    Include,
    #[strum(serialize = ".globl")]
    Globl,
    #[strum(serialize = ".extern")]
    Extern,
    #[strum(serialize = ".align")]
    Align,
    #[strum(serialize = ".space")]
    Space,
    #[strum(serialize = ".text")]
    Text,
    #[strum(serialize = ".data")]
    Data,
    #[strum(serialize = ".ktext")]
    KText,
    #[strum(serialize = ".kdata")]
    KData,
    #[strum(serialize = ".ascii")]
    Ascii,
    #[strum(serialize = ".asciiz")]
    Asciiz,
    #[strum(serialize = ".byte")]
    Byte,
    #[strum(serialize = ".half")]
    Half,
    #[strum(serialize = ".word")]
    Word,
    #[strum(serialize = ".float")]
    Float,
    #[strum(serialize = ".double")]
    Double,
}

impl Directive {
    /// Directives consumed by the preprocessor before anything else sees the line.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            Directive::Eqv | Directive::Macro | Directive::EndMacro | Directive::Include
        )
    }

    pub fn is_data(self) -> bool {
        self.data_width().is_some() || matches!(self, Directive::Ascii | Directive::Asciiz)
    }

    /// Bytes per element for the fixed-width data directives.
    pub fn data_width(self) -> Option<u32> {
        match self {
            Directive::Byte => Some(1),
            Directive::Half => Some(2),
            Directive::Word | Directive::Float => Some(4),
            Directive::Double => Some(8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Register(Reg),
    FloatRegister(FReg),
    Integer(i32),
    Real(f64),
    String(String),
    Operator(String),
    Directive(Directive),
    MacroParameter(String),
    Colon,
    LeftParen,
    RightParen,
    Plus,
    Minus,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Register(reg) => write!(f, "{}", reg),
            TokenKind::FloatRegister(reg) => write!(f, "{}", reg),
            TokenKind::Integer(v) => write!(f, "{}", v),
            TokenKind::Real(v) => write!(f, "{}", v),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::Directive(d) => write!(f, "{}", d),
            TokenKind::MacroParameter(name) => write!(f, "%{}", name),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Token { kind, pos }
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn directive(&self) -> Option<Directive> {
        match self.kind {
            TokenKind::Directive(d) => Some(d),
            _ => None,
        }
    }
}

/// One line of source with its (rewritable) token sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub file: Arc<str>,
    pub line: usize,
    pub text: String,
    pub tokens: Vec<Token>,
    /// Macro expansion nesting; 0 for lines read from a file.
    pub depth: usize,
}

impl SourceLine {
    pub fn pos(&self) -> Pos {
        let col = self.tokens.first().map_or(1, |t| t.pos.col);
        Pos::new(&self.file, self.line, col)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `name:` at the head of the line.
    pub fn leading_label(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [first, second, ..] if second.kind == TokenKind::Colon => first.ident(),
            _ => None,
        }
    }
}
