use crate::token::{Directive, Pos};
use arch::mem::{MemError, Segment};
use color_print::{ceprintln, cformat};
use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Category {
    Lexical,
    Syntactic,
    Semantic,
    Range,
    Segment,
    Resource,
    NotImplemented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexical
    #[error("Malformed character literal: {0}")]
    MalformedChar(String),

    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Malformed string literal: invalid escape `\\{0}`")]
    MalformedString(char),

    #[error("Malformed token: `{0}`")]
    MalformedToken(String),

    #[error("Character literal value {0} exceeds 8 bits, truncated to {1}")]
    CharTruncated(u32, u8),

    // Syntactic
    #[error("Expected {expected}, found `{found}`")]
    Expected { expected: String, found: String },

    #[error("More operands required: expected {0}")]
    MissingOperand(String),

    #[error("Extra operand: `{0}`")]
    ExtraOperand(String),

    #[error("Invalid macro signature: {0}")]
    MacroSignature(String),

    #[error("Duplicate macro parameter `%{0}`")]
    DuplicateParameter(String),

    #[error("Undefined macro parameter `%{0}`")]
    UndefinedParameter(String),

    #[error("`.align` operand must be 0, 1, 2 or 3, found {0}")]
    AlignRange(i32),

    #[error("`{0}` requires at least one value")]
    EmptyDirective(Directive),

    // Semantic
    #[error("Label `{0}` is already defined")]
    LabelRedefinition(String),

    #[error("`{0}` is already defined by `.eqv`")]
    EqvRedefinition(String),

    #[error("Macro `{0}` with {1} parameters is already defined")]
    MacroRedefinition(String, usize),

    #[error("`{0}` is used both as a label and an `.eqv` name")]
    NamespaceClash(String),

    #[error("Undefined label: `{0}`")]
    UndefinedLabel(String),

    #[error("Unknown macro signature: `{0}` with {1} arguments")]
    UnknownMacro(String, usize),

    #[error("`{0}` is only allowed at the beginning of a line")]
    StrayDirective(Directive),

    #[error("`{0}` is not allowed inside a `{1}` body")]
    DirectiveInBody(Directive, Directive),

    #[error("Macro `{0}` is missing its `.end_macro`")]
    UnterminatedMacro(String),

    #[error("Macro `{0}` nests deeper than {1} expansions")]
    ExpansionDepth(String, usize),

    #[error("`.end_macro` without a matching `.macro`")]
    StrayEndMacro,

    // Range
    #[error("Value {value} does not fit in {bits} bits and was truncated")]
    Truncated { value: i64, bits: u8 },

    #[error("Branch target 0x{0:08x} is out of range, offset truncated")]
    BranchRange(u32),

    #[error("Jump target 0x{0:08x} is outside the current 256MB region, truncated")]
    JumpRange(u32),

    #[error("Value {0} is out of range for `{1}`")]
    DataRange(i32, Directive),

    #[error("Label `{0}` used as an immediate value (address 0x{1:08x})")]
    LabelAsImmediate(String, u32),

    #[error("Character `{0}` cannot be encoded in a single byte, replaced with `?`")]
    Unmappable(char),

    // Segment
    #[error("`{0}` is only allowed in a data segment")]
    DataSegmentOnly(Directive),

    #[error("Instruction placed in data segment `{0}`")]
    InstructionInData(Segment),

    #[error("Address 0x{0:08x} is outside the `{1}` segment")]
    AddressOutOfSegment(u32, Segment),

    #[error("Instruction at 0x{0:08x} overwrites an earlier instruction")]
    InstructionOverwrite(u32),

    #[error("Address 0x{0:08x} is not word aligned")]
    Misaligned(u32),

    #[error("Memory write failed: {0}")]
    Memory(#[from] MemError),

    // Resource
    #[error("Extern area exhausted: cannot allocate {0} bytes for `{1}`")]
    ExternExhausted(i32, String),

    #[error("Failed to read file: {0}: {1}")]
    FileRead(String, String),

    #[error("{0} is not implemented")]
    NotImplemented(String),

    #[error("Unparsable line dropped")]
    UnparsableLine,
}

impl ErrorKind {
    pub fn category(&self) -> Category {
        use ErrorKind::*;
        match self {
            MalformedChar(_) | UnterminatedString | MalformedString(_) | MalformedToken(_)
            | CharTruncated(..) => Category::Lexical,
            Expected { .. } | MissingOperand(_) | ExtraOperand(_) | MacroSignature(_)
            | DuplicateParameter(_) | UndefinedParameter(_) | AlignRange(_)
            | EmptyDirective(_) | UnparsableLine => Category::Syntactic,
            LabelRedefinition(_) | EqvRedefinition(_) | MacroRedefinition(..)
            | NamespaceClash(_) | UndefinedLabel(_) | UnknownMacro(..) | StrayDirective(_)
            | DirectiveInBody(..) | UnterminatedMacro(_) | StrayEndMacro | ExpansionDepth(..) => {
                Category::Semantic
            }
            Truncated { .. } | BranchRange(_) | JumpRange(_) | DataRange(..)
            | LabelAsImmediate(..) | Unmappable(_) => Category::Range,
            DataSegmentOnly(_) | InstructionInData(_) | AddressOutOfSegment(..)
            | InstructionOverwrite(_) | Misaligned(_) | Memory(_) => Category::Segment,
            ExternExhausted(..) | FileRead(..) => Category::Resource,
            NotImplemented(_) => Category::NotImplemented,
        }
    }
}

/// One located error or warning.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{pos}: {severity}: {kind}")]
pub struct Diagnostic {
    pub pos: Pos,
    pub text: String,
    pub severity: Severity,
    pub kind: ErrorKind,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, pos: Pos, text: &str) -> Self {
        Diagnostic {
            pos,
            text: text.to_string(),
            severity: Severity::Error,
            kind,
        }
    }

    pub fn warning(kind: ErrorKind, pos: Pos, text: &str) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(kind, pos, text)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Print with the file location, the offending line and a caret under the column.
    pub fn print_diag(&self) {
        match self.severity {
            Severity::Error => ceprintln!("<red,bold>error</>: {}", self.kind),
            Severity::Warning => ceprintln!("<yellow,bold>warning</>: {}", self.kind),
        }
        ceprintln!(
            "     <blue>--></> <underline>{}:{}:{}</>",
            self.pos.file,
            self.pos.line,
            self.pos.col
        );
        ceprintln!("      <blue>|</>");
        ceprintln!(" <blue>{:>4} |</> {}", self.pos.line, self.text);
        let caret = cformat!("<red,bold>^</>");
        ceprintln!(
            "      <blue>|</> {}{}",
            " ".repeat(self.pos.col.saturating_sub(1)),
            caret
        );
    }
}

pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Diagnostics gathered over one assembly run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
    warnings_are_errors: bool,
}

impl Diagnostics {
    pub fn new(warnings_are_errors: bool) -> Self {
        Diagnostics {
            list: Vec::new(),
            warnings_are_errors,
        }
    }

    /// Records a warning, or hands it back as a fatal error when warnings are errors.
    pub fn warn(&mut self, diag: Diagnostic) -> Result<()> {
        if self.warnings_are_errors {
            return Err(Diagnostic {
                severity: Severity::Error,
                ..diag
            });
        }
        log::debug!("warning at {}: {}", diag.pos, diag.kind);
        self.list.push(diag);
        Ok(())
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.list.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.list.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn print_diag(&self) {
        for diag in &self.list {
            diag.print_diag();
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for diag in &self.list {
            writeln!(f, "{}", diag)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
