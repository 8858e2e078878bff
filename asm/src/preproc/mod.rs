//! The single left-to-right pass over the tokenized source.
//!
//! Each line goes through label extraction, source directives (`.eqv`,
//! `.macro`, `.include`), EQV substitution, macro invocation, the remaining
//! directives and finally instruction placement. The line buffer is owned
//! here; macro expansions are spliced into it in place of the call.

mod data;
mod segment;

use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::label::Defined;
use crate::macros::Macro;
use crate::program::Program;
use crate::token::{Directive, SourceLine, Token, TokenKind};
use arch::mem::{MemoryLayout, Segment};
use std::collections::HashMap;
use std::path::Path;

/// Nesting limit for macro expansion; deeper chains are taken as recursion.
const MAX_EXPANSION_DEPTH: usize = 64;

pub struct Preprocessor<'a> {
    layout: &'a MemoryLayout,
    program: Program,
    segment: Segment,
    cursors: HashMap<Segment, u32>,
    extern_cursor: u32,
    /// Alignment set by `.align` per data segment.
    boundary: HashMap<Segment, u32>,
    /// Labels bound on the line being processed.
    pending: Vec<String>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(layout: &'a MemoryLayout) -> Self {
        use strum::IntoEnumIterator;
        Preprocessor {
            layout,
            program: Program::default(),
            segment: Segment::Text,
            cursors: Segment::iter().map(|seg| (seg, layout.base(seg))).collect(),
            extern_cursor: layout.extern_base,
            boundary: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn run(mut self, mut lines: Vec<SourceLine>, diags: &mut Diagnostics) -> Result<Program> {
        let mut idx = 0;
        while idx < lines.len() {
            idx = self.process(&mut lines, idx, diags)?;
        }
        Ok(self.program)
    }

    /// Handles the line at `idx` and returns the index of the next line to look at.
    fn process(
        &mut self,
        lines: &mut Vec<SourceLine>,
        idx: usize,
        diags: &mut Diagnostics,
    ) -> Result<usize> {
        self.pending.clear();
        log::trace!("{}:{}: {}", lines[idx].file, lines[idx].line, lines[idx].text);

        // 1. Labels
        self.extract_labels(&mut lines[idx])?;
        if lines[idx].is_empty() {
            return Ok(idx + 1);
        }

        // 2. Source directives
        if let Some(d) = lines[idx].tokens[0].directive().filter(|d| d.is_source()) {
            let line = &lines[idx];
            return match d {
                Directive::Eqv => self.define_eqv(line).map(|_| idx + 1),
                Directive::Macro => self.define_macro(lines, idx),
                Directive::Include => Err(self.include(line)),
                _ => Err(error(ErrorKind::StrayEndMacro, &line.tokens[0], line)),
            };
        }
        check_stray(&lines[idx])?;

        // 3. EQV substitution
        self.apply_eqvs(&mut lines[idx].tokens);
        self.extract_labels(&mut lines[idx])?;
        if lines[idx].is_empty() {
            return Ok(idx + 1);
        }

        // 4. Macro invocation
        if let Some((name, args)) = invocation(&lines[idx].tokens) {
            let expansion = self.expand(&name, &args, &lines[idx])?;
            lines.splice(idx..=idx, expansion);
            return Ok(idx);
        }

        // 5. Directives, 6. Instructions
        match lines[idx].tokens[0].kind.clone() {
            TokenKind::Directive(d) => self.directive(d, lines, idx),
            TokenKind::Operator(_) => {
                self.instruction(lines[idx].clone(), diags)?;
                Ok(idx + 1)
            }
            _ => {
                let line = &lines[idx];
                diags.warn(Diagnostic::warning(
                    ErrorKind::UnparsableLine,
                    line.pos(),
                    &line.text,
                ))?;
                Ok(idx + 1)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Cursors

    fn cursor(&self) -> u32 {
        self.cursors
            .get(&self.segment)
            .copied()
            .unwrap_or_else(|| self.layout.base(self.segment))
    }

    fn set_cursor(&mut self, addr: u32) {
        self.cursors.insert(self.segment, addr);
    }

    /// Moves the cursor past `size` bytes, all of which must lie in the segment.
    fn advance(&mut self, size: u32, at: &Token, line: &SourceLine) -> Result<()> {
        let cursor = self.cursor();
        let out = |addr| error(ErrorKind::AddressOutOfSegment(addr, self.segment), at, line);
        let next = cursor.checked_add(size).ok_or_else(|| out(cursor))?;
        if size > 0 && !self.layout.contains(self.segment, next - 1) {
            return Err(out(next - 1));
        }
        self.set_cursor(next);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Labels

    fn extract_labels(&mut self, line: &mut SourceLine) -> Result<()> {
        while let Some(name) = line.leading_label().map(str::to_string) {
            self.define_label(&name, &line.tokens[0], line)?;
            line.tokens.drain(..2);
        }
        Ok(())
    }

    fn define_label(&mut self, name: &str, at: &Token, line: &SourceLine) -> Result<()> {
        if self.program.eqvs.contains_key(name) {
            return Err(error(ErrorKind::NamespaceClash(name.to_string()), at, line));
        }
        let addr = self.cursor();
        match self.program.labels.define(name, addr) {
            Defined::Redefined(_) => Err(error(
                ErrorKind::LabelRedefinition(name.to_string()),
                at,
                line,
            )),
            _ => {
                log::debug!("label {} = 0x{:08x}", name, addr);
                self.pending.push(name.to_string());
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // .eqv

    fn define_eqv(&mut self, line: &SourceLine) -> Result<()> {
        let head = &line.tokens[0];
        let name_tok = line.tokens.get(1).ok_or_else(|| {
            error(ErrorKind::MissingOperand("a name".into()), head, line)
        })?;
        let name = name_tok.ident().ok_or_else(|| {
            error(expected("an identifier", name_tok), name_tok, line)
        })?;
        let body = &line.tokens[2..];
        if body.is_empty() {
            return Err(error(ErrorKind::MissingOperand("a value".into()), name_tok, line));
        }
        if self.program.eqvs.contains_key(name) {
            return Err(error(ErrorKind::EqvRedefinition(name.to_string()), name_tok, line));
        }
        if self.program.labels.contains(name) || self.program.macros.contains(name, 0) {
            return Err(error(ErrorKind::NamespaceClash(name.to_string()), name_tok, line));
        }
        if let Some((t, d)) = find_source_directive(body) {
            return Err(error(ErrorKind::DirectiveInBody(d, Directive::Eqv), t, line));
        }
        let mut value = body.to_vec();
        self.apply_eqvs(&mut value);
        log::debug!("eqv {} defined", name);
        self.program.eqvs.insert(name.to_string(), value);
        Ok(())
    }

    fn apply_eqvs(&self, tokens: &mut Vec<Token>) {
        if self.program.eqvs.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens.drain(..) {
            let value = token.ident().and_then(|name| self.program.eqvs.get(name));
            match value {
                Some(value) => out.extend(
                    value
                        .iter()
                        .map(|v| Token::new(v.kind.clone(), token.pos.clone())),
                ),
                None => out.push(token),
            }
        }
        *tokens = out;
    }

    // ------------------------------------------------------------------------
    // .macro

    /// Records the body up to `.end_macro`; returns the line after it.
    fn define_macro(&mut self, lines: &mut Vec<SourceLine>, idx: usize) -> Result<usize> {
        let header = lines[idx].clone();
        let mut mac = parse_signature(&header)?;
        if self.program.macros.contains(&mac.name, mac.arity()) {
            return Err(Diagnostic::error(
                ErrorKind::MacroRedefinition(mac.name.clone(), mac.arity()),
                mac.pos.clone(),
                &header.text,
            ));
        }
        if mac.arity() == 0 && self.program.eqvs.contains_key(&mac.name) {
            return Err(Diagnostic::error(
                ErrorKind::NamespaceClash(mac.name.clone()),
                mac.pos.clone(),
                &header.text,
            ));
        }

        let mut j = idx + 1;
        loop {
            let Some(line) = lines.get(j) else {
                return Err(Diagnostic::error(
                    ErrorKind::UnterminatedMacro(mac.name.clone()),
                    mac.pos.clone(),
                    &header.text,
                ));
            };
            let mut line = line.clone();
            let skip = label_prefix_len(&line.tokens);

            if line.tokens.get(skip).and_then(Token::directive) == Some(Directive::EndMacro) {
                if let Some(extra) = line.tokens.get(skip + 1) {
                    return Err(error(ErrorKind::ExtraOperand(extra.kind.to_string()), extra, &line));
                }
                if skip > 0 {
                    line.tokens.truncate(skip);
                    mac.push_line(line);
                }
                break;
            }
            if let Some((t, d)) = find_source_directive(&line.tokens) {
                return Err(error(ErrorKind::DirectiveInBody(d, Directive::Macro), t, &line));
            }

            self.apply_eqvs(&mut line.tokens);
            let skip = label_prefix_len(&line.tokens);
            if let Some((name, args)) = invocation(&line.tokens[skip..]) {
                let mut expansion = self.expand(&name, &args, &line)?;
                if skip > 0 {
                    let mut labels = line.clone();
                    labels.tokens.truncate(skip);
                    expansion.insert(0, labels);
                }
                // Rescan the spliced lines so their labels become locals
                lines.splice(j..=j, expansion);
                continue;
            }

            mac.push_line(line);
            j += 1;
        }

        if let Some((line, t)) = mac.undefined_param() {
            let name = match &t.kind {
                TokenKind::MacroParameter(name) => name.clone(),
                kind => kind.to_string(),
            };
            return Err(error(ErrorKind::UndefinedParameter(name), t, line));
        }
        self.program.macros.insert(mac);
        Ok(j + 1)
    }

    fn expand(&mut self, name: &str, args: &[Token], line: &SourceLine) -> Result<Vec<SourceLine>> {
        if line.depth >= MAX_EXPANSION_DEPTH {
            return Err(Diagnostic::error(
                ErrorKind::ExpansionDepth(name.to_string(), MAX_EXPANSION_DEPTH),
                line.pos(),
                &line.text,
            ));
        }
        match self.program.macros.get_mut(name, args.len()) {
            Some(mac) => {
                let mut expansion = mac.expand(args);
                for body in &mut expansion {
                    body.depth = line.depth + 1;
                }
                Ok(expansion)
            }
            None => Err(Diagnostic::error(
                ErrorKind::UnknownMacro(name.to_string(), args.len()),
                line.pos(),
                &line.text,
            )),
        }
    }

    // ------------------------------------------------------------------------
    // .include

    /// Reads the file, then refuses: inclusion is not supported.
    fn include(&self, line: &SourceLine) -> Diagnostic {
        let head = &line.tokens[0];
        let path = match line.tokens.get(1) {
            Some(Token {
                kind: TokenKind::String(path),
                ..
            }) => path,
            Some(t) => return error(expected("a file name string", t), t, line),
            None => return error(ErrorKind::MissingOperand("a file name".into()), head, line),
        };
        if let Some(extra) = line.tokens.get(2) {
            return error(ErrorKind::ExtraOperand(extra.kind.to_string()), extra, line);
        }
        let full = Path::new(&*line.file)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(path);
        match std::fs::read_to_string(&full) {
            Err(e) => error(
                ErrorKind::FileRead(full.display().to_string(), e.to_string()),
                head,
                line,
            ),
            Ok(_) => error(ErrorKind::NotImplemented(".include".into()), head, line),
        }
    }

    // ------------------------------------------------------------------------
    // Instructions

    fn instruction(&mut self, line: SourceLine, diags: &mut Diagnostics) -> Result<()> {
        let seg = self.segment;
        if seg.is_data() {
            diags.warn(Diagnostic::warning(
                ErrorKind::InstructionInData(seg),
                line.pos(),
                &line.text,
            ))?;
            self.pad_to(4, &line.tokens[0], &line)?;
            let addr = self.cursor();
            for name in std::mem::take(&mut self.pending) {
                self.program.labels.rebind(&name, addr);
            }
        }
        let addr = self.cursor();
        if self.program.code(seg).contains_key(&addr) {
            return Err(Diagnostic::error(
                ErrorKind::InstructionOverwrite(addr),
                line.pos(),
                &line.text,
            ));
        }
        log::trace!("0x{:08x}: {}", addr, line.text.trim());
        self.advance(4, &line.tokens[0], &line)?;
        self.program.code_mut(seg).insert(addr, line);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn error(kind: ErrorKind, at: &Token, line: &SourceLine) -> Diagnostic {
    Diagnostic::error(kind, at.pos.clone(), &line.text)
}

fn expected(what: &str, found: &Token) -> ErrorKind {
    ErrorKind::Expected {
        expected: what.to_string(),
        found: found.kind.to_string(),
    }
}

fn find_source_directive(tokens: &[Token]) -> Option<(&Token, Directive)> {
    tokens
        .iter()
        .find_map(|t| t.directive().filter(|d| d.is_source()).map(|d| (t, d)))
}

/// A source directive that is not the first token of its line.
fn check_stray(line: &SourceLine) -> Result<()> {
    match find_source_directive(&line.tokens) {
        Some((t, d)) => Err(error(ErrorKind::StrayDirective(d), t, line)),
        None => Ok(()),
    }
}

/// Number of tokens taken by leading `name:` pairs.
fn label_prefix_len(tokens: &[Token]) -> usize {
    let mut n = 0;
    while tokens.get(n).and_then(Token::ident).is_some()
        && tokens.get(n + 1).is_some_and(|t| t.kind == TokenKind::Colon)
    {
        n += 2;
    }
    n
}

fn is_macro_arg(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Identifier(_)
            | TokenKind::Register(_)
            | TokenKind::FloatRegister(_)
            | TokenKind::Integer(_)
            | TokenKind::Real(_)
            | TokenKind::String(_)
            | TokenKind::Operator(_)
            | TokenKind::MacroParameter(_)
    )
}

/// `name(arg, ...)` with single-token arguments.
fn invocation(tokens: &[Token]) -> Option<(String, Vec<Token>)> {
    let [first, open, rest @ ..] = tokens else {
        return None;
    };
    let name = first.ident()?;
    if open.kind != TokenKind::LeftParen {
        return None;
    }
    let (close, args) = rest.split_last()?;
    if close.kind != TokenKind::RightParen || !args.iter().all(is_macro_arg) {
        return None;
    }
    Some((name.to_string(), args.to_vec()))
}

/// `.macro name(%a, %b)`; the parentheses are required even without parameters.
fn parse_signature(line: &SourceLine) -> Result<Macro> {
    let bad = |t: &Token| {
        error(
            ErrorKind::MacroSignature(line.text.trim().to_string()),
            t,
            line,
        )
    };
    let head = &line.tokens[0];
    let name_tok = line.tokens.get(1).ok_or_else(|| bad(head))?;
    let name = name_tok.ident().ok_or_else(|| bad(name_tok))?;
    match line.tokens.get(2) {
        Some(t) if t.kind == TokenKind::LeftParen => {}
        Some(t) => return Err(bad(t)),
        None => return Err(bad(name_tok)),
    }

    let mut params: Vec<String> = Vec::new();
    let mut rest = line.tokens[3..].iter();
    loop {
        match rest.next() {
            Some(Token {
                kind: TokenKind::MacroParameter(p),
                ..
            }) if params.contains(p) => {
                let t = &line.tokens[3 + params.len()];
                return Err(error(ErrorKind::DuplicateParameter(p.clone()), t, line));
            }
            Some(Token {
                kind: TokenKind::MacroParameter(p),
                ..
            }) => params.push(p.clone()),
            Some(t) if t.kind == TokenKind::RightParen => break,
            Some(t) => return Err(bad(t)),
            None => return Err(bad(name_tok)),
        }
    }
    if let Some(t) = rest.next() {
        return Err(bad(t));
    }
    Ok(Macro::new(name, params, name_tok.pos.clone()))
}

#[cfg(test)]
mod tests;
