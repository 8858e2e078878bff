use super::{error, expected, label_prefix_len, Preprocessor};
use crate::error::{ErrorKind, Result};
use crate::program::DataDirective;
use crate::token::{Directive, SourceLine, Token, TokenKind};

/// Whether `kind` is a value `d` can store.
fn accepts(d: Directive, kind: &TokenKind) -> bool {
    match d {
        Directive::Ascii | Directive::Asciiz => matches!(kind, TokenKind::String(_)),
        Directive::Byte | Directive::Half | Directive::Word => {
            matches!(kind, TokenKind::Integer(_) | TokenKind::Identifier(_))
        }
        Directive::Float | Directive::Double => {
            matches!(kind, TokenKind::Integer(_) | TokenKind::Real(_))
        }
        _ => false,
    }
}

fn describe(d: Directive) -> &'static str {
    match d {
        Directive::Ascii | Directive::Asciiz => "a string",
        Directive::Float | Directive::Double => "a number",
        _ => "an integer or a label",
    }
}

impl Preprocessor<'_> {
    /// Collects the values of a data directive from its own line and the
    /// continuation lines right after it: lines holding nothing but values
    /// of the same kind, optionally labeled. Returns the first line not consumed.
    pub(super) fn data(
        &mut self,
        d: Directive,
        lines: &[SourceLine],
        idx: usize,
    ) -> Result<usize> {
        let line = lines[idx].clone();
        let head = &line.tokens[0];
        if !self.segment.is_data() {
            return Err(error(ErrorKind::DataSegmentOnly(d), head, &line));
        }

        // Natural alignment, unless `.align 0` asked for packed data
        if let Some(width) = d.data_width().filter(|w| *w > 1) {
            if self.boundary.get(&self.segment) != Some(&1) {
                self.pad_to(width, head, &line)?;
                let addr = self.cursor();
                for name in std::mem::take(&mut self.pending) {
                    self.program.labels.rebind(&name, addr);
                }
            }
        }

        let start = self.cursor();
        let mut values = Vec::new();
        self.take_values(d, &line.tokens[1..], &line, &mut values)?;

        let mut next = idx + 1;
        while let Some(cont) = lines.get(next) {
            let mut cont = cont.clone();
            self.apply_eqvs(&mut cont.tokens);
            let skip = label_prefix_len(&cont.tokens);
            let values_only = skip < cont.tokens.len()
                && cont.tokens[skip..].iter().all(|t| accepts(d, &t.kind));
            if !values_only {
                break;
            }
            self.extract_labels(&mut cont)?;
            self.take_values(d, &cont.tokens, &cont, &mut values)?;
            next += 1;
        }

        if values.is_empty() {
            return Err(error(ErrorKind::EmptyDirective(d), head, &line));
        }
        log::trace!("0x{:08x}: {} with {} values", start, d, values.len());
        self.program.data_mut(self.segment).insert(
            start,
            DataDirective {
                directive: d,
                values,
                pos: head.pos.clone(),
                text: line.text.clone(),
            },
        );
        Ok(next)
    }

    fn take_values(
        &mut self,
        d: Directive,
        tokens: &[Token],
        line: &SourceLine,
        values: &mut Vec<Token>,
    ) -> Result<()> {
        for t in tokens {
            if !accepts(d, &t.kind) {
                return Err(error(expected(describe(d), t), t, line));
            }
            let size = match (&t.kind, d.data_width()) {
                (_, Some(width)) => width,
                (TokenKind::String(s), None) => {
                    s.chars().count() as u32 + u32::from(d == Directive::Asciiz)
                }
                _ => 0,
            };
            self.advance(size, t, line)?;
            values.push(t.clone());
        }
        Ok(())
    }
}
