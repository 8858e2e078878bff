use super::{error, expected, Preprocessor};
use crate::error::{ErrorKind, Result};
use crate::label::Defined;
use crate::program::DataDirective;
use crate::token::{Directive, SourceLine, Token, TokenKind};
use arch::mem::Segment;

impl Preprocessor<'_> {
    /// Dispatches a line that starts with a non-source directive.
    pub(super) fn directive(
        &mut self,
        d: Directive,
        lines: &[SourceLine],
        idx: usize,
    ) -> Result<usize> {
        let line = &lines[idx];
        match d {
            Directive::Globl => self.globl(line)?,
            Directive::Extern => self.extern_(line)?,
            Directive::Text | Directive::Data | Directive::KText | Directive::KData => {
                self.switch_segment(d, line)?
            }
            Directive::Align => self.align(line)?,
            Directive::Space => self.space(line)?,
            Directive::Ascii
            | Directive::Asciiz
            | Directive::Byte
            | Directive::Half
            | Directive::Word
            | Directive::Float
            | Directive::Double => return self.data(d, lines, idx),
            Directive::Eqv | Directive::Macro | Directive::EndMacro | Directive::Include => {
                return Err(error(ErrorKind::StrayDirective(d), &line.tokens[0], line))
            }
        }
        Ok(idx + 1)
    }

    fn globl(&mut self, line: &SourceLine) -> Result<()> {
        let names = &line.tokens[1..];
        if names.is_empty() {
            return Err(error(
                ErrorKind::MissingOperand("a label name".into()),
                &line.tokens[0],
                line,
            ));
        }
        for t in names {
            let name = t
                .ident()
                .ok_or_else(|| error(expected("a label name", t), t, line))?;
            if self.program.eqvs.contains_key(name) {
                return Err(error(ErrorKind::NamespaceClash(name.to_string()), t, line));
            }
            self.program.labels.declare_global(name);
        }
        Ok(())
    }

    /// `.extern name size` takes `size` bytes from the extern area.
    fn extern_(&mut self, line: &SourceLine) -> Result<()> {
        let head = &line.tokens[0];
        let (name_tok, size_tok) = match &line.tokens[1..] {
            [name, size] => (name, size),
            [_, _, extra, ..] => {
                return Err(error(ErrorKind::ExtraOperand(extra.kind.to_string()), extra, line))
            }
            _ => {
                return Err(error(
                    ErrorKind::MissingOperand("a label name and a size".into()),
                    head,
                    line,
                ))
            }
        };
        let name = name_tok
            .ident()
            .ok_or_else(|| error(expected("a label name", name_tok), name_tok, line))?;
        let size = match size_tok.kind {
            TokenKind::Integer(size) => size,
            _ => return Err(error(expected("a byte count", size_tok), size_tok, line)),
        };
        if self.program.eqvs.contains_key(name) {
            return Err(error(ErrorKind::NamespaceClash(name.to_string()), name_tok, line));
        }

        let addr = self.extern_cursor;
        let end = addr.checked_add(size.max(0) as u32);
        let fits = match end {
            Some(end) if size > 0 => self.layout.in_extern(end - 1),
            Some(_) => size == 0,
            None => false,
        };
        if !fits {
            return Err(error(
                ErrorKind::ExternExhausted(size, name.to_string()),
                size_tok,
                line,
            ));
        }
        if let Defined::Redefined(_) = self.program.labels.define_extern(name, addr) {
            return Err(error(
                ErrorKind::LabelRedefinition(name.to_string()),
                name_tok,
                line,
            ));
        }
        log::debug!("extern {} = 0x{:08x} ({} bytes)", name, addr, size);
        self.extern_cursor = addr + size as u32;
        Ok(())
    }

    /// `.text`, `.data`, `.ktext`, `.kdata`, each with an optional start address.
    fn switch_segment(&mut self, d: Directive, line: &SourceLine) -> Result<()> {
        let seg = match d {
            Directive::Text => Segment::Text,
            Directive::Data => Segment::Data,
            Directive::KText => Segment::KText,
            _ => Segment::KData,
        };
        let addr = match line.tokens.get(1) {
            None => None,
            Some(Token {
                kind: TokenKind::Integer(addr),
                ..
            }) => Some(*addr as u32),
            Some(t) => return Err(error(expected("an address", t), t, line)),
        };
        if let Some(extra) = line.tokens.get(2) {
            return Err(error(ErrorKind::ExtraOperand(extra.kind.to_string()), extra, line));
        }

        self.segment = seg;
        if let Some(addr) = addr {
            let at = &line.tokens[1];
            if !self.layout.contains(seg, addr) {
                return Err(error(ErrorKind::AddressOutOfSegment(addr, seg), at, line));
            }
            if !seg.is_data() && addr % 4 != 0 {
                return Err(error(ErrorKind::Misaligned(addr), at, line));
            }
            self.set_cursor(addr);
        }
        log::debug!("switched to {} at 0x{:08x}", seg, self.cursor());
        Ok(())
    }

    fn require_data_segment(&self, d: Directive, line: &SourceLine) -> Result<()> {
        if self.segment.is_data() {
            Ok(())
        } else {
            Err(error(ErrorKind::DataSegmentOnly(d), &line.tokens[0], line))
        }
    }

    /// The single non-negative integer operand of `.align` / `.space`.
    fn count_operand(line: &SourceLine) -> Result<(i32, &Token)> {
        let head = &line.tokens[0];
        match &line.tokens[1..] {
            [t] => match t.kind {
                TokenKind::Integer(n) => Ok((n, t)),
                _ => Err(error(expected("an integer", t), t, line)),
            },
            [] => Err(error(ErrorKind::MissingOperand("an integer".into()), head, line)),
            [_, extra, ..] => Err(error(
                ErrorKind::ExtraOperand(extra.kind.to_string()),
                extra,
                line,
            )),
        }
    }

    /// `.align n` pads to a `2^n` byte boundary. `.align 0` turns off
    /// automatic alignment of the following data directives.
    fn align(&mut self, line: &SourceLine) -> Result<()> {
        self.require_data_segment(Directive::Align, line)?;
        let (n, at) = Self::count_operand(line)?;
        if !(0..=3).contains(&n) {
            return Err(error(ErrorKind::AlignRange(n), at, line));
        }
        let boundary = 1u32 << n;
        self.boundary.insert(self.segment, boundary);
        self.pad_to(boundary, at, line)
    }

    fn space(&mut self, line: &SourceLine) -> Result<()> {
        self.require_data_segment(Directive::Space, line)?;
        let (n, at) = Self::count_operand(line)?;
        if n < 0 {
            return Err(error(expected("a non-negative size", at), at, line));
        }
        self.zero_fill(n as u32, at, line)
    }

    /// Zero pads the cursor up to `boundary`; nothing happens when already aligned.
    pub(super) fn pad_to(&mut self, boundary: u32, at: &Token, line: &SourceLine) -> Result<()> {
        let cursor = self.cursor();
        let pad = (boundary - cursor % boundary) % boundary;
        self.zero_fill(pad, at, line)
    }

    /// Records `size` zero bytes as a `.space` directive at the cursor.
    fn zero_fill(&mut self, size: u32, at: &Token, line: &SourceLine) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let addr = self.cursor();
        self.advance(size, at, line)?;
        let length = Token::new(TokenKind::Integer(size as i32), at.pos.clone());
        self.program.data_mut(self.segment).insert(
            addr,
            DataDirective {
                directive: Directive::Space,
                values: vec![length],
                pos: at.pos.clone(),
                text: line.text.clone(),
            },
        );
        Ok(())
    }
}
