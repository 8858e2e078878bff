use crate::label::Labels;
use crate::macros::Macros;
use crate::token::{Directive, Pos, SourceLine, Token, TokenKind};
use arch::mem::Segment;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// One data directive, possibly gathered from several source lines.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDirective {
    pub directive: Directive,
    pub values: Vec<Token>,
    pub pos: Pos,
    pub text: String,
}

impl DataDirective {
    /// Bytes the values occupy in memory.
    pub fn size(&self) -> u32 {
        if self.directive == Directive::Space {
            return self
                .values
                .iter()
                .map(|v| match v.kind {
                    TokenKind::Integer(n) => n as u32,
                    _ => 0,
                })
                .sum();
        }
        match self.directive.data_width() {
            Some(width) => width * self.values.len() as u32,
            None => self
                .values
                .iter()
                .map(|v| match &v.kind {
                    TokenKind::String(s) => {
                        let nul = u32::from(self.directive == Directive::Asciiz);
                        s.chars().count() as u32 + nul
                    }
                    _ => 0,
                })
                .sum(),
        }
    }
}

/// Output of the preprocessor: the symbol tables plus what lands where.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub eqvs: IndexMap<String, Vec<Token>>,
    pub macros: Macros,
    pub labels: Labels,
    pub text: BTreeMap<u32, SourceLine>,
    pub ktext: BTreeMap<u32, SourceLine>,
    pub data: BTreeMap<u32, DataDirective>,
    pub kdata: BTreeMap<u32, DataDirective>,
}

impl Program {
    /// Instruction map that `seg` places instructions into.
    pub fn code(&self, seg: Segment) -> &BTreeMap<u32, SourceLine> {
        match seg {
            Segment::Text | Segment::Data => &self.text,
            Segment::KText | Segment::KData => &self.ktext,
        }
    }

    pub fn code_mut(&mut self, seg: Segment) -> &mut BTreeMap<u32, SourceLine> {
        match seg {
            Segment::Text | Segment::Data => &mut self.text,
            Segment::KText | Segment::KData => &mut self.ktext,
        }
    }

    pub fn data_mut(&mut self, seg: Segment) -> &mut BTreeMap<u32, DataDirective> {
        match seg {
            Segment::Text | Segment::Data => &mut self.data,
            Segment::KText | Segment::KData => &mut self.kdata,
        }
    }

    /// Every instruction in address order, user code first.
    pub fn instructions(&self) -> impl Iterator<Item = (&u32, &SourceLine)> {
        self.text.iter().chain(self.ktext.iter())
    }

    pub fn data_directives(&self) -> impl Iterator<Item = (&u32, &DataDirective)> {
        self.data.iter().chain(self.kdata.iter())
    }
}
