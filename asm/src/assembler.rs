use crate::classify::Classifier;
use crate::config::Settings;
use crate::encoder;
use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::lexer::Lexer;
use crate::loader;
use crate::preproc::Preprocessor;
use crate::program::Program;
use crate::token::{Pos, SourceLine};
use arch::mem::Memory;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                ErrorKind::FileRead(name.clone(), e.to_string()),
                Pos::new(&Arc::from(name.as_str()), 0, 0),
                "",
            )
        })?;
        Ok(Source { name, text })
    }
}

/// A finished run: the program, the encoded words and the warnings raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub program: Program,
    pub words: BTreeMap<u32, u32>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    settings: Settings,
}

impl Assembler {
    pub fn new(settings: Settings) -> Self {
        Assembler { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Assembles `sources` as one program and writes the result into `mem`.
    ///
    /// Stops at the first fatal diagnostic; the error list then holds the
    /// warnings raised so far followed by that error.
    pub fn assemble<M: Memory>(
        &self,
        sources: &[Source],
        mem: &mut M,
    ) -> std::result::Result<Assembly, Diagnostics> {
        let mut diags = Diagnostics::new(self.settings.warnings_are_errors);
        match self.run(sources, mem, &mut diags) {
            Ok((program, words)) => Ok(Assembly {
                program,
                words,
                diagnostics: diags,
            }),
            Err(fatal) => {
                log::info!("assembly aborted: {}", fatal);
                diags.push(fatal);
                Err(diags)
            }
        }
    }

    /// Tokenizes every source, keeping each file's name on its lines.
    pub fn tokenize(&self, sources: &[Source], diags: &mut Diagnostics) -> Result<Vec<SourceLine>> {
        let classifier = Classifier::new(self.settings.extended);
        let mut lines = Vec::new();
        for source in sources {
            log::info!("tokenizing {}", source.name);
            lines.extend(Lexer::new(&source.name, &source.text, classifier).parse(diags)?);
        }
        Ok(lines)
    }

    fn run<M: Memory>(
        &self,
        sources: &[Source],
        mem: &mut M,
        diags: &mut Diagnostics,
    ) -> Result<(Program, BTreeMap<u32, u32>)> {
        let lines = self.tokenize(sources, diags)?;

        log::info!("preprocessing {} lines", lines.len());
        let program = Preprocessor::new(&self.settings.layout).run(lines, diags)?;

        log::info!(
            "loading {} data directives",
            program.data.len() + program.kdata.len()
        );
        loader::load(&program, mem, diags)?;

        log::info!(
            "encoding {} instructions",
            program.text.len() + program.ktext.len()
        );
        let mut words = BTreeMap::new();
        for (addr, line) in program.instructions() {
            let word = encoder::encode(line, *addr, &program.labels, diags)?;
            mem.write_word(*addr, word)
                .map_err(|e| Diagnostic::error(e.into(), line.pos(), &line.text))?;
            words.insert(*addr, word);
        }
        Ok((program, words))
    }
}
