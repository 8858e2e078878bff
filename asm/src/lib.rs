//! Two-pass assembler core for MIPS32 source.
//!
//! Source text is split into lines of classified tokens ([`lexer`],
//! [`classify`]), rewritten and placed by the [`preproc`] pass, then data
//! is packed by the [`loader`] and instructions by the [`encoder`].
//! [`assembler::Assembler`] drives the whole run.

pub mod assembler;
pub mod classify;
pub mod config;
pub mod dump;
pub mod encoder;
pub mod error;
pub mod label;
pub mod lexer;
pub mod loader;
pub mod macros;
pub mod preproc;
pub mod program;
pub mod token;

pub use assembler::{Assembler, Assembly, Source};
pub use config::Settings;
pub use error::{Diagnostic, Diagnostics};
