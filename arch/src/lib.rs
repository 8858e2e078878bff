//! Read-only catalogs for the MIPS32 target: registers, instructions and
//! the memory layout the assembler writes into.

pub mod inst;
pub mod mem;
pub mod reg;
