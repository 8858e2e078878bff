use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::label::Labels;
use crate::program::{DataDirective, Program};
use crate::token::{Directive, Token, TokenKind};
use arch::mem::Memory;

/// Writes every data directive of `program` into `mem`.
pub fn load(program: &Program, mem: &mut impl Memory, diags: &mut Diagnostics) -> Result<()> {
    for (addr, data) in program.data_directives() {
        let bytes = pack(data, &program.labels, diags)?;
        log::trace!("0x{:08x}: {} bytes of {}", addr, bytes.len(), data.directive);
        mem.write_bytes(*addr, &bytes)
            .map_err(|e| Diagnostic::error(e.into(), data.pos.clone(), &data.text))?;
    }
    Ok(())
}

/// Little-endian image of one directive's values.
pub fn pack(data: &DataDirective, labels: &Labels, diags: &mut Diagnostics) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(data.size() as usize);
    match data.directive {
        Directive::Ascii | Directive::Asciiz => {
            for value in &data.values {
                if let TokenKind::String(s) = &value.kind {
                    latin1(s, value, data, diags, &mut bytes)?;
                    if data.directive == Directive::Asciiz {
                        bytes.push(0);
                    }
                }
            }
        }
        Directive::Space => bytes.resize(data.size() as usize, 0),
        Directive::Byte | Directive::Half | Directive::Word => {
            for value in &data.values {
                let v = integer(value, data, labels)?;
                match data.directive {
                    Directive::Byte => {
                        check_range(v, i8::MIN as i32, i8::MAX as i32, value, data)?;
                        bytes.push(v as u8);
                    }
                    Directive::Half => {
                        check_range(v, i16::MIN as i32, i16::MAX as i32, value, data)?;
                        bytes.extend_from_slice(&(v as u16).to_le_bytes());
                    }
                    _ => bytes.extend_from_slice(&v.to_le_bytes()),
                }
            }
        }
        d => {
            return Err(Diagnostic::error(
                ErrorKind::NotImplemented(format!("`{}`", d)),
                data.pos.clone(),
                &data.text,
            ))
        }
    }
    Ok(bytes)
}

/// Single-byte encoding; characters above U+00FF become `?`.
fn latin1(
    s: &str,
    at: &Token,
    data: &DataDirective,
    diags: &mut Diagnostics,
    bytes: &mut Vec<u8>,
) -> Result<()> {
    for ch in s.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(b) => bytes.push(b),
            Err(_) => {
                diags.warn(Diagnostic::warning(
                    ErrorKind::Unmappable(ch),
                    at.pos.clone(),
                    &data.text,
                ))?;
                bytes.push(b'?');
            }
        }
    }
    Ok(())
}

fn integer(value: &Token, data: &DataDirective, labels: &Labels) -> Result<i32> {
    match &value.kind {
        TokenKind::Integer(v) => Ok(*v),
        TokenKind::Identifier(name) => labels
            .get_val(name)
            .map(|addr| addr as i32)
            .ok_or_else(|| {
                Diagnostic::error(
                    ErrorKind::UndefinedLabel(name.clone()),
                    value.pos.clone(),
                    &data.text,
                )
            }),
        kind => Err(Diagnostic::error(
            ErrorKind::Expected {
                expected: "an integer or a label".into(),
                found: kind.to_string(),
            },
            value.pos.clone(),
            &data.text,
        )),
    }
}

fn check_range(v: i32, min: i32, max: i32, value: &Token, data: &DataDirective) -> Result<()> {
    if (min..=max).contains(&v) {
        Ok(())
    } else {
        Err(Diagnostic::error(
            ErrorKind::DataRange(v, data.directive),
            value.pos.clone(),
            &data.text,
        ))
    }
}
