use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::label::Labels;
use crate::token::{SourceLine, Token, TokenKind};
use arch::inst::{self, Slot};
use arch::reg::Reg;

fn describe(slot: &Slot) -> &'static str {
    match slot {
        Slot::Reg => "a register",
        Slot::FReg => "a floating point register",
        Slot::Imm(_) => "an immediate",
        Slot::Branch => "a branch target",
        Slot::Jump => "a jump target",
        Slot::LParen => "`(`",
        Slot::RParen => "`)`",
    }
}

fn error(kind: ErrorKind, at: &Token, line: &SourceLine) -> Diagnostic {
    Diagnostic::error(kind, at.pos.clone(), &line.text)
}

fn warning(kind: ErrorKind, at: &Token, line: &SourceLine) -> Diagnostic {
    Diagnostic::warning(kind, at.pos.clone(), &line.text)
}

fn expected(slot: &Slot, found: &Token) -> ErrorKind {
    ErrorKind::Expected {
        expected: describe(slot).to_string(),
        found: found.kind.to_string(),
    }
}

/// Encodes the instruction on `line`, placed at `addr`.
///
/// Operands are matched positionally against the mnemonic's shape.
/// Out-of-range immediates and targets only warn; the value is truncated
/// by the bit packing.
pub fn encode(
    line: &SourceLine,
    addr: u32,
    labels: &Labels,
    diags: &mut Diagnostics,
) -> Result<u32> {
    let Some((head, operands)) = line.tokens.split_first() else {
        return Err(Diagnostic::error(
            ErrorKind::MissingOperand("an instruction".into()),
            line.pos(),
            &line.text,
        ));
    };
    let TokenKind::Operator(mnemonic) = &head.kind else {
        return Err(error(
            ErrorKind::Expected {
                expected: "an instruction".into(),
                found: head.kind.to_string(),
            },
            head,
            line,
        ));
    };
    let def = inst::lookup(mnemonic)
        .unwrap_or_else(|| panic!("`{}` reached the encoder but is not in the catalog", mnemonic));
    let slots = def.shape.slots();

    // `jalr $rs` links through $ra
    let implied;
    let operands = if def.mnemonic == "jalr" && operands.len() == 1 {
        implied = [
            Token::new(TokenKind::Register(Reg::RA), head.pos.clone()),
            operands[0].clone(),
        ];
        &implied[..]
    } else {
        operands
    };

    let mut ops = Vec::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        let Some(token) = operands.get(i) else {
            if def.shape.optional_code() && i + 1 == slots.len() {
                ops.push(0);
                break;
            }
            let last = line.tokens.last().unwrap_or(head);
            return Err(error(
                ErrorKind::MissingOperand(describe(slot).into()),
                last,
                line,
            ));
        };
        match (slot, &token.kind) {
            (Slot::Reg, TokenKind::Register(reg)) => ops.push(reg.number() as i32),
            (Slot::FReg, TokenKind::FloatRegister(reg)) => ops.push(reg.number() as i32),
            (Slot::LParen, TokenKind::LeftParen) | (Slot::RParen, TokenKind::RightParen) => {}
            (Slot::Branch, _) => {
                let target = target(slot, token, labels, line)?;
                let offset = (target as i64 - (addr as i64 + 4)) >> 2;
                if offset < i16::MIN as i64 || offset > i16::MAX as i64 {
                    diags.warn(warning(ErrorKind::BranchRange(target), token, line))?;
                }
                ops.push(offset as i32);
            }
            (Slot::Jump, _) => {
                let target = target(slot, token, labels, line)?;
                if target & 0xf000_0000 != addr.wrapping_add(4) & 0xf000_0000 {
                    diags.warn(warning(ErrorKind::JumpRange(target), token, line))?;
                }
                ops.push(((target >> 2) & 0x03ff_ffff) as i32);
            }
            (Slot::Imm(bits), _) => ops.push(immediate(*bits, token, labels, line, diags)?),
            (slot, _) => return Err(error(expected(slot, token), token, line)),
        }
    }
    if let Some(extra) = operands.get(slots.len()) {
        return Err(error(
            ErrorKind::ExtraOperand(extra.kind.to_string()),
            extra,
            line,
        ));
    }

    let word = (def.encode)(&ops);
    log::trace!("0x{:08x}: {} {:?} => 0x{:08x}", addr, mnemonic, ops, word);
    Ok(word)
}

/// Branch or jump target: a defined label or a literal address.
fn target(slot: &Slot, token: &Token, labels: &Labels, line: &SourceLine) -> Result<u32> {
    match &token.kind {
        TokenKind::Identifier(name) => labels
            .get_val(name)
            .ok_or_else(|| error(ErrorKind::UndefinedLabel(name.clone()), token, line)),
        TokenKind::Integer(addr) => Ok(*addr as u32),
        _ => Err(error(expected(slot, token), token, line)),
    }
}

/// A value fits when it is representable in `bits` either signed or unsigned.
fn immediate(
    bits: u8,
    token: &Token,
    labels: &Labels,
    line: &SourceLine,
    diags: &mut Diagnostics,
) -> Result<i32> {
    let value = match &token.kind {
        TokenKind::Integer(v) => *v,
        TokenKind::Identifier(name) => {
            let addr = labels
                .get_val(name)
                .ok_or_else(|| error(ErrorKind::UndefinedLabel(name.clone()), token, line))?;
            diags.warn(warning(
                ErrorKind::LabelAsImmediate(name.clone(), addr),
                token,
                line,
            ))?;
            addr as i32
        }
        _ => return Err(error(expected(&Slot::Imm(bits), token), token, line)),
    };
    let v = value as i64;
    if !(-(1i64 << (bits - 1))..(1i64 << bits)).contains(&v) {
        diags.warn(warning(
            ErrorKind::Truncated { value: v, bits },
            token,
            line,
        ))?;
    }
    Ok(value)
}
