use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::token::{Directive, Pos, Token, TokenKind};
use arch::inst;
use arch::reg::{FReg, Reg};
use std::str::FromStr;

/// Decides which token variant a raw lexeme is.
///
/// Rules are tried in a fixed order; the first one that matches wins:
/// char literal, macro parameter, directive, register, integer, real,
/// mnemonic, identifier.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    /// Accept conventional register names (`$t0`) besides `$8`.
    pub extended: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier { extended: true }
    }
}

impl Classifier {
    pub fn new(extended: bool) -> Self {
        Classifier { extended }
    }

    pub fn classify(
        &self,
        lexeme: &str,
        pos: Pos,
        text: &str,
        diags: &mut Diagnostics,
    ) -> Result<Token> {
        let kind = if lexeme.starts_with('\'') {
            let value = decode_char(lexeme).ok_or_else(|| {
                Diagnostic::error(
                    ErrorKind::MalformedChar(lexeme.to_string()),
                    pos.clone(),
                    text,
                )
            })?;
            if value > 0xff {
                let truncated = (value & 0xff) as u8;
                diags.warn(Diagnostic::warning(
                    ErrorKind::CharTruncated(value, truncated),
                    pos.clone(),
                    text,
                ))?;
                TokenKind::Integer(truncated as i32)
            } else {
                TokenKind::Integer(value as i32)
            }
        } else if let Some(name) = lexeme.strip_prefix('%').filter(|n| is_identifier(n)) {
            TokenKind::MacroParameter(name.to_string())
        } else if let Ok(directive) = Directive::from_str(lexeme) {
            TokenKind::Directive(directive)
        } else if let Some(reg) = self.register(lexeme) {
            TokenKind::Register(reg)
        } else if let Some(freg) = FReg::parse(lexeme) {
            TokenKind::FloatRegister(freg)
        } else if let Some(value) = parse_int(lexeme) {
            TokenKind::Integer(value)
        } else if let Some(value) = parse_real(lexeme) {
            TokenKind::Real(value)
        } else if inst::is_mnemonic(lexeme) {
            TokenKind::Operator(lexeme.to_string())
        } else if is_identifier(lexeme) {
            TokenKind::Identifier(lexeme.to_string())
        } else {
            return Err(Diagnostic::error(
                ErrorKind::MalformedToken(lexeme.to_string()),
                pos,
                text,
            ));
        };
        Ok(Token::new(kind, pos))
    }

    fn register(&self, lexeme: &str) -> Option<Reg> {
        Reg::by_number(lexeme).or_else(|| {
            if self.extended {
                Reg::by_name(lexeme)
            } else {
                None
            }
        })
    }
}

/// `[A-Za-z_.$][A-Za-z0-9_.$]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

/// Value of the character named by a backslash escape, shared by char and
/// string literals.
pub fn unescape(c: char) -> Option<char> {
    match c {
        '\'' => Some('\''),
        '"' => Some('"'),
        '\\' => Some('\\'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'b' => Some('\u{8}'),
        'r' => Some('\r'),
        'f' => Some('\u{c}'),
        '0' => Some('\0'),
        _ => None,
    }
}

/// `'c'`, `'\n'` or `'\ooo'` (exactly three octal digits, 000 to 377).
fn decode_char(lexeme: &str) -> Option<u32> {
    let inner: Vec<char> = lexeme
        .strip_prefix('\'')?
        .strip_suffix('\'')?
        .chars()
        .collect();
    match inner.as_slice() {
        [c] if *c != '\\' && *c != '\'' => Some(*c as u32),
        ['\\', e] => unescape(*e).map(|c| c as u32),
        ['\\', a, b, c] if ('0'..='3').contains(a) && [b, c].iter().all(|d| ('0'..='7').contains(*d)) => {
            let digits: String = [*a, *b, *c].iter().collect();
            u32::from_str_radix(&digits, 8).ok()
        }
        _ => None,
    }
}

/// Decimal, `0x` hex, `0b` binary or leading-zero octal, optionally signed.
///
/// The accepted range is the union of `i32` and `u32`; values above
/// `i32::MAX` keep their bit pattern.
pub fn parse_int(s: &str) -> Option<i32> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = body
        .strip_prefix("0b")
        .or_else(|| body.strip_prefix("0B"))
    {
        (2, bin)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if magnitude > u32::MAX as u64 {
        return None;
    }
    let value = if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    if value < i32::MIN as i64 {
        return None;
    }
    Some(value as u32 as i32)
}

fn parse_real(s: &str) -> Option<f64> {
    let numeric = s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !numeric {
        return None;
    }
    s.parse::<f64>().ok()
}
