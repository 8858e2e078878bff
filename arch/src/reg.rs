use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// General purpose registers of the MIPS32 integer unit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    ZERO,
    AT,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    K0,
    K1,
    GP,
    SP,
    FP,
    RA,
}

static REG_MAP: Lazy<BiMap<&'static str, Reg>> = Lazy::new(|| {
    let mut map: BiMap<&'static str, Reg> = BiMap::new();
    map.insert("zero", Reg::ZERO);
    map.insert("at", Reg::AT);
    map.insert("v0", Reg::V0);
    map.insert("v1", Reg::V1);
    map.insert("a0", Reg::A0);
    map.insert("a1", Reg::A1);
    map.insert("a2", Reg::A2);
    map.insert("a3", Reg::A3);
    map.insert("t0", Reg::T0);
    map.insert("t1", Reg::T1);
    map.insert("t2", Reg::T2);
    map.insert("t3", Reg::T3);
    map.insert("t4", Reg::T4);
    map.insert("t5", Reg::T5);
    map.insert("t6", Reg::T6);
    map.insert("t7", Reg::T7);
    map.insert("s0", Reg::S0);
    map.insert("s1", Reg::S1);
    map.insert("s2", Reg::S2);
    map.insert("s3", Reg::S3);
    map.insert("s4", Reg::S4);
    map.insert("s5", Reg::S5);
    map.insert("s6", Reg::S6);
    map.insert("s7", Reg::S7);
    map.insert("t8", Reg::T8);
    map.insert("t9", Reg::T9);
    map.insert("k0", Reg::K0);
    map.insert("k1", Reg::K1);
    map.insert("gp", Reg::GP);
    map.insert("sp", Reg::SP);
    map.insert("fp", Reg::FP);
    map.insert("ra", Reg::RA);
    map
});

impl Reg {
    /// Numeric form: `$0` .. `$31`.
    pub fn by_number(s: &str) -> Option<Reg> {
        let digits = s.strip_prefix('$')?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let num: u8 = digits.parse().ok()?;
        Reg::try_from(num).ok()
    }

    /// Conventional form: `$zero`, `$t0`, `$ra`, ...
    pub fn by_name(s: &str) -> Option<Reg> {
        let name = s.strip_prefix('$')?;
        REG_MAP.get_by_left(name).copied()
    }

    pub fn parse(s: &str) -> Result<Reg, String> {
        Reg::by_number(s)
            .or_else(|| Reg::by_name(s))
            .ok_or_else(|| format!("Unknown register name: `{}`", s))
    }

    pub fn number(self) -> u8 {
        self.into()
    }

    pub fn name(&self) -> &'static str {
        REG_MAP.get_by_right(self).copied().unwrap_or("?")
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Coprocessor 1 (floating point) registers `$f0` .. `$f31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FReg(u8);

impl FReg {
    pub fn parse(s: &str) -> Option<FReg> {
        let digits = s.strip_prefix("$f")?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match digits.parse::<u8>() {
            Ok(num) if num < 32 => Some(FReg(num)),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl Display for FReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$f{}", self.0)
    }
}
