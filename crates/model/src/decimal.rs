use std::{
    fmt::{self, Debug, Display},
    ops::Mul,
    str::FromStr,
};

use serde_with::{DeserializeFromStr, SerializeDisplay};

const DECIMALS: u32 = 2;
const SCALE: i64 = 10i64.pow(DECIMALS);

/// Fixed-point money amount with two fractional digits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Decimal(i64);

impl Decimal {
    pub fn int(value: i64) -> Decimal {
        Decimal(value * SCALE)
    }

    pub fn zero() -> Decimal {
        Decimal(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_mul(self, count: u32) -> Option<Decimal> {
        self.0.checked_mul(count as i64).map(Decimal)
    }
}

impl Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            abs / SCALE as u64,
            abs % SCALE as u64
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to parse decimal value `{0}`")]
pub struct ParseDecimalError(String);

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_owned());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        let int = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<i64>().map_err(|_| err())?
        };
        // Digits past the second fractional place are truncated.
        let frac = frac_part
            .chars()
            .chain(std::iter::repeat('0'))
            .take(DECIMALS as usize)
            .collect::<String>()
            .parse::<i64>()
            .map_err(|_| err())?;

        let value = int
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(err)?;
        Ok(Decimal(if negative { -value } else { value }))
    }
}

/// Saturates at the `i64` bounds instead of overflowing.
impl Mul<u32> for Decimal {
    type Output = Decimal;

    fn mul(self, count: u32) -> Decimal {
        Decimal(self.0.saturating_mul(count as i64))
    }
}
