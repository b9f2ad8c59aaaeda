//! Unsigned fixed-point decimal with 18 fractional digits.

use core::{fmt, str::FromStr};
use primitive_types::U256;
use thiserror::Error;

/// Number of fractional digits carried by [`Dec`].
pub const DEC_PRECISION: usize = 18;

/// Raw value of `1.0`.
pub const DEC_SCALE: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecError {
    #[error("decimal overflow")]
    Overflow,

    #[error("decimal division by zero")]
    DivisionByZero,

    #[error("invalid decimal {0:?}")]
    Parse(String),
}

/// Fixed-point decimal, stored as `value × 10^18`.
///
/// Displayed with exactly 18 fractional digits (`0.130000000000000000`),
/// which is also its serialized form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(u128);

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(DEC_SCALE);

    /// Build from the raw scaled representation.
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw scaled representation.
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn from_int(n: u64) -> Self {
        Self(n as u128 * DEC_SCALE)
    }

    /// `numerator / denominator`, rounded half up at the last digit.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, DecError> {
        mul_div_round(numerator, DEC_SCALE, denominator).map(Self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Dec) -> Result<Dec, DecError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(DecError::Overflow)
    }

    pub fn checked_sub(self, rhs: Dec) -> Result<Dec, DecError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(DecError::Overflow)
    }

    pub fn saturating_sub(self, rhs: Dec) -> Dec {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Product, rounded half up.
    pub fn checked_mul(self, rhs: Dec) -> Result<Dec, DecError> {
        mul_div_round(self.0, rhs.0, DEC_SCALE).map(Self)
    }

    /// Quotient, rounded half up.
    pub fn checked_quo(self, rhs: Dec) -> Result<Dec, DecError> {
        mul_div_round(self.0, DEC_SCALE, rhs.0).map(Self)
    }

    /// Multiply by an integer. Exact.
    pub fn checked_mul_int(self, n: u128) -> Result<Dec, DecError> {
        self.0.checked_mul(n).map(Self).ok_or(DecError::Overflow)
    }

    /// Divide by an integer, truncating the last digit.
    pub fn checked_quo_int(self, n: u128) -> Result<Dec, DecError> {
        if n == 0 {
            return Err(DecError::DivisionByZero);
        }
        Ok(Self(self.0 / n))
    }

    /// Integer part, rounded toward zero.
    pub fn truncate_int(self) -> u128 {
        self.0 / DEC_SCALE
    }

    /// Smallest integer not below this value.
    pub fn ceil_int(self) -> u128 {
        let int = self.0 / DEC_SCALE;
        if self.0 % DEC_SCALE == 0 {
            int
        } else {
            int + 1
        }
    }

    /// Clamp into `[min, max]`. `max` wins if the bounds are inverted.
    pub fn clamp_between(self, min: Dec, max: Dec) -> Dec {
        self.max(min).min(max)
    }
}

fn mul_div_round(a: u128, b: u128, divisor: u128) -> Result<u128, DecError> {
    if divisor == 0 {
        return Err(DecError::DivisionByZero);
    }
    let divisor = U256::from(divisor);
    let quotient = (U256::from(a) * U256::from(b) + divisor / 2) / divisor;
    if quotient > U256::from(u128::MAX) {
        return Err(DecError::Overflow);
    }
    Ok(quotient.as_u128())
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / DEC_SCALE,
            self.0 % DEC_SCALE,
            width = DEC_PRECISION
        )
    }
}

impl FromStr for Dec {
    type Err = DecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecError::Parse(s.to_string());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (s, ""),
        };
        if int_part.is_empty()
            || frac_part.len() > DEC_PRECISION
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || (s.contains('.') && frac_part.is_empty())
        {
            return Err(invalid());
        }

        let int: u128 = int_part.parse().map_err(|_| invalid())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = DEC_PRECISION);
            padded.parse().map_err(|_| invalid())?
        };

        int.checked_mul(DEC_SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Dec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Dec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
