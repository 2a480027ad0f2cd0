use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A number of leave days, fixed-point with 4 decimal places.
///
/// Accrual rates are often fractional (1.5 or 1.75 days a month), so the
/// ledger keeps a scaled integer to avoid drift over a year of additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Days(i64);

impl Days {
    const SCALE: i64 = 10_000;

    pub const ZERO: Days = Days(0);

    pub fn whole(days: i64) -> Self {
        Days(days * Self::SCALE)
    }

    pub fn from_float(value: f64) -> Self {
        Days((value * Self::SCALE as f64).round() as i64)
    }

    /// Like [`Days::from_float`], but `None` for NaN, infinities and values
    /// the scaled integer cannot hold.
    pub fn try_from_float(value: f64) -> Option<Self> {
        let scaled = (value * Self::SCALE as f64).round();
        (scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64)
            .then(|| Days(scaled as i64))
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Days)
    }

    pub fn from_scaled(value: i64) -> Self {
        Days(value)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Trailing zeros are dropped: `2`, `1.5`, `0.0001`.
impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let frac = format!("{frac:04}");
        write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl std::ops::Add for Days {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Days(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Days {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Days(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Days {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Days {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Days {
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

// Serialized as a plain decimal number so stored rows read naturally.
impl Serialize for Days {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Days {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Days::from_float)
    }
}

impl From<u32> for Days {
    fn from(days: u32) -> Self {
        Days::whole(days as i64)
    }
}
