//! Typed surrogate keys for type-safe dimension references.
//!
//! Using typed keys prevents accidentally passing a `CustomerKey` where a
//! `ProductKey` is expected. Each optional dimension reserves key `0` for
//! its seeded "unknown" row, so unresolved references are pinned to a real
//! dimension row instead of loading as NULL.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Macro to generate typed surrogate-key wrappers.
macro_rules! typed_key {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Reserved key of the seeded "unknown" dimension row.
            pub const UNKNOWN: Self = Self(0);

            /// Returns the raw warehouse key.
            #[must_use]
            pub const fn into_inner(self) -> i32 {
                self.0
            }

            /// Returns true if this is the reserved unknown key.
            #[must_use]
            pub const fn is_unknown(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_key!(CustomerKey, "Surrogate key for a customer dimension row.");
typed_key!(ProductKey, "Surrogate key for a product dimension row.");
typed_key!(
    SalespersonKey,
    "Surrogate key for a salesperson dimension row."
);
typed_key!(WarehouseKey, "Surrogate key for a warehouse dimension row.");
typed_key!(CountryKey, "Surrogate key for a country dimension row.");
typed_key!(CurrencyKey, "Surrogate key for a currency dimension row.");

/// Surrogate key for a time dimension row.
///
/// Unlike the other keys this is not warehouse-assigned: it is the
/// deterministic `YYYYMMDD` encoding of the calendar date, so the same date
/// can never produce two rows regardless of call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(pub i32);

impl DateKey {
    /// Encodes a calendar date as its `YYYYMMDD` key.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        #[allow(clippy::cast_possible_wrap)]
        Self(date.year() * 10_000 + (date.month() * 100 + date.day()) as i32)
    }

    /// Decodes the key back to a calendar date.
    ///
    /// Returns `None` for values that do not encode a valid date.
    #[must_use]
    pub fn to_date(self) -> Option<NaiveDate> {
        let year = self.0 / 10_000;
        #[allow(clippy::cast_sign_loss)]
        let month = ((self.0 / 100) % 100) as u32;
        #[allow(clippy::cast_sign_loss)]
        let day = (self.0 % 100) as u32;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Returns the raw warehouse key.
    #[must_use]
    pub const fn into_inner(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2025, 3, 1, 20_250_301)]
    #[case(2024, 12, 31, 20_241_231)]
    #[case(2025, 1, 10, 20_250_110)]
    fn test_date_key_encoding(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: i32,
    ) {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        let key = DateKey::from_date(date);
        assert_eq!(key.into_inner(), expected);
        assert_eq!(key.to_date(), Some(date));
    }

    #[test]
    fn test_date_key_rejects_garbage() {
        assert_eq!(DateKey(20_251_340).to_date(), None);
        assert_eq!(DateKey(0).to_date(), None);
    }

    #[test]
    fn test_unknown_key_is_zero() {
        assert!(WarehouseKey::UNKNOWN.is_unknown());
        assert!(!WarehouseKey(3).is_unknown());
        assert_eq!(SalespersonKey::UNKNOWN.into_inner(), 0);
    }
}
