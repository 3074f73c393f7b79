//! Human-readable order numbers.

use core::fmt;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// Not of the form `MPyymmdd-nnnn`.
    #[error("order number must look like MP240131-0042")]
    Malformed,
}

/// An order number of the form `MP` + `YYMMDD` + `-` + four random digits.
///
/// Numbers are unique per store; the random suffix makes same-day collisions
/// unlikely but not impossible, so callers persisting a fresh number must be
/// prepared to retry with another one.
///
/// ```
/// use chrono::NaiveDate;
/// use mp_records_core::OrderNumber;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// let number = OrderNumber::for_date(day, 42);
/// assert_eq!(number.as_str(), "MP240307-0042");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "MP";

    /// Build the number for `date` with the given suffix (taken modulo 10000).
    #[must_use]
    pub fn for_date(date: NaiveDate, suffix: u16) -> Self {
        Self(format!(
            "{}{:02}{:02}{:02}-{:04}",
            Self::PREFIX,
            date.year().rem_euclid(100),
            date.month(),
            date.day(),
            suffix % 10_000
        ))
    }

    /// Generate a number for `date` with a random suffix.
    #[must_use]
    pub fn generate(date: NaiveDate) -> Self {
        let suffix = rand::rng().random_range(0..10_000);
        Self::for_date(date, suffix)
    }

    /// Parse an existing order number.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError::Malformed`] unless the input is `MP`, six
    /// digits, a hyphen and four digits.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let rest = s.strip_prefix(Self::PREFIX).ok_or(OrderNumberError::Malformed)?;
        let (date, suffix) = rest.split_once('-').ok_or(OrderNumberError::Malformed)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(date, 6) || !digits(suffix, 4) {
            return Err(OrderNumberError::Malformed);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
    }

    #[test]
    fn test_for_date_pads() {
        assert_eq!(OrderNumber::for_date(day(), 7).as_str(), "MP251104-0007");
        assert_eq!(OrderNumber::for_date(day(), 9999).as_str(), "MP251104-9999");
    }

    #[test]
    fn test_generate_has_expected_shape() {
        for _ in 0..50 {
            let number = OrderNumber::generate(day());
            assert!(number.as_str().starts_with("MP251104-"));
            assert!(OrderNumber::parse(number.as_str()).is_ok());
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(OrderNumber::parse("").is_err());
        assert!(OrderNumber::parse("XX251104-0001").is_err());
        assert!(OrderNumber::parse("MP2511040001").is_err());
        assert!(OrderNumber::parse("MP25110-00011").is_err());
        assert!(OrderNumber::parse("MP251104-00a1").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let number: OrderNumber = serde_json::from_str("\"MP240101-1234\"").unwrap();
        assert_eq!(number.to_string(), "MP240101-1234");
        assert!(serde_json::from_str::<OrderNumber>("\"12345\"").is_err());
    }
}
