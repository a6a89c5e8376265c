use crate::error::{FeedError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An ISO-4217-like currency code: exactly three ASCII letters, upper case.
///
/// Input is trimmed and upper-cased before validation, so `" usd"` and `"USD"`
/// name the same currency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validates and normalizes a raw currency code.
    ///
    /// # Errors
    /// Returns `FeedError::InvalidConfig` if the trimmed input is not three ASCII letters.
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(FeedError::InvalidConfig(format!(
                "`{}` is not a three-letter currency code",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Validates a list of raw codes into a set, collapsing duplicates.
///
/// Nothing is returned unless every code is valid, which lets callers reject a
/// configuration request before touching stored state.
pub fn parse_codes<I, S>(codes: I) -> Result<BTreeSet<CurrencyCode>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|code| CurrencyCode::parse(code.as_ref()))
        .collect()
}
