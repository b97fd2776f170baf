//! Input validation helpers shared by the record modules.
//!
//! Request bodies arrive with every field optional so that a missing required
//! field surfaces as [`Error::MissingField`] rather than a deserializer message.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Identifiers returned by the external attachment store.
///
/// Flattened into request bodies as `attachmentId`, `attachmentName` and `attachmentUrl`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Object id in the attachment store
    #[serde(default)]
    pub attachment_id: Option<String>,
    /// Original file name
    #[serde(default)]
    pub attachment_name: Option<String>,
    /// Stable URL of the stored object
    #[serde(default)]
    pub attachment_url: Option<String>,
}

impl Attachment {
    /// Drops blank fields so they never overwrite stored values.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            attachment_id: optional_text(self.attachment_id),
            attachment_name: optional_text(self.attachment_name),
            attachment_url: optional_text(self.attachment_url),
        }
    }
}

/// Parses a `YYYY-MM-DD` date (a trailing `T...` time part is ignored).
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        value: value.to_string(),
    })
}

/// Parses an optional date query/body value; empty strings count as absent.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date(text).map(Some),
    }
}

/// Serde adapter for optional dates that accepts `null`, `""` and `YYYY-MM-DD`.
pub fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    parse_optional_date(raw.as_deref()).map_err(serde::de::Error::custom)
}

/// Serde adapter for patch fields. Used with `#[serde(default)]`: an absent field stays
/// `None`, an explicit `null` becomes `Some(None)`.
pub fn deserialize_nullable<'de, T, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// [`deserialize_nullable`] for dates; `""` clears like `null`.
pub fn deserialize_nullable_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_date(deserializer).map(Some)
}

/// Returns the trimmed string, or `MissingField` when absent or blank.
pub fn require_text(value: Option<&str>, field: &'static str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
        .ok_or(Error::MissingField { field })
}

/// Treats blank optional text as absent.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Requires a finite, strictly positive amount.
pub fn require_positive_amount(value: Option<f64>, field: &'static str) -> Result<f64> {
    let amount = value.ok_or(Error::MissingField { field })?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Requires a finite, non-negative amount, defaulting to zero when absent.
pub fn non_negative_amount(value: Option<f64>) -> Result<f64> {
    let amount = value.unwrap_or(0.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}
