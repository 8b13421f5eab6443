//! Lenient decoding helpers for the shapes the book service emits.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Identifiers arrive as UUID strings, but integer keys are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    pub(crate) fn into_string(self) -> String {
        match self {
            RawId::Text(value) => value,
            RawId::Number(value) => value.to_string(),
        }
    }
}

/// Decimal columns are rendered as strings (`"4.25"`) by the service.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDecimal {
    Number(f64),
    Text(String),
}

impl RawDecimal {
    pub(crate) fn value(&self) -> Result<f32, String> {
        match self {
            RawDecimal::Number(value) => Ok(*value as f32),
            RawDecimal::Text(text) => text
                .trim()
                .parse::<f32>()
                .map_err(|_| format!("invalid decimal: {text:?}")),
        }
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(decimal_opt(deserializer)?.unwrap_or(0.0))
}

pub(crate) fn decimal_opt<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDecimal>::deserialize(deserializer)? {
        Some(raw) => raw.value().map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}
