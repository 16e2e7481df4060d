use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{flag} must be a number, got {value:?}")]
    NotANumber { flag: &'static str, value: String },
    #[error("{flag} must be {requirement}")]
    OutOfRange {
        flag: &'static str,
        requirement: &'static str,
    },
    #[error("{flag} is required when {condition}")]
    Missing {
        flag: &'static str,
        condition: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to serialize forecast: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Form fields arrive either as text or as JSON numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    pub fn into_text(self) -> String {
        match self {
            FormValue::Number(v) => v.to_string(),
            FormValue::Text(s) => s,
        }
    }
}

/// Drops redundant leading zeros and cuts everything after the second
/// decimal digit. Digits are truncated, not rounded.
pub fn round_to_2dec(value: &str) -> String {
    let mut trimmed = value;
    while trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed[1..].starts_with('.') {
        trimmed = &trimmed[1..];
    }

    let end = trimmed
        .find('.')
        .and_then(|dot| trimmed[dot..].char_indices().nth(3).map(|(i, _)| dot + i))
        .unwrap_or(trimmed.len());
    trimmed[..end].to_string()
}

/// Sanitizes and parses a money or percentage field.
pub fn parse_amount(flag: &'static str, raw: &str) -> Result<f64, InputError> {
    let cleaned = round_to_2dec(raw.trim());
    let value = cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::NotANumber {
            flag,
            value: raw.to_string(),
        })?;
    if value < 0.0 {
        return Err(InputError::OutOfRange {
            flag,
            requirement: ">= 0",
        });
    }
    Ok(value)
}
