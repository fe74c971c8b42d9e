use crate::app_error::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar day in `YYYY-MM-DD` form. Keys every local record, score and puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let invalid = || {
            AppError::new(
                "LL_DATE_INVALID",
                "validation",
                "date must be formatted as YYYY-MM-DD",
                false,
                serde_json::json!({ "value": raw }),
            )
        };
        if raw.len() != 10 {
            return Err(invalid());
        }
        let parsed = NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT).map_err(|_| invalid())?;
        // chrono tolerates padding such as "2026-01- 1"; only the exact form is a key.
        if parsed.format(DATE_KEY_FORMAT).to_string() != raw {
            return Err(invalid());
        }
        Ok(Self(parsed))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn today_utc() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(|e| serde::de::Error::custom(e.message))
    }
}

/// Caller identity handed over by the external auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
        }
    }

    /// A blank user id is treated as no identity at all.
    pub fn is_valid(&self) -> bool {
        !self.user_id.trim().is_empty()
    }
}
