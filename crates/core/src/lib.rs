//! Core domain types for Booklog.

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod wire;

use wire::{RawDecimal, RawId, blank_as_none, decimal, decimal_opt, null_as_default};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(Self(RawId::deserialize(deserializer)?.into_string()))
            }
        }
    };
}

id_type!(BookId);
id_type!(LogId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub access_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        let url = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if url.is_empty() {
            DEFAULT_API_BASE_URL.to_string()
        } else {
            url.to_string()
        };
        self.access_token = self
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub cover_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub isbn_10: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub isbn_13: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating_count: u32,
    #[serde(default, deserialize_with = "decimal")]
    pub avg_rating: f32,
}

impl Book {
    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }

    pub fn genres_line(&self) -> String {
        self.genres.join(", ")
    }

    /// Author line as shown on cards; never blank.
    pub fn display_authors(&self) -> String {
        let line = self.authors_line();
        if line.trim().is_empty() {
            "Unknown author".to_string()
        } else {
            line
        }
    }

    /// Page count, only when it can anchor a progress figure.
    pub fn known_page_count(&self) -> Option<u32> {
        self.page_count.filter(|pages| *pages > 0)
    }

    pub fn average_rating(&self) -> Option<Rating> {
        if self.rating_count == 0 {
            return None;
        }
        Rating::from_stars(self.avg_rating.clamp(0.0, 5.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    #[default]
    WantToRead,
    Reading,
    Completed,
    DidNotFinish,
    OnHold,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 5] = [
        ReadingStatus::WantToRead,
        ReadingStatus::Reading,
        ReadingStatus::Completed,
        ReadingStatus::DidNotFinish,
        ReadingStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want_to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Completed => "completed",
            ReadingStatus::DidNotFinish => "did_not_finish",
            ReadingStatus::OnHold => "on_hold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "Want to Read",
            ReadingStatus::Reading => "Currently Reading",
            ReadingStatus::Completed => "Completed",
            ReadingStatus::DidNotFinish => "Did Not Finish",
            ReadingStatus::OnHold => "On Hold",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "want_to_read" => Ok(ReadingStatus::WantToRead),
            "reading" => Ok(ReadingStatus::Reading),
            "completed" => Ok(ReadingStatus::Completed),
            "did_not_finish" => Ok(ReadingStatus::DidNotFinish),
            "on_hold" => Ok(ReadingStatus::OnHold),
            _ => Err("unknown reading status"),
        }
    }
}

/// Star rating in half-point steps, 0 to 5 inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MAX_HALF_STEPS: u8 = 10;

    pub fn from_half_steps(half_steps: u8) -> Option<Self> {
        (half_steps <= Self::MAX_HALF_STEPS).then_some(Self(half_steps))
    }

    /// Snaps to the nearest half star; `None` outside [0, 5].
    pub fn from_stars(stars: f32) -> Option<Self> {
        if !stars.is_finite() || !(0.0..=5.0).contains(&stars) {
            return None;
        }
        Some(Self((stars * 2.0).round() as u8))
    }

    pub fn half_steps(self) -> u8 {
        self.0
    }

    pub fn stars(self) -> f32 {
        f32::from(self.0) / 2.0
    }

    pub fn step_up(self) -> Self {
        Self((self.0 + 1).min(Self::MAX_HALF_STEPS))
    }

    pub fn step_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    pub fn glyphs(self) -> String {
        let full = usize::from(self.0 / 2);
        let half = usize::from(self.0 % 2);
        let empty = 5 - full - half;
        let mut out = "★".repeat(full);
        if half == 1 {
            out.push('½');
        }
        out.push_str(&"☆".repeat(empty));
        out
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stars())
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.stars())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(raw) = Option::<RawDecimal>::deserialize(deserializer)? else {
            return Ok(Rating::default());
        };
        let stars = raw.value().map_err(D::Error::custom)?;
        Rating::from_stars(stars).ok_or_else(|| D::Error::custom(format!("rating {stars} out of range")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingLog {
    pub id: LogId,
    pub book: BookId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ReadingStatus,
    #[serde(default)]
    pub date_started: Option<NaiveDate>,
    #[serde(default)]
    pub date_finished: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default)]
    pub rating: Rating,
    /// Computed by the service; never sent back.
    #[serde(
        default,
        deserialize_with = "decimal_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<f32>,
}

/// Body for creating or updating a log. Blank dates serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPayload {
    pub book: BookId,
    pub status: ReadingStatus,
    pub date_started: Option<NaiveDate>,
    pub date_finished: Option<NaiveDate>,
    pub current_page: u32,
    pub notes: String,
    pub rating: Rating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current_page: u32,
    pub page_count: Option<u32>,
}

impl Progress {
    /// Rounded percentage; `None` without a positive page count. May exceed 100.
    pub fn percent(&self) -> Option<u32> {
        let total = self.page_count.filter(|pages| *pages > 0)?;
        let ratio = f64::from(self.current_page) / f64::from(total);
        Some((ratio * 100.0).round() as u32)
    }

    pub fn display_percent(&self) -> Option<u32> {
        self.percent().map(|percent| percent.min(100))
    }
}
