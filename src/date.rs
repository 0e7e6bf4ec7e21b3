//! Formats publication timestamps for display, e.g. `2021-03-15T10:00:00Z`
//! becomes `15 mar 2021` in the `pt-BR` [`Locale`].

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A display locale. Each locale carries its own table of abbreviated month
/// names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    PtBr,
    EnUs,
    EsEs,
}

impl Locale {
    /// Abbreviated month names, January first.
    fn months(self) -> &'static [&'static str; 12] {
        match self {
            Locale::PtBr => &[
                "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set",
                "out", "nov", "dez",
            ],
            Locale::EnUs => &[
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep",
                "Oct", "Nov", "Dec",
            ],
            Locale::EsEs => &[
                "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept",
                "oct", "nov", "dic",
            ],
        }
    }

    /// The locale's identifier, e.g. `pt-BR`.
    pub fn id(self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
            Locale::EsEs => "es-ES",
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::PtBr
    }
}

impl FromStr for Locale {
    type Err = Error;

    /// Parses a locale identifier. Matching ignores case and accepts `_` in
    /// place of `-`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Locale::PtBr),
            "en-us" | "en" => Ok(Locale::EnUs),
            "es-es" | "es" => Ok(Locale::EsEs),
            _ => Err(Error::UnknownLocale(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Locale, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        String::deserialize(deserializer)?
            .parse::<Locale>()
            .map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// What to do with a publication date that is missing or can't be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Fail with [`Error::InvalidTimestamp`] or [`Error::MissingTimestamp`].
    Strict,

    /// Log a warning and display an empty string.
    Lenient,
}

impl Default for DatePolicy {
    fn default() -> Self {
        DatePolicy::Lenient
    }
}

/// Formats `timestamp` as `{dd} {month} {yyyy}` using `locale`'s month
/// abbreviations. The date is taken in UTC.
///
/// Both RFC 3339 timestamps (`2021-03-15T10:00:00Z`,
/// `2021-03-15T10:00:00+00:00`) and the colon-less offsets the content API
/// emits (`2021-03-15T10:00:00+0000`) are accepted.
pub fn format(timestamp: &str, locale: Locale) -> Result<String> {
    let date = parse(timestamp)?.with_timezone(&Utc);
    Ok(format!(
        "{:02} {} {:04}",
        date.day(),
        locale.months()[date.month0() as usize],
        date.year()
    ))
}

/// Like [`format`], but applies `policy` to missing and invalid timestamps.
pub fn format_or_placeholder(
    timestamp: Option<&str>,
    locale: Locale,
    policy: DatePolicy,
) -> Result<String> {
    let result = match timestamp {
        Some(timestamp) => format(timestamp, locale),
        None => Err(Error::MissingTimestamp),
    };
    match (result, policy) {
        (Ok(formatted), _) => Ok(formatted),
        (Err(e), DatePolicy::Strict) => Err(e),
        (Err(e), DatePolicy::Lenient) => {
            tracing::warn!("{}; displaying an empty date", e);
            Ok(String::new())
        }
    }
}

fn parse(timestamp: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|err| Error::InvalidTimestamp {
            timestamp: timestamp.to_owned(),
            err,
        })
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem formatting a date.
#[derive(Debug)]
pub enum Error {
    /// Returned when a timestamp isn't a valid ISO-8601 date-time.
    InvalidTimestamp {
        timestamp: String,
        err: chrono::ParseError,
    },

    /// Returned under [`DatePolicy::Strict`] for articles without a
    /// publication date.
    MissingTimestamp,

    /// Returned when parsing an unsupported locale identifier.
    UnknownLocale(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidTimestamp { timestamp, err } => {
                write!(f, "Invalid timestamp '{}': {}", timestamp, err)
            }
            Error::MissingTimestamp => write!(f, "Missing publication date"),
            Error::UnknownLocale(locale) => {
                write!(f, "Unsupported locale '{}'", locale)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidTimestamp { timestamp: _, err } => Some(err),
            Error::MissingTimestamp => None,
            Error::UnknownLocale(_) => None,
        }
    }
}
