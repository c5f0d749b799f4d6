//! Level definitions and name lookups

use super::error::{LoggerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The closed set of record levels, ordered by severity.
///
/// `NotSet` is the lowest level; a logger at `NotSet` lets everything
/// through (or inherits the level of its group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    #[default]
    NotSet = 0,
    Debug = 1,
    Info = 2,
    Notice = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::NotSet,
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Level::Critical => "CRITICAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Notice => "NOTICE",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::NotSet => "NOTSET",
        }
    }

    /// Integer to level, failing for integers outside `0..=6`
    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(LoggerError::UnknownLevel(value))
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::NotSet | Level::Debug => BrightBlack,
            Level::Info => Green,
            Level::Notice => Cyan,
            Level::Warning => Yellow,
            Level::Error => Red,
            Level::Critical => BrightRed,
        }
    }
}

/// Return the textual representation of the level integer `level`.
pub fn get_level_name(level: u8) -> Result<&'static str> {
    Level::from_u8(level).map(|l| l.name())
}

/// Return the level for an exact (upper-case) level name.
///
/// This is the strict lookup; [`FromStr`] additionally accepts any case and
/// the `WARN` abbreviation.
pub fn lookup_level(name: &str) -> Result<Level> {
    Level::ALL
        .iter()
        .copied()
        .find(|l| l.name() == name)
        .ok_or_else(|| LoggerError::UnknownLevelName(name.to_string()))
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "WARN" => Ok(Level::Warning),
            upper => lookup_level(upper).map_err(|_| LoggerError::UnknownLevelName(s.to_string())),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for Level {
    type Error = LoggerError;

    fn try_from(value: u8) -> Result<Self> {
        Level::from_u8(value)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Level::from_u8(value).map_err(serde::de::Error::custom),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::NotSet < Level::Debug);
        assert!(Level::Notice > Level::Info);
        assert!(Level::Notice < Level::Warning);
        assert!(Level::Critical > Level::Error);
    }

    #[test]
    fn test_get_level_name() {
        assert_eq!(get_level_name(4).unwrap(), "WARNING");
        assert_eq!(get_level_name(0).unwrap(), "NOTSET");
        assert!(matches!(get_level_name(42), Err(LoggerError::UnknownLevel(42))));
    }

    #[test]
    fn test_lookup_level_is_strict() {
        assert_eq!(lookup_level("NOTICE").unwrap(), Level::Notice);
        assert!(lookup_level("notice").is_err());
        assert!(lookup_level("WARN").is_err());
    }

    #[test]
    fn test_from_str_is_lenient() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" Critical ".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_serde_accepts_names_and_integers() {
        let level: Level = serde_json::from_str("5").unwrap();
        assert_eq!(level, Level::Error);
        let level: Level = serde_json::from_str("\"notice\"").unwrap();
        assert_eq!(level, Level::Notice);
        assert_eq!(serde_json::to_string(&Level::Info).unwrap(), "2");
    }
}
