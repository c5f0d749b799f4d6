//! Property-based tests for rust_logbook using proptest

use proptest::prelude::*;
use rust_logbook::core::{format_message, get_level_name, lookup_level, ExtraMap};
use rust_logbook::prelude::*;
use std::collections::BTreeMap;

fn any_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::NotSet),
        Just(Level::Debug),
        Just(Level::Info),
        Just(Level::Notice),
        Just(Level::Warning),
        Just(Level::Error),
        Just(Level::Critical),
    ]
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Level names round-trip through the strict and the lenient lookup
    #[test]
    fn test_level_name_roundtrip(level in any_level()) {
        let name = get_level_name(level as u8).unwrap();
        prop_assert_eq!(lookup_level(name).unwrap(), level);
        prop_assert_eq!(name.to_lowercase().parse::<Level>().unwrap(), level);
    }

    /// Ordering follows the numeric value
    #[test]
    fn test_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a <= b, (a as u8) <= (b as u8));
        prop_assert_eq!(a.cmp(&b), (a as u8).cmp(&(b as u8)));
    }

    /// Integers outside the level range are rejected
    #[test]
    fn test_unknown_level_numbers(value in 7u8..) {
        prop_assert!(get_level_name(value).is_err());
        prop_assert!(Level::from_u8(value).is_err());
    }

    /// Serde keeps the level intact
    #[test]
    fn test_level_serde(level in any_level()) {
        let json = serde_json::to_string(&level).unwrap();
        let back: Level = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, level);
    }
}

// ============================================================================
// Message Formatting Tests
// ============================================================================

proptest! {
    /// Text without braces comes out unchanged
    #[test]
    fn test_plain_text_is_unchanged(text in "[^{}]*") {
        let formatted = format_message(&text, &[FieldValue::from(1)], &BTreeMap::new()).unwrap();
        prop_assert_eq!(formatted, text);
    }

    /// Escaped braces render as single braces
    #[test]
    fn test_escaped_braces(inner in "[a-z ]{0,20}") {
        let template = format!("{{{{{}}}}}", inner);
        let formatted = format_message(&template, &[FieldValue::Null], &BTreeMap::new()).unwrap();
        prop_assert_eq!(formatted, format!("{{{}}}", inner));
    }

    /// Positional and keyword arguments substitute their display value
    #[test]
    fn test_argument_substitution(n in any::<i64>(), word in "[a-zA-Z]{1,12}") {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("word".to_string(), FieldValue::from(word.clone()));
        let formatted = format_message("{0}:{word}:{0}", &[FieldValue::from(n)], &kwargs).unwrap();
        prop_assert_eq!(formatted, format!("{}:{}:{}", n, word, n));
    }

    /// Width pads to at least the requested size
    #[test]
    fn test_width_padding(word in "[a-z]{0,10}", width in 0usize..20) {
        let template = format!("{{:{}}}", width);
        let formatted =
            format_message(&template, &[FieldValue::from(word.clone())], &BTreeMap::new()).unwrap();
        prop_assert_eq!(formatted.len(), word.len().max(width));
        prop_assert!(formatted.starts_with(&word));
    }

    /// Out-of-range positional arguments are errors, never panics
    #[test]
    fn test_missing_positional(index in 1usize..50) {
        let template = format!("{{{}}}", index);
        prop_assert!(format_message(&template, &[FieldValue::from(0)], &BTreeMap::new()).is_err());
    }
}

// ============================================================================
// Record Tests
// ============================================================================

proptest! {
    /// Extra lookups never fail
    #[test]
    fn test_extra_missing_key_is_empty(key in "[a-z_]{1,16}") {
        let extra = ExtraMap::new();
        prop_assert_eq!(extra.get(&key).to_string(), "");
    }

    /// Export keeps level, channel, message and extra
    #[test]
    fn test_record_export_roundtrip(
        level in any_level(),
        channel in "[a-z]{1,10}",
        message in "[^{}]{0,40}",
        value in any::<i64>(),
    ) {
        let mut record = LogRecord::new(Some(channel.clone()), level, message.clone());
        record.extra.insert("value", value);
        record.heavy_init().unwrap();

        let restored = LogRecord::from_dict(&record.to_dict().unwrap()).unwrap();
        prop_assert_eq!(restored.level, level);
        prop_assert_eq!(restored.channel.clone(), Some(channel));
        prop_assert_eq!(restored.message().unwrap(), message);
        prop_assert_eq!(restored.extra.get("value"), &FieldValue::Int(value));
        prop_assert_eq!(restored.time, record.time);
    }
}
