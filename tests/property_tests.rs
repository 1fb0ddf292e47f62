//! Property-based tests for klog using proptest

use klog::appenders::rotating_file::decide;
use klog::prelude::*;
use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

// ============================================================================
// Rotation Decision Tests
// ============================================================================

proptest! {
    /// Files at or under the limit are never trimmed
    #[test]
    fn test_decide_within_limit(limit in 1u64..1_000_000, fraction in 0.0f64..=1.0) {
        let size = (limit as f64 * fraction) as u64;
        let decision = decide(size, limit);
        prop_assert!(!decision.should_rotate);
        prop_assert_eq!(decision.keep_from_offset, 0);
    }

    /// Oversized files always keep from a quarter of the limit
    #[test]
    fn test_decide_over_limit(limit in 1u64..1_000_000, excess in 1u64..10_000_000) {
        let decision = decide(limit + excess, limit);
        prop_assert!(decision.should_rotate);
        prop_assert_eq!(decision.keep_from_offset, limit / 4);
        prop_assert!(decision.keep_from_offset < limit + excess);
    }

    /// The policy and the free function agree
    #[test]
    fn test_policy_matches_decide(limit in 1u64..1_000_000, size in 0u64..2_000_000) {
        prop_assert_eq!(RotationPolicy::new(limit).decide(size), decide(size, limit));
    }
}

// ============================================================================
// Log Level Tests
// ============================================================================

proptest! {
    /// Test that LogLevel string conversions roundtrip correctly
    #[test]
    fn test_log_level_str_roundtrip(level in prop_oneof![
        Just(LogLevel::Info),
        Just(LogLevel::Error),
    ]) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
        prop_assert_eq!(level.to_string(), level.to_str());
    }

    /// Anything other than a known level name is rejected
    #[test]
    fn test_log_level_invalid_parse(invalid in "[0-9xyz]{1,8}") {
        prop_assert!(invalid.parse::<LogLevel>().is_err());
    }
}

// ============================================================================
// Record Format Tests
// ============================================================================

proptest! {
    /// Messages are written verbatim between the timestamp and the terminator
    #[test]
    fn test_record_format_is_verbatim(message in "(?s).{0,200}") {
        let formatted = LogRecord::new(message.clone()).format();
        prop_assert_eq!(formatted.as_bytes()[19], b' ');
        prop_assert!(formatted.ends_with("\r\n"));
        prop_assert_eq!(&formatted[20..formatted.len() - 2], message.as_str());
    }
}

// ============================================================================
// File Target Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Without rotation the file is exactly the concatenation of the records
    #[test]
    fn test_unrotated_file_is_concatenation(
        messages in prop::collection::vec("[a-zA-Z0-9 ]{0,40}", 1..30)
    ) {
        let dir = tempdir().unwrap();
        let mut target = FileTarget::new(dir.path(), "log", 1024 * 1024).unwrap();

        let mut expected = String::new();
        for message in &messages {
            let record = LogRecord::new(message.clone());
            target.append(&record).unwrap();
            expected.push_str(&record.format());
        }
        prop_assert_eq!(fs::read_to_string(target.path()).unwrap(), expected);
    }

    /// Trimming removes exactly a quarter of the limit before the append
    #[test]
    fn test_rotation_removes_quarter_of_limit(
        limit in 4u64..4096,
        excess in 1u64..4096,
        tail in prop::collection::vec(any::<u8>(), 1..64)
    ) {
        let dir = tempdir().unwrap();
        let mut target = FileTarget::new(dir.path(), "log", limit).unwrap();

        let before: Vec<u8> = (0..limit + excess).map(|i| (i % 251) as u8).collect();
        fs::write(target.path(), &before).unwrap();

        target.append_bytes(&tail).unwrap();

        let after = fs::read(target.path()).unwrap();
        let discarded = (limit / 4) as usize;
        prop_assert_eq!(after.len(), before.len() - discarded + tail.len());
        prop_assert_eq!(&after[..before.len() - discarded], &before[discarded..]);
        prop_assert_eq!(&after[before.len() - discarded..], tail.as_slice());
        prop_assert!(!target.temp_path().exists());
    }

    /// Steady writes keep the file within the limit plus one record
    #[test]
    fn test_size_stays_bounded(
        limit in 128u64..2048,
        records in prop::collection::vec("[a-z]{0,10}", 1..200)
    ) {
        let dir = tempdir().unwrap();
        let mut target = FileTarget::new(dir.path(), "log", limit).unwrap();

        for message in &records {
            let record = LogRecord::new(message.clone());
            let record_len = record.format().len() as u64;
            target.append(&record).unwrap();
            prop_assert!(target.current_size().unwrap() <= limit + record_len);
        }
    }
}
