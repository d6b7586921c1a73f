//! Property-based tests for logchain using proptest

use logchain::config::ConfigDocument;
use logchain::core::BoundedQueue;
use logchain::prelude::*;
use proptest::prelude::*;

fn info_event(message: &str) -> LogEvent {
    LogEvent::with_message(
        LogLevel::Info,
        "prop.test",
        message,
        SourceLocation::default(),
    )
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Test that LogLevel string conversions roundtrip correctly
    #[test]
    fn test_level_str_roundtrip(level in prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
        Just(LogLevel::Off),
    ]) {
        let as_str = level.as_str();
        let parsed: LogLevel = as_str.parse().unwrap();
        assert_eq!(level, parsed);
    }

    /// Test that LogLevel ordering matches the numeric discriminants
    #[test]
    fn test_level_ordering(
        level1 in prop_oneof![
            Just(LogLevel::Trace),
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warn),
            Just(LogLevel::Error),
            Just(LogLevel::Fatal),
            Just(LogLevel::Off),
        ],
        level2 in prop_oneof![
            Just(LogLevel::Trace),
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warn),
            Just(LogLevel::Error),
            Just(LogLevel::Fatal),
            Just(LogLevel::Off),
        ]
    ) {
        let val1 = level1 as u8;
        let val2 = level2 as u8;

        assert_eq!(level1 <= level2, val1 <= val2);
        assert_eq!(level1 < level2, val1 < val2);
        assert_eq!(level1 >= level2, val1 >= val2);
        assert_eq!(level1 > level2, val1 > val2);
    }

    /// Test that LogLevel Display matches as_str
    #[test]
    fn test_level_display(level in prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
        Just(LogLevel::Off),
    ]) {
        assert_eq!(format!("{}", level), level.as_str());
    }

    /// Test that parsing ignores case and surrounding whitespace
    #[test]
    fn test_level_parse_ignores_case_and_space(
        level in prop_oneof![
            Just(LogLevel::Trace),
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warn),
            Just(LogLevel::Error),
            Just(LogLevel::Fatal),
            Just(LogLevel::Off),
        ],
        use_lower in any::<bool>(),
    ) {
        let name = if use_lower {
            level.as_str().to_lowercase()
        } else {
            level.as_str().to_string()
        };
        let input = format!("  {}  ", name);

        assert_eq!(input.parse::<LogLevel>(), Ok(level));
    }

    /// Test that parsing any string either maps to a known name or errors
    #[test]
    fn test_level_parse_is_total(input in ".*") {
        let known = [
            "trace", "debug", "info", "warn", "warning", "error", "fatal",
            "critical", "off",
        ];
        match input.parse::<LogLevel>() {
            Ok(_) => {
                let normalized = input.trim().to_lowercase();
                assert!(known.contains(&normalized.as_str()),
                        "Parsed unexpected input: {:?}", input);
            }
            Err(message) => assert!(message.contains("Unknown log level")),
        }
    }
}

// ============================================================================
// PatternFormatter Tests
// ============================================================================

proptest! {
    /// Test that compiling and rendering arbitrary patterns never panics
    #[test]
    fn test_pattern_compile_never_panics(pattern in ".*", message in ".*") {
        let formatter = PatternFormatter::new(pattern);
        let _ = formatter.format(&info_event(&message));
    }

    /// Test that a pattern without directives renders verbatim
    #[test]
    fn test_literal_pattern_renders_verbatim(pattern in "[a-zA-Z0-9 :,._/-]*") {
        let formatter = PatternFormatter::new(pattern.clone());
        assert_eq!(formatter.format(&info_event("ignored")), pattern);
    }

    /// Test that %m substitutes the message without altering it
    #[test]
    fn test_message_directive_is_verbatim(
        prefix in "[a-z ]{0,8}",
        message in ".*",
        // A suffix starting with 's' would turn %m into the %ms directive.
        suffix in "([a-rt-z ][a-z ]{0,7})?",
    ) {
        let formatter = PatternFormatter::new(format!("{}%m{}", prefix, suffix));
        let rendered = formatter.format(&info_event(&message));
        assert_eq!(rendered, format!("{}{}{}", prefix, message, suffix));
    }

    /// Test that width modifiers pad but never truncate
    #[test]
    fn test_width_pads_without_truncating(
        width in 1usize..32,
        left_align in any::<bool>(),
    ) {
        let pattern = if left_align {
            format!("%-{}p", width)
        } else {
            format!("%{}p", width)
        };
        let rendered = PatternFormatter::new(pattern).format(&info_event("x"));

        // "INFO" is four characters; narrower widths must not cut into it.
        assert_eq!(rendered.chars().count(), width.max(4));
        assert_eq!(rendered.trim(), "INFO");
        if width > 4 {
            if left_align {
                assert!(rendered.starts_with("INFO"));
            } else {
                assert!(rendered.ends_with("INFO"));
            }
        }
    }
}

// ============================================================================
// JsonFormatter Tests
// ============================================================================

proptest! {
    /// Test that JSON output parses for any message and carries it intact
    #[test]
    fn test_json_output_always_parses(
        message in ".*",
        logger_name in "[a-zA-Z0-9_.]{1,24}",
        level in prop_oneof![
            Just(LogLevel::Trace),
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warn),
            Just(LogLevel::Error),
            Just(LogLevel::Fatal),
        ]
    ) {
        let event = LogEvent::with_message(
            level,
            logger_name.clone(),
            message.clone(),
            SourceLocation::default(),
        );
        let line = JsonFormatter::new().format(&event);

        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["message"], serde_json::Value::String(message));
        assert_eq!(value["logger"], serde_json::Value::String(logger_name));
        assert_eq!(
            value["level"],
            serde_json::Value::String(level.as_str().to_owned())
        );
        assert!(value["thread_id"].is_u64());
    }
}

// ============================================================================
// LogEvent Tests
// ============================================================================

proptest! {
    /// Test that event construction never panics and stamps a recent time
    #[test]
    fn test_event_timestamp_is_recent(message in ".*") {
        let event = info_event(&message);

        let age = chrono::Utc::now().signed_duration_since(event.timestamp);
        assert!(age.num_seconds() <= 1, "Timestamp too old: {:?}", event.timestamp);
        assert!(event.milliseconds() < 1000);
    }
}

// ============================================================================
// BoundedQueue Tests
// ============================================================================

proptest! {
    /// Test that the queue never exceeds capacity and keeps FIFO order
    #[test]
    fn test_queue_respects_capacity_and_order(
        capacity in 1usize..32,
        items in prop::collection::vec(any::<u32>(), 0..64),
    ) {
        let queue = BoundedQueue::new(capacity);
        let mut accepted = Vec::new();
        for item in &items {
            if queue.try_push(*item).is_ok() {
                accepted.push(*item);
            }
            assert!(queue.len() <= capacity);
        }

        // Without a consumer, exactly the first `capacity` items fit.
        assert_eq!(accepted.len(), items.len().min(capacity));

        let mut drained = Vec::new();
        while let Some(item) = queue.try_pop() {
            drained.push(item);
        }
        assert_eq!(drained, accepted);
    }

    /// Test that an unbounded queue accepts everything in order
    #[test]
    fn test_unbounded_queue_accepts_everything(
        items in prop::collection::vec(any::<u32>(), 0..256),
    ) {
        let queue = BoundedQueue::unbounded();
        for item in &items {
            assert!(queue.try_push(*item).is_ok());
        }
        assert_eq!(queue.len(), items.len());

        let mut drained = Vec::new();
        while let Some(item) = queue.try_pop() {
            drained.push(item);
        }
        assert_eq!(drained, items);
    }
}

// ============================================================================
// ConfigDocument Tests
// ============================================================================

proptest! {
    /// Test that serialized documents parse back to an equal document
    #[test]
    fn test_document_display_roundtrip(
        section in "[a-z][a-z0-9_.]{0,8}",
        entries in prop::collection::btree_map(
            "[a-z][a-z0-9_.]{0,12}",
            r"([!-~]([ -~\t\n\r]{0,24}[!-~])?)?",
            0..8,
        ),
    ) {
        let mut document = ConfigDocument::new();
        for (key, value) in &entries {
            document.set_str(&section, key, value.clone());
        }

        let reparsed = ConfigDocument::parse(&document.to_string());
        assert_eq!(reparsed, document);
    }

    /// Test that integer values survive a write/read cycle
    #[test]
    fn test_document_int_roundtrip(value in any::<i64>()) {
        let mut document = ConfigDocument::new();
        document.set_int("limits", "max", value);

        let reparsed = ConfigDocument::parse(&document.to_string());
        assert_eq!(reparsed.get_int("limits", "max"), Some(value));
    }
}
