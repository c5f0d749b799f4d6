//! Integration tests for the logbook
//!
//! These tests verify:
//! - Dispatch order across logger and context handlers
//! - Bubbling and blackhole handlers
//! - Lazy record initialization and processors
//! - Logger groups
//! - Record export and re-dispatch
//! - File handlers end to end
//!
//! Everything here binds to the test's own thread; application-wide
//! binding is covered in `stack_tests.rs`.

use rust_logbook::handlers::{
    FileHandler, FingersCrossedHandler, GroupHandler, NullHandler, TestHandler,
    ThreadedWrapperHandler,
};
use rust_logbook::prelude::*;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_most_recent_handler_sees_record_first() {
    let outer = TestHandler::new();
    let inner = TestHandler::new().with_bubble(true);
    let outer_ref = outer.clone().into_shared();
    let inner_ref = inner.clone().into_shared();

    let _outer = outer_ref.threadbound();
    let _inner = inner_ref.threadbound();

    Logger::new("app").info("both see me");
    assert!(inner.has_info("both see me"));
    assert!(outer.has_info("both see me"));
}

#[test]
fn test_logger_handler_without_bubble_hides_context_handlers() {
    let own = TestHandler::new();
    let context = TestHandler::new();
    let logger = Logger::builder()
        .name("private")
        .handler(own.clone().into_shared())
        .build();

    let context_ref = context.clone().into_shared();
    let _guard = context_ref.threadbound();

    logger.error("kept private");
    assert!(own.has_error("kept private"));
    assert!(context.is_empty());
}

#[test]
fn test_handler_level_lets_records_pass_outwards() {
    let outer = TestHandler::new();
    let inner = TestHandler::new().with_level(Level::Error);
    let outer_ref = outer.clone().into_shared();
    let inner_ref = inner.clone().into_shared();
    let _outer = outer_ref.threadbound();
    let _inner = inner_ref.threadbound();

    let logger = Logger::new("app");
    logger.info("low");
    logger.error("high");

    assert!(outer.has_info("low"));
    assert!(!outer.has_error("high"));
    assert!(inner.has_error("high"));
}

#[test]
fn test_null_handler_silences_everything_outside() {
    let outer = TestHandler::new();
    let outer_ref = outer.clone().into_shared();
    let null = NullHandler::new().into_shared();
    let _outer = outer_ref.threadbound();
    let _null = null.threadbound();

    Logger::new("app").critical("nobody hears this");
    assert!(outer.is_empty());
}

#[test]
fn test_processor_runs_once_and_only_when_handled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let processor = Processor::new(move |record: &mut LogRecord| {
        counter.fetch_add(1, Ordering::SeqCst);
        record.extra.insert("request_id", "req-42");
    });

    let first = TestHandler::new().with_bubble(true);
    let second = TestHandler::new()
        .with_format_string("{record.extra[request_id]} {record.message}")
        .unwrap();
    let setup = NestedSetup::new()
        .with(second.clone().into_shared())
        .with(first.clone().into_shared())
        .with(processor);
    let _bound = setup.threadbound();

    let logger = Logger::builder().name("web").level(Level::Info).build();
    logger.debug("not handled");
    logger.info("handled");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.formatted_records(), vec!["req-42 handled"]);
    assert_eq!(first.records()[0].extra.get("request_id").to_string(), "req-42");
}

#[test]
fn test_group_controls_members() {
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    let group = LoggerGroup::new()
        .with_level(Level::Warning)
        .with_processor(|record| {
            record.extra.insert("subsystem", "storage");
        });
    let db = Logger::builder().name("db").group(&group).build();
    let cache = Logger::builder().name("cache").group(&group).build();

    db.info("ignored");
    cache.warn("evicting");
    assert!(!handler.has_info("ignored"));
    assert_eq!(handler.records()[0].extra.get("subsystem").to_string(), "storage");

    group.disable();
    db.critical("muted");
    assert!(!handler.has_critical("muted"));
    assert_eq!(group.loggers().len(), 2);
}

#[test]
fn test_export_and_redispatch() {
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    Logger::new("worker").notice(
        LogArgs::new("job {id} took {}s")
            .arg(2.5)
            .kwarg("id", 7)
            .extra("queue", "emails"),
    );
    let exported = handler.records()[0].to_dict().unwrap();
    assert_eq!(exported["message"], "job 7 took 2.5s");

    let mut restored = LogRecord::from_dict(&exported).unwrap();
    assert_eq!(restored.level, Level::Notice);
    assert_eq!(restored.channel.as_deref(), Some("worker"));
    assert_eq!(restored.time, handler.records()[0].time);

    handler.clear();
    dispatch_record(&mut restored);
    assert!(handler.has_record(Level::Notice, "job 7 took 2.5s", Some("worker")));
}

#[test]
fn test_redispatch_of_record_never_logged() {
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    let fresh = LogRecord::new(Some("w".into()), Level::Warning, "x");
    let mut restored = LogRecord::from_dict(&fresh.to_dict().unwrap()).unwrap();
    assert!(!restored.is_late());

    dispatch_record(&mut restored);
    assert_eq!(handler.len(), 1);
    assert!(handler.has_record(Level::Warning, "x", Some("w")));
    assert!(handler.records()[0].time.is_some());
}

#[test]
fn test_formatting_error_reports_context() {
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    // The handler reports the failure on stderr; the call site is unaffected
    Logger::new("app").error(LogArgs::new("{missing} of {}").arg(3));
    assert!(handler.is_empty());

    let record = LogRecord::new(Some("app".into()), Level::Error, "{missing} of {}")
        .with_args(vec![FieldValue::from(3)])
        .with_location("src/main.rs", 12, "app");
    let text = record.message().unwrap_err().to_string();
    assert!(text.contains("msg='{missing} of {}'"));
    assert!(text.contains("file src/main.rs, line 12"));
}

#[test]
fn test_file_handler_and_fingers_crossed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("crash.log");

    let file = FileHandler::new(&log_file)
        .expect("Failed to create handler")
        .with_format_string("{record.level_name}: {record.message}")
        .unwrap();
    let fingers = FingersCrossedHandler::new(file.into_shared())
        .with_action_level(Level::Error)
        .into_shared();
    let _guard = fingers.threadbound();

    let logger = Logger::new("batch");
    logger.info("loading");
    assert_eq!(fs::read_to_string(&log_file).unwrap(), "");

    logger.error("failed");
    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content, "INFO: loading\nERROR: failed\n");
}

#[test]
fn test_threaded_group_pipeline() {
    let sink = TestHandler::new();
    let threaded = ThreadedWrapperHandler::new(sink.clone().into_shared())
        .unwrap()
        .into_shared();
    let group = GroupHandler::new(Arc::clone(&threaded)).into_shared();

    {
        let _guard = group.threadbound();
        let logger = Logger::new("pipeline");
        for i in 0..5 {
            logger.info(LogArgs::new("step {}").arg(i));
        }
        assert!(sink.is_empty());
    }

    threaded.flush().unwrap();
    assert_eq!(sink.len(), 5);
    assert!(sink.has_info("step 4"));
}

#[test]
fn test_catch_exceptions_logs_through_context() {
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    let logger = Logger::new("parser");
    let parsed = logger.catch_exceptions(|| "12x".parse::<i32>());
    assert!(parsed.is_none());

    let record = &handler.records()[0];
    assert_eq!(record.level, Level::Error);
    assert_eq!(record.exception_shortname().as_deref(), Some("ParseIntError"));
    assert!(handler.formatted_records()[0].contains("invalid digit"));
}
