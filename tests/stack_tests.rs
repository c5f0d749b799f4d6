//! Application-wide binding tests
//!
//! Binding to the application stack is visible to every thread of the
//! process, so the tests in this file run one at a time.

use rust_logbook::core::{context_handlers, context_processors, ContextStack, LoggerError};
use rust_logbook::handlers::TestHandler;
use rust_logbook::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn test_application_binding_is_visible_from_other_threads() {
    let _serial = serial();
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.applicationbound();

    thread::spawn(|| Logger::new("worker").info("from another thread"))
        .join()
        .unwrap();

    assert!(handler.has_record(Level::Info, "from another thread", Some("worker")));
}

#[test]
fn test_thread_binding_is_invisible_from_other_threads() {
    let _serial = serial();
    let handler = TestHandler::new();
    let bound = handler.clone().into_shared();
    let _guard = bound.threadbound();

    thread::spawn(|| Logger::new("worker").info("elsewhere"))
        .join()
        .unwrap();
    Logger::new("main").info("here");

    assert!(!handler.has_info("elsewhere"));
    assert!(handler.has_info("here"));
}

#[test]
fn test_thread_objects_interleave_with_application_objects_by_push_order() {
    let _serial = serial();
    let first_app = TestHandler::new().into_shared();
    let thread_bound = TestHandler::new().into_shared();
    let second_app = TestHandler::new().into_shared();

    let _a = first_app.applicationbound();
    let _t = thread_bound.threadbound();
    let _b = second_app.applicationbound();

    let handlers = context_handlers();
    assert_eq!(handlers.len(), 3);
    assert!(Arc::ptr_eq(&handlers[0], &second_app));
    assert!(Arc::ptr_eq(&handlers[1], &thread_bound));
    assert!(Arc::ptr_eq(&handlers[2], &first_app));

    let other_thread_count = thread::spawn(|| context_handlers().len()).join().unwrap();
    assert_eq!(other_thread_count, 2);
}

#[test]
fn test_application_pop_mismatch() {
    let _serial = serial();
    let outer = TestHandler::new().into_shared();
    let inner = TestHandler::new().into_shared();

    outer.push_application();
    inner.push_application();
    assert!(matches!(
        outer.pop_application(),
        Err(LoggerError::StackMismatch(_))
    ));
    inner.pop_application().unwrap();
    outer.pop_application().unwrap();
    assert!(matches!(
        outer.pop_application(),
        Err(LoggerError::EmptyStack(_))
    ));
}

#[test]
fn test_application_processor_and_nested_setup() {
    let _serial = serial();
    let handler = TestHandler::new();
    let setup = NestedSetup::new()
        .with(handler.clone().into_shared())
        .with(Processor::new(|record: &mut LogRecord| {
            record.extra.insert("host", "web-1");
        }));

    {
        let _guard = setup.applicationbound();
        assert_eq!(context_processors().len(), 1);
        thread::spawn(|| Logger::new("api").warn("slow"))
            .join()
            .unwrap();
    }

    assert!(context_handlers().is_empty());
    assert!(context_processors().is_empty());
    assert_eq!(handler.records()[0].extra.get("host").to_string(), "web-1");
}

#[test]
fn test_private_context_stack() {
    let _serial = serial();
    let stack: ContextStack<str> = ContextStack::new("label");
    let global: Arc<str> = Arc::from("global");
    let local: Arc<str> = Arc::from("local");

    stack.push_application(Arc::clone(&global));
    stack.push_thread(Arc::clone(&local));
    let seen: Vec<String> = stack
        .iter_context_objects()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(seen, vec!["local", "global"]);

    stack.pop_thread(&local).unwrap();
    stack.pop_application(&global).unwrap();
    assert!(stack.iter_context_objects().is_empty());
}
