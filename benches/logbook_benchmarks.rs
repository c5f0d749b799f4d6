//! Criterion benchmarks for rust_logbook

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_logbook::core::{format_message, FieldValue};
use rust_logbook::handlers::{NullHandler, StreamHandler, ThreadedWrapperHandler};
use rust_logbook::prelude::*;
use std::collections::BTreeMap;
use std::io;

// ============================================================================
// Logger Creation Benchmarks
// ============================================================================

fn bench_logger_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new", |b| {
        b.iter(|| {
            let logger = Logger::new(black_box("bench"));
            black_box(logger)
        });
    });

    group.bench_function("builder_with_group", |b| {
        let logger_group = LoggerGroup::new();
        b.iter(|| {
            let logger = Logger::builder()
                .name(black_box("bench"))
                .level(Level::Info)
                .group(&logger_group)
                .build();
            black_box(logger)
        });
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::new("bench");

    group.bench_function("no_handlers", |b| {
        b.iter(|| logger.info(black_box("Nobody listens")));
    });

    group.bench_function("below_logger_level", |b| {
        let quiet = Logger::builder().name("quiet").level(Level::Error).build();
        b.iter(|| quiet.debug(black_box("Filtered early")));
    });

    group.bench_function("null_handler", |b| {
        let null = NullHandler::new().into_shared();
        let _guard = null.threadbound();
        b.iter(|| logger.info(black_box("Swallowed")));
    });

    group.bench_function("stream_handler_sink", |b| {
        let stream = StreamHandler::with_writer(io::sink()).into_shared();
        let _guard = stream.threadbound();
        b.iter(|| logger.info(black_box("Formatted and discarded")));
    });

    group.bench_function("stream_handler_with_args", |b| {
        let stream = StreamHandler::with_writer(io::sink()).into_shared();
        let _guard = stream.threadbound();
        b.iter(|| {
            logger.warn(
                LogArgs::new("request {} took {ms}ms")
                    .arg(black_box(42))
                    .kwarg("ms", black_box(17)),
            )
        });
    });

    group.bench_function("threaded_wrapper", |b| {
        let sink = StreamHandler::with_writer(io::sink()).into_shared();
        let threaded = ThreadedWrapperHandler::new(sink)
            .expect("Failed to start worker")
            .into_shared();
        let _guard = threaded.threadbound();
        b.iter(|| logger.info(black_box("Queued")));
    });

    group.finish();
}

// ============================================================================
// Record Benchmarks
// ============================================================================

fn bench_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("records");
    group.throughput(Throughput::Elements(1));

    group.bench_function("format_message", |b| {
        let args = vec![FieldValue::from("GET"), FieldValue::from(200)];
        let mut kwargs = BTreeMap::new();
        kwargs.insert("path".to_string(), FieldValue::from("/index.html"));
        b.iter(|| {
            let text = format_message(black_box("{} {path} -> {:>5}"), &args, &kwargs);
            black_box(text)
        });
    });

    group.bench_function("heavy_init", |b| {
        b.iter(|| {
            let mut record = LogRecord::new(Some("bench".into()), Level::Info, "message");
            record.heavy_init().expect("fresh record");
            black_box(record)
        });
    });

    group.bench_function("to_json", |b| {
        let mut record = LogRecord::new(Some("bench".into()), Level::Info, "message {}")
            .with_args(vec![FieldValue::from(1)]);
        record.extra.insert("user", "alice");
        record.pull_information();
        b.iter(|| black_box(record.to_json()));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_logger_creation, bench_dispatch, bench_records);

criterion_main!(benches);
