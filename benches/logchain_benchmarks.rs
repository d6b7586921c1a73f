//! Criterion benchmarks for logchain

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use logchain::prelude::*;
use std::sync::Arc;

struct NullAppender;

impl Appender for NullAppender {
    fn append(&self, _event: &Arc<LogEvent>) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Event Creation Benchmarks
// ============================================================================

fn bench_event_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new", |b| {
        b.iter(|| {
            let event = LogEvent::new(
                black_box(LogLevel::Info),
                black_box("bench.event"),
                SourceLocation::default(),
            );
            black_box(event)
        });
    });

    group.bench_function("with_message", |b| {
        b.iter(|| {
            let event = LogEvent::with_message(
                black_box(LogLevel::Info),
                black_box("bench.event"),
                black_box("Test message"),
                SourceLocation::default(),
            );
            black_box(event)
        });
    });

    group.bench_function("with_location", |b| {
        b.iter(|| {
            let event = LogEvent::with_message(
                black_box(LogLevel::Info),
                black_box("bench.event"),
                black_box("Test message"),
                SourceLocation::new(black_box("bench.rs"), black_box("bench::event"), black_box(42)),
            );
            black_box(event)
        });
    });

    group.finish();
}

// ============================================================================
// Level Gate Benchmarks
// ============================================================================

fn bench_level_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_gate");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::new("bench.gate");
    logger.set_level(LogLevel::Warn);

    group.bench_function("below_threshold", |b| {
        b.iter(|| {
            logger.debug(black_box("This should be filtered"));
        });
    });

    group.bench_function("above_threshold", |b| {
        b.iter(|| {
            logger.error(black_box("This should be logged"));
        });
    });

    // The macro checks the gate before running format!, so the argument is
    // never rendered here.
    group.bench_function("gated_macro_skips_formatting", |b| {
        b.iter(|| {
            logchain::debug!(logger, "expensive argument: {}", black_box(42));
        });
    });

    group.finish();
}

// ============================================================================
// Formatter Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let event = LogEvent::with_message(
        LogLevel::Info,
        "bench.format",
        "A representative log message",
        SourceLocation::new("bench.rs", "bench::format", 42),
    );

    let pattern = PatternFormatter::default();
    group.bench_function("pattern_default", |b| {
        b.iter(|| black_box(pattern.format(black_box(&event))));
    });

    let minimal = PatternFormatter::new("%p %m%n");
    group.bench_function("pattern_minimal", |b| {
        b.iter(|| black_box(minimal.format(black_box(&event))));
    });

    let json = JsonFormatter::new();
    group.bench_function("json", |b| {
        b.iter(|| black_box(json.format(black_box(&event))));
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_sync_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_dispatch");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::new("bench.sync");
    logger.set_level(LogLevel::Trace);
    logger.add_appender(Arc::new(NullAppender));

    group.bench_function("trace", |b| {
        b.iter(|| {
            logger.trace(black_box("Trace message"));
        });
    });

    group.bench_function("info", |b| {
        b.iter(|| {
            logger.info(black_box("Info message"));
        });
    });

    group.bench_function("error", |b| {
        b.iter(|| {
            logger.error(black_box("Error message"));
        });
    });

    group.finish();
}

fn bench_async_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_dispatch");
    group.throughput(Throughput::Elements(1));

    let appender = Arc::new(
        AsyncAppender::new(Arc::new(NullAppender))
            .with_queue_capacity(100_000)
            .with_overflow_policy(OverflowPolicy::DropNewest),
    );
    appender.start(1).unwrap();

    let logger = Logger::new("bench.async");
    logger.set_level(LogLevel::Trace);
    logger.add_appender(Arc::clone(&appender) as Arc<dyn Appender>);

    group.bench_function("info", |b| {
        b.iter(|| {
            logger.info(black_box("Info message"));
        });
    });

    group.bench_function("error", |b| {
        b.iter(|| {
            logger.error(black_box("Error message"));
        });
    });

    group.finish();
    appender.stop(false);
}

// ============================================================================
// Concurrent Logging Benchmarks
// ============================================================================

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");

    let appender = Arc::new(
        AsyncAppender::new(Arc::new(NullAppender))
            .with_queue_capacity(100_000)
            .with_overflow_policy(OverflowPolicy::DropNewest),
    );
    appender.start(1).unwrap();

    let logger = Arc::new(Logger::new("bench.concurrent"));
    logger.add_appender(Arc::clone(&appender) as Arc<dyn Appender>);

    group.bench_function("single_thread", |b| {
        let logger = Arc::clone(&logger);
        b.iter(|| {
            logger.info(black_box("Concurrent message"));
        });
    });

    group.bench_function("multi_thread_4", |b| {
        let logger = Arc::clone(&logger);
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let logger = Arc::clone(&logger);
                    std::thread::spawn(move || {
                        logger.info(black_box("Concurrent message"));
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
    appender.stop(false);
}

// ============================================================================
// Filtering Benchmarks
// ============================================================================

fn bench_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtering");
    group.throughput(Throughput::Elements(1));

    let filter = LevelRangeFilter::at_least(LogLevel::Debug);
    let event = LogEvent::with_message(
        LogLevel::Info,
        "bench.filter",
        "Filtered message",
        SourceLocation::default(),
    );

    group.bench_function("decide_direct", |b| {
        b.iter(|| black_box(filter.decide(black_box(&event))));
    });

    let logger = Logger::new("bench.filter");
    logger.set_level(LogLevel::Trace);
    logger.add_appender(Arc::new(NullAppender));
    logger.add_filter(Arc::new(LevelRangeFilter::at_least(LogLevel::Debug)));

    group.bench_function("accepted_by_chain", |b| {
        b.iter(|| {
            logger.info(black_box("Accepted message"));
        });
    });

    group.bench_function("denied_by_chain", |b| {
        b.iter(|| {
            logger.trace(black_box("Denied message"));
        });
    });

    group.finish();
}

// ============================================================================
// Statistics Benchmarks
// ============================================================================

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::new("bench.stats");
    logger.add_appender(Arc::new(NullAppender));

    stats().set_enabled(true);
    group.bench_function("recording_enabled", |b| {
        b.iter(|| {
            logger.info(black_box("Counted message"));
        });
    });

    stats().set_enabled(false);
    group.bench_function("recording_disabled", |b| {
        b.iter(|| {
            logger.info(black_box("Uncounted message"));
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_event_creation,
    bench_level_gate,
    bench_formatting,
    bench_sync_dispatch,
    bench_async_dispatch,
    bench_concurrent_logging,
    bench_filtering,
    bench_statistics
);

criterion_main!(benches);
