//! Asynchronous delivery pipeline
//!
//! Decorates one backend appender with a bounded queue and a pool of worker
//! threads. `append` only enqueues; workers pop with a short timeout, batch
//! if configured, and deliver to the backend off the caller's thread. When
//! the queue is full the configured [`OverflowPolicy`] decides whether the
//! producer waits or which event is lost; every lost event shows up in the
//! dropped counter and the process statistics.
//!
//! Ordering is preserved end-to-end only with a single worker. Multiple
//! workers share the queue, so their deliveries interleave.

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::event::LogEvent;
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::queue::BoundedQueue;
use crate::core::stats::stats;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Interval after which a partial batch is delivered anyway.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

/// How long a worker waits on an empty queue before re-checking the flush
/// interval and the stop condition.
const POP_TIMEOUT: Duration = Duration::from_millis(100);

/// Polling step for the drain waits in `stop(true)` and `flush`.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Upper bound on drain polling in `stop(true)`. A producer stuck inside a
/// blocking push can keep the queue non-empty, so the wait must not be open
/// ended.
const DRAIN_POLL_LIMIT: u32 = 1000;

/// State shared between the appender handle and its worker threads.
struct Shared {
    backend: RwLock<Option<Arc<dyn Appender>>>,
    queue: BoundedQueue<Arc<LogEvent>>,
    accepting: AtomicBool,
    batch_size: AtomicUsize,
    flush_interval_ms: AtomicU64,
}

impl Shared {
    fn backend_snapshot(&self) -> Option<Arc<dyn Appender>> {
        self.backend.read().as_ref().map(Arc::clone)
    }

    fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.load(Ordering::Relaxed))
    }
}

/// Appender that queues events and writes them on background threads.
///
/// Wraps exactly one backend appender, replaceable at runtime through
/// [`set_backend`](AsyncAppender::set_backend). Events are accepted as soon
/// as the appender exists; they sit in the queue until
/// [`start`](AsyncAppender::start) spawns workers to drain it.
///
/// # Example
///
/// ```no_run
/// use logchain::appenders::{AsyncAppender, FileAppender};
/// use logchain::OverflowPolicy;
/// use std::sync::Arc;
///
/// # fn main() -> logchain::Result<()> {
/// let file = Arc::new(FileAppender::new("app.log")?);
/// let appender = AsyncAppender::new(file)
///     .with_queue_capacity(8192)
///     .with_batch_size(64)
///     .with_overflow_policy(OverflowPolicy::DropOldest);
/// appender.start(1)?;
/// // ... attach to a logger, log ...
/// appender.stop(true);
/// # Ok(())
/// # }
/// ```
pub struct AsyncAppender {
    name: String,
    shared: Arc<Shared>,
    policy: RwLock<OverflowPolicy>,
    dropped: AtomicU64,
    running: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AsyncAppender {
    /// Create an appender delivering to `backend`, with default capacity,
    /// no batching, and the blocking overflow policy.
    #[must_use]
    pub fn new(backend: Arc<dyn Appender>) -> Self {
        let name = format!("async({})", backend.name());
        let mut appender = Self::without_backend();
        appender.name = name;
        *appender.shared.backend.write() = Some(backend);
        appender
    }

    /// Create an appender with no backend yet. `start` refuses to run until
    /// one is attached via [`set_backend`](AsyncAppender::set_backend).
    #[must_use]
    pub fn without_backend() -> Self {
        Self {
            name: "async".to_owned(),
            shared: Arc::new(Shared {
                backend: RwLock::new(None),
                queue: BoundedQueue::new(DEFAULT_QUEUE_CAPACITY),
                accepting: AtomicBool::new(true),
                batch_size: AtomicUsize::new(0),
                flush_interval_ms: AtomicU64::new(DEFAULT_FLUSH_INTERVAL.as_millis() as u64),
            }),
            policy: RwLock::new(OverflowPolicy::default()),
            dropped: AtomicU64::new(0),
            running: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Set the queue capacity (0 = unbounded).
    #[must_use]
    pub fn with_queue_capacity(self, capacity: usize) -> Self {
        self.shared.queue.set_capacity(capacity);
        self
    }

    /// Set the batch size (0 = deliver events one at a time).
    #[must_use]
    pub fn with_batch_size(self, size: usize) -> Self {
        self.shared.batch_size.store(size, Ordering::Relaxed);
        self
    }

    /// Set the interval after which a partial batch is delivered.
    #[must_use]
    pub fn with_flush_interval(self, interval: Duration) -> Self {
        self.shared
            .flush_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
        self
    }

    /// Set the behavior when the queue is full.
    #[must_use]
    pub fn with_overflow_policy(self, policy: OverflowPolicy) -> Self {
        *self.policy.write() = policy;
        self
    }

    /// Override the diagnostic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the backend appender. In-flight deliveries finish against
    /// the backend they snapshotted; later ones see the new backend.
    pub fn set_backend(&self, backend: Arc<dyn Appender>) {
        *self.shared.backend.write() = Some(backend);
    }

    /// Current backend appender, if one is attached.
    #[must_use]
    pub fn backend(&self) -> Option<Arc<dyn Appender>> {
        self.shared.backend_snapshot()
    }

    /// Spawn `workers` threads draining the queue. Fails if no backend is
    /// attached or the pipeline is already running. A count of zero is
    /// treated as one.
    pub fn start(&self, workers: usize) -> Result<()> {
        if self.shared.backend.read().is_none() {
            return Err(LoggerError::pipeline(
                "cannot start async appender without a backend",
            ));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoggerError::pipeline("async appender is already running"));
        }
        self.shared.accepting.store(true, Ordering::Release);

        let workers = workers.max(1);
        let mut handles = self.workers.lock();
        for index in 0..workers {
            let shared = Arc::clone(&self.shared);
            match thread::Builder::new()
                .name(format!("logchain-async-{index}"))
                .spawn(move || worker_loop(&shared))
            {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    drop(handles);
                    self.stop(false);
                    return Err(LoggerError::pipeline(format!(
                        "failed to spawn async worker: {err}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Stop the pipeline. New events are refused immediately; with
    /// `wait_for_empty` the call polls for up to ten seconds to let the
    /// workers drain what is already queued. Workers are then unblocked,
    /// joined, and the backend flushed once more. The appender can be
    /// started again afterwards.
    pub fn stop(&self, wait_for_empty: bool) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.shared.accepting.store(false, Ordering::Release);

        if wait_for_empty {
            for _ in 0..DRAIN_POLL_LIMIT {
                if self.shared.queue.is_empty() {
                    break;
                }
                thread::sleep(DRAIN_POLL);
            }
        }

        self.shared.queue.stop();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                eprintln!("[WARN] Async log worker panicked during shutdown");
            }
        }

        if let Some(backend) = self.shared.backend_snapshot() {
            if let Err(err) = backend.flush() {
                eprintln!("[WARN] Final flush of '{}' failed: {}", backend.name(), err);
            }
        }
        // Leave the queue usable for a later start.
        self.shared.queue.resume();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Events lost to overflow since construction.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn set_queue_capacity(&self, capacity: usize) {
        self.shared.queue.set_capacity(capacity);
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.shared.batch_size.load(Ordering::Relaxed)
    }

    pub fn set_batch_size(&self, size: usize) {
        self.shared.batch_size.store(size, Ordering::Relaxed);
    }

    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        self.shared.flush_interval()
    }

    pub fn set_flush_interval(&self, interval: Duration) {
        self.shared
            .flush_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn overflow_policy(&self) -> OverflowPolicy {
        *self.policy.read()
    }

    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        *self.policy.write() = policy;
    }

    fn record_drop(&self, event: &LogEvent) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        stats().record_dropped(&event.logger_name, event.message().len());
    }
}

impl Appender for AsyncAppender {
    fn append(&self, event: &Arc<LogEvent>) -> Result<()> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.shared.backend.read().is_none() {
            return Ok(());
        }

        match *self.policy.read() {
            OverflowPolicy::Block => {
                // Only fails when the queue is stopped out from under us.
                if self.shared.queue.push(Arc::clone(event)).is_err() {
                    self.record_drop(event);
                }
            }
            OverflowPolicy::DropOldest => {
                if let Err(rejected) = self.shared.queue.try_push(Arc::clone(event)) {
                    if let Some(evicted) = self.shared.queue.try_pop() {
                        self.record_drop(&evicted);
                    }
                    if self.shared.queue.try_push(rejected).is_err() {
                        self.record_drop(event);
                    }
                }
            }
            OverflowPolicy::DropNewest => {
                if self.shared.queue.try_push(Arc::clone(event)).is_err() {
                    self.record_drop(event);
                }
            }
        }
        Ok(())
    }

    /// Wait until the queue empties (or the pipeline stops), then flush the
    /// backend. Returns immediately when the pipeline is not running.
    fn flush(&self) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        while !self.shared.queue.is_empty() && self.shared.accepting.load(Ordering::Acquire) {
            thread::sleep(DRAIN_POLL);
        }
        if let Some(backend) = self.shared.backend_snapshot() {
            backend.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for AsyncAppender {
    fn drop(&mut self) {
        self.stop(true);
    }
}

fn worker_loop(shared: &Shared) {
    let mut batch: Vec<Arc<LogEvent>> = Vec::new();
    let mut last_flush = Instant::now();

    loop {
        if !shared.accepting.load(Ordering::Acquire) && shared.queue.is_empty() {
            break;
        }

        match shared.queue.pop_timeout(POP_TIMEOUT) {
            Some(event) => {
                let batch_size = shared.batch_size.load(Ordering::Relaxed);
                if batch_size > 0 {
                    batch.push(event);
                    if batch.len() >= batch_size {
                        deliver_batch(shared, &mut batch);
                        last_flush = Instant::now();
                    }
                } else {
                    deliver(shared, &event);
                }
            }
            None => {
                if shared.queue.is_stopped() {
                    break;
                }
            }
        }

        if last_flush.elapsed() >= shared.flush_interval() {
            deliver_batch(shared, &mut batch);
            flush_backend(shared);
            last_flush = Instant::now();
        }
    }

    deliver_batch(shared, &mut batch);
    flush_backend(shared);
}

fn deliver(shared: &Shared, event: &Arc<LogEvent>) {
    if let Some(backend) = shared.backend_snapshot() {
        deliver_to(&backend, event);
    }
}

fn deliver_batch(shared: &Shared, batch: &mut Vec<Arc<LogEvent>>) {
    if batch.is_empty() {
        return;
    }
    let Some(backend) = shared.backend_snapshot() else {
        batch.clear();
        return;
    };
    for event in batch.drain(..) {
        deliver_to(&backend, &event);
    }
}

/// A panicking backend must not take the worker thread down with it.
fn deliver_to(backend: &Arc<dyn Appender>, event: &Arc<LogEvent>) {
    match catch_unwind(AssertUnwindSafe(|| backend.append(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            eprintln!("[WARN] Async delivery to '{}' failed: {}", backend.name(), err);
        }
        Err(_) => {
            eprintln!(
                "[WARN] Appender '{}' panicked while handling a log event",
                backend.name()
            );
        }
    }
}

fn flush_backend(shared: &Shared) {
    if let Some(backend) = shared.backend_snapshot() {
        if let Err(err) = backend.flush() {
            eprintln!("[WARN] Flush of '{}' failed: {}", backend.name(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::SourceLocation;
    use crate::core::level::LogLevel;

    struct RecordingBackend {
        delivered: Mutex<Vec<String>>,
        flushes: AtomicUsize,
    }

    impl RecordingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                flushes: AtomicUsize::new(0),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.delivered.lock().clone()
        }
    }

    impl Appender for RecordingBackend {
        fn append(&self, event: &Arc<LogEvent>) -> Result<()> {
            self.delivered.lock().push(event.message().to_owned());
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingBackend {
        attempts: AtomicUsize,
    }

    impl Appender for FailingBackend {
        fn append(&self, _event: &Arc<LogEvent>) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(LoggerError::other("backend is down"))
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn event(message: &str) -> Arc<LogEvent> {
        Arc::new(LogEvent::with_message(
            LogLevel::Info,
            "async.test",
            message,
            SourceLocation::default(),
        ))
    }

    #[test]
    fn test_name_includes_backend() {
        let appender = AsyncAppender::new(RecordingBackend::new());
        assert_eq!(appender.name(), "async(recording)");
        assert_eq!(AsyncAppender::without_backend().name(), "async");
    }

    #[test]
    fn test_start_requires_backend() {
        let appender = AsyncAppender::without_backend();
        assert!(appender.start(1).is_err());
        assert!(!appender.is_running());

        appender.set_backend(RecordingBackend::new());
        assert!(appender.start(1).is_ok());
        assert!(appender.is_running());
        appender.stop(true);
    }

    #[test]
    fn test_start_twice_fails() {
        let appender = AsyncAppender::new(RecordingBackend::new());
        appender.start(1).unwrap();
        assert!(appender.start(1).is_err());
        appender.stop(true);
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);

        appender.start(1).unwrap();
        appender.append(&event("first run")).unwrap();
        appender.stop(true);
        appender.stop(true);
        assert!(!appender.is_running());

        appender.start(1).unwrap();
        appender.append(&event("second run")).unwrap();
        appender.stop(true);

        assert_eq!(backend.messages(), vec!["first run", "second run"]);
    }

    #[test]
    fn test_single_worker_preserves_order() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);
        appender.start(1).unwrap();

        let expected: Vec<String> = (0..50).map(|i| format!("event {i}")).collect();
        for message in &expected {
            appender.append(&event(message)).unwrap();
        }
        appender.stop(true);

        assert_eq!(backend.messages(), expected);
    }

    #[test]
    fn test_batching_delivers_everything_in_order() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>)
            .with_batch_size(8);
        appender.start(1).unwrap();

        let expected: Vec<String> = (0..20).map(|i| format!("event {i}")).collect();
        for message in &expected {
            appender.append(&event(message)).unwrap();
        }
        appender.stop(true);

        // 20 events with batch size 8: two full batches plus a residual one.
        assert_eq!(backend.messages(), expected);
    }

    #[test]
    fn test_flush_interval_delivers_partial_batch() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>)
            .with_batch_size(100)
            .with_flush_interval(Duration::from_millis(50));
        appender.start(1).unwrap();

        appender.append(&event("a")).unwrap();
        appender.append(&event("b")).unwrap();
        thread::sleep(Duration::from_millis(400));

        // Batch size was never reached; the interval alone flushed it.
        assert_eq!(backend.messages(), vec!["a", "b"]);
        appender.stop(true);
    }

    #[test]
    fn test_drop_newest_rejects_incoming() {
        let appender = AsyncAppender::new(RecordingBackend::new())
            .with_queue_capacity(2)
            .with_overflow_policy(OverflowPolicy::DropNewest);

        appender.append(&event("1")).unwrap();
        appender.append(&event("2")).unwrap();
        appender.append(&event("3")).unwrap();

        assert_eq!(appender.queue_len(), 2);
        assert_eq!(appender.dropped_count(), 1);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>)
            .with_queue_capacity(2)
            .with_overflow_policy(OverflowPolicy::DropOldest);

        for i in 1..=5 {
            appender.append(&event(&i.to_string())).unwrap();
        }
        assert_eq!(appender.queue_len(), 2);
        assert_eq!(appender.dropped_count(), 3);

        appender.start(1).unwrap();
        appender.stop(true);
        assert_eq!(backend.messages(), vec!["4", "5"]);
    }

    #[test]
    fn test_block_policy_waits_for_worker() {
        let backend = RecordingBackend::new();
        let appender = Arc::new(
            AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>).with_queue_capacity(2),
        );

        appender.append(&event("1")).unwrap();
        appender.append(&event("2")).unwrap();
        assert_eq!(appender.queue_len(), 2);

        let producer = {
            let appender = Arc::clone(&appender);
            thread::spawn(move || {
                appender.append(&event("3")).unwrap();
            })
        };
        thread::sleep(Duration::from_millis(100));
        assert!(!producer.is_finished(), "full queue should block the producer");

        // A worker makes room; the parked producer finishes on its own.
        appender.start(1).unwrap();
        producer.join().unwrap();
        appender.stop(true);

        assert_eq!(backend.messages(), vec!["1", "2", "3"]);
        assert_eq!(appender.dropped_count(), 0);
    }

    #[test]
    fn test_append_after_stop_is_ignored() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);
        appender.start(1).unwrap();
        appender.stop(true);

        appender.append(&event("late")).unwrap();
        assert_eq!(appender.queue_len(), 0);
        assert_eq!(appender.dropped_count(), 0);
        assert!(backend.messages().is_empty());
    }

    #[test]
    fn test_stop_without_wait_terminates() {
        let appender = AsyncAppender::new(RecordingBackend::new());
        appender.start(2).unwrap();
        for i in 0..100 {
            appender.append(&event(&i.to_string())).unwrap();
        }
        // Must return promptly even with events still queued.
        appender.stop(false);
        assert!(!appender.is_running());
    }

    #[test]
    fn test_backend_errors_do_not_kill_workers() {
        let backend = Arc::new(FailingBackend {
            attempts: AtomicUsize::new(0),
        });
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);
        appender.start(1).unwrap();

        for i in 0..3 {
            appender.append(&event(&i.to_string())).unwrap();
        }
        appender.stop(true);

        // Every event was attempted despite the failures.
        assert_eq!(backend.attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_set_backend_swaps_target() {
        let first = RecordingBackend::new();
        let second = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&first) as Arc<dyn Appender>);

        appender.start(1).unwrap();
        appender.append(&event("to first")).unwrap();
        appender.stop(true);

        appender.set_backend(Arc::clone(&second) as Arc<dyn Appender>);
        appender.start(1).unwrap();
        appender.append(&event("to second")).unwrap();
        appender.stop(true);

        assert_eq!(first.messages(), vec!["to first"]);
        assert_eq!(second.messages(), vec!["to second"]);
    }

    #[test]
    fn test_flush_drains_queue() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);
        appender.start(1).unwrap();

        for i in 0..20 {
            appender.append(&event(&i.to_string())).unwrap();
        }
        appender.flush().unwrap();

        assert_eq!(appender.queue_len(), 0);
        assert!(backend.flushes.load(Ordering::SeqCst) >= 1);
        appender.stop(true);
    }

    #[test]
    fn test_stop_flushes_backend() {
        let backend = RecordingBackend::new();
        let appender = AsyncAppender::new(Arc::clone(&backend) as Arc<dyn Appender>);
        appender.start(1).unwrap();
        appender.append(&event("x")).unwrap();
        appender.stop(true);
        assert!(backend.flushes.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_configuration_accessors() {
        let appender = AsyncAppender::new(RecordingBackend::new())
            .with_queue_capacity(64)
            .with_batch_size(16)
            .with_flush_interval(Duration::from_millis(250))
            .with_overflow_policy(OverflowPolicy::DropNewest);

        assert_eq!(appender.queue_capacity(), 64);
        assert_eq!(appender.batch_size(), 16);
        assert_eq!(appender.flush_interval(), Duration::from_millis(250));
        assert_eq!(appender.overflow_policy(), OverflowPolicy::DropNewest);

        appender.set_batch_size(0);
        appender.set_overflow_policy(OverflowPolicy::Block);
        assert_eq!(appender.batch_size(), 0);
        assert_eq!(appender.overflow_policy(), OverflowPolicy::Block);
    }
}
