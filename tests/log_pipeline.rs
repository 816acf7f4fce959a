use isx_pool::ThreadPool;
use isx_pool::config::LoggingConfig;
use isx_pool::log::{AsyncLogger, LogLevel, LogRecord, SeverityFilter, WriterSink};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;
use std::thread;

/// A writer whose bytes stay readable after the sink took ownership.
#[derive(Clone, Default)]
struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
}

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        let bytes = self.bytes.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn logger(filter: SeverityFilter) -> (AsyncLogger, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let config = LoggingConfig {
        log_level: filter,
        ..LoggingConfig::default()
    };
    let pool = Arc::new(ThreadPool::new(2));

    let logger = AsyncLogger::new(&config, WriterSink::new(buffer.clone()), pool);
    (logger, buffer)
}

#[test]
fn test_records_are_written_in_order() {
    let (logger, buffer) = logger(SeverityFilter::Trace);

    for i in 0..50 {
        logger.debug(format!("message {i}"));
    }
    logger.flush();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 50);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!("message {i}")), "{line}");
    }
    assert_eq!(logger.pending(), 0);
}

#[test]
fn test_record_layout() {
    let (logger, buffer) = logger(SeverityFilter::Debug);

    logger.warning("disk almost full");
    logger.flush();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);

    let line = &lines[0];
    assert!(line.starts_with("ThreadId("), "{line}");
    assert!(line.contains(" [Warning] - ["), "{line}");
    assert!(line.contains("log_pipeline.rs:"), "{line}");
    assert!(line.ends_with("] disk almost full"), "{line}");
}

#[test]
fn test_filter_drops_lower_severities() {
    let (logger, buffer) = logger(SeverityFilter::ProdWarnErr);

    logger.trace("dropped");
    logger.debug("dropped");
    logger.prod("kept prod");
    logger.warning("kept warning");
    logger.error("kept error");
    logger.flush();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.contains("kept")));
}

#[test]
fn test_no_logs_writes_nothing() {
    let (logger, buffer) = logger(SeverityFilter::NoLogs);

    logger.error("not even errors");
    logger.flush();

    assert!(buffer.lines().is_empty());
}

#[test]
fn test_drop_flushes_pending_records() {
    let (logger, buffer) = logger(SeverityFilter::Debug);

    for i in 0..20 {
        logger.prod(format!("shutdown {i}"));
    }
    drop(logger);

    assert_eq!(buffer.lines().len(), 20);
}

#[test]
fn test_only_last_handle_flushes_on_drop() {
    let (logger, buffer) = logger(SeverityFilter::Debug);

    let clone = logger.clone();
    drop(clone);
    assert_eq!(buffer.flushes(), 0);

    drop(logger);
    assert_eq!(buffer.flushes(), 1);
}

#[test]
fn test_logging_after_pool_shutdown() {
    let buffer = SharedBuffer::default();
    let pool = Arc::new(ThreadPool::new(1));
    let logger = AsyncLogger::new(
        &LoggingConfig::default(),
        WriterSink::new(buffer.clone()),
        pool.clone(),
    );

    pool.shutdown();

    logger.prod("first");
    logger.prod("second");

    // Nothing can be scheduled any more, so records are written inline.
    assert_eq!(logger.pending(), 0);
    let lines = buffer.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with("second"));
}

#[test]
fn test_logger_outliving_caller_handles() {
    let buffer = SharedBuffer::default();
    let pool = Arc::new(ThreadPool::new(2));
    let logger = AsyncLogger::new(
        &LoggingConfig::default(),
        WriterSink::new(buffer.clone()),
        pool.clone(),
    );

    let late = logger.clone();
    let (done, finished) = mpsc::channel();

    pool.enqueue_detach(move || {
        thread::sleep(Duration::from_millis(50));
        late.prod("from the last handle");
        // Releases the last logger handle and with it the last pool handle.
        drop(late);
        done.send(()).unwrap();
    });
    drop(pool);
    drop(logger);

    finished
        .recv_timeout(Duration::from_secs(5))
        .expect("task did not finish after releasing the logger");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("from the last handle"));
}

#[test]
fn test_concurrent_producers_lose_nothing() {
    let (logger, buffer) = logger(SeverityFilter::Trace);

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    logger.trace(format!("producer {p} record {i}"));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    logger.flush();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 400);

    // Each producer's records keep their relative order.
    for p in 0..4 {
        let prefix = format!("producer {p} record ");
        let order: Vec<usize> = lines
            .iter()
            .filter_map(|line| line.split(&prefix).nth(1))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }
}

#[test]
fn test_severity_filter_labels() {
    assert_eq!(SeverityFilter::NoLogs.label(), "");
    assert_eq!(SeverityFilter::ProdWarnErr.label(), "Prod/Warning/Error");
    assert_eq!(SeverityFilter::Debug.label(), "Debug");
    assert_eq!(SeverityFilter::Trace.label(), "Trace");
}

#[test]
fn test_severity_filter_from_int() {
    assert_eq!(SeverityFilter::try_from(0u8), Ok(SeverityFilter::NoLogs));
    assert_eq!(SeverityFilter::try_from(3u8), Ok(SeverityFilter::Trace));
    assert!(SeverityFilter::try_from(4u8).is_err());

    assert!(SeverityFilter::Debug.allows(LogLevel::Debug));
    assert!(!SeverityFilter::Debug.allows(LogLevel::Trace));
    assert!(SeverityFilter::ProdWarnErr.allows(LogLevel::Error));
}

#[test]
fn test_record_captures_caller() {
    let record = LogRecord::new(LogLevel::Error, "here");

    assert!(record.location.file().ends_with("log_pipeline.rs"));
    assert_eq!(record.thread, thread::current().id());
    assert_eq!(record.to_string().matches("[Error]").count(), 1);
}
