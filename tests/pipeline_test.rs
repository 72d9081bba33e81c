use event_relay::batch::{Accumulator, Batch, BatchSink, FlushReason};
use event_relay::domain::{EventRecord, Metadata, PhoneNumbers};
use event_relay::intake::{IntakeQueue, RecordSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sink that records every flushed batch instead of delivering it.
#[derive(Clone, Default)]
struct RecordingSink {
    batches: Arc<Mutex<Vec<Batch>>>,
}

impl RecordingSink {
    fn flushed(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }
}

impl BatchSink for RecordingSink {
    fn dispatch(&self, batch: Batch) {
        self.batches.lock().unwrap().push(batch);
    }
}

fn record(n: i64) -> EventRecord {
    EventRecord {
        user_id: n,
        total: n as f64,
        title: format!("r{n}"),
        meta: Metadata {
            logins: vec![],
            phone_numbers: PhoneNumbers {
                home: String::new(),
                mobile: String::new(),
            },
        },
        completed: false,
    }
}

fn user_ids(batch: &Batch) -> Vec<i64> {
    batch.records().iter().map(|r| r.user_id).collect()
}

fn start_accumulator(
    max_batch_size: usize,
    flush_interval: Duration,
) -> (
    RecordSender,
    RecordingSink,
    CancellationToken,
    JoinHandle<()>,
) {
    let (tx, rx) = IntakeQueue::bounded(64).unwrap();
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();
    let accumulator = Accumulator::new(rx, Arc::new(sink.clone()), max_batch_size, flush_interval);
    let handle = tokio::spawn(accumulator.run(shutdown.clone()));
    (tx, sink, shutdown, handle)
}

#[tokio::test(start_paused = true)]
async fn size_threshold_flushes_immediately() {
    let (tx, sink, shutdown, handle) = start_accumulator(2, Duration::from_secs(5));

    tx.enqueue(record(1)).await.unwrap();
    tx.enqueue(record(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].reason(), FlushReason::Size);
    assert_eq!(user_ids(&flushed[0]), vec![1, 2]);

    // Six more time units: the timer fires once on an empty batch and must
    // not produce a second flush.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(sink.flushed().len(), 1);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_flushes_partial_batch() {
    let (tx, sink, shutdown, handle) = start_accumulator(2, Duration::from_secs(5));

    tx.enqueue(record(3)).await.unwrap();

    // Nothing before the interval elapses.
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(sink.flushed().is_empty());

    // One flush at ~5 time units.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].reason(), FlushReason::Interval);
    assert_eq!(user_ids(&flushed[0]), vec![3]);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn timer_is_noop_while_batch_is_empty() {
    let (_tx, sink, shutdown, handle) = start_accumulator(10, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(sink.flushed().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fifo_order_within_and_across_batches() {
    let (tx, sink, shutdown, handle) = start_accumulator(2, Duration::from_secs(5));

    for n in 1..=5 {
        tx.enqueue(record(n)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 2);
    assert_eq!(user_ids(&flushed[0]), vec![1, 2]);
    assert_eq!(user_ids(&flushed[1]), vec![3, 4]);

    // The straggler goes out on the timer.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 3);
    assert_eq!(user_ids(&flushed[2]), vec![5]);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn batches_never_exceed_max_size() {
    let (tx, sink, shutdown, handle) = start_accumulator(3, Duration::from_secs(5));

    for n in 1..=7 {
        tx.enqueue(record(n)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(6)).await;

    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 3);
    assert!(flushed.iter().all(|b| b.len() <= 3));
    assert!(flushed.iter().all(|b| !b.is_empty()));

    let delivered: Vec<i64> = flushed.iter().flat_map(|b| user_ids(b)).collect();
    assert_eq!(delivered, vec![1, 2, 3, 4, 5, 6, 7]);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancellation_flushes_open_batch() {
    let (tx, sink, shutdown, handle) = start_accumulator(10, Duration::from_secs(60));

    tx.enqueue(record(1)).await.unwrap();
    tx.enqueue(record(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    shutdown.cancel();
    handle.await.unwrap();

    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].reason(), FlushReason::Shutdown);
    assert_eq!(user_ids(&flushed[0]), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn queue_is_drained_when_producers_drop() {
    let (tx, sink, _shutdown, handle) = start_accumulator(10, Duration::from_secs(60));

    tx.enqueue(record(1)).await.unwrap();
    tx.enqueue(record(2)).await.unwrap();
    drop(tx);

    handle.await.unwrap();

    let flushed = sink.flushed();
    assert_eq!(flushed.len(), 1);
    assert_eq!(user_ids(&flushed[0]), vec![1, 2]);
}
