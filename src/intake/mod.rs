use crate::domain::EventRecord;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Invalid queue capacity")]
    InvalidCapacity,
    #[error("Queue is closed")]
    Closed,
}

/// Bounded FIFO buffer between producers and the accumulator.
///
/// The queue is the only shared resource on the intake path and its capacity
/// is the only backpressure signal producers receive: `enqueue` suspends while
/// the queue is full and never drops a record. Constructed once at startup and
/// handed to both the intake adapter and the accumulator.
pub struct IntakeQueue;

impl IntakeQueue {
    pub fn bounded(capacity: usize) -> Result<(RecordSender, RecordReceiver), QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }

        let (tx, rx) = mpsc::channel(capacity);
        Ok((RecordSender { tx, capacity }, RecordReceiver { rx }))
    }
}

/// Producer half of the intake queue. Cheap to clone; one per connection.
#[derive(Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<EventRecord>,
    capacity: usize,
}

impl RecordSender {
    /// Appends one record, suspending while the queue is at capacity.
    ///
    /// Fails only when the receiving side has been closed during shutdown.
    pub async fn enqueue(&self, record: EventRecord) -> Result<(), QueueError> {
        self.tx.send(record).await.map_err(|_| QueueError::Closed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer half of the intake queue, owned exclusively by the accumulator.
pub struct RecordReceiver {
    rx: mpsc::Receiver<EventRecord>,
}

impl RecordReceiver {
    /// Suspends until a record is available. Yields `None` once the queue is
    /// closed and fully drained.
    pub async fn dequeue(&mut self) -> Option<EventRecord> {
        self.rx.recv().await
    }

    /// Stops accepting new records. Buffered records remain dequeueable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
