use super::batch::{Batch, FlushReason};
use crate::domain::EventRecord;
use crate::intake::RecordReceiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant as TokioInstant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Hand-off point between the accumulator and whatever delivers batches.
///
/// `dispatch` must not block the caller: implementations take ownership of
/// the batch and run delivery out of band, so a slow or retrying send never
/// stalls accumulation of the next batch.
pub trait BatchSink: Send + Sync {
    fn dispatch(&self, batch: Batch);
}

/// Single-task loop that drains the intake queue into an open batch and
/// flushes it on whichever fires first: the size threshold or the interval
/// timer.
///
/// The size check happens only on append, so the loop never polls. The timer
/// is a no-op while the open batch is empty; it exists to bound worst-case
/// delivery latency during low-volume periods.
pub struct Accumulator {
    receiver: RecordReceiver,
    sink: Arc<dyn BatchSink>,
    max_batch_size: usize,
    flush_interval: Duration,
}

impl Accumulator {
    pub fn new(
        receiver: RecordReceiver,
        sink: Arc<dyn BatchSink>,
        max_batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            sink,
            max_batch_size,
            flush_interval,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut open: Vec<EventRecord> = Vec::with_capacity(self.max_batch_size);

        // First tick lands one full interval from now, then on a fixed
        // cadence. Ticks missed while the loop is busy are delayed, not
        // replayed in a burst.
        let mut ticker = interval_at(
            TokioInstant::now() + self.flush_interval,
            self.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_record = self.receiver.dequeue() => {
                    match maybe_record {
                        Some(record) => {
                            open.push(record);
                            if open.len() == self.max_batch_size {
                                self.flush(&mut open, FlushReason::Size);
                            }
                        }
                        // Queue closed and drained: all producers are gone.
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !open.is_empty() {
                        self.flush(&mut open, FlushReason::Interval);
                    }
                }
                _ = shutdown.cancelled() => {
                    self.receiver.close();
                    loop {
                        let Some(record) = self.receiver.dequeue().await else {
                            break;
                        };
                        open.push(record);
                        if open.len() == self.max_batch_size {
                            self.flush(&mut open, FlushReason::Size);
                        }
                    }
                    break;
                }
            }
        }

        if !open.is_empty() {
            self.flush(&mut open, FlushReason::Shutdown);
        }
        debug!("accumulator stopped");
    }

    fn flush(&self, open: &mut Vec<EventRecord>, reason: FlushReason) {
        let records = std::mem::replace(open, Vec::with_capacity(self.max_batch_size));
        let batch = Batch::new(records, reason);
        debug!(
            batch_id = %batch.id(),
            batch_size = batch.len(),
            reason = ?batch.reason(),
            "batch flushed"
        );
        self.sink.dispatch(batch);
    }
}
