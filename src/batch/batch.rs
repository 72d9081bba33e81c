use crate::domain::EventRecord;
use std::time::Instant;
use uuid::Uuid;

/// Why a batch was closed and handed off for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The batch reached the configured maximum size.
    Size,
    /// The flush interval elapsed with a non-empty open batch.
    Interval,
    /// The accumulator is shutting down with records still open.
    Shutdown,
}

/// An ordered group of records delivered as one unit.
///
/// Mutable only while open inside the accumulator; once handed to a
/// dispatcher invocation the batch is immutable and owned by that
/// invocation alone.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    records: Vec<EventRecord>,
    reason: FlushReason,
    created_at: Instant,
}

impl Batch {
    pub fn new(records: Vec<EventRecord>, reason: FlushReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            records,
            reason,
            created_at: Instant::now(),
        }
    }

    /// Identifier used to correlate log lines across accumulation and
    /// delivery. Not part of the wire payload.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn reason(&self) -> FlushReason {
        self.reason
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}
