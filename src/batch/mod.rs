mod accumulator;
mod batch;

pub use accumulator::{Accumulator, BatchSink};
pub use batch::{Batch, FlushReason};
