mod record;

pub use record::{EventRecord, Login, Metadata, PhoneNumbers};
