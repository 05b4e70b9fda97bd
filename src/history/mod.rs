// src/history/mod.rs
pub mod backup;
pub mod ingested;
pub mod key;
pub mod lock;
pub mod merge;
pub mod store;
pub mod table_history;

pub use ingested::{IngestLedger, IngestRunRow};
pub use key::identity_key;
pub use lock::IngestLock;
pub use merge::{merge_rows, MergeStats};
pub use store::{read_dataset, AtomicWriter, Dataset, WriteReport};
