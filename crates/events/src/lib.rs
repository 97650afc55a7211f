//! OpenSky operation journal
//!
//! Append-only JSONL records of every committed operation, chained by hash.
//! The journal is the durable half of the transactional boundary: an
//! operation is journaled only after it has fully validated and applied, and
//! startup replay re-executes recorded commands to rebuild state.

pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod store;

pub use error::JournalError;
pub use hash::{calculate_record_hash, verify_chain, ChainError};
pub use reader::JournalReader;
pub use record::{OperationKind, OperationRecord};
pub use store::JournalStore;
