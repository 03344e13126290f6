//! Quarantine zone storage.
//!
//! Quarantined files are stored compressed under a name in a backing
//! store and read back as a decompressed stream.

mod codec;
mod config;
mod store;
pub mod storage;

pub use codec::DecompressingReader;
pub use config::{QuarantineConfig, QuarantineKind};
pub use storage::{
    is_remote_reference, open_backend, ArcBackend, LocalBackend, MemoryBackend, ObjectInfo,
    ObjectReader, StorageBackend,
};
pub use store::{Quarantine, QuarantineReader};
