pub mod memory;
pub mod types;
pub mod wal;

pub use memory::MemoryStore;
pub use types::{MetaStore, StoreError, StoreResult};
pub use wal::WalStore;
