//! Row persistence: the generic row API, its typed wrapper and the in-memory
//! backend.

pub mod memory;
pub mod table;
pub mod traits;

pub use memory::MemoryBackend;
pub use table::{Record, Table};
pub use traits::{Filter, Order, RecordId, RowStore};
