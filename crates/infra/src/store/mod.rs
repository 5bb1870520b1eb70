//! Job storage: the keyed record store the controllers read and patch.

pub mod in_memory;
pub mod patch;
pub mod r#trait;

pub use in_memory::InMemoryJobStore;
pub use patch::{JobPatch, merge_patch};
pub use r#trait::{JobStore, StoreError};
