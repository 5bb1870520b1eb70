//! Job change notifications and the bus that distributes them.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::{JobEvent, JobEventKind};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
