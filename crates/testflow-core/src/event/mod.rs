//! Eventos del lifecycle y listeners.

mod listener;
mod types;

pub use listener::{CompositeListener, InMemoryEventLog, LifecycleListener, RecordedEvent};
pub use types::{LifecycleEvent, LifecycleEventKind};
