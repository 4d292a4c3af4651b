pub mod event;

pub use event::{Event, EventChanges, EventView, NewEvent};
