pub mod event;
pub mod events;

pub use event::Event;
pub use events::{Diagnostic, EventKind};
