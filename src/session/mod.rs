//! Interactive session: state, events, the reducer, layout and the loop that drives them.

pub mod controller;
pub mod event;
pub mod queue;
pub mod reducer;
pub mod render;
pub mod state;

pub use controller::Session;
pub use event::{Effect, Generation, SessionEvent};
pub use queue::EventQueue;
pub use reducer::reduce;
pub use render::{render, Frame};
pub use state::{History, LastError, SessionConfig, SessionOutcome, SessionState, Status};
