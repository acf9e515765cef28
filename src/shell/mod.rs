//! Shell-text analysis: deciding whether submitted lines form a complete command.

mod grammar;
pub mod multiline;
mod scan;

pub use multiline::{LineStatus, MultilineAccumulator, Pending, MAX_ACCUMULATED_BYTES};
