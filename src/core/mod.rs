//! Terminal-facing building blocks: key decoding, output, width probing and text layout.

pub mod keys;
pub mod output;
pub mod probe;
pub(crate) mod quiet;
pub mod terminal;
pub mod text;
