//! Text helpers (ANSI parsing, width calculations, wrapping, truncation).
//!
//! These helpers are pure (string in/string out) apart from reading the
//! process-wide glyph width cache.

pub mod ansi;
pub mod slice;
pub mod utils;
pub mod width;
