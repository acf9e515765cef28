//! Panic capture that keeps the default hook off a raw-mode terminal.
//!
//! [`catch_quietly`] marks the calling thread while the closure runs. The
//! process hook, installed once, sends panics from marked threads to
//! `tracing` and hands every other panic to whichever hook was active before.
//! Installing a different hook later turns the quiet routing off again.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

static INSTALL: Once = Once::new();

fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if QUIET.with(Cell::get) {
                tracing::debug!(panic = %info, "panic captured");
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs `call`, catching a panic without printing it to stderr.
pub(crate) fn catch_quietly<T>(call: impl FnOnce() -> T) -> std::thread::Result<T> {
    install_hook();
    let outer = QUIET.with(|quiet| quiet.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(call));
    QUIET.with(|quiet| quiet.set(outer));
    result
}

#[cfg(test)]
mod tests {
    use super::catch_quietly;

    #[test]
    fn nested_scopes_restore_the_outer_flag() {
        let result = catch_quietly(|| {
            let inner: std::thread::Result<()> = catch_quietly(|| panic!("inner"));
            assert!(inner.is_err());
            super::QUIET.with(std::cell::Cell::get)
        });
        assert_eq!(result.ok(), Some(true));
        assert!(!super::QUIET.with(std::cell::Cell::get));
    }
}
