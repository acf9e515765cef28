//! Terminal capability probing for ambiguous glyph widths.
//!
//! Emoji and other ambiguous code points render at one or two columns depending
//! on the terminal and its font. We measure them on the live terminal with the
//! DSR cursor-position report:
//!
//! ```text
//! ESC 7  ESC [1G  <glyph>  ESC [6n   ->   ESC [ row ; col R   ->   ESC 8  ESC [K
//! ```
//!
//! The reported column minus one is the glyph width. Results (including the
//! fallback for failed probes) are memoized in a process-wide [`WidthCache`].
//!
//! Probing blocks for up to the probe timeout, so it must never run on the
//! session event loop; callers prewarm the cache before the loop starts.

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Width assumed when a glyph cannot be measured.
pub const DEFAULT_PROBE_WIDTH: u8 = 1;

/// Default bound on how long we wait for the cursor-position report.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

const SAVE_CURSOR: &str = "\x1b7";
const MOVE_TO_COLUMN_ONE: &str = "\x1b[1G";
const REQUEST_CURSOR_POSITION: &str = "\x1b[6n";
const RESTORE_CURSOR: &str = "\x1b8";
const ERASE_TO_LINE_END: &str = "\x1b[K";

/// Shortest well-formed report: `ESC [ 1 ; 2 R`.
const MIN_REPORT_LEN: usize = 6;

/// Measures how many columns a glyph occupies on the attached terminal.
///
/// Returns `None` when the width cannot be determined; callers fall back to
/// [`DEFAULT_PROBE_WIDTH`].
pub trait CapabilityProbe: Send + Sync {
    fn probe_width(&self, ch: char) -> Option<u8>;
}

/// Probe used when no interactive terminal is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl CapabilityProbe for NoProbe {
    fn probe_width(&self, _ch: char) -> Option<u8> {
        None
    }
}

/// Byte transport for one probe exchange.
pub trait ProbeIo {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads whatever is available within `timeout`; `Ok(0)` means nothing arrived.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// Runs the save/print/query/restore exchange for `ch` over `io`.
pub fn measure_glyph(io: &mut dyn ProbeIo, ch: char, timeout: Duration) -> Option<u8> {
    let mut query = String::with_capacity(16);
    query.push_str(SAVE_CURSOR);
    query.push_str(MOVE_TO_COLUMN_ONE);
    query.push(ch);
    query.push_str(REQUEST_CURSOR_POSITION);
    if io.write(query.as_bytes()).is_err() {
        let _ = io.write(format!("{RESTORE_CURSOR}{ERASE_TO_LINE_END}").as_bytes());
        return None;
    }

    let response = read_report(io, timeout);
    let _ = io.write(format!("{RESTORE_CURSOR}{ERASE_TO_LINE_END}").as_bytes());

    let response = response.ok()?;
    if response.len() < MIN_REPORT_LEN {
        tracing::debug!(glyph = %ch, bytes = response.len(), "short cursor report");
        return None;
    }

    let column = parse_cursor_report(&response);
    match column - 1 {
        width @ (1 | 2) => Some(width as u8),
        _ => {
            tracing::debug!(glyph = %ch, column, "cursor report outside expected range");
            None
        }
    }
}

fn read_report(io: &mut dyn ProbeIo, timeout: Duration) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut response = Vec::with_capacity(32);
    let mut buf = [0u8; 32];
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let read = io.read_timeout(&mut buf, deadline - now)?;
        if read == 0 {
            break;
        }
        response.extend_from_slice(&buf[..read]);
        if response.contains(&b'R') {
            break;
        }
    }
    Ok(response)
}

/// Extracts the column from an `ESC [ row ; col R` report.
///
/// Leading garbage before the escape introducer is skipped, and a missing or
/// malformed row is tolerated. Returns `-1` when no valid report is present.
pub fn parse_cursor_report(bytes: &[u8]) -> i32 {
    let mut start = 0;
    while let Some(offset) = bytes[start..].iter().position(|&b| b == 0x1b) {
        let esc = start + offset;
        if bytes.get(esc + 1) == Some(&b'[') {
            if let Some(column) = parse_report_body(&bytes[esc + 2..]) {
                return column;
            }
        }
        start = esc + 1;
    }
    -1
}

fn parse_report_body(body: &[u8]) -> Option<i32> {
    let end = body.iter().position(|&b| b == b'R')?;
    let body = &body[..end];
    let column = match body.iter().rposition(|&b| b == b';') {
        Some(separator) => &body[separator + 1..],
        None => body,
    };
    if column.is_empty() || !column.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(column).ok()?.parse::<i32>().ok()
}

/// Process-wide memo of measured glyph widths.
#[derive(Debug, Default)]
pub struct WidthCache {
    widths: RwLock<HashMap<char, u8>>,
    probe_lock: Mutex<()>,
}

impl WidthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ch: char) -> Option<u8> {
        let widths = match self.widths.read() {
            Ok(widths) => widths,
            Err(poisoned) => poisoned.into_inner(),
        };
        widths.get(&ch).copied()
    }

    pub fn insert(&self, ch: char, width: u8) {
        let mut widths = match self.widths.write() {
            Ok(widths) => widths,
            Err(poisoned) => poisoned.into_inner(),
        };
        widths.insert(ch, width);
    }

    /// Returns the cached width, probing at most once per glyph.
    ///
    /// Concurrent callers racing on the same glyph serialize on the probe lock
    /// and re-check the cache, so only the first one talks to the terminal.
    pub fn resolve(&self, ch: char, probe: &dyn CapabilityProbe) -> u8 {
        if let Some(width) = self.get(ch) {
            return width;
        }

        let _probing = match self.probe_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(width) = self.get(ch) {
            return width;
        }

        let width = probe.probe_width(ch).unwrap_or(DEFAULT_PROBE_WIDTH);
        self.insert(ch, width);
        width
    }

    pub fn len(&self) -> usize {
        match self.widths.read() {
            Ok(widths) => widths.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_WIDTH_CACHE: Lazy<WidthCache> = Lazy::new(WidthCache::new);

/// The cache consulted by all width calculations in this process.
pub fn width_cache() -> &'static WidthCache {
    &GLOBAL_WIDTH_CACHE
}

/// Probes every probe-worthy glyph in `chars` into the global cache.
///
/// Returns how many glyphs were resolved (cached or newly measured).
pub fn prewarm<I>(chars: I, probe: &dyn CapabilityProbe) -> usize
where
    I: IntoIterator<Item = char>,
{
    let mut resolved = 0;
    for ch in chars {
        if crate::core::text::width::needs_probe(ch) {
            width_cache().resolve(ch, probe);
            resolved += 1;
        }
    }
    resolved
}
