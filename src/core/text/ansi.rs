//! ANSI escape scanning and SGR style carry.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiCodeKind {
    Csi,
    Osc,
    Apc,
    Dcs,
    Ss3,
    /// Two-byte `ESC x` sequences such as `ESC 7` / `ESC 8`.
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiCode<'a> {
    pub code: &'a str,
    pub kind: AnsiCodeKind,
}

impl AnsiCode<'_> {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Select Graphic Rendition (`CSI ... m`).
    pub fn is_sgr(&self) -> bool {
        self.kind == AnsiCodeKind::Csi && self.code.ends_with('m')
    }
}

/// Returns the complete escape sequence starting at byte `pos`, if any.
///
/// Unterminated sequences return `None` so callers treat the ESC byte as text
/// instead of swallowing the rest of the line.
pub fn extract_ansi_code(input: &str, pos: usize) -> Option<AnsiCode<'_>> {
    let bytes = input.as_bytes();
    if pos + 1 >= bytes.len() || bytes[pos] != 0x1b {
        return None;
    }

    let (end, kind) = match bytes[pos + 1] {
        b'[' => (csi_end(bytes, pos + 2)?, AnsiCodeKind::Csi),
        b']' => (string_terminated_end(bytes, pos + 2)?, AnsiCodeKind::Osc),
        b'_' => (string_terminated_end(bytes, pos + 2)?, AnsiCodeKind::Apc),
        b'P' => (string_terminated_end(bytes, pos + 2)?, AnsiCodeKind::Dcs),
        b'O' if pos + 2 < bytes.len() => (pos + 3, AnsiCodeKind::Ss3),
        b'7' | b'8' | b'=' | b'>' | b'c' | b'M' => (pos + 2, AnsiCodeKind::Short),
        _ => return None,
    };

    Some(AnsiCode {
        code: &input[pos..end],
        kind,
    })
}

fn csi_end(bytes: &[u8], mut idx: usize) -> Option<usize> {
    while idx < bytes.len() {
        if (0x40..=0x7e).contains(&bytes[idx]) {
            return Some(idx + 1);
        }
        idx += 1;
    }
    None
}

fn string_terminated_end(bytes: &[u8], mut idx: usize) -> Option<usize> {
    while idx < bytes.len() {
        if bytes[idx] == 0x07 {
            return Some(idx + 1);
        }
        if bytes[idx] == 0x1b && bytes.get(idx + 1) == Some(&b'\\') {
            return Some(idx + 2);
        }
        idx += 1;
    }
    None
}

/// A run of either one escape sequence or escape-free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Escape(AnsiCode<'a>),
    Text(&'a str),
}

/// Splits `input` into escape sequences and the plain text between them.
pub fn segments(input: &str) -> Segments<'_> {
    Segments { input, pos: 0 }
}

pub struct Segments<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }
        if let Some(code) = extract_ansi_code(self.input, self.pos) {
            self.pos += code.len();
            return Some(Segment::Escape(code));
        }

        let start = self.pos;
        let mut idx = start;
        for (offset, ch) in self.input[start..].char_indices() {
            idx = start + offset;
            if ch == '\x1b' && idx > start && extract_ansi_code(self.input, idx).is_some() {
                self.pos = idx;
                return Some(Segment::Text(&self.input[start..idx]));
            }
            idx += ch.len_utf8();
        }
        self.pos = idx;
        Some(Segment::Text(&self.input[start..idx]))
    }
}

/// Removes every complete escape sequence from `input`.
pub fn strip_ansi(input: &str) -> String {
    segments(input)
        .filter_map(|segment| match segment {
            Segment::Text(text) => Some(text),
            Segment::Escape(_) => None,
        })
        .collect()
}

/// Tracks the SGR parameters active since the last reset so wrapped lines can
/// reopen the same style.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SgrTracker {
    params: Vec<String>,
    underline: bool,
}

impl SgrTracker {
    pub fn process(&mut self, code: &AnsiCode<'_>) {
        if !code.is_sgr() {
            return;
        }
        let params = &code.code[2..code.code.len() - 1];
        if params.is_empty() || params == "0" {
            self.params.clear();
            self.underline = false;
            return;
        }
        for param in params.split(';') {
            match param {
                "0" => {
                    self.params.clear();
                    self.underline = false;
                    continue;
                }
                "4" => self.underline = true,
                "24" => self.underline = false,
                _ => {}
            }
        }
        self.params.push(params.to_string());
    }

    /// Escape sequence that re-establishes the tracked style.
    pub fn active_codes(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        format!("\x1b[{}m", self.params.join(";"))
    }

    /// Closes styles that would otherwise bleed past the end of a line.
    pub fn line_end_reset(&self) -> &'static str {
        if self.underline {
            "\x1b[24m"
        } else {
            ""
        }
    }

    pub fn observe_text(&mut self, text: &str) {
        for segment in segments(text) {
            if let Segment::Escape(code) = segment {
                self.process(&code);
            }
        }
    }
}
