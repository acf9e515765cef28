//! Decoding of raw terminal input into key events.
//!
//! Input arrives in arbitrary chunks: an escape sequence or a multi-byte UTF-8
//! character can be split across reads. The decoder buffers incomplete tails
//! and only emits complete keys. A lone `ESC` is ambiguous (Escape key vs. the
//! start of a sequence), so it stays pending until the caller decides the input
//! has gone quiet and calls [`KeyDecoder::flush_pending`].

const ESC: u8 = 0x1b;
const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Bracketed paste payload, with CRs normalized to newlines.
    Paste(String),
    Enter,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    F1,
    /// Control chord; the payload is the lowercase letter (`Ctrl('c')`).
    Ctrl(char),
    /// `ESC` followed by a printable character.
    Alt(char),
    /// A complete sequence we do not map.
    Unknown(String),
}

#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
    paste: Option<Vec<u8>>,
}

enum Step {
    Key(Key, usize),
    /// Skip bytes without emitting anything (e.g. the paste start marker).
    Skip(usize),
    Incomplete,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when bytes are buffered waiting for the rest of a sequence.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() && self.paste.is_none()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Key> {
        self.pending.extend_from_slice(bytes);
        let mut keys = Vec::new();

        loop {
            if let Some(paste) = self.paste.as_mut() {
                paste.extend(self.pending.drain(..));
                let Some(end) = find(paste, PASTE_END) else {
                    break;
                };
                let rest = paste.split_off(end + PASTE_END.len());
                paste.truncate(end);
                let text = String::from_utf8_lossy(paste).replace("\r\n", "\n").replace('\r', "\n");
                keys.push(Key::Paste(text));
                self.paste = None;
                self.pending = rest;
                continue;
            }

            if self.pending.is_empty() {
                break;
            }

            match decode_one(&self.pending) {
                Step::Key(key, consumed) => {
                    self.pending.drain(..consumed);
                    keys.push(key);
                }
                Step::Skip(consumed) => {
                    let is_paste_start = self.pending.starts_with(PASTE_START);
                    self.pending.drain(..consumed);
                    if is_paste_start {
                        self.paste = Some(Vec::new());
                    }
                }
                Step::Incomplete => break,
            }
        }

        keys
    }

    /// Emits whatever is buffered as complete keys. Called after an input lull.
    pub fn flush_pending(&mut self) -> Vec<Key> {
        if self.paste.is_some() {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.pending);
        match pending.as_slice() {
            [] => Vec::new(),
            [ESC] => vec![Key::Escape],
            [ESC, rest @ ..] => {
                let mut keys = vec![Key::Escape];
                keys.extend(self.feed(rest));
                keys.extend(self.flush_pending());
                keys
            }
            other => vec![Key::Unknown(String::from_utf8_lossy(other).into_owned())],
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn decode_one(bytes: &[u8]) -> Step {
    let first = bytes[0];
    match first {
        ESC => decode_escape(bytes),
        b'\r' | b'\n' => Step::Key(Key::Enter, 1),
        b'\t' => Step::Key(Key::Tab, 1),
        0x7f | 0x08 => Step::Key(Key::Backspace, 1),
        0x01..=0x1a => Step::Key(Key::Ctrl((b'a' + first - 1) as char), 1),
        0x00..=0x1f => Step::Key(Key::Unknown(String::from_utf8_lossy(&bytes[..1]).into_owned()), 1),
        _ => decode_utf8(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> Step {
    let len = match bytes[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Step::Key(Key::Unknown(format!("\\x{:02x}", bytes[0])), 1),
    };
    if bytes.len() < len {
        return Step::Incomplete;
    }
    match std::str::from_utf8(&bytes[..len]) {
        Ok(text) => match text.chars().next() {
            Some(ch) => Step::Key(Key::Char(ch), len),
            None => Step::Skip(len),
        },
        Err(_) => Step::Key(Key::Unknown(format!("\\x{:02x}", bytes[0])), 1),
    }
}

fn decode_escape(bytes: &[u8]) -> Step {
    let Some(&second) = bytes.get(1) else {
        return Step::Incomplete;
    };

    match second {
        b'[' => decode_csi(bytes),
        b'O' => match bytes.get(2) {
            None => Step::Incomplete,
            Some(&third) => Step::Key(ss3_key(third, &bytes[..3]), 3),
        },
        ESC => Step::Key(Key::Escape, 1),
        b'\r' => Step::Key(Key::Alt('\r'), 2),
        0x20..=0x7e => Step::Key(Key::Alt(second as char), 2),
        _ => Step::Key(Key::Escape, 1),
    }
}

fn decode_csi(bytes: &[u8]) -> Step {
    let Some(offset) = bytes[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        return Step::Incomplete;
    };
    let end = 2 + offset + 1;
    let sequence = &bytes[..end];
    if sequence == PASTE_START {
        return Step::Skip(end);
    }

    let key = match sequence {
        b"\x1b[A" => Key::Up,
        b"\x1b[B" => Key::Down,
        b"\x1b[C" => Key::Right,
        b"\x1b[D" => Key::Left,
        b"\x1b[H" | b"\x1b[1~" | b"\x1b[7~" => Key::Home,
        b"\x1b[F" | b"\x1b[4~" | b"\x1b[8~" => Key::End,
        b"\x1b[3~" => Key::Delete,
        b"\x1b[11~" => Key::F1,
        _ => Key::Unknown(String::from_utf8_lossy(sequence).into_owned()),
    };
    Step::Key(key, end)
}

fn ss3_key(final_byte: u8, sequence: &[u8]) -> Key {
    match final_byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'P' => Key::F1,
        _ => Key::Unknown(String::from_utf8_lossy(sequence).into_owned()),
    }
}
