//! Line intake: turns the inbound byte stream into edit events and lines.

use crate::history::{History, Recall};
use crate::{DEL, ESC, LINE_CAPACITY};
use heapless::Vec;

/// Text of the line being edited.
///
/// Holds at most `LINE_CAPACITY - 1` bytes so a copy always fits a
/// null-terminated buffer of `LINE_CAPACITY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    bytes: Vec<u8, LINE_CAPACITY>,
}

impl EditBuffer {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Appends `byte`, returning `false` when the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= LINE_CAPACITY - 1 {
            return false;
        }
        self.bytes.push(byte).is_ok()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line as text; empty if it is not valid UTF-8.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Progress through a multi-byte control sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EscapeState {
    #[default]
    Idle,
    /// Seen `ESC`.
    Escaped,
    /// Seen `ESC [`.
    Csi,
}

/// What the console has to do after a byte was fed to the editor.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    /// Nothing to output.
    None,
    /// Echo this byte back.
    Echo(u8),
    /// A complete line; it is already stored in the history.
    Submit(EditBuffer),
    /// Enter on an empty line: reprint the prompt only.
    Prompt,
    /// `ESC ESC`: go back one page and reprint the prompt.
    Cancel,
    /// The buffer was replaced from history: redraw prompt and line.
    Redraw,
}

#[derive(Default)]
pub struct LineEditor {
    buffer: EditBuffer,
    history: History,
    escape: EscapeState,
}

impl LineEditor {
    pub const fn new() -> Self {
        Self {
            buffer: EditBuffer::new(),
            history: History::new(),
            escape: EscapeState::Idle,
        }
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn escape_state(&self) -> EscapeState {
        self.escape
    }

    pub fn feed(&mut self, byte: u8) -> Event {
        match self.escape {
            EscapeState::Csi => {
                self.escape = EscapeState::Idle;
                match byte {
                    b'A' => self.recall_older(),
                    b'B' => self.recall_newer(),
                    _ => Event::None,
                }
            }
            EscapeState::Escaped => match byte {
                ESC => {
                    self.escape = EscapeState::Idle;
                    self.buffer.clear();
                    self.history.reset_cursor();
                    Event::Cancel
                }
                b'[' => {
                    self.escape = EscapeState::Csi;
                    Event::None
                }
                _ => {
                    self.escape = EscapeState::Idle;
                    self.feed_idle(byte)
                }
            },
            EscapeState::Idle => self.feed_idle(byte),
        }
    }

    fn feed_idle(&mut self, byte: u8) -> Event {
        match byte {
            b'\r' => {
                if self.buffer.is_empty() {
                    return Event::Prompt;
                }
                self.history.push(&self.buffer);
                Event::Submit(core::mem::take(&mut self.buffer))
            }
            ESC => {
                self.escape = EscapeState::Escaped;
                Event::None
            }
            DEL => {
                self.buffer.pop();
                Event::Echo(DEL)
            }
            _ => {
                if !self.buffer.push(byte) {
                    trace!("line full, dropping byte");
                }
                Event::Echo(byte)
            }
        }
    }

    fn recall_older(&mut self) -> Event {
        match self.history.older() {
            Some(entry) => self.buffer.clone_from(entry),
            None => self.buffer.clear(),
        }
        Event::Redraw
    }

    fn recall_newer(&mut self) -> Event {
        match self.history.newer() {
            Some(Recall::Entry(entry)) => self.buffer.clone_from(entry),
            Some(Recall::Live) => self.buffer.clear(),
            None => return Event::None,
        }
        Event::Redraw
    }
}
