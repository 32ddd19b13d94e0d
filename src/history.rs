//! Fixed-depth ring of submitted command lines.

use crate::HISTORY_DEPTH;
use crate::line::EditBuffer;

/// Where a step towards newer entries landed.
#[derive(Debug, PartialEq, Eq)]
pub enum Recall<'a> {
    Entry(&'a EditBuffer),
    /// Back on the line being edited.
    Live,
}

/// Circular store of the last [`HISTORY_DEPTH`] submitted lines.
///
/// `head` is the slot the next line goes into. The read cursor counts entries
/// back from `head`: 0 is the live line, 1 the most recent entry, up to `len`.
pub struct History {
    entries: [EditBuffer; HISTORY_DEPTH],
    head: usize,
    len: usize,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub const fn new() -> Self {
        Self {
            entries: [const { EditBuffer::new() }; HISTORY_DEPTH],
            head: 0,
            len: 0,
            cursor: 0,
        }
    }

    /// Stores a copy of `line`, overwriting the oldest entry when full, and
    /// moves the read cursor back to the live line.
    pub fn push(&mut self, line: &EditBuffer) {
        self.entries[self.head].clone_from(line);
        self.head = (self.head + 1) % HISTORY_DEPTH;
        self.len = (self.len + 1).min(HISTORY_DEPTH);
        self.cursor = 0;
    }

    /// Steps one entry back. Returns `None` when already at the oldest entry
    /// (or there is none), leaving the cursor where it is.
    pub fn older(&mut self) -> Option<&EditBuffer> {
        if self.cursor >= self.len {
            return None;
        }
        self.cursor += 1;
        Some(self.entry(self.cursor))
    }

    /// Steps one entry towards the live line. Returns `None` when already there.
    pub fn newer(&mut self) -> Option<Recall<'_>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        if self.cursor == 0 {
            Some(Recall::Live)
        } else {
            Some(Recall::Entry(self.entry(self.cursor)))
        }
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entry(&self, back: usize) -> &EditBuffer {
        &self.entries[(self.head + HISTORY_DEPTH - back) % HISTORY_DEPTH]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> EditBuffer {
        let mut buffer = EditBuffer::new();
        for &byte in text.as_bytes() {
            buffer.push(byte);
        }
        buffer
    }

    fn older_text(history: &mut History) -> Option<std::string::String> {
        history.older().map(|entry| entry.as_str().into())
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::new();
        assert!(history.is_empty());
        assert!(history.older().is_none());
        assert!(history.newer().is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_older_walks_back_and_stops() {
        let mut history = History::new();
        history.push(&line("one"));
        history.push(&line("two"));

        assert_eq!(older_text(&mut history).as_deref(), Some("two"));
        assert_eq!(older_text(&mut history).as_deref(), Some("one"));
        assert_eq!(older_text(&mut history), None);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_newer_returns_to_live() {
        let mut history = History::new();
        history.push(&line("one"));
        history.push(&line("two"));
        history.older();
        history.older();

        match history.newer() {
            Some(Recall::Entry(entry)) => assert_eq!(entry.as_str(), "two"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(history.newer(), Some(Recall::Live));
        assert_eq!(history.newer(), None);
    }

    #[test]
    fn test_wraps_when_full() {
        let mut history = History::new();
        for i in 0..HISTORY_DEPTH + 3 {
            history.push(&line(&std::format!("cmd{i}")));
        }
        assert_eq!(history.len(), HISTORY_DEPTH);

        let mut seen = std::vec::Vec::new();
        while let Some(text) = older_text(&mut history) {
            seen.push(text);
        }
        assert_eq!(seen.len(), HISTORY_DEPTH);
        assert_eq!(seen.first().map(std::string::String::as_str), Some("cmd12"));
        assert_eq!(seen.last().map(std::string::String::as_str), Some("cmd3"));
    }

    #[test]
    fn test_push_resets_cursor() {
        let mut history = History::new();
        history.push(&line("one"));
        history.older();
        history.push(&line("two"));
        assert_eq!(history.cursor(), 0);
        assert_eq!(older_text(&mut history).as_deref(), Some("two"));
    }
}
