// ============================================================================
// HISTORY: snapshot log with an undo/redo cursor and bounded memory
// ============================================================================

use image::RgbaImage;

use crate::params::EffectParams;

/// One step in the session history.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Full snapshot of the working buffer after the step.
    pub snapshot: RgbaImage,
    /// Human-readable summary of what changed.
    pub label: String,
    /// Marks a fresh starting point (open, crop, rotation, removal commit).
    pub is_base: bool,
    /// The parameter record in force when the snapshot was taken.
    pub params: EffectParams,
}

impl HistoryEntry {
    fn memory_size(&self) -> usize {
        self.snapshot.as_raw().len() + self.label.len()
    }
}

/// Linear history. The cursor points at the entry currently on screen;
/// pushing while the cursor sits behind the tail drops the redo suffix
/// first. Old entries are pruned from the front to stay inside the count
/// and memory limits, at the cost of how far back undo can reach.
#[derive(Clone, Debug)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_entries: usize,
    max_memory_bytes: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries: max_entries.max(1),
            max_memory_bytes: 100 * 1024 * 1024,
        }
    }

    /// Replace the default 100MB snapshot budget.
    pub fn set_memory_limit(&mut self, bytes: usize) {
        self.max_memory_bytes = bytes.max(1);
        self.prune();
    }

    /// Append an entry after the cursor, dropping any redo suffix. An entry
    /// that changes neither the parameters nor the pixels of the current
    /// entry is rejected, so consecutive entries always differ.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if let Some(current) = self.current() {
            if current.params == entry.params
                && current.snapshot.as_raw() == entry.snapshot.as_raw()
            {
                log::debug!("no-op history entry rejected: {}", entry.label);
                return false;
            }
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
        self.prune();
        true
    }

    /// The entry the cursor points at.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Step the cursor back one entry and return it.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step the cursor forward one entry and return it.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0 && !self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    /// Snapshot of the nearest base checkpoint at or before the cursor. This
    /// is the buffer every entry up to the next checkpoint derives from.
    pub fn base_snapshot(&self) -> Option<&RgbaImage> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries[..=self.cursor]
            .iter()
            .rev()
            .find(|e| e.is_base)
            .map(|e| &e.snapshot)
    }

    /// Entry labels oldest-first, for display.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Total bytes held by snapshots and labels.
    pub fn total_memory(&self) -> usize {
        self.entries.iter().map(|e| e.memory_size()).sum()
    }

    fn prune(&mut self) {
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
            self.cursor = self.cursor.saturating_sub(1);
        }
        while self.total_memory() > self.max_memory_bytes && self.entries.len() > 1 {
            self.entries.remove(0);
            self.cursor = self.cursor.saturating_sub(1);
        }
    }
}
