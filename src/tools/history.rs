//! Bounded, newest-first history of repeatable tool results.

use std::collections::VecDeque;

use super::result::ToolResult;

pub const HISTORY_LIMIT: usize = 10;

/// Bounded results of a repeatable generator, newest first.
#[derive(Debug, Clone)]
pub struct GeneratorHistory {
    entries: VecDeque<ToolResult>,
    limit: usize,
}

impl Default for GeneratorHistory {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl GeneratorHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, result: ToolResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.limit);
    }

    pub fn latest(&self) -> Option<&ToolResult> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
