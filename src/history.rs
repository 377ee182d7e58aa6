use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Executed command lines with arrow-key style navigation.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    limit: usize,
    // None while the user is not navigating
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
            cursor: None,
        }
    }

    pub fn push(&mut self, line: &str) {
        self.entries.push_back(line.to_string());
        if self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = None;
    }

    /// Moves through history. `Up` starts at the newest entry and stops at the
    /// oldest; `Down` past the newest returns an empty line and stops
    /// navigating; `Down` while not navigating returns `None`.
    pub fn navigate(&mut self, direction: Direction) -> Option<String> {
        match direction {
            Direction::Up => {
                if self.entries.is_empty() {
                    return None;
                }
                let index = match self.cursor {
                    None => self.entries.len() - 1,
                    Some(i) => i.saturating_sub(1),
                };
                self.cursor = Some(index);
                self.entries.get(index).cloned()
            }
            Direction::Down => {
                let current = self.cursor?;
                if current + 1 < self.entries.len() {
                    self.cursor = Some(current + 1);
                    self.entries.get(current + 1).cloned()
                } else {
                    self.cursor = None;
                    Some(String::new())
                }
            }
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
