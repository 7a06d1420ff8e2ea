// Directional focus movement over the browse grid.
//
// Cards flow along lines: a horizontal grid fills each column top to bottom
// before moving right, a vertical grid fills each row left to right before
// moving down. Moving past the end of a line wraps onto the next one.

use crate::models::GridDirection;

/// Navigation direction for grid movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Remote-control input the grid reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Move(Direction),
    Confirm,
}

/// Focus state for the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusGrid {
    /// Focused item index
    index: usize,
    /// Number of loaded items
    len: usize,
    /// Cards per line (rows of a horizontal grid, columns of a vertical one)
    lines: usize,
    /// Lines stack vertically when cards flow left to right
    row_major: bool,
}

impl FocusGrid {
    pub fn new(lines: usize, direction: GridDirection) -> Self {
        Self {
            index: 0,
            len: 0,
            lines: lines.max(1),
            row_major: direction != GridDirection::Horizontal,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Relayout keeps the focused index, clamped to the item count.
    pub fn relayout(&mut self, lines: usize, direction: GridDirection) {
        self.lines = lines.max(1);
        self.row_major = direction != GridDirection::Horizontal;
    }

    /// Set the item count
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.index >= len {
            self.index = len.saturating_sub(1);
        }
    }

    pub fn set_index(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let changed = self.index != index;
        self.index = index;
        changed
    }

    /// Move focus in the given direction
    pub fn move_focus(&mut self, direction: Direction) -> bool {
        if self.len == 0 {
            return false;
        }

        let old = self.index;
        // Along the line: previous/next card, wrapping between lines.
        // Across lines: jump by a whole line.
        let (along, forward) = match (direction, self.row_major) {
            (Direction::Left, true) | (Direction::Up, false) => (true, false),
            (Direction::Right, true) | (Direction::Down, false) => (true, true),
            (Direction::Up, true) | (Direction::Left, false) => (false, false),
            (Direction::Down, true) | (Direction::Right, false) => (false, true),
        };
        let last = self.len - 1;

        match (along, forward) {
            (true, false) => self.index = self.index.saturating_sub(1),
            (true, true) => self.index = (self.index + 1).min(last),
            (false, false) => {
                if self.index >= self.lines {
                    self.index -= self.lines;
                }
            }
            (false, true) => {
                if self.index + self.lines <= last {
                    self.index += self.lines;
                } else if self.index / self.lines < last / self.lines {
                    // Clamp to the last card of a shorter final line
                    self.index = last;
                }
            }
        }

        old != self.index
    }
}
