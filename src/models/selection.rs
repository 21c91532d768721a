//! 选区模型：anchor/head 两端，坐标为 (行, 字符列)

pub type Position = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    anchor: Position,
    head: Position,
}

impl Selection {
    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    pub fn caret(pos: Position) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn head(&self) -> Position {
        self.head
    }

    pub fn range(&self) -> (Position, Position) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    pub fn start(&self) -> Position {
        self.range().0
    }

    pub fn end(&self) -> Position {
        self.range().1
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn is_single_line(&self) -> bool {
        self.anchor.0 == self.head.0
    }

    pub fn contains(&self, pos: Position) -> bool {
        let (start, end) = self.range();
        start <= pos && pos < end
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::caret((0, 0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/selection.rs"]
mod tests;
