use serde::{Deserialize, Serialize};

/// Absolute block coordinate `(x, y, z)`.
pub type BlockPos = (i32, i32, i32);

/// Axis-aligned box with an inclusive `min` and an exclusive `max` corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl SelectionBox {
    /// Build a box from two opposite corners in any order.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        SelectionBox {
            min: (a.0.min(b.0), a.1.min(b.1), a.2.min(b.2)),
            max: (a.0.max(b.0), a.1.max(b.1), a.2.max(b.2)),
        }
    }

    pub fn from_position_and_size(position: BlockPos, size: (i32, i32, i32)) -> Self {
        SelectionBox::new(
            position,
            (
                position.0 + size.0,
                position.1 + size.1,
                position.2 + size.2,
            ),
        )
    }

    pub fn size(&self) -> (i32, i32, i32) {
        (
            self.max.0 - self.min.0,
            self.max.1 - self.min.1,
            self.max.2 - self.min.2,
        )
    }

    pub fn volume(&self) -> u64 {
        let (x, y, z) = self.size();
        x as u64 * y as u64 * z as u64
    }

    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    pub fn contains_block(&self, pos: BlockPos) -> bool {
        pos.0 >= self.min.0
            && pos.0 < self.max.0
            && pos.1 >= self.min.1
            && pos.1 < self.max.1
            && pos.2 >= self.min.2
            && pos.2 < self.max.2
    }

    pub fn contains_point(&self, point: (f64, f64, f64)) -> bool {
        point.0 >= self.min.0 as f64
            && point.0 < self.max.0 as f64
            && point.1 >= self.min.1 as f64
            && point.1 < self.max.1 as f64
            && point.2 >= self.min.2 as f64
            && point.2 < self.max.2 as f64
    }

    pub fn translate(&self, offset: (i32, i32, i32)) -> Self {
        SelectionBox {
            min: (
                self.min.0 + offset.0,
                self.min.1 + offset.1,
                self.min.2 + offset.2,
            ),
            max: (
                self.max.0 + offset.0,
                self.max.1 + offset.1,
                self.max.2 + offset.2,
            ),
        }
    }

    /// Every block position inside the box, x fastest, then z, then y.
    pub fn blocks(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (self.min.1..self.max.1).flat_map(move |y| {
            (self.min.2..self.max.2)
                .flat_map(move |z| (self.min.0..self.max.0).map(move |x| (x, y, z)))
        })
    }
}

/// Ordered collection of selection boxes describing the extent of a level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionGroup {
    pub selection_boxes: Vec<SelectionBox>,
}

impl SelectionGroup {
    pub fn new() -> Self {
        SelectionGroup::default()
    }

    pub fn from_box(selection: SelectionBox) -> Self {
        SelectionGroup {
            selection_boxes: vec![selection],
        }
    }

    pub fn push(&mut self, selection: SelectionBox) {
        self.selection_boxes.push(selection);
    }

    pub fn first(&self) -> Option<&SelectionBox> {
        self.selection_boxes.first()
    }

    pub fn is_empty(&self) -> bool {
        self.selection_boxes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let b = SelectionBox::new((4, 10, -2), (0, 2, 3));
        assert_eq!(b.min, (0, 2, -2));
        assert_eq!(b.max, (4, 10, 3));
        assert_eq!(b.size(), (4, 8, 5));
        assert_eq!(b.volume(), 160);
    }

    #[test]
    fn test_max_is_exclusive() {
        let b = SelectionBox::from_position_and_size((0, 0, 0), (2, 2, 2));
        assert!(b.contains_block((1, 1, 1)));
        assert!(!b.contains_block((2, 1, 1)));
        assert!(b.contains_point((1.99, 0.0, 0.5)));
        assert!(!b.contains_point((2.0, 0.0, 0.5)));
    }

    #[test]
    fn test_blocks_iteration_order() {
        let b = SelectionBox::from_position_and_size((0, 0, 0), (2, 2, 2));
        let positions: Vec<_> = b.blocks().collect();
        assert_eq!(positions.len(), 8);
        assert_eq!(positions[0], (0, 0, 0));
        assert_eq!(positions[1], (1, 0, 0));
        assert_eq!(positions[2], (0, 0, 1));
        assert_eq!(positions[4], (0, 1, 0));
    }

    #[test]
    fn test_empty_box_yields_nothing() {
        let b = SelectionBox::from_position_and_size((5, 5, 5), (0, 3, 3));
        assert!(b.is_empty());
        assert_eq!(b.blocks().count(), 0);
    }

    #[test]
    fn test_group_keeps_box_order() {
        let mut group = SelectionGroup::new();
        assert!(group.first().is_none());
        group.push(SelectionBox::new((0, 0, 0), (4, 4, 4)));
        group.push(SelectionBox::new((-2, 1, 8), (1, 2, 9)));
        assert_eq!(group.selection_boxes.len(), 2);
        assert_eq!(group.first(), Some(&SelectionBox::new((0, 0, 0), (4, 4, 4))));
    }
}
