use super::position::{ChunkPos, Position};

/// An inclusive axis-aligned rectangle on the XZ plane.
///
/// Built from any two opposite corners; `min`/`max` are normalized so every
/// query can assume `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    pub min_x: i64,
    pub min_z: i64,
    pub max_x: i64,
    pub max_z: i64,
}

impl Area {
    pub fn from_corners(first: Position, second: Position) -> Self {
        Self {
            min_x: first.x.min(second.x),
            min_z: first.z.min(second.z),
            max_x: first.x.max(second.x),
            max_z: first.z.max(second.z),
        }
    }

    #[inline]
    pub fn contains(&self, x: i64, z: i64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_z <= z && z <= self.max_z
    }

    pub fn contains_position(&self, pos: &Position) -> bool {
        self.contains(pos.x, pos.z)
    }

    /// Shared cells count as overlap: two partitions may touch edges only if
    /// they are separated by at least one column.
    pub fn overlaps(&self, other: &Area) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_z <= other.max_z
            && other.min_z <= self.max_z
    }

    pub fn width(&self) -> i64 {
        self.max_x - self.min_x + 1
    }

    pub fn length(&self) -> i64 {
        self.max_z - self.min_z + 1
    }

    pub fn block_count(&self) -> i64 {
        self.width() * self.length()
    }

    /// Every chunk column the rectangle touches.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkPos> + use<> {
        let (min_cx, max_cx) = ((self.min_x >> 4) as i32, (self.max_x >> 4) as i32);
        let (min_cz, max_cz) = ((self.min_z >> 4) as i32, (self.max_z >> 4) as i32);
        (min_cx..=max_cx).flat_map(move |cx| (min_cz..=max_cz).map(move |cz| ChunkPos::new(cx, cz)))
    }

    /// The perimeter cells, each exactly once (also for one-wide strips).
    pub fn edges(&self) -> Vec<(i64, i64)> {
        let mut cells = Vec::with_capacity((2 * (self.width() + self.length())) as usize);
        for x in self.min_x..=self.max_x {
            cells.push((x, self.min_z));
            if self.max_z != self.min_z {
                cells.push((x, self.max_z));
            }
        }
        for z in (self.min_z + 1)..self.max_z {
            cells.push((self.min_x, z));
            if self.max_x != self.min_x {
                cells.push((self.max_x, z));
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn corners_are_normalized() {
        let area = Area::from_corners(Position::flat(10, -3), Position::flat(-2, 7));
        assert_eq!((area.min_x, area.min_z, area.max_x, area.max_z), (-2, -3, 10, 7));
        assert!(area.contains(-2, 7));
        assert!(!area.contains(11, 0));
    }

    #[test]
    fn edges_are_the_perimeter() {
        let area = Area::from_corners(Position::flat(0, 0), Position::flat(4, 2));
        let edges = area.edges();
        let unique: HashSet<_> = edges.iter().copied().collect();
        assert_eq!(edges.len(), unique.len());
        assert_eq!(edges.len(), 2 * 5 + 2 * 3 - 4);
        assert!(unique.contains(&(0, 1)));
        assert!(unique.contains(&(4, 1)));
        assert!(!unique.contains(&(2, 1)));
    }

    #[test]
    fn thin_strips_have_no_duplicate_edges() {
        let row = Area::from_corners(Position::flat(0, 5), Position::flat(3, 5));
        assert_eq!(row.edges().len(), 4);
        let single = Area::from_corners(Position::flat(1, 1), Position::flat(1, 1));
        assert_eq!(single.edges(), vec![(1, 1)]);
    }

    #[test]
    fn chunk_footprint_spans_boundaries() {
        let area = Area::from_corners(Position::flat(-1, 0), Position::flat(16, 15));
        let chunks: Vec<_> = area.chunks().collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.contains(&ChunkPos::new(-1, 0)));
        assert!(chunks.contains(&ChunkPos::new(1, 0)));
    }

    #[test]
    fn touching_cells_overlap() {
        let a = Area::from_corners(Position::flat(0, 0), Position::flat(5, 5));
        let b = Area::from_corners(Position::flat(5, 5), Position::flat(9, 9));
        let c = Area::from_corners(Position::flat(6, 0), Position::flat(9, 5));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
