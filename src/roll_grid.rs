use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollCell {
    pub roll: u32,
    pub present: bool,
}

/// Presentation model of a session roster: one cell per roll number in `1..=expected`.
///
/// The grid never owns the marked set. Interaction is reported back through
/// [`RollGrid::toggle`] and the caller decides what to do with it.
#[derive(Debug, Clone)]
pub struct RollGrid<'a> {
    expected: u32,
    marked: &'a BTreeSet<u32>,
    interactive: bool,
}

impl<'a> RollGrid<'a> {
    pub fn new(expected: u32, marked: &'a BTreeSet<u32>) -> Self {
        Self {
            expected,
            marked,
            interactive: false,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn len(&self) -> usize {
        self.expected as usize
    }

    pub fn is_empty(&self) -> bool {
        self.expected == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = RollCell> + '_ {
        (1..=self.expected).map(|roll| RollCell {
            roll,
            present: self.marked.contains(&roll),
        })
    }

    pub fn present_count(&self) -> usize {
        self.marked.range(1..=self.expected).count()
    }

    /// Returns the roll number a click on `roll` should toggle, if the grid accepts it.
    pub fn toggle(&self, roll: u32) -> Option<u32> {
        (self.interactive && (1..=self.expected).contains(&roll)).then_some(roll)
    }

    /// Rows of at most `columns` cells, in roll order.
    pub fn rows(&self, columns: usize) -> Vec<Vec<RollCell>> {
        let columns = columns.max(1);
        let cells: Vec<RollCell> = self.cells().collect();
        cells.chunks(columns).map(|c| c.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_cover_roster_in_order() {
        let marked = BTreeSet::new();
        for n in 1..=64u32 {
            let grid = RollGrid::new(n, &marked);
            let rolls: Vec<u32> = grid.cells().map(|c| c.roll).collect();
            assert_eq!(rolls, (1..=n).collect::<Vec<_>>());
            assert_eq!(grid.len(), n as usize);
        }
    }

    #[test]
    fn test_cells_flag_presence() {
        let marked: BTreeSet<u32> = [2, 4].into_iter().collect();
        let grid = RollGrid::new(4, &marked);
        let flags: Vec<bool> = grid.cells().map(|c| c.present).collect();
        assert_eq!(flags, vec![false, true, false, true]);
        assert_eq!(grid.present_count(), 2);
    }

    #[test]
    fn test_toggle_requires_interactive() {
        let marked = BTreeSet::new();
        let grid = RollGrid::new(5, &marked);
        assert_eq!(grid.toggle(3), None);

        let grid = grid.interactive(true);
        assert_eq!(grid.toggle(3), Some(3));
        assert_eq!(grid.toggle(0), None);
        assert_eq!(grid.toggle(6), None);
        assert!(marked.is_empty());
    }

    #[test]
    fn test_rows_chunk_cells() {
        let marked = BTreeSet::new();
        let grid = RollGrid::new(7, &marked);
        let rows = grid.rows(3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].len(), 1);
        assert_eq!(rows[2][0].roll, 7);
        assert_eq!(grid.rows(0).len(), 7);
    }
}
