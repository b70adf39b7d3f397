use tracing::trace;

/// Display order of the columns, as a permutation of original column indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    order: Vec<usize>,
}

impl ColumnOrder {
    pub fn identity(ncols: usize) -> Self {
        Self {
            order: (0..ncols).collect(),
        }
    }

    pub fn reset(&mut self, ncols: usize) {
        self.order = (0..ncols).collect();
    }

    /// Exchanges the columns at positions `position - 1` and `position`.
    /// Returns false (and changes nothing) at either edge.
    pub fn swap_adjacent(&mut self, position: usize) -> bool {
        if position == 0 || position >= self.order.len() {
            trace!("Column swap at edge position {position} ignored");
            return false;
        }
        self.order.swap(position - 1, position);
        true
    }

    /// Original column index shown at `position`.
    pub fn original(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_twice_restores_order() {
        for p in 1..4 {
            let mut order = ColumnOrder::identity(4);
            assert!(order.swap_adjacent(p));
            assert_ne!(order, ColumnOrder::identity(4));
            assert!(order.swap_adjacent(p));
            assert_eq!(order, ColumnOrder::identity(4));
        }
    }

    #[test]
    fn swap_moves_pair() {
        let mut order = ColumnOrder::identity(3);
        order.swap_adjacent(2);
        assert_eq!(order.as_slice(), &[0, 2, 1]);
        assert_eq!(order.original(1), Some(2));
    }

    #[test]
    fn swap_at_edges_is_noop() {
        let mut order = ColumnOrder::identity(3);
        assert!(!order.swap_adjacent(0));
        assert!(!order.swap_adjacent(3));
        assert_eq!(order.as_slice(), &[0, 1, 2]);

        let mut empty = ColumnOrder::default();
        assert!(!empty.swap_adjacent(1));
    }

    #[test]
    fn reset_restores_identity() {
        let mut order = ColumnOrder::identity(3);
        order.swap_adjacent(1);
        order.reset(5);
        assert_eq!(order.as_slice(), &[0, 1, 2, 3, 4]);
    }
}
