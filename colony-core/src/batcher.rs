use crate::{
    cell::Cell,
    membership::IndexSet,
    protocol::UpdateBatch,
    types::{CellId, Generation},
};

/// Accumulates mutated cell indices and flushes them as bounded batches.
///
/// Every call to [`UpdateBatcher::record`] counts as one change, while the
/// pending set is deduplicated: a cell written in several generations before
/// a flush is sent once, with its latest state.
#[derive(Debug, Clone)]
pub struct UpdateBatcher {
    batch_size: usize,
    pending: IndexSet,
    changes: usize,
}

impl UpdateBatcher {
    pub fn new(batch_size: usize, cell_count: usize) -> Self {
        Self {
            batch_size,
            pending: IndexSet::with_capacity(cell_count),
            changes: 0,
        }
    }

    pub fn record(&mut self, id: CellId) {
        self.changes += 1;
        self.pending.insert(id);
    }

    /// Enough changes have accumulated to warrant a flush.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.changes >= self.batch_size
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Snapshots every pending cell and clears the accumulator.
    ///
    /// ### Parameters
    /// - `generation` - Generation the batch is tagged with.
    /// - `cells` - The engine's cell arena, indexed by [`CellId`].
    ///
    /// ### Returns
    /// `None` if nothing changed since the last flush.
    pub fn flush(&mut self, generation: Generation, cells: &[Cell]) -> Option<UpdateBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let batch_updates = self
            .pending
            .iter()
            .filter_map(|id| cells.get(id).map(Cell::snapshot))
            .collect();
        self.pending.clear();
        self.changes = 0;
        Some(UpdateBatch {
            batch_updates,
            generation,
        })
    }
}
