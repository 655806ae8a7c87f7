use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::expansion::Generation;

use super::NodePosition;

/// Last measured box per node, trusted only for the generation it was
/// measured against.
#[derive(Debug, Clone, Default)]
pub struct PositionRegistry {
    generation: Generation,
    positions: HashMap<String, NodePosition>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Moves to a newer generation and drops every older measurement.
    /// Older generations are ignored.
    pub fn advance(&mut self, generation: Generation) {
        if generation <= self.generation {
            return;
        }
        if !self.positions.is_empty() {
            debug!(
                from = self.generation.value(),
                to = generation.value(),
                dropped = self.positions.len(),
                "position registry invalidated"
            );
        }
        self.generation = generation;
        self.positions.clear();
    }

    /// Stores a measurement. Measurements for a superseded generation are
    /// discarded, as are boxes with non-finite coordinates or a negative
    /// size; a newer generation invalidates everything recorded so far.
    pub fn record_position(&mut self, position: NodePosition, generation: Generation) -> bool {
        if generation < self.generation {
            debug!(
                id = %position.id,
                stale = generation.value(),
                current = self.generation.value(),
                "discarding stale measurement"
            );
            return false;
        }
        if !position.is_finite() {
            debug!(id = %position.id, "discarding non-finite measurement");
            return false;
        }
        if position.width < 0.0 || position.height < 0.0 {
            debug!(
                id = %position.id,
                width = position.width,
                height = position.height,
                "discarding measurement with negative size"
            );
            return false;
        }
        self.advance(generation);
        self.positions.insert(position.id.clone(), position);
        true
    }

    pub fn record_all<I>(&mut self, positions: I, generation: Generation) -> usize
    where
        I: IntoIterator<Item = NodePosition>,
    {
        let mut accepted = 0;
        for position in positions {
            if self.record_position(position, generation) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Absent for unknown ids and for any generation other than the latest.
    pub fn get_position(&self, id: &str, generation: Generation) -> Option<&NodePosition> {
        if generation != self.generation {
            return None;
        }
        self.positions.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<NodePosition> {
        self.positions.remove(id)
    }

    /// Current-generation positions in id order.
    pub fn snapshot(&self) -> BTreeMap<String, NodePosition> {
        self.positions
            .iter()
            .map(|(id, position)| (id.clone(), position.clone()))
            .collect()
    }
}
