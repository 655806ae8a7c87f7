use tracing::debug;

use crate::config::LayoutConfig;
use crate::expansion::{ExpansionState, Generation};
use crate::layout::{
    self, Columns, ConnectorPath, DiagramLayout, NodePosition, PositionRegistry, measure_columns,
};
use crate::theme::Theme;
use crate::tree::Forest;

/// One interactive diagram: the forest, what is expanded, and the boxes the
/// host measured for the current generation.
///
/// Every expansion change bumps the generation and invalidates the recorded
/// positions, so connectors are never drawn from a previous frame's boxes.
#[derive(Debug, Clone)]
pub struct DiagramView {
    forest: Forest,
    expansion: ExpansionState,
    registry: PositionRegistry,
    config: LayoutConfig,
}

impl DiagramView {
    pub fn new(forest: Forest) -> Self {
        Self::with_config(forest, LayoutConfig::default())
    }

    pub fn with_config(forest: Forest, config: LayoutConfig) -> Self {
        let expansion = ExpansionState::new(&forest);
        Self {
            forest,
            expansion,
            registry: PositionRegistry::new(),
            config,
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn generation(&self) -> Generation {
        self.expansion.generation()
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        let changed = self.expansion.toggle(id);
        self.sync_registry();
        changed
    }

    pub fn expand_all(&mut self) -> Generation {
        self.expansion.expand_all();
        self.sync_registry()
    }

    pub fn collapse_all(&mut self) -> Generation {
        self.expansion.collapse_all();
        self.sync_registry()
    }

    pub fn set_expanded<I, S>(&mut self, ids: I) -> Generation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.expansion.set_expanded(ids);
        self.sync_registry()
    }

    /// The three visible columns for the current expansion state.
    pub fn columns(&self) -> Columns {
        layout::project(&self.forest, &self.expansion)
    }

    /// Accepts host measurements taken against `generation`. Measurements for
    /// a superseded generation are dropped; returns how many were kept.
    pub fn record_positions<I>(&mut self, generation: Generation, positions: I) -> usize
    where
        I: IntoIterator<Item = NodePosition>,
    {
        if generation > self.generation() {
            debug!(
                reported = generation.value(),
                current = self.generation().value(),
                "measurements ahead of the expansion state ignored"
            );
            return 0;
        }
        self.registry.record_all(positions, generation)
    }

    pub fn position(&self, id: &str) -> Option<&NodePosition> {
        self.registry.get_position(id, self.generation())
    }

    /// Measures the visible rows with the built-in column host and records
    /// them under the current generation.
    pub fn measure_with_builtin_host(&mut self, theme: &Theme) -> usize {
        let positions = measure_columns(&self.columns(), theme, &self.config);
        let generation = self.generation();
        self.registry.record_all(positions, generation)
    }

    pub fn connectors(&self) -> Vec<ConnectorPath> {
        layout::route(
            &self.forest,
            &self.expansion,
            &self.registry,
            self.generation(),
            &self.config,
        )
    }

    pub fn layout(&self) -> DiagramLayout {
        let positions = if self.registry.generation() == self.generation() {
            self.registry.snapshot()
        } else {
            Default::default()
        };
        let connectors = self.connectors();
        let (width, height) = layout::bounds(
            &positions,
            &connectors,
            (self.config.origin_x, self.config.origin_y),
        );
        DiagramLayout {
            generation: self.generation(),
            columns: self.columns(),
            positions,
            connectors,
            width,
            height,
        }
    }

    fn sync_registry(&mut self) -> Generation {
        let generation = self.generation();
        self.registry.advance(generation);
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ConnectorKind;
    use crate::tree::{NodeKind, TreeNode};

    fn view() -> DiagramView {
        let programs = vec![
            TreeNode::new("b", "B", NodeKind::Program),
            TreeNode::new("c", "C", NodeKind::Program),
        ];
        let forest = Forest::new(vec![
            TreeNode::new("a", "A", NodeKind::Program).with_children(programs),
        ])
        .unwrap();
        DiagramView::new(forest)
    }

    #[test]
    fn toggle_invalidates_recorded_positions() {
        let mut view = view();
        let g0 = view.generation();
        assert_eq!(
            view.record_positions(g0, [NodePosition::new("a", 0.0, 0.0, 80.0, 30.0)]),
            1
        );
        assert!(view.position("a").is_some());

        assert!(view.toggle("a"));
        assert!(view.generation() > g0);
        assert!(view.position("a").is_none());
        assert_eq!(
            view.record_positions(g0, [NodePosition::new("a", 0.0, 0.0, 80.0, 30.0)]),
            0
        );
    }

    #[test]
    fn leaf_toggle_keeps_generation_and_positions() {
        let mut view = view();
        view.expand_all();
        view.measure_with_builtin_host(&Theme::standard());
        let before = view.generation();
        assert!(!view.toggle("b"));
        assert_eq!(view.generation(), before);
        assert!(view.position("b").is_some());
    }

    #[test]
    fn future_generation_is_rejected() {
        let mut view = view();
        let ahead = view.generation().next();
        assert_eq!(
            view.record_positions(ahead, [NodePosition::new("a", 0.0, 0.0, 80.0, 30.0)]),
            0
        );
        assert_eq!(view.generation(), Generation::INITIAL);
    }

    #[test]
    fn builtin_host_drives_full_pipeline() {
        let mut view = view();
        view.expand_all();
        assert_eq!(view.measure_with_builtin_host(&Theme::standard()), 3);
        let layout = view.layout();
        let kinds: Vec<ConnectorKind> = layout.connectors.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ConnectorKind::Trunk, ConnectorKind::Branch, ConnectorKind::Branch]
        );
        assert_eq!(layout.positions.len(), 3);
        assert!(layout.width > 0.0 && layout.height > 0.0);
    }

    #[test]
    fn unmeasured_layout_has_no_connectors() {
        let mut view = view();
        view.expand_all();
        let layout = view.layout();
        assert!(layout.positions.is_empty());
        assert!(layout.connectors.is_empty());
        assert_eq!(layout.columns.programs.len(), 3);
    }
}
