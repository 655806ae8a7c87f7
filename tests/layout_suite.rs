use std::path::Path;

use portfolio_tree::{
    ConnectorKind, ConnectorPath, DiagramView, ExpansionState, Forest, Generation, LayoutConfig,
    NodePosition, PositionRegistry, Theme, parse_tree_document, project, render_svg, route,
};

fn load_fixture(name: &str) -> Forest {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_tree_document(&input).unwrap_or_else(|err| panic!("{name}: {err}"))
}

/// Positions as a host would report them: one box per id, stacked.
fn fake_positions(ids: &[&str], generation: Generation) -> PositionRegistry {
    let mut registry = PositionRegistry::new();
    for (idx, id) in ids.iter().enumerate() {
        let column = idx as f32 * 300.0;
        let row = idx as f32 * 50.0;
        registry.record_position(NodePosition::new(id, column, row, 140.0, 32.0), generation);
    }
    registry
}

fn kinds(paths: &[ConnectorPath]) -> Vec<ConnectorKind> {
    paths.iter().map(|path| path.kind).collect()
}

fn count(paths: &[ConnectorPath], kind: ConnectorKind) -> usize {
    paths.iter().filter(|path| path.kind == kind).count()
}

#[test]
fn alpha_chain_routes_three_cross_type_paths() {
    let forest = load_fixture("alpha_chain.json");
    let mut state = ExpansionState::new(&forest);
    let generation = state.expand_all();
    assert_eq!(generation, Generation::new(1));

    let registry = fake_positions(&["alpha", "x", "y", "z"], generation);
    let paths = route(&forest, &state, &registry, generation, &LayoutConfig::default());

    assert_eq!(
        kinds(&paths),
        vec![
            ConnectorKind::CrossDirect,
            ConnectorKind::CrossDirect,
            ConnectorKind::CrossCurved,
        ]
    );
    let keys: Vec<&str> = paths.iter().map(|path| path.key.as_str()).collect();
    assert_eq!(keys, vec!["alpha->x", "x->y", "y->z"]);
    assert_eq!(count(&paths, ConnectorKind::Trunk), 0);

    // Every path ends flush on the child's left edge.
    for path in &paths {
        let child = registry
            .get_position(path.to.as_deref().unwrap(), generation)
            .unwrap();
        assert_eq!(path.end(), Some(child.left_center()), "{}", path.key);
    }
}

#[test]
fn shared_trunk_for_same_type_siblings() {
    let forest = load_fixture("shared_trunk.json");
    let state = ExpansionState::with_expanded(&forest, ["a"]);
    let generation = state.generation();
    let mut registry = PositionRegistry::new();
    registry.record_position(NodePosition::new("a", 16.0, 16.0, 140.0, 32.0), generation);
    registry.record_position(NodePosition::new("b", 44.0, 80.0, 120.0, 32.0), generation);
    registry.record_position(NodePosition::new("c", 44.0, 130.0, 120.0, 32.0), generation);

    let config = LayoutConfig::default();
    let paths = route(&forest, &state, &registry, generation, &config);
    assert_eq!(
        kinds(&paths),
        vec![ConnectorKind::Trunk, ConnectorKind::Branch, ConnectorKind::Branch]
    );

    let trunk = &paths[0];
    assert_eq!(trunk.key, "trunk:a");
    assert_eq!(trunk.start(), Some((16.0 + config.trunk_inset, 48.0)));
    let trunk_bottom = trunk.end().unwrap();
    assert_eq!(trunk_bottom.1, 48.0 + config.trunk_length_program);
    for branch in &paths[1..] {
        assert_eq!(branch.start(), Some(trunk_bottom));
        assert_eq!(branch.from, "a");
    }
    assert_eq!(paths[1].end(), Some((44.0, 96.0)));
    assert_eq!(paths[2].end(), Some((44.0, 146.0)));
}

#[test]
fn route_is_idempotent() {
    let forest = load_fixture("portfolio.json5");
    let mut view = DiagramView::new(forest);
    view.expand_all();
    view.measure_with_builtin_host(&Theme::standard());
    let first = view.connectors();
    let second = view.connectors();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn portfolio_fixture_routes_every_relation() {
    let forest = load_fixture("portfolio.json5");
    assert_eq!(
        forest.roots().iter().map(|root| root.id.as_str()).collect::<Vec<_>>(),
        vec!["growth", "platform"]
    );
    let mut view = DiagramView::new(forest);
    view.expand_all();
    assert_eq!(view.measure_with_builtin_host(&Theme::standard()), 14);

    let columns = view.columns();
    let program_ids: Vec<&str> = columns.programs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(program_ids, vec!["growth", "growth-emea", "growth-apac", "platform"]);
    let product_ids: Vec<&str> = columns.products.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(product_ids, vec!["mobile", "checkout", "checkout-v2", "wallets"]);
    let product_levels: Vec<usize> = columns.products.iter().map(|r| r.level).collect();
    assert_eq!(product_levels, vec![0, 0, 1, 1]);
    let project_ids: Vec<&str> = columns
        .projects_with_topics
        .iter()
        .map(|p| p.row.id.as_str())
        .collect();
    assert_eq!(project_ids, vec!["apple-pay", "migration"]);
    assert_eq!(columns.projects_with_topics[0].topics.len(), 3);

    let paths = view.connectors();
    assert_eq!(paths.len(), 15);
    assert_eq!(count(&paths, ConnectorKind::Trunk), 3);
    assert_eq!(count(&paths, ConnectorKind::Branch), 7);
    assert_eq!(count(&paths, ConnectorKind::CrossDirect), 4);
    assert_eq!(count(&paths, ConnectorKind::CrossCurved), 1);

    let trunks: Vec<&str> = paths
        .iter()
        .filter(|p| p.kind == ConnectorKind::Trunk)
        .map(|p| p.from.as_str())
        .collect();
    assert_eq!(trunks, vec!["growth", "checkout", "apple-pay"]);
}

#[test]
fn missing_position_omits_only_touching_paths() {
    let forest = load_fixture("portfolio.json5");
    let mut state = ExpansionState::new(&forest);
    let generation = state.expand_all();
    let columns = project(&forest, &state);
    let ids: Vec<&str> = columns.rows().map(|row| row.id.as_str()).collect();
    let mut registry = fake_positions(&ids, generation);
    let config = LayoutConfig::default();

    let full = route(&forest, &state, &registry, generation, &config);
    registry.remove("wallets");
    let partial = route(&forest, &state, &registry, generation, &config);

    let expected: Vec<ConnectorPath> = full
        .iter()
        .filter(|path| !path.touches("wallets"))
        .cloned()
        .collect();
    assert!(expected.len() < full.len());
    // checkout still has a trunk shared with the remaining sibling.
    assert!(partial.iter().any(|path| path.key == "trunk:checkout"));
    assert_eq!(partial, expected);
}

#[test]
fn stale_generation_routes_nothing() {
    let forest = load_fixture("shared_trunk.json");
    let mut state = ExpansionState::new(&forest);
    let g1 = state.expand_all();
    let registry = fake_positions(&["a", "b", "c"], g1);
    let config = LayoutConfig::default();
    assert_eq!(route(&forest, &state, &registry, g1, &config).len(), 3);

    state.toggle("a");
    state.toggle("a");
    assert!(route(&forest, &state, &registry, g1, &config).is_empty());
    assert!(route(&forest, &state, &registry, state.generation(), &config).is_empty());
}

#[test]
fn noop_toggles_leave_outputs_unchanged() {
    let forest = load_fixture("portfolio.json5");
    let mut view = DiagramView::new(forest);
    view.set_expanded(["growth", "checkout"]);
    view.measure_with_builtin_host(&Theme::standard());
    let generation = view.generation();
    let columns = view.columns();
    let paths = view.connectors();

    assert!(!view.toggle("does-not-exist"));
    assert!(!view.toggle("growth-emea"));
    assert!(!view.toggle("fraud"));
    assert_eq!(view.generation(), generation);
    assert_eq!(view.columns(), columns);
    assert_eq!(view.connectors(), paths);
}

#[test]
fn expand_all_then_collapse_all_shows_only_roots() {
    let forest = load_fixture("portfolio.json5");
    let mut view = DiagramView::new(forest);
    view.expand_all();
    view.collapse_all();
    assert!(view.expansion().is_empty());
    let columns = view.columns();
    assert_eq!(columns.programs.len(), 2);
    assert!(columns.programs.iter().all(|row| row.level == 0));
    assert!(columns.products.is_empty());
    assert!(columns.projects_with_topics.is_empty());
}

#[test]
fn products_are_listed_once() {
    let forest = load_fixture("portfolio.json5");
    let mut state = ExpansionState::new(&forest);
    state.expand_all();
    let columns = project(&forest, &state);
    let mut ids: Vec<&str> = columns.products.iter().map(|r| r.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn empty_forest_is_not_an_error() {
    let forest = parse_tree_document("[]").unwrap();
    let mut view = DiagramView::new(forest);
    view.expand_all();
    assert!(view.columns().is_empty());
    assert!(view.connectors().is_empty());
    let svg = render_svg(&view.layout(), &Theme::standard(), view.config());
    assert!(svg.contains("<svg") && svg.contains("</svg>"));
}

#[test]
fn render_all_fixtures() {
    for name in ["alpha_chain.json", "portfolio.json5", "shared_trunk.json"] {
        let mut view = DiagramView::new(load_fixture(name));
        view.expand_all();
        view.measure_with_builtin_host(&Theme::dark());
        let layout = view.layout();
        let svg = render_svg(&layout, &Theme::dark(), view.config());
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert_eq!(
            svg.matches("<path ").count(),
            layout.connectors.len(),
            "{name}: connector count"
        );
    }
}
