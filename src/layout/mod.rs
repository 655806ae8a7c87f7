mod measure;
mod projector;
mod registry;
mod routing;
mod text;
pub(crate) mod types;

pub(crate) use measure::TOGGLE_SPACE;
pub use measure::measure_columns;
pub use projector::project;
pub use registry::PositionRegistry;
pub use routing::route;
pub(crate) use text::measure_label;
pub use types::*;

use std::collections::BTreeMap;

/// Extent of everything drawn, padded by the origin on the far side.
pub fn bounds(
    positions: &BTreeMap<String, NodePosition>,
    connectors: &[ConnectorPath],
    origin: Point,
) -> (f32, f32) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for position in positions.values() {
        max_x = max_x.max(position.right());
        max_y = max_y.max(position.bottom());
    }
    for command in connectors.iter().flat_map(|path| path.commands.iter()) {
        let (x, y) = command.end();
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (max_x + origin.0.max(0.0), max_y + origin.1.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_boxes_and_paths() {
        let mut positions = BTreeMap::new();
        positions.insert("a".to_string(), NodePosition::new("a", 10.0, 10.0, 100.0, 30.0));
        let path = ConnectorPath {
            key: "a->b".to_string(),
            kind: ConnectorKind::CrossDirect,
            from: "a".to_string(),
            to: Some("b".to_string()),
            commands: vec![PathCommand::MoveTo((110.0, 25.0)), PathCommand::LineTo((300.0, 90.0))],
        };
        assert_eq!(bounds(&positions, &[], (16.0, 16.0)), (126.0, 56.0));
        assert_eq!(bounds(&positions, &[path], (16.0, 16.0)), (316.0, 106.0));
    }

    #[test]
    fn empty_bounds_are_just_padding() {
        assert_eq!(bounds(&BTreeMap::new(), &[], (16.0, 8.0)), (16.0, 8.0));
    }
}
