use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::expansion::{ExpansionState, Generation};
use crate::tree::{Forest, NodeKind, TreeNode};

use super::{ConnectorKind, ConnectorPath, NodePosition, PathCommand, Point, PositionRegistry};

// ── Geometry tolerances ─────────────────────────────────────────────
/// Offsets below this are treated as aligned (no bend needed).
const ALIGN_EPSILON: f32 = 0.5;

/// Where a same-column trunk leaves the parent's bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TrunkAnchor {
    Left,
    Center,
}

impl TrunkAnchor {
    pub(super) fn for_relation(parent: NodeKind) -> Self {
        match parent {
            NodeKind::Project => Self::Center,
            _ => Self::Left,
        }
    }
}

/// Children of one parent, split by whether they continue the parent's
/// column or live in the next column.
#[derive(Debug)]
pub(super) struct ChildPartition<'a> {
    pub(super) same_type: Vec<&'a TreeNode>,
    pub(super) cross_type: Vec<&'a TreeNode>,
}

pub(super) fn partition_children(node: &TreeNode) -> ChildPartition<'_> {
    let (same_type, cross_type): (Vec<&TreeNode>, Vec<&TreeNode>) = node
        .children
        .iter()
        .partition(|child| child.kind.is_continuation_of(node.kind));
    ChildPartition {
        same_type,
        cross_type,
    }
}

/// Computes every connector for the expanded part of the forest.
///
/// Output order follows the tree: for each expanded parent (depth first),
/// its trunk, then its same-type branches, then its cross-type links. Any
/// connector whose endpoint has no position for `generation` is omitted.
pub fn route(
    forest: &Forest,
    expansion: &ExpansionState,
    positions: &PositionRegistry,
    generation: Generation,
    config: &LayoutConfig,
) -> Vec<ConnectorPath> {
    if generation < expansion.generation() {
        debug!(
            requested = generation.value(),
            current = expansion.generation().value(),
            "declining to route against a superseded generation"
        );
        return Vec::new();
    }
    let router = Router {
        positions,
        generation,
        config,
    };
    let mut paths = Vec::new();
    let mut stack: Vec<&TreeNode> = forest.roots().iter().rev().collect();
    while let Some(node) = stack.pop() {
        if !node.has_children() || !expansion.is_expanded(&node.id) {
            continue;
        }
        router.route_children(node, &mut paths);
        stack.extend(node.children.iter().rev());
    }
    trace!(count = paths.len(), generation = generation.value(), "connectors routed");
    paths
}

struct Router<'a> {
    positions: &'a PositionRegistry,
    generation: Generation,
    config: &'a LayoutConfig,
}

impl Router<'_> {
    fn position(&self, id: &str) -> Option<&NodePosition> {
        self.positions.get_position(id, self.generation)
    }

    fn route_children(&self, node: &TreeNode, paths: &mut Vec<ConnectorPath>) {
        let Some(parent) = self.position(&node.id) else {
            debug!(parent = %node.id, "connectors omitted: parent has no position");
            return;
        };
        let partition = partition_children(node);
        let radius = self.config.corner_radius.max(0.0);

        match partition.same_type.as_slice() {
            [] => {}
            [only] => {
                if let Some(child) = self.child_position(node, only) {
                    paths.push(self.single_same_type(node, parent, only, child, radius));
                }
            }
            group => {
                let anchor = TrunkAnchor::for_relation(node.kind);
                let top = trunk_top(parent, anchor, self.config.trunk_inset);
                let bottom = (top.0, top.1 + self.config.trunk_length(node.kind).max(0.0));
                paths.push(ConnectorPath {
                    key: format!("trunk:{}", node.id),
                    kind: ConnectorKind::Trunk,
                    from: node.id.clone(),
                    to: None,
                    commands: vec![PathCommand::MoveTo(top), PathCommand::LineTo(bottom)],
                });
                for child_node in group {
                    if let Some(child) = self.child_position(node, child_node) {
                        paths.push(ConnectorPath {
                            key: edge_key(&node.id, &child_node.id),
                            kind: ConnectorKind::Branch,
                            from: node.id.clone(),
                            to: Some(child_node.id.clone()),
                            commands: elbow_path(bottom, child.left_center(), radius),
                        });
                    }
                }
            }
        }

        for child_node in &partition.cross_type {
            let Some(child) = self.child_position(node, child_node) else {
                continue;
            };
            paths.push(self.cross_type(node, parent, child_node, child, radius));
        }
    }

    fn child_position(&self, parent: &TreeNode, child: &TreeNode) -> Option<&NodePosition> {
        let position = self.position(&child.id);
        if position.is_none() {
            debug!(
                parent = %parent.id,
                child = %child.id,
                "connector omitted: child has no position"
            );
        }
        position
    }

    /// A lone same-type child: project → topic gets the fan-out curve, the
    /// other relations a single branch straight off the parent's anchor.
    fn single_same_type(
        &self,
        node: &TreeNode,
        parent: &NodePosition,
        child_node: &TreeNode,
        child: &NodePosition,
        radius: f32,
    ) -> ConnectorPath {
        if is_topic_relation(node.kind, child_node.kind) {
            return ConnectorPath {
                key: edge_key(&node.id, &child_node.id),
                kind: ConnectorKind::CrossCurved,
                from: node.id.clone(),
                to: Some(child_node.id.clone()),
                commands: curve_path(
                    parent.right_center(),
                    child.left_center(),
                    self.config.curve_bow_ratio,
                ),
            };
        }
        let start = trunk_top(
            parent,
            TrunkAnchor::for_relation(node.kind),
            self.config.trunk_inset,
        );
        ConnectorPath {
            key: edge_key(&node.id, &child_node.id),
            kind: ConnectorKind::Branch,
            from: node.id.clone(),
            to: Some(child_node.id.clone()),
            commands: elbow_path(start, child.left_center(), radius),
        }
    }

    fn cross_type(
        &self,
        node: &TreeNode,
        parent: &NodePosition,
        child_node: &TreeNode,
        child: &NodePosition,
        radius: f32,
    ) -> ConnectorPath {
        trace!(from = %node.id, to = %child_node.id, "cross-column connector");
        ConnectorPath {
            key: edge_key(&node.id, &child_node.id),
            kind: ConnectorKind::CrossDirect,
            from: node.id.clone(),
            to: Some(child_node.id.clone()),
            commands: orthogonal_path(parent.right_center(), child.left_center(), radius),
        }
    }
}

fn is_topic_relation(parent: NodeKind, child: NodeKind) -> bool {
    parent == NodeKind::Project && child == NodeKind::Topic
}

pub(super) fn edge_key(parent: &str, child: &str) -> String {
    format!("{parent}->{child}")
}

pub(super) fn trunk_top(parent: &NodePosition, anchor: TrunkAnchor, inset: f32) -> Point {
    let x = match anchor {
        TrunkAnchor::Left => parent.x + inset.min(parent.width / 2.0).max(0.0),
        TrunkAnchor::Center => parent.center_x(),
    };
    (x, parent.bottom())
}

/// Vertical run from `start` to the end's row, a rounded corner, then a
/// horizontal run that lands on `end`.
pub(super) fn elbow_path(start: Point, end: Point, radius: f32) -> Vec<PathCommand> {
    let (sx, sy) = start;
    let (ex, ey) = end;
    let dx = ex - sx;
    let dy = ey - sy;
    if dx.abs() < ALIGN_EPSILON || dy.abs() < ALIGN_EPSILON {
        return vec![PathCommand::MoveTo(start), PathCommand::LineTo(end)];
    }
    let r = radius.min(dx.abs()).min(dy.abs());
    if r < ALIGN_EPSILON {
        return vec![
            PathCommand::MoveTo(start),
            PathCommand::LineTo((sx, ey)),
            PathCommand::LineTo(end),
        ];
    }
    let vy = dy.signum();
    let hx = dx.signum();
    vec![
        PathCommand::MoveTo(start),
        PathCommand::LineTo((sx, ey - vy * r)),
        PathCommand::QuadTo {
            control: (sx, ey),
            to: (sx + hx * r, ey),
        },
        PathCommand::LineTo(end),
    ]
}

/// Horizontal run to the midpoint between the two boxes, a rounded
/// vertical transition towards the child's row, then a horizontal run into
/// the child. Corner direction flips with the sign of the vertical offset.
pub(super) fn orthogonal_path(start: Point, end: Point, radius: f32) -> Vec<PathCommand> {
    let (sx, sy) = start;
    let (ex, ey) = end;
    let dy = ey - sy;
    if dy.abs() < ALIGN_EPSILON {
        return vec![PathCommand::MoveTo(start), PathCommand::LineTo(end)];
    }
    let mid_x = (sx + ex) / 2.0;
    let half_span = (mid_x - sx).abs();
    let r = radius.min(dy.abs() / 2.0).min(half_span);
    if r < ALIGN_EPSILON {
        return vec![
            PathCommand::MoveTo(start),
            PathCommand::LineTo((mid_x, sy)),
            PathCommand::LineTo((mid_x, ey)),
            PathCommand::LineTo(end),
        ];
    }
    let vy = dy.signum();
    let hx = if ex >= sx { 1.0 } else { -1.0 };
    vec![
        PathCommand::MoveTo(start),
        PathCommand::LineTo((mid_x - hx * r, sy)),
        PathCommand::QuadTo {
            control: (mid_x, sy),
            to: (mid_x, sy + vy * r),
        },
        PathCommand::LineTo((mid_x, ey - vy * r)),
        PathCommand::QuadTo {
            control: (mid_x, ey),
            to: (mid_x + hx * r, ey),
        },
        PathCommand::LineTo(end),
    ]
}

/// Single quadratic whose control point stays level with the start and sits
/// `bow` of the way across the horizontal span.
pub(super) fn curve_path(start: Point, end: Point, bow: f32) -> Vec<PathCommand> {
    let control = (start.0 + (end.0 - start.0) * bow, start.1);
    vec![
        PathCommand::MoveTo(start),
        PathCommand::QuadTo { control, to: end },
    ]
}
