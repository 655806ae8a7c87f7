use std::collections::HashMap;

use tracing::trace;

use crate::expansion::ExpansionState;
use crate::tree::{Forest, NodeKind, TreeNode};

use super::{Columns, ProjectRow, Row};

/// Derives the visible rows of the three columns.
///
/// Roots are always visible; a child is visible only when its parent is
/// visible and expanded. Every visible node lands in its kind's column in
/// depth-first order. Programs and products are indented by the length of
/// their same-kind ancestor chain; projects are flat and carry their topics
/// as a secondary group while expanded.
pub fn project(forest: &Forest, expansion: &ExpansionState) -> Columns {
    let mut projector = Projector {
        expansion,
        columns: Columns::default(),
        program_index: HashMap::new(),
        product_index: HashMap::new(),
        project_index: HashMap::new(),
    };
    // Pre-order walk with an explicit stack; children are pushed reversed.
    let mut stack: Vec<(&TreeNode, Option<&TreeNode>, usize)> =
        forest.roots().iter().rev().map(|root| (root, None, 0)).collect();
    while let Some((node, parent, level)) = stack.pop() {
        if !projector.visit(node, parent, level) {
            continue;
        }
        for child in node.children.iter().rev() {
            if child.kind == NodeKind::Topic {
                continue;
            }
            let nested = child.kind == node.kind && child.kind.is_continuation_of(node.kind);
            stack.push((child, Some(node), if nested { level + 1 } else { 0 }));
        }
    }
    projector.columns
}

struct Projector<'a> {
    expansion: &'a ExpansionState,
    columns: Columns,
    program_index: HashMap<String, usize>,
    product_index: HashMap<String, usize>,
    project_index: HashMap<String, usize>,
}

impl Projector<'_> {
    /// Adds the row for `node`; returns whether its children are visible.
    fn visit(&mut self, node: &TreeNode, parent: Option<&TreeNode>, level: usize) -> bool {
        let row = self.row(node, parent, level);
        match node.kind {
            NodeKind::Program => {
                push_unique(&mut self.columns.programs, &mut self.program_index, row)
            }
            NodeKind::Product => {
                push_unique(&mut self.columns.products, &mut self.product_index, row)
            }
            NodeKind::Project => self.push_project(node, row),
            // Topics are collected by their project.
            NodeKind::Topic => {
                if parent.map(|p| p.kind) != Some(NodeKind::Project) {
                    trace!(id = %node.id, "topic without a project parent has no column");
                }
                return false;
            }
        }
        self.expansion.is_expanded(&node.id)
    }

    fn push_project(&mut self, node: &TreeNode, mut row: Row) {
        if self.project_index.contains_key(&node.id) {
            return;
        }
        // Projects do not nest visually.
        row.level = 0;
        let topics = if self.expansion.is_expanded(&node.id) {
            node.children
                .iter()
                .filter(|child| child.kind == NodeKind::Topic)
                .map(|topic| self.row(topic, Some(node), 0))
                .collect()
        } else {
            Vec::new()
        };
        self.project_index
            .insert(node.id.clone(), self.columns.projects_with_topics.len());
        self.columns
            .projects_with_topics
            .push(ProjectRow { row, topics });
    }

    fn row(&self, node: &TreeNode, parent: Option<&TreeNode>, level: usize) -> Row {
        Row {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            level,
            parent_id: parent.map(|p| p.id.clone()),
            expandable: node.has_children(),
            expanded: self.expansion.is_expanded(&node.id),
        }
    }
}

/// Keeps the first occurrence of an id; a later sighting only lowers the level.
fn push_unique(rows: &mut Vec<Row>, index: &mut HashMap<String, usize>, row: Row) {
    if let Some(&existing) = index.get(&row.id) {
        if row.level < rows[existing].level {
            rows[existing].level = row.level;
            rows[existing].parent_id = row.parent_id;
        }
        return;
    }
    index.insert(row.id.clone(), rows.len());
    rows.push(row);
}
