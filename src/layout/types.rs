use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::expansion::Generation;
use crate::tree::NodeKind;

pub type Point = (f32, f32);

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// One visible node in a column, with its indentation level.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub level: usize,
    pub parent_id: Option<String>,
    /// Whether a toggle control is shown (the node has children).
    pub expandable: bool,
    pub expanded: bool,
}

/// A project row plus the topics rendered beneath it while it is expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub row: Row,
    pub topics: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    pub programs: Vec<Row>,
    pub products: Vec<Row>,
    pub projects_with_topics: Vec<ProjectRow>,
}

impl Columns {
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty() && self.products.is_empty() && self.projects_with_topics.is_empty()
    }

    /// All visible rows, column by column, topics right after their project.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.programs
            .iter()
            .chain(self.products.iter())
            .chain(
                self.projects_with_topics
                    .iter()
                    .flat_map(|project| std::iter::once(&project.row).chain(project.topics.iter())),
            )
    }

    pub fn row_count(&self) -> usize {
        self.rows().count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows().any(|row| row.id == id)
    }
}

/// Measured bounding box of a rendered node, relative to the diagram origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodePosition {
    pub fn new(id: &str, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn left_center(&self) -> Point {
        (self.x, self.center_y())
    }

    pub fn right_center(&self) -> Point {
        (self.right(), self.center_y())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    Trunk,
    Branch,
    CrossDirect,
    CrossCurved,
}

impl ConnectorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trunk => "trunk",
            Self::Branch => "branch",
            Self::CrossDirect => "cross-direct",
            Self::CrossCurved => "cross-curved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo { control: Point, to: Point },
}

impl PathCommand {
    pub fn end(&self) -> Point {
        match *self {
            Self::MoveTo(point) | Self::LineTo(point) => point,
            Self::QuadTo { to, .. } => to,
        }
    }
}

/// Fully resolved connector geometry; renderers draw it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub key: String,
    pub kind: ConnectorKind,
    pub from: String,
    /// Child endpoint; `None` for trunks.
    pub to: Option<String>,
    pub commands: Vec<PathCommand>,
}

impl ConnectorPath {
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to.as_deref() == Some(id)
    }

    pub fn start(&self) -> Option<Point> {
        self.commands.first().map(PathCommand::end)
    }

    pub fn end(&self) -> Option<Point> {
        self.commands.last().map(PathCommand::end)
    }

    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match command {
                PathCommand::MoveTo((x, y)) => d.push_str(&format!("M {:.2} {:.2}", x, y)),
                PathCommand::LineTo((x, y)) => d.push_str(&format!("L {:.2} {:.2}", x, y)),
                PathCommand::QuadTo { control, to } => d.push_str(&format!(
                    "Q {:.2} {:.2} {:.2} {:.2}",
                    control.0, control.1, to.0, to.1
                )),
            }
        }
        d
    }
}

/// Snapshot of one generation: what is visible, where it was measured, and
/// the connectors routed between those measurements.
#[derive(Debug, Clone)]
pub struct DiagramLayout {
    pub generation: Generation,
    pub columns: Columns,
    pub positions: BTreeMap<String, NodePosition>,
    pub connectors: Vec<ConnectorPath>,
    pub width: f32,
    pub height: f32,
}
