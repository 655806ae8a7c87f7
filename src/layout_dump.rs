use crate::layout::{ConnectorPath, DiagramLayout, PathCommand, Row};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub generation: u64,
    pub width: f32,
    pub height: f32,
    pub programs: Vec<RowDump>,
    pub products: Vec<RowDump>,
    pub projects: Vec<ProjectDump>,
    pub connectors: Vec<ConnectorDump>,
}

#[derive(Debug, Serialize)]
pub struct RowDump {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub level: usize,
    pub parent: Option<String>,
    pub expandable: bool,
    pub expanded: bool,
    /// `[x, y, width, height]`, absent when the row was never measured.
    pub bounds: Option<[f32; 4]>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDump {
    #[serde(flatten)]
    pub project: RowDump,
    pub topics: Vec<RowDump>,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub key: String,
    pub kind: String,
    pub from: String,
    pub to: Option<String>,
    pub d: String,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &DiagramLayout) -> Self {
        let row = |row: &Row| RowDump {
            id: row.id.clone(),
            name: row.name.clone(),
            kind: row.kind.as_str().to_string(),
            level: row.level,
            parent: row.parent_id.clone(),
            expandable: row.expandable,
            expanded: row.expanded,
            bounds: layout
                .positions
                .get(&row.id)
                .map(|p| [p.x, p.y, p.width, p.height]),
        };
        let columns = &layout.columns;
        Self {
            generation: layout.generation.value(),
            width: layout.width,
            height: layout.height,
            programs: columns.programs.iter().map(row).collect(),
            products: columns.products.iter().map(row).collect(),
            projects: columns
                .projects_with_topics
                .iter()
                .map(|project| ProjectDump {
                    project: row(&project.row),
                    topics: project.topics.iter().map(row).collect(),
                })
                .collect(),
            connectors: layout.connectors.iter().map(ConnectorDump::from_path).collect(),
        }
    }
}

impl ConnectorDump {
    fn from_path(path: &ConnectorPath) -> Self {
        let points = path
            .commands
            .iter()
            .flat_map(|command| match *command {
                PathCommand::MoveTo((x, y)) | PathCommand::LineTo((x, y)) => vec![[x, y]],
                PathCommand::QuadTo { control, to } => {
                    vec![[control.0, control.1], [to.0, to.1]]
                }
            })
            .collect();
        Self {
            key: path.key.clone(),
            kind: path.kind.as_str().to_string(),
            from: path.from.clone(),
            to: path.to.clone(),
            d: path.to_svg_path(),
            points,
        }
    }
}

/// Pretty JSON to `output`, or stdout when no path is given.
pub fn write_layout_dump(output: Option<&Path>, layout: &DiagramLayout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
