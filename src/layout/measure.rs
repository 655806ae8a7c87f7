use crate::config::LayoutConfig;
use crate::theme::Theme;
use crate::tree::Column;

use super::text::measure_label;
use super::{Columns, NodePosition, Row};

/// Room reserved right of the label for the expand/collapse glyph.
pub(crate) const TOGGLE_SPACE: f32 = 18.0;

/// Built-in measurement host: stacks each column's rows top-down and sizes
/// every box from its wrapped label.
///
/// Output order matches [`Columns::rows`].
pub fn measure_columns(
    columns: &Columns,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<NodePosition> {
    let mut positions = Vec::with_capacity(columns.row_count());

    let mut cursor = ColumnCursor::new(Column::Programs, config);
    for row in &columns.programs {
        positions.push(cursor.place(row, row.level as f32 * config.indent, theme, config));
    }

    let mut cursor = ColumnCursor::new(Column::Products, config);
    for row in &columns.products {
        positions.push(cursor.place(row, row.level as f32 * config.indent, theme, config));
    }

    let mut cursor = ColumnCursor::new(Column::ProjectsWithTopics, config);
    for project in &columns.projects_with_topics {
        let parent = cursor.place(&project.row, 0.0, theme, config);
        // Topics hang right of the project's centre trunk.
        let topic_offset = parent.center_x() - cursor.left + config.topic_indent / 2.0;
        positions.push(parent);
        for topic in &project.topics {
            positions.push(cursor.place(topic, topic_offset, theme, config));
        }
    }

    positions
}

struct ColumnCursor {
    left: f32,
    width: f32,
    y: f32,
}

impl ColumnCursor {
    fn new(column: Column, config: &LayoutConfig) -> Self {
        let width = config.column_width.max(1.0);
        Self {
            left: config.origin_x + column.index() as f32 * (width + config.column_gap.max(0.0)),
            width,
            y: config.origin_y,
        }
    }

    fn place(
        &mut self,
        row: &Row,
        offset: f32,
        theme: &Theme,
        config: &LayoutConfig,
    ) -> NodePosition {
        let offset = offset.clamp(0.0, self.width - 1.0);
        let available = self.width - offset;
        let label = measure_label(&row.name, theme, config);
        let toggle = if row.expandable { TOGGLE_SPACE } else { 0.0 };
        let width = (label.width + 2.0 * config.node_padding_x + toggle)
            .clamp(config.min_node_width.min(available), available);
        let height = label.height + 2.0 * config.node_padding_y;

        let position = NodePosition::new(&row.id, self.left + offset, self.y, width, height);
        self.y += height + config.row_gap.max(0.0);
        position
    }
}
