#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod expansion;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod tree;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config, parse_config};
pub use expansion::{ExpansionState, Generation};
pub use layout::{
    Columns, ConnectorKind, ConnectorPath, DiagramLayout, NodePosition, PathCommand,
    PositionRegistry, ProjectRow, Row, measure_columns, project, route,
};
pub use render::render_svg;
pub use theme::Theme;
pub use tree::{Forest, MAX_DEPTH, NodeKind, TreeError, TreeNode, parse_tree_document};
pub use view::DiagramView;
