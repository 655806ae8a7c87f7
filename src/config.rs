use crate::theme::Theme;
use crate::tree::NodeKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Trunk drop below a program whose same-type children fan out.
    pub trunk_length_program: f32,
    pub trunk_length_product: f32,
    pub trunk_length_project: f32,
    /// Horizontal offset of left-aligned trunks from the parent's left edge.
    pub trunk_inset: f32,
    pub corner_radius: f32,
    /// Control point position along the horizontal span of project → topic curves.
    pub curve_bow_ratio: f32,
    pub column_width: f32,
    pub column_gap: f32,
    pub row_gap: f32,
    pub indent: f32,
    pub topic_indent: f32,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub min_node_width: f32,
    pub label_line_height: f32,
    pub max_label_width_chars: usize,
    pub fast_text_metrics: bool,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            trunk_length_program: 20.0,
            trunk_length_product: 12.0,
            trunk_length_project: 12.0,
            trunk_inset: 16.0,
            corner_radius: 6.0,
            curve_bow_ratio: 0.7,
            column_width: 260.0,
            column_gap: 80.0,
            row_gap: 14.0,
            indent: 28.0,
            topic_indent: 36.0,
            node_padding_x: 14.0,
            node_padding_y: 9.0,
            min_node_width: 80.0,
            label_line_height: 1.4,
            max_label_width_chars: 28,
            fast_text_metrics: true,
            origin_x: 16.0,
            origin_y: 16.0,
        }
    }
}

impl LayoutConfig {
    pub fn trunk_length(&self, kind: NodeKind) -> f32 {
        match kind {
            NodeKind::Program => self.trunk_length_program,
            NodeKind::Product => self.trunk_length_product,
            NodeKind::Project | NodeKind::Topic => self.trunk_length_project,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::standard();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariablesFile {
    font_family: Option<String>,
    font_size: Option<f32>,
    program_color: Option<String>,
    product_color: Option<String>,
    project_color: Option<String>,
    topic_color: Option<String>,
    node_text_color: Option<String>,
    node_border_color: Option<String>,
    line_color: Option<String>,
    toggle_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    trunk_length_program: Option<f32>,
    trunk_length_product: Option<f32>,
    trunk_length_project: Option<f32>,
    trunk_inset: Option<f32>,
    corner_radius: Option<f32>,
    curve_bow_ratio: Option<f32>,
    column_width: Option<f32>,
    column_gap: Option<f32>,
    row_gap: Option<f32>,
    indent: Option<f32>,
    topic_indent: Option<f32>,
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    min_node_width: Option<f32>,
    label_line_height: Option<f32>,
    max_label_width_chars: Option<usize>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariablesFile>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlays a JSON5 config document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    match parsed.theme.as_deref() {
        Some("dark") => config.theme = Theme::dark(),
        Some("default") | Some("standard") | None => {}
        Some(other) => return Err(anyhow::anyhow!("unknown theme '{}'", other)),
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.program_color {
            config.theme.program_color = v;
        }
        if let Some(v) = vars.product_color {
            config.theme.product_color = v;
        }
        if let Some(v) = vars.project_color {
            config.theme.project_color = v;
        }
        if let Some(v) = vars.topic_color {
            config.theme.topic_color = v;
        }
        if let Some(v) = vars.node_text_color {
            config.theme.node_text_color = v;
        }
        if let Some(v) = vars.node_border_color {
            config.theme.node_border_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.toggle_color {
            config.theme.toggle_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.trunk_length_program {
            config.layout.trunk_length_program = v;
        }
        if let Some(v) = layout.trunk_length_product {
            config.layout.trunk_length_product = v;
        }
        if let Some(v) = layout.trunk_length_project {
            config.layout.trunk_length_project = v;
        }
        if let Some(v) = layout.trunk_inset {
            config.layout.trunk_inset = v;
        }
        if let Some(v) = layout.corner_radius {
            config.layout.corner_radius = v.max(0.0);
        }
        if let Some(v) = layout.curve_bow_ratio {
            config.layout.curve_bow_ratio = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.column_width {
            config.layout.column_width = v;
        }
        if let Some(v) = layout.column_gap {
            config.layout.column_gap = v;
        }
        if let Some(v) = layout.row_gap {
            config.layout.row_gap = v;
        }
        if let Some(v) = layout.indent {
            config.layout.indent = v;
        }
        if let Some(v) = layout.topic_indent {
            config.layout.topic_indent = v;
        }
        if let Some(v) = layout.node_padding_x {
            config.layout.node_padding_x = v;
        }
        if let Some(v) = layout.node_padding_y {
            config.layout.node_padding_y = v;
        }
        if let Some(v) = layout.min_node_width {
            config.layout.min_node_width = v;
        }
        if let Some(v) = layout.label_line_height {
            config.layout.label_line_height = v;
        }
        if let Some(v) = layout.max_label_width_chars {
            config.layout.max_label_width_chars = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}
