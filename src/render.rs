use crate::config::LayoutConfig;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::layout::{ConnectorKind, DiagramLayout, Row, TOGGLE_SPACE, measure_label};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Draws the measured boxes and routed connectors of one generation.
///
/// Rows without a position are skipped, matching the connector omission
/// rule: nothing is drawn from stale or missing geometry.
pub fn render_svg(layout: &DiagramLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\" data-generation=\"{}\">",
        layout.generation.value()
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&theme.background)
    ));

    svg.push_str("<g class=\"connectors\">");
    for connector in &layout.connectors {
        let dash = match connector.kind {
            ConnectorKind::CrossCurved => " stroke-dasharray=\"4 3\"",
            _ => "",
        };
        svg.push_str(&format!(
            "<path class=\"{}\" data-key=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" stroke-linecap=\"round\"{dash}/>",
            connector.kind.as_str(),
            escape_xml(&connector.key),
            connector.to_svg_path(),
            escape_xml(&theme.line_color),
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for row in layout.columns.rows() {
        render_node(&mut svg, layout, row, theme, config);
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn render_node(
    svg: &mut String,
    layout: &DiagramLayout,
    row: &Row,
    theme: &Theme,
    config: &LayoutConfig,
) {
    let Some(position) = layout.positions.get(&row.id) else {
        return;
    };
    svg.push_str(&format!(
        "<g class=\"node {}\" data-id=\"{}\">",
        row.kind.as_str(),
        escape_xml(&row.id)
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        position.x,
        position.y,
        position.width,
        position.height,
        escape_xml(theme.fill_for(row.kind)),
        escape_xml(&theme.node_border_color),
    ));

    let label = measure_label(&row.name, theme, config);
    let line_height = theme.font_size * config.label_line_height;
    let text_x = position.x + config.node_padding_x;
    let first_baseline =
        position.y + config.node_padding_y + line_height * 0.5 + theme.font_size * 0.35;
    svg.push_str(&format!(
        "<text x=\"{text_x:.2}\" y=\"{first_baseline:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(&theme.node_text_color),
    ));
    for (idx, line) in label.lines.iter().enumerate() {
        if idx == 0 {
            svg.push_str(&format!("<tspan>{}</tspan>", escape_xml(line)));
        } else {
            svg.push_str(&format!(
                "<tspan x=\"{text_x:.2}\" dy=\"{line_height:.2}\">{}</tspan>",
                escape_xml(line)
            ));
        }
    }
    svg.push_str("</text>");

    if row.expandable {
        let cx = position.right() - TOGGLE_SPACE / 2.0 - 2.0;
        let cy = position.center_y();
        let glyph = if row.expanded { "\u{2212}" } else { "+" };
        svg.push_str(&format!(
            "<text class=\"toggle\" x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{glyph}</text>",
            cy + theme.font_size * 0.35,
            escape_xml(&theme.font_family),
            theme.font_size,
            escape_xml(&theme.toggle_color),
        ));
    }
    svg.push_str("</g>");
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("failed to allocate {width}x{height} pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
