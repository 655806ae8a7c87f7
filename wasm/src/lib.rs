use portfolio_tree::config::LayoutConfig;
use portfolio_tree::expansion::Generation;
use portfolio_tree::layout::NodePosition;
use portfolio_tree::layout_dump::LayoutDump;
use portfolio_tree::render::render_svg;
use portfolio_tree::theme::Theme;
use portfolio_tree::tree::parse_tree_document;
use portfolio_tree::view::DiagramView;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeDiagramOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fast_text: Option<bool>,
}

fn build_options(options: TreeDiagramOptions) -> (Theme, LayoutConfig) {
    let mut theme = if options.theme.as_deref() == Some("dark") {
        Theme::dark()
    } else {
        Theme::standard()
    };
    if let Some(font_family) = options.font_family {
        theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        theme.font_size = font_size;
    }
    let mut config = LayoutConfig::default();
    if let Some(fast_text) = options.fast_text {
        config.fast_text_metrics = fast_text;
    }
    (theme, config)
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Browser-side session: the host renders `columnsJson`, measures the boxes,
/// reports them with `recordPositionsJson`, then draws `connectorsJson`.
#[wasm_bindgen]
pub struct TreeDiagram {
    view: DiagramView,
    theme: Theme,
}

#[wasm_bindgen]
impl TreeDiagram {
    #[wasm_bindgen(constructor)]
    pub fn new(tree_json: &str, options_json: Option<String>) -> Result<TreeDiagram, JsValue> {
        let options = match options_json {
            Some(raw) => serde_json::from_str::<TreeDiagramOptions>(&raw).map_err(js_error)?,
            None => TreeDiagramOptions::default(),
        };
        let (theme, config) = build_options(options);
        let forest = parse_tree_document(tree_json).map_err(js_error)?;
        Ok(Self {
            view: DiagramView::with_config(forest, config),
            theme,
        })
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        self.view.toggle(id)
    }

    #[wasm_bindgen(js_name = expandAll)]
    pub fn expand_all(&mut self) -> f64 {
        self.view.expand_all().value() as f64
    }

    #[wasm_bindgen(js_name = collapseAll)]
    pub fn collapse_all(&mut self) -> f64 {
        self.view.collapse_all().value() as f64
    }

    /// Generations are exposed as JS numbers; precision is exact up to 2^53.
    pub fn generation(&self) -> f64 {
        self.view.generation().value() as f64
    }

    #[wasm_bindgen(js_name = columnsJson)]
    pub fn columns_json(&self) -> Result<String, JsValue> {
        let dump = LayoutDump::from_layout(&self.view.layout());
        serde_json::to_string(&serde_json::json!({
            "generation": dump.generation,
            "programs": dump.programs,
            "products": dump.products,
            "projects": dump.projects,
        }))
        .map_err(js_error)
    }

    /// Accepts `[{id, x, y, width, height}]` measured for `generation`;
    /// returns how many boxes were kept.
    #[wasm_bindgen(js_name = recordPositionsJson)]
    pub fn record_positions_json(&mut self, generation: f64, json: &str) -> Result<u32, JsValue> {
        let positions: Vec<NodePosition> = serde_json::from_str(json).map_err(js_error)?;
        if !generation.is_finite() || generation < 0.0 {
            return Err(js_error(format!("invalid generation {generation}")));
        }
        let accepted = self
            .view
            .record_positions(Generation::new(generation as u64), positions);
        Ok(accepted as u32)
    }

    #[wasm_bindgen(js_name = connectorsJson)]
    pub fn connectors_json(&self) -> Result<String, JsValue> {
        let dump = LayoutDump::from_layout(&self.view.layout());
        serde_json::to_string(&dump.connectors).map_err(js_error)
    }

    /// Self-contained SVG using the built-in column measurement.
    #[wasm_bindgen(js_name = renderSvg)]
    pub fn render_svg(&mut self) -> String {
        self.view.measure_with_builtin_host(&self.theme);
        render_svg(&self.view.layout(), &self.theme, self.view.config())
    }
}

#[cfg(test)]
mod tests {
    use crate::{TreeDiagram, TreeDiagramOptions, build_options};

    const TREE: &str = r#"[{"id":"a","name":"A","type":"program","children":[
        {"id":"b","name":"B","type":"program"},
        {"id":"c","name":"C","type":"program"}]}]"#;

    #[test]
    fn host_measurements_drive_connectors() {
        let mut diagram = TreeDiagram::new(TREE, None).unwrap();
        let generation = diagram.expand_all();
        assert_eq!(generation, 1.0);

        let positions = r#"[
            {"id":"a","x":0,"y":0,"width":120,"height":30},
            {"id":"b","x":28,"y":50,"width":100,"height":30},
            {"id":"c","x":28,"y":90,"width":100,"height":30}]"#;
        assert_eq!(diagram.record_positions_json(generation, positions).unwrap(), 3);

        let connectors: serde_json::Value =
            serde_json::from_str(&diagram.connectors_json().unwrap()).unwrap();
        let kinds: Vec<&str> = connectors
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["trunk", "branch", "branch"]);
    }

    #[test]
    fn stale_measurements_are_ignored() {
        let mut diagram = TreeDiagram::new(TREE, None).unwrap();
        let stale = diagram.generation();
        diagram.toggle("a");
        let positions = r#"[{"id":"a","x":0,"y":0,"width":120,"height":30}]"#;
        assert_eq!(diagram.record_positions_json(stale, positions).unwrap(), 0);
        assert_eq!(diagram.connectors_json().unwrap(), "[]");
    }

    #[test]
    fn dark_option_selects_dark_theme() {
        let options: TreeDiagramOptions =
            serde_json::from_str(r#"{"theme":"dark","fontSize":15,"fastText":false}"#).unwrap();
        let (theme, config) = build_options(options);
        assert_eq!(theme.background, portfolio_tree::theme::Theme::dark().background);
        assert_eq!(theme.font_size, 15.0);
        assert!(!config.fast_text_metrics);
    }
}
