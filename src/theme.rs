use serde::{Deserialize, Serialize};

use crate::tree::NodeKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub program_color: String,
    pub product_color: String,
    pub project_color: String,
    pub topic_color: String,
    pub node_text_color: String,
    pub node_border_color: String,
    pub line_color: String,
    pub toggle_color: String,
    pub background: String,
}

impl Theme {
    pub fn standard() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            program_color: "#E8EEFF".to_string(),
            product_color: "#E9F7EF".to_string(),
            project_color: "#FFF4E0".to_string(),
            topic_color: "#F6F7F9".to_string(),
            node_text_color: "#1C2430".to_string(),
            node_border_color: "#C7D2E5".to_string(),
            line_color: "#7A8AA6".to_string(),
            toggle_color: "#4B5B78".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            program_color: "#25304A".to_string(),
            product_color: "#1F3A2E".to_string(),
            project_color: "#3D321D".to_string(),
            topic_color: "#2A2D33".to_string(),
            node_text_color: "#E6EAF2".to_string(),
            node_border_color: "#4A5568".to_string(),
            line_color: "#8C9BB5".to_string(),
            toggle_color: "#C3CCDD".to_string(),
            background: "#14171C".to_string(),
        }
    }

    pub fn fill_for(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Program => &self.program_color,
            NodeKind::Product => &self.product_color,
            NodeKind::Project => &self.project_color,
            NodeKind::Topic => &self.topic_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}
