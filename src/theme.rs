use serde::{Deserialize, Serialize};

/// Typography and colors for the header/footer cells and tick text. Chart
/// geometry colors live in [`crate::config::ChartConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub tick_font_size: f64,
    pub label_color: String,
    pub value_color: String,
    pub rate_color: String,
    pub cell_height: f64,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"Helvetica Neue\", Helvetica, Arial, sans-serif".to_string(),
            font_size: 12.0,
            tick_font_size: 10.0,
            label_color: "#555555".to_string(),
            value_color: "#333333".to_string(),
            rate_color: "#999999".to_string(),
            cell_height: 56.0,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            tick_font_size: 10.0,
            label_color: "#1C2430".to_string(),
            value_color: "#1C2430".to_string(),
            rate_color: "#7A8AA6".to_string(),
            cell_height: 60.0,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
