use crate::format::{FormatError, NumberFormat};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("`{field}` must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
    #[error("unknown theme `{0}`")]
    UnknownTheme(String),
    #[error("`{field}` is not a usable CSS value: {value:?}")]
    UnsafeValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddingConfig {
    pub top: f64,
    pub right: f64,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    /// Fraction of each band step left empty between bars.
    pub gap: f64,
    /// Outer padding before the first and after the last band, in steps.
    pub padding: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            gap: 0.6,
            padding: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YAxisConfig {
    pub ticks: usize,
    pub color: String,
    pub stroke: String,
    pub format: String,
}

impl Default for YAxisConfig {
    fn default() -> Self {
        Self {
            ticks: 4,
            color: "#cccccc".to_string(),
            stroke: "#eeeeee".to_string(),
            format: ",.0f".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XAxisConfig {
    pub stroke: String,
    pub dash_array: String,
}

impl Default for XAxisConfig {
    fn default() -> Self {
        Self {
            stroke: "#ddd".to_string(),
            dash_array: "3, 3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub y: YAxisConfig,
    pub x: XAxisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarConfig {
    pub stroke: String,
    pub fill: String,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            stroke: "#6596EB".to_string(),
            fill: "#739FEE".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyConfig {
    pub color: String,
    pub opacity: f64,
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            color: "#e9e9e9".to_string(),
            opacity: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Used only when the mount reports no width of its own.
    pub width: Option<f64>,
    pub height: f64,
    pub padding: PaddingConfig,
    pub range: RangeConfig,
    pub axis: AxisConfig,
    pub bar: BarConfig,
    pub sankey: SankeyConfig,
    pub theme: Theme,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: 200.0,
            padding: PaddingConfig::default(),
            range: RangeConfig::default(),
            axis: AxisConfig::default(),
            bar: BarConfig::default(),
            sankey: SankeyConfig::default(),
            theme: Theme::default(),
        }
    }
}

impl ChartConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        NumberFormat::parse(&self.axis.y.format)?;
        if !(0.0..=1.0).contains(&self.range.gap) {
            return Err(ConfigError::OutOfRange {
                field: "range.gap",
                expected: "between 0 and 1",
                value: self.range.gap,
            });
        }
        if let Some(width) = self.width {
            check_non_negative("width", width)?;
        }
        check_non_negative("range.padding", self.range.padding)?;
        check_non_negative("height", self.height)?;
        check_non_negative("padding.right", self.padding.right)?;
        check_non_negative("padding.top", self.padding.top)?;
        if self.axis.y.ticks == 0 {
            return Err(ConfigError::OutOfRange {
                field: "axis.y.ticks",
                expected: "at least 1",
                value: 0.0,
            });
        }
        if !(0.0..=1.0).contains(&self.sankey.opacity) {
            return Err(ConfigError::OutOfRange {
                field: "sankey.opacity",
                expected: "between 0 and 1",
                value: self.sankey.opacity,
            });
        }
        for (field, value) in [
            ("axis.x.stroke", &self.axis.x.stroke),
            ("axis.x.dash_array", &self.axis.x.dash_array),
            ("axis.y.stroke", &self.axis.y.stroke),
            ("axis.y.color", &self.axis.y.color),
            ("bar.fill", &self.bar.fill),
            ("bar.stroke", &self.bar.stroke),
            ("sankey.color", &self.sankey.color),
            ("theme.background", &self.theme.background),
            ("theme.label_color", &self.theme.label_color),
            ("theme.value_color", &self.theme.value_color),
            ("theme.rate_color", &self.theme.rate_color),
        ] {
            check_css_value(field, value, false)?;
        }
        check_css_value("theme.font_family", &self.theme.font_family, true)?;
        Ok(())
    }

    /// Overlays the sections present in `overlay`. Each section is merged
    /// field by field; sections that are absent keep their current values.
    pub fn apply(&mut self, overlay: ConfigOverlay) -> Result<(), ConfigError> {
        if let Some(name) = overlay.theme.as_deref() {
            self.theme = Theme::by_name(name)
                .ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))?;
        }
        if let Some(v) = overlay.width {
            self.width = Some(v);
        }
        if let Some(v) = overlay.height {
            self.height = v;
        }
        if let Some(padding) = overlay.padding {
            if let Some(v) = padding.top {
                self.padding.top = v;
            }
            if let Some(v) = padding.right {
                self.padding.right = v;
            }
        }
        if let Some(range) = overlay.range {
            if let Some(v) = range.gap {
                self.range.gap = v;
            }
            if let Some(v) = range.padding {
                self.range.padding = v;
            }
        }
        if let Some(axis) = overlay.axis {
            if let Some(y) = axis.y {
                if let Some(v) = y.ticks {
                    self.axis.y.ticks = v;
                }
                if let Some(v) = y.color {
                    self.axis.y.color = v;
                }
                if let Some(v) = y.stroke {
                    self.axis.y.stroke = v;
                }
                if let Some(v) = y.format {
                    self.axis.y.format = v;
                }
            }
            if let Some(x) = axis.x {
                if let Some(v) = x.stroke {
                    self.axis.x.stroke = v;
                }
                if let Some(v) = x.dash_array {
                    self.axis.x.dash_array = v;
                }
            }
        }
        if let Some(bar) = overlay.bar {
            if let Some(v) = bar.stroke {
                self.bar.stroke = v;
            }
            if let Some(v) = bar.fill {
                self.bar.fill = v;
            }
        }
        if let Some(sankey) = overlay.sankey {
            if let Some(v) = sankey.color {
                self.sankey.color = v;
            }
            if let Some(v) = sankey.opacity {
                self.sankey.opacity = v;
            }
        }
        if let Some(vars) = overlay.theme_variables {
            if let Some(v) = vars.font_family {
                self.theme.font_family = v;
            }
            if let Some(v) = vars.font_size {
                self.theme.font_size = v;
            }
            if let Some(v) = vars.tick_font_size {
                self.theme.tick_font_size = v;
            }
            if let Some(v) = vars.label_color {
                self.theme.label_color = v;
            }
            if let Some(v) = vars.value_color {
                self.theme.value_color = v;
            }
            if let Some(v) = vars.rate_color {
                self.theme.rate_color = v;
            }
            if let Some(v) = vars.cell_height {
                self.theme.cell_height = v;
            }
            if let Some(v) = vars.background {
                self.theme.background = v;
            }
        }
        Ok(())
    }

    /// Defaults overlaid with a JSON options object, then validated.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !value.is_null() {
            let overlay: ConfigOverlay = serde_json::from_value(value.clone())
                .map_err(|err| ConfigError::Parse(err.to_string()))?;
            config.apply(overlay)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "a finite non-negative number",
            value,
        })
    }
}

/// Colors and dash patterns land in both `style` attributes and the
/// stylesheet, so nothing that can close either is accepted. Font family
/// lists may quote names, as long as the quotes pair up.
fn check_css_value(field: &'static str, value: &str, quoted: bool) -> Result<(), ConfigError> {
    let closes = |c: char| matches!(c, ';' | '{' | '}' | '<' | '>' | '\\') || c.is_control();
    let bad_quotes = if quoted {
        value.matches('"').count() % 2 != 0 || value.matches('\'').count() % 2 != 0
    } else {
        value.contains(['"', '\''])
    };
    if value.chars().any(closes) || bad_quotes {
        return Err(ConfigError::UnsafeValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverlay {
    pub theme: Option<String>,
    #[serde(alias = "themeVariables")]
    pub theme_variables: Option<ThemeVariables>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub padding: Option<PaddingOverlay>,
    pub range: Option<RangeOverlay>,
    pub axis: Option<AxisOverlay>,
    pub bar: Option<BarOverlay>,
    pub sankey: Option<SankeyOverlay>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaddingOverlay {
    pub top: Option<f64>,
    pub right: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeOverlay {
    pub gap: Option<f64>,
    pub padding: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AxisOverlay {
    pub y: Option<YAxisOverlay>,
    pub x: Option<XAxisOverlay>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YAxisOverlay {
    pub ticks: Option<usize>,
    pub color: Option<String>,
    pub stroke: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct XAxisOverlay {
    pub stroke: Option<String>,
    #[serde(alias = "dashArray")]
    pub dash_array: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BarOverlay {
    pub stroke: Option<String>,
    pub fill: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SankeyOverlay {
    pub color: Option<String>,
    pub opacity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeVariables {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub tick_font_size: Option<f64>,
    pub label_color: Option<String>,
    pub value_color: Option<String>,
    pub rate_color: Option<String>,
    pub cell_height: Option<f64>,
    pub background: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> Result<ChartConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ChartConfig::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(value) => value,
        Err(json_err) => json5::from_str::<serde_json::Value>(&contents)
            .map_err(|_| ConfigError::Parse(json_err.to_string()))?,
    };
    ChartConfig::from_value(&value)
}
