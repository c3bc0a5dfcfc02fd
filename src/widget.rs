//! Mount points and the host-widget adapter.
//!
//! A [`Mount`] stands in for the element a host page hands us. Every render
//! replaces its content wholesale, so rendering the same chart twice leaves
//! exactly one chart behind.

use crate::config::{ChartConfig, ConfigError};
use crate::format::FormatError;
use crate::ir::{DataError, Funnel, StageTable};
use crate::layout::{ChartLayout, compute_layout};
use crate::render::render_html;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Name the widget registers under with the host framework.
pub const WIDGET_NAME: &str = "sankeyBarChart";

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid widget payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mount {
    id: String,
    width: f64,
    height: f64,
    content: String,
}

impl Mount {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            content: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn replace_content(&mut self, content: String) {
        self.content = content;
    }
}

/// Derives `dataset` in place, lays it out against the mount's current size
/// and replaces the mount's content with the rendered chart.
pub fn render(
    target: &mut Mount,
    dataset: &mut Funnel,
    config: &ChartConfig,
) -> Result<ChartLayout, FormatError> {
    dataset.derive();

    let usable = |w: f64| w.is_finite() && w > 0.0;
    let width = if usable(target.width()) {
        target.width()
    } else {
        config.width.filter(|&w| usable(w)).unwrap_or(0.0)
    };
    if width <= 0.0 {
        warn!(mount = target.id(), "mount has no width; chart will be empty");
    }

    // A zero configured height defers to the mount's measured height.
    let measured;
    let config = if config.height > 0.0 {
        config
    } else {
        measured = ChartConfig {
            height: if target.height().is_finite() {
                target.height().max(0.0)
            } else {
                0.0
            },
            ..config.clone()
        };
        &measured
    };

    let layout = compute_layout(dataset, config, width)?;
    let height = layout.height;
    let html = render_html(&layout, config);
    target.replace_content(html);
    debug!(mount = target.id(), width, height, "rendered chart");
    Ok(layout)
}

/// A chart bound to its dataset and configuration, re-rendered in full on
/// every resize.
#[derive(Debug, Clone)]
pub struct SankeyBarchart {
    funnel: Funnel,
    config: ChartConfig,
    layout: Option<ChartLayout>,
}

impl SankeyBarchart {
    pub fn new(funnel: Funnel, config: ChartConfig) -> Self {
        Self {
            funnel,
            config,
            layout: None,
        }
    }

    pub fn render(&mut self, mount: &mut Mount) -> Result<&ChartLayout, FormatError> {
        let layout = render(mount, &mut self.funnel, &self.config)?;
        Ok(self.layout.insert(layout))
    }

    pub fn resize(
        &mut self,
        mount: &mut Mount,
        width: f64,
        height: f64,
    ) -> Result<&ChartLayout, FormatError> {
        mount.set_size(width, height);
        self.render(mount)
    }

    pub fn funnel(&self) -> &Funnel {
        &self.funnel
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn layout(&self) -> Option<&ChartLayout> {
        self.layout.as_ref()
    }
}

/// What the host framework passes to `renderValue`.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetPayload {
    pub data: StageTable,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl WidgetPayload {
    pub fn from_json(input: &str) -> Result<Self, WidgetError> {
        let value = crate::ir::parse_json_value(input)?;
        serde_json::from_value(value).map_err(|err| WidgetError::Payload(err.to_string()))
    }
}

/// Host-framework adapter: one instance per element, created by the host's
/// factory with the element's initial size.
#[derive(Debug, Clone)]
pub struct HtmlWidget {
    mount: Mount,
    chart: Option<SankeyBarchart>,
}

impl HtmlWidget {
    pub fn factory(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            mount: Mount::new(id, width, height),
            chart: None,
        }
    }

    pub fn name(&self) -> &'static str {
        WIDGET_NAME
    }

    pub fn render_value(&mut self, payload: &WidgetPayload) -> Result<&str, WidgetError> {
        let funnel = Funnel::from_table(&payload.data)?;
        let config = ChartConfig::from_value(&payload.options)?;
        let chart = self.chart.insert(SankeyBarchart::new(funnel, config));
        chart.render(&mut self.mount)?;
        Ok(self.mount.content())
    }

    /// Records the new size and, once a value has been rendered, redraws.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<&str, WidgetError> {
        match self.chart.as_mut() {
            Some(chart) => {
                chart.resize(&mut self.mount, width, height)?;
            }
            None => self.mount.set_size(width, height),
        }
        Ok(self.mount.content())
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn chart(&self) -> Option<&SankeyBarchart> {
        self.chart.as_ref()
    }
}
