#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod format;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod theme;
pub mod widget;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{ChartConfig, ConfigError, load_config};
pub use format::{FormatError, NumberFormat};
pub use ir::{DataError, EnterSide, ExitSide, Funnel, Stage, StageTable, parse_funnel};
pub use layout::{ChartLayout, compute_layout};
pub use render::{render_document, render_html, render_svg};
pub use theme::Theme;
pub use widget::{HtmlWidget, Mount, SankeyBarchart, WIDGET_NAME, WidgetError, WidgetPayload, render};

/// Derives `funnel` and renders the header, chart surface and footer for a
/// container `width` pixels wide.
pub fn render_to_html(
    funnel: &mut Funnel,
    config: &ChartConfig,
    width: f64,
) -> Result<String, FormatError> {
    let mut mount = Mount::new("chart", width, config.height);
    render(&mut mount, funnel, config)?;
    Ok(mount.content().to_string())
}
