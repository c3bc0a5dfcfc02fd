/// One header or footer cell, positioned over a chart column.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout {
    pub index: usize,
    pub x: f64,
    pub width: f64,
    pub label: String,
    pub value: Option<f64>,
    pub value_text: Option<String>,
    pub rate: Option<f64>,
    pub rate_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayout {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Quadrilateral between the tops of two adjacent bars, closed along the
/// baseline one pixel below the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RibbonLayout {
    pub from: usize,
    pub to: usize,
    pub points: [(f64, f64); 4],
}

/// Everything needed to draw one chart, in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub band_width: f64,
    pub value_domain: (f64, f64),
    pub header: Vec<CellLayout>,
    pub footer: Vec<CellLayout>,
    pub x_lines: Vec<GridLine>,
    pub y_lines: Vec<GridLine>,
    pub ticks: Vec<TickLabel>,
    pub bars: Vec<BarLayout>,
    pub ribbons: Vec<RibbonLayout>,
}
