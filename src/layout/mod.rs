pub mod scale;
pub(crate) mod types;
pub use scale::*;
pub use types::*;

use crate::config::ChartConfig;
use crate::format::{FormatError, NumberFormat, format_count, format_rate};
use crate::ir::Funnel;
use tracing::{debug, trace};

// Tick labels sit this far above their gridline.
const TICK_LABEL_LIFT: f64 = 3.0;
const TICK_LABEL_X: f64 = 2.0;
// Ribbons overshoot the bar edges and baseline by a pixel so no seam shows.
const RIBBON_OVERSHOOT: f64 = 1.0;
// Target tick count used when rounding the value domain.
const NICE_TICKS: usize = 10;

/// Scales shared by every drawing step of one render.
#[derive(Debug, Clone)]
pub struct Scales {
    pub band: BandScale,
    pub value: LinearScale,
    pub height: f64,
    pub width: f64,
}

impl Scales {
    pub fn new(funnel: &Funnel, config: &ChartConfig, width: f64) -> Self {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        let height = config.height;
        let band = BandScale::round_bands(
            funnel.len(),
            (0.0, (width - config.padding.right).max(0.0)),
            config.range.gap,
            config.range.padding,
        );
        let value =
            LinearScale::new((0.0, funnel.max_enter_value()), (0.0, height)).nice(NICE_TICKS);
        Self {
            band,
            value,
            height,
            width,
        }
    }

    fn bar_top(&self, value: f64) -> f64 {
        self.height - self.value.scale(value)
    }
}

/// Lays out a funnel whose rates have already been derived
/// (see [`Funnel::derive`]).
pub fn compute_layout(
    funnel: &Funnel,
    config: &ChartConfig,
    width: f64,
) -> Result<ChartLayout, FormatError> {
    let tick_format = NumberFormat::parse(&config.axis.y.format)?;
    let scales = Scales::new(funnel, config, width);

    let header = header_cells(funnel, &scales);
    let footer = footer_cells(funnel, &scales);
    let x_lines = x_gridlines(&scales);
    let (y_lines, ticks) = y_axis(funnel, config, &scales, &tick_format);
    let bars = bars(funnel, &scales);
    let ribbons = ribbons(funnel, &scales);

    debug!(
        stages = funnel.len(),
        width = scales.width,
        height = scales.height,
        band_width = scales.band.bandwidth(),
        value_max = scales.value.domain().1,
        "computed chart layout"
    );

    Ok(ChartLayout {
        width: scales.width,
        height: scales.height,
        band_width: scales.band.bandwidth(),
        value_domain: scales.value.domain(),
        header,
        footer,
        x_lines,
        y_lines,
        ticks,
        bars,
        ribbons,
    })
}

fn header_cells(funnel: &Funnel, scales: &Scales) -> Vec<CellLayout> {
    let widths = scales.band.column_widths(scales.width);
    let cells: Vec<CellLayout> = funnel
        .stages
        .iter()
        .zip(scales.band.starts())
        .zip(widths)
        .enumerate()
        .map(|(index, ((stage, start), width))| CellLayout {
            index,
            x: start.round(),
            width,
            label: stage.enter.label.clone(),
            value: Some(stage.enter.value),
            value_text: Some(format_count(stage.enter.value)),
            rate: stage.enter.rate,
            rate_text: stage.enter.rate.map(format_rate),
        })
        .collect();
    trace!(cells = cells.len(), "header cells");
    cells
}

fn footer_cells(funnel: &Funnel, scales: &Scales) -> Vec<CellLayout> {
    let widths = scales.band.column_widths(scales.width);
    let count = funnel.len().saturating_sub(1);
    let cells: Vec<CellLayout> = funnel
        .stages
        .iter()
        .zip(scales.band.starts())
        .zip(widths)
        .take(count)
        .enumerate()
        .map(|(index, ((stage, start), width))| CellLayout {
            index,
            x: start.round(),
            width,
            label: stage.exit.label.clone(),
            value: stage.exit.value,
            value_text: stage.exit.value.map(format_count),
            rate: stage.exit.rate,
            rate_text: stage.exit.rate.map(format_rate),
        })
        .collect();
    trace!(cells = cells.len(), "footer cells");
    cells
}

fn x_gridlines(scales: &Scales) -> Vec<GridLine> {
    scales
        .band
        .starts()
        .iter()
        .map(|&x| GridLine {
            x1: x,
            y1: 0.0,
            x2: x,
            y2: scales.height,
        })
        .collect()
}

fn y_axis(
    funnel: &Funnel,
    config: &ChartConfig,
    scales: &Scales,
    format: &NumberFormat,
) -> (Vec<GridLine>, Vec<TickLabel>) {
    let height = scales.height;
    let line = |y: f64| GridLine {
        x1: 0.0,
        y1: y,
        x2: scales.width,
        y2: y,
    };
    if funnel.is_empty() {
        return (vec![line(height)], Vec::new());
    }

    let positions = tick_positions(config.axis.y.ticks, height);
    let lines = positions.iter().map(|&y| line(y)).collect();
    let last = positions.len() - 1;
    let labels = positions
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let text = if i == last {
                "0".to_string()
            } else {
                let value = scales.value.invert(height - y);
                format.format(value.round())
            };
            let lifted = y - TICK_LABEL_LIFT;
            // The top label would be clipped above the surface; drop it
            // below its line instead.
            let y = if lifted < config.theme.tick_font_size {
                y + config.theme.tick_font_size
            } else {
                lifted
            };
            TickLabel {
                x: TICK_LABEL_X,
                y,
                text,
            }
        })
        .collect();
    (lines, labels)
}

fn bars(funnel: &Funnel, scales: &Scales) -> Vec<BarLayout> {
    funnel
        .stages
        .iter()
        .zip(scales.band.starts())
        .enumerate()
        .map(|(index, (stage, &x))| {
            let top = scales.bar_top(stage.enter.value);
            BarLayout {
                index,
                x,
                y: top,
                width: scales.band.bandwidth(),
                height: scales.height - top,
            }
        })
        .collect()
}

fn ribbons(funnel: &Funnel, scales: &Scales) -> Vec<RibbonLayout> {
    let baseline = scales.height + RIBBON_OVERSHOOT;
    funnel
        .stages
        .windows(2)
        .zip(scales.band.starts().windows(2))
        .enumerate()
        .map(|(from, (pair, starts))| {
            let right_edge = starts[0] + scales.band.bandwidth() + RIBBON_OVERSHOOT;
            let next_left = starts[1];
            let y1 = scales.bar_top(pair[0].enter.value);
            let y2 = scales.bar_top(pair[1].enter.value);
            RibbonLayout {
                from,
                to: from + 1,
                points: [
                    (right_edge, y1),
                    (next_left, y2),
                    (next_left, baseline),
                    (right_edge, baseline),
                ],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Stage;

    fn shop_funnel() -> Funnel {
        let mut funnel = Funnel::new(vec![
            Stage::new("All", 19485.0, "No Shopping Activity"),
            Stage::new("Views", 5455.0, "No Cart Addition"),
            Stage::new("Cart", 768.0, "Cart Abandonment"),
        ]);
        funnel.derive();
        funnel
    }

    #[test]
    fn lays_out_the_shop_funnel() {
        let layout = compute_layout(&shop_funnel(), &ChartConfig::default(), 800.0).unwrap();
        assert_eq!(layout.value_domain, (0.0, 20000.0));
        assert_eq!(layout.header.len(), 3);
        assert_eq!(layout.footer.len(), 2);
        assert_eq!(layout.bars.len(), 3);
        assert_eq!(layout.ribbons.len(), 2);
        assert_eq!(layout.x_lines.len(), 3);

        assert_eq!(layout.header[0].value_text.as_deref(), Some("19,485"));
        assert_eq!(layout.header[0].rate_text, None);
        assert_eq!(layout.header[1].rate_text.as_deref(), Some("28.0%"));
        assert_eq!(layout.header[2].rate_text.as_deref(), Some("3.9%"));
        assert_eq!(layout.footer[0].value_text.as_deref(), Some("14,030"));
        assert_eq!(layout.footer[0].rate_text.as_deref(), Some("72.0%"));
        assert_eq!(layout.footer[1].label, "No Cart Addition");
    }

    #[test]
    fn bars_grow_up_from_the_baseline() {
        let layout = compute_layout(&shop_funnel(), &ChartConfig::default(), 800.0).unwrap();
        let first = layout.bars[0];
        // 19485 of a 20000 domain over 200px
        assert!((first.height - 194.85).abs() < 1e-9);
        assert!((first.y + first.height - 200.0).abs() < 1e-9);
        for bar in &layout.bars {
            assert_eq!(bar.width, layout.band_width);
        }
    }

    #[test]
    fn ribbons_join_adjacent_bar_tops() {
        let layout = compute_layout(&shop_funnel(), &ChartConfig::default(), 800.0).unwrap();
        let ribbon = layout.ribbons[0];
        let (a, b) = (layout.bars[0], layout.bars[1]);
        assert_eq!(ribbon.points[0], (a.x + a.width + 1.0, a.y));
        assert_eq!(ribbon.points[1], (b.x, b.y));
        assert_eq!(ribbon.points[2], (b.x, 201.0));
        assert_eq!(ribbon.points[3], (a.x + a.width + 1.0, 201.0));
    }

    #[test]
    fn tick_labels_invert_the_value_scale() {
        let layout = compute_layout(&shop_funnel(), &ChartConfig::default(), 800.0).unwrap();
        let texts: Vec<&str> = layout.ticks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["20,000", "15,000", "10,000", "5,000", "0"]);
        assert_eq!(layout.y_lines.len(), 5);
        assert_eq!(layout.ticks[1].y, 47.0);
        assert_eq!(layout.ticks[4].y, 197.0);
        assert!(layout.ticks[0].y > 0.0);
    }

    #[test]
    fn header_and_footer_share_band_positions() {
        let layout = compute_layout(&shop_funnel(), &ChartConfig::default(), 800.0).unwrap();
        for (cell, bar) in layout.header.iter().zip(&layout.bars) {
            assert_eq!(cell.x, bar.x.round());
        }
        for (cell, header) in layout.footer.iter().zip(&layout.header) {
            assert_eq!((cell.x, cell.width), (header.x, header.width));
        }
        let covered: f64 = layout.header.iter().map(|c| c.width).sum();
        assert_eq!(layout.header[0].x + covered, 800.0);
    }

    #[test]
    fn single_stage_has_no_footer_or_ribbons() {
        let mut funnel = Funnel::new(vec![Stage::new("Only", 42.0, "Gone")]);
        funnel.derive();
        let layout = compute_layout(&funnel, &ChartConfig::default(), 600.0).unwrap();
        assert_eq!(layout.header.len(), 1);
        assert_eq!(layout.header[0].rate_text, None);
        assert!(layout.footer.is_empty());
        assert!(layout.ribbons.is_empty());
        assert_eq!(layout.bars.len(), 1);
    }

    #[test]
    fn empty_funnel_keeps_only_the_baseline() {
        let layout = compute_layout(&Funnel::default(), &ChartConfig::default(), 600.0).unwrap();
        assert!(layout.header.is_empty());
        assert!(layout.bars.is_empty());
        assert!(layout.ribbons.is_empty());
        assert!(layout.ticks.is_empty());
        assert!(layout.x_lines.is_empty());
        assert_eq!(layout.y_lines.len(), 1);
        assert_eq!(layout.y_lines[0].y1, 200.0);
    }

    #[test]
    fn zero_entries_render_without_rates() {
        let mut funnel = Funnel::new(vec![
            Stage::new("a", 0.0, "x"),
            Stage::new("b", 0.0, "y"),
        ]);
        funnel.derive();
        let layout = compute_layout(&funnel, &ChartConfig::default(), 400.0).unwrap();
        assert_eq!(layout.footer[0].rate_text, None);
        assert_eq!(layout.header[1].rate_text, None);
        assert!(layout.bars.iter().all(|bar| bar.height == 0.0));
        assert!(layout.ticks.iter().all(|t| t.text == "0"));
    }

    #[test]
    fn uses_configured_tick_count_and_format() {
        let config = ChartConfig::from_value(&serde_json::json!({
            "height": 100,
            "axis": { "y": { "ticks": 2, "format": ".1e" } }
        }))
        .unwrap();
        let layout = compute_layout(&shop_funnel(), &config, 800.0).unwrap();
        let texts: Vec<&str> = layout.ticks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["2.0e+4", "1.0e+4", "0"]);
    }

    #[test]
    fn resizing_keeps_the_band_invariants() {
        let funnel = shop_funnel();
        let config = ChartConfig::default();
        for width in [800.0, 400.0] {
            let layout = compute_layout(&funnel, &config, width).unwrap();
            let limit = width - config.padding.right;
            for pair in layout.bars.windows(2) {
                assert!(pair[0].x < pair[1].x);
                assert!(pair[0].x + pair[0].width <= pair[1].x);
            }
            let last = layout.bars.last().unwrap();
            assert!(layout.bars[0].x >= 0.0);
            assert!(last.x + last.width <= limit);
            let covered: f64 = layout.header.iter().map(|c| c.width).sum();
            assert_eq!(layout.header[0].x + covered, width);
        }
    }
}
