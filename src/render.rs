use crate::config::ChartConfig;
use crate::layout::{CellLayout, ChartLayout, GridLine};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;
use tracing::trace;

/// Header row, chart surface and footer row, ready to be written into a
/// mount point.
pub fn render_html(layout: &ChartLayout, config: &ChartConfig) -> String {
    let mut html = String::new();
    html.push_str(&cell_row("header", &layout.header, layout.width, &config.theme));
    html.push_str(&svg_element(layout, config, false));
    html.push_str(&cell_row("footer", &layout.footer, layout.width, &config.theme));
    html
}

/// The chart surface alone, as a standalone SVG document.
pub fn render_svg(layout: &ChartLayout, config: &ChartConfig) -> String {
    svg_element(layout, config, true)
}

/// A complete HTML page holding one chart and its stylesheet.
pub fn render_document(layout: &ChartLayout, config: &ChartConfig, title: &str) -> String {
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    doc.push_str(&format!("<title>{}</title>", escape_xml(title)));
    doc.push_str(&format!("<style>{}</style>", stylesheet(&config.theme)));
    doc.push_str("</head><body>");
    doc.push_str("<div class=\"sankey-barchart\">");
    doc.push_str(&render_html(layout, config));
    doc.push_str("</div></body></html>");
    doc
}

pub fn stylesheet(theme: &Theme) -> String {
    format!(
        ".sankey-barchart{{font-family:{family};font-size:{size}px;background:{bg};}}\
.sankey-barchart .th{{padding:0 4px;line-height:1.3;}}\
.sankey-barchart .th label{{display:block;color:{label};white-space:nowrap;overflow:hidden;text-overflow:ellipsis;}}\
.sankey-barchart .th em{{display:block;font-style:normal;}}\
.sankey-barchart .th em.value{{color:{value};font-weight:bold;}}\
.sankey-barchart .th em.rate{{color:{rate};}}\
.sankey-barchart svg text.y{{font-size:{tick}px;}}",
        family = css_value(&theme.font_family),
        size = theme.font_size,
        bg = css_value(&theme.background),
        label = css_value(&theme.label_color),
        value = css_value(&theme.value_color),
        rate = css_value(&theme.rate_color),
        tick = theme.tick_font_size,
    )
}

fn cell_row(class: &str, cells: &[CellLayout], width: f64, theme: &Theme) -> String {
    let mut row = format!(
        "<div class=\"{class}\" style=\"width:{width}px;position:relative;display:block;clear:both;height:{}px\">",
        theme.cell_height
    );
    for cell in cells {
        row.push_str(&format!(
            "<span style=\"left:{}px;width:{}px;position:absolute\"><div class=\"th\">",
            cell.x, cell.width
        ));
        row.push_str(&format!("<label>{}</label>", escape_xml(&cell.label)));
        if let Some(value) = &cell.value_text {
            row.push_str(&format!("<em class=\"value\">{}</em>", escape_xml(value)));
        }
        if let Some(rate) = &cell.rate_text {
            row.push_str(&format!("<em class=\"rate\">{}</em>", escape_xml(rate)));
        }
        row.push_str("</div></span>");
    }
    row.push_str("</div>");
    trace!(class, cells = cells.len(), "rendered cell row");
    row
}

fn svg_element(layout: &ChartLayout, config: &ChartConfig, standalone: bool) -> String {
    let width = layout.width;
    let height = layout.height;
    let mut svg = String::new();

    if standalone {
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        ));
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&config.theme.background)
        ));
    } else {
        svg.push_str(&format!(
            "<svg width=\"{width}\" height=\"{height}\" style=\"display:block;margin-top:{}px\">",
            config.padding.top
        ));
    }

    svg.push_str("<g class=\"x-lines\" transform=\"translate(0,0)\">");
    for line in &layout.x_lines {
        svg.push_str(&line_svg(
            "x",
            line,
            &format!(
                "stroke:{};stroke-dasharray:{}",
                css_value(&config.axis.x.stroke),
                css_value(&config.axis.x.dash_array)
            ),
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"y-lines\" transform=\"translate(0,0)\">");
    for line in &layout.y_lines {
        svg.push_str(&line_svg("y", line, &format!("stroke:{}", css_value(&config.axis.y.stroke))));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"y-text\" transform=\"translate(0,0)\">");
    for tick in &layout.ticks {
        svg.push_str(&format!(
            "<text class=\"y\" x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" style=\"fill:{}\">{}</text>",
            tick.x,
            tick.y,
            escape_xml(&config.theme.font_family),
            config.theme.tick_font_size,
            escape_xml(&css_value(&config.axis.y.color)),
            escape_xml(&tick.text)
        ));
    }
    svg.push_str("</g>");

    for bar in &layout.bars {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" style=\"stroke:{}\"/>",
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            escape_xml(&config.bar.fill),
            escape_xml(&css_value(&config.bar.stroke))
        ));
    }

    svg.push_str("<g class=\"edges\" transform=\"translate(0,0)\">");
    for ribbon in &layout.ribbons {
        svg.push_str(&format!(
            "<polygon class=\"edge\" points=\"{}\" style=\"fill:{};opacity:{}\"/>",
            points_to_string(&ribbon.points),
            escape_xml(&css_value(&config.sankey.color)),
            config.sankey.opacity
        ));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn line_svg(class: &str, line: &GridLine, style: &str) -> String {
    format!(
        "<line class=\"{class}\" x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" style=\"{}\"/>",
        line.x1,
        line.y1,
        line.x2,
        line.y2,
        escape_xml(style)
    )
}

fn points_to_string(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

/// Drops characters that would end a CSS declaration or rule early.
/// Config validation already rejects them; themes built in code skip it.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '\\' | '\n' | '\r'))
        .collect()
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Funnel, Stage};
    use crate::layout::compute_layout;

    fn layout_for(stages: Vec<Stage>, width: f64) -> (ChartLayout, ChartConfig) {
        let mut funnel = Funnel::new(stages);
        funnel.derive();
        let config = ChartConfig::default();
        let layout = compute_layout(&funnel, &config, width).unwrap();
        (layout, config)
    }

    #[test]
    fn render_html_basic() {
        let (layout, config) = layout_for(
            vec![
                Stage::new("All", 19485.0, "No Shopping Activity"),
                Stage::new("Views", 5455.0, "No Cart Addition"),
                Stage::new("Cart", 768.0, "Cart Abandonment"),
            ],
            800.0,
        );
        let html = render_html(&layout, &config);
        assert!(html.starts_with("<div class=\"header\""));
        assert!(html.contains("<svg width=\"800\" height=\"200\""));
        assert!(html.contains("<em class=\"value\">19,485</em>"));
        assert!(html.contains("<em class=\"rate\">28.0%</em>"));
        assert!(!html.contains("<label>Cart Abandonment</label>"));
        assert!(html.contains("<label>No Cart Addition</label>"));
        assert_eq!(html.matches("<polygon class=\"edge\"").count(), 2);
        assert_eq!(html.matches("<rect ").count(), 3);
        assert!(html.contains("stroke-dasharray:3, 3"));
        assert!(html.contains("fill:#e9e9e9;opacity:0.4"));
        assert!(html.contains("fill=\"#739FEE\" style=\"stroke:#6596EB\""));
    }

    #[test]
    fn escapes_labels() {
        let (layout, config) = layout_for(vec![Stage::new("<b>R&D</b>", 3.0, "x")], 300.0);
        let html = render_html(&layout, &config);
        assert!(html.contains("<label>&lt;b&gt;R&amp;D&lt;/b&gt;</label>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn escapes_config_values_in_markup() {
        let mut funnel = Funnel::new(vec![Stage::new("a", 10.0, "x"), Stage::new("b", 4.0, "y")]);
        funnel.derive();
        let mut config = ChartConfig::default();
        config.bar.fill = "x\"/><script>alert(1)</script><rect fill=\"y".to_string();
        config.sankey.color = "red;}</style><b>".to_string();
        config.theme.background = "#fff}body{color:red".to_string();
        let layout = compute_layout(&funnel, &config, 400.0).unwrap();

        let html = render_html(&layout, &config);
        assert!(!html.contains("<script>"));
        assert!(html.contains("fill=\"x&quot;/&gt;&lt;script&gt;"));
        assert!(html.contains("style=\"fill:red/styleb;opacity:0.4\""));
        assert!(!html.contains("<b>"));

        let css = stylesheet(&config.theme);
        assert!(css.contains("background:#fffbodycolor:red;"));
        assert!(!render_svg(&layout, &config).contains("<script>"));
    }

    #[test]
    fn standalone_svg_and_document() {
        let (layout, config) = layout_for(
            vec![Stage::new("a", 10.0, "x"), Stage::new("b", 4.0, "y")],
            400.0,
        );
        let svg = render_svg(&layout, &config);
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("<div"));

        let doc = render_document(&layout, &config, "Funnel");
        assert!(doc.contains("<title>Funnel</title>"));
        assert!(doc.contains(".sankey-barchart .th em.rate"));
        assert!(doc.contains("<div class=\"footer\""));
    }
}
