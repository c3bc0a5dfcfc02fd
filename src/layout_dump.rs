use crate::ir::Funnel;
use crate::layout::ChartLayout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub band_width: f64,
    pub value_domain: [f64; 2],
    pub stages: Vec<StageDump>,
    pub ticks: Vec<TickDump>,
    pub ribbons: Vec<RibbonDump>,
}

#[derive(Debug, Serialize)]
pub struct StageDump {
    pub index: usize,
    pub label: String,
    pub value: f64,
    pub enter_rate: Option<f64>,
    pub exit_label: String,
    pub exit_value: Option<f64>,
    pub exit_rate: Option<f64>,
    pub column_x: f64,
    pub column_width: f64,
    pub bar: [f64; 4],
}

#[derive(Debug, Serialize)]
pub struct TickDump {
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RibbonDump {
    pub from: usize,
    pub to: usize,
    pub points: Vec<[f64; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &ChartLayout, funnel: &Funnel) -> Self {
        let stages = funnel
            .stages
            .iter()
            .zip(&layout.header)
            .zip(&layout.bars)
            .enumerate()
            .map(|(index, ((stage, cell), bar))| StageDump {
                index,
                label: stage.enter.label.clone(),
                value: stage.enter.value,
                enter_rate: stage.enter.rate,
                exit_label: stage.exit.label.clone(),
                exit_value: stage.exit.value,
                exit_rate: stage.exit.rate,
                column_x: cell.x,
                column_width: cell.width,
                bar: [bar.x, bar.y, bar.width, bar.height],
            })
            .collect();

        let ticks = layout
            .ticks
            .iter()
            .map(|tick| TickDump {
                y: tick.y,
                text: tick.text.clone(),
            })
            .collect();

        let ribbons = layout
            .ribbons
            .iter()
            .map(|ribbon| RibbonDump {
                from: ribbon.from,
                to: ribbon.to,
                points: ribbon.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            band_width: layout.band_width,
            value_domain: [layout.value_domain.0, layout.value_domain.1],
            stages,
            ticks,
            ribbons,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &ChartLayout, funnel: &Funnel) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, funnel);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
