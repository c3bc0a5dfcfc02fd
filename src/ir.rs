use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("column `{column}` has {found} entries, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("stage {index} has value {value}; expected a finite non-negative number")]
    InvalidValue { index: usize, value: f64 },
    #[error("invalid dataset: {0}")]
    Parse(String),
}

/// The entry side of a stage: how many reached it, and what fraction of the
/// first stage that is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnterSide {
    pub value: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

/// The exit side of a stage: the loss between this stage and the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitSide {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub enter: EnterSide,
    #[serde(default)]
    pub exit: ExitSide,
}

impl Stage {
    pub fn new(label: impl Into<String>, value: f64, exit_label: impl Into<String>) -> Self {
        Self {
            enter: EnterSide {
                value,
                label: label.into(),
                rate: None,
            },
            exit: ExitSide {
                label: exit_label.into(),
                value: None,
                rate: None,
            },
        }
    }
}

/// Ordered funnel stages. Order is the funnel progression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Funnel {
    pub stages: Vec<Stage>,
}

impl Funnel {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        for (index, stage) in self.stages.iter().enumerate() {
            let value = stage.enter.value;
            if !value.is_finite() || value < 0.0 {
                return Err(DataError::InvalidValue { index, value });
            }
        }
        Ok(())
    }

    /// Attach exit counts/rates and entry conversion rates to every stage.
    ///
    /// Previously derived fields are cleared first, so deriving twice gives
    /// the same result as deriving once.
    pub fn derive(&mut self) {
        for stage in &mut self.stages {
            stage.enter.rate = None;
            stage.exit.value = None;
            stage.exit.rate = None;
        }

        let len = self.stages.len();
        for i in 0..len.saturating_sub(1) {
            let entered = self.stages[i].enter.value;
            let exit_count = entered - self.stages[i + 1].enter.value;
            let exit = &mut self.stages[i].exit;
            exit.value = Some(exit_count);
            exit.rate = finite_ratio(exit_count, entered);
            if exit.rate.is_none() {
                warn!(stage = i, "exit rate suppressed; stage has no entries");
            }
        }

        let Some(first) = self.stages.first().map(|stage| stage.enter.value) else {
            return;
        };
        for stage in self.stages.iter_mut().skip(1) {
            stage.enter.rate = finite_ratio(stage.enter.value, first);
        }
        if len > 1 && first == 0.0 {
            warn!("conversion rates suppressed; first stage has no entries");
        }
        debug!(stages = len, "derived funnel rates");
    }

    pub fn max_enter_value(&self) -> f64 {
        self.stages
            .iter()
            .map(|stage| stage.enter.value)
            .fold(0.0_f64, f64::max)
    }

    /// Builds stages from a host table. Each row becomes the enter side; the
    /// exit label is the row's `exit_label` or `"<label> Exit"`.
    pub fn from_table(table: &StageTable) -> Result<Self, DataError> {
        let stages = match table {
            StageTable::Columns(columns) => {
                let expected = columns.value.len();
                if columns.label.len() != expected {
                    return Err(DataError::ColumnLength {
                        column: "label",
                        expected,
                        found: columns.label.len(),
                    });
                }
                if let Some(exit_labels) = &columns.exit_label {
                    if exit_labels.len() != expected {
                        return Err(DataError::ColumnLength {
                            column: "exit_label",
                            expected,
                            found: exit_labels.len(),
                        });
                    }
                }
                columns
                    .value
                    .iter()
                    .zip(&columns.label)
                    .enumerate()
                    .map(|(idx, (value, label))| {
                        let exit_label = columns
                            .exit_label
                            .as_ref()
                            .and_then(|labels| labels.get(idx).cloned())
                            .unwrap_or_else(|| synthesize_exit_label(label));
                        Stage::new(label.clone(), *value, exit_label)
                    })
                    .collect()
            }
            StageTable::Rows(rows) => rows
                .iter()
                .map(|row| {
                    let exit_label = row
                        .exit_label
                        .clone()
                        .unwrap_or_else(|| synthesize_exit_label(&row.label));
                    Stage::new(row.label.clone(), row.value, exit_label)
                })
                .collect(),
        };
        let funnel = Self::new(stages);
        funnel.validate()?;
        Ok(funnel)
    }
}

fn synthesize_exit_label(label: &str) -> String {
    format!("{label} Exit")
}

fn finite_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

/// Tabular stage data as a host framework hands it over: either
/// column-oriented (`{"value": [...], "label": [...]}`) or a list of rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StageTable {
    Columns(StageColumns),
    Rows(Vec<StageRow>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageColumns {
    pub value: Vec<f64>,
    pub label: Vec<String>,
    #[serde(default)]
    pub exit_label: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageRow {
    pub value: f64,
    pub label: String,
    #[serde(default)]
    pub exit_label: Option<String>,
}

/// Parses JSON, falling back to JSON5 for hand-written inputs with unquoted
/// keys or single-quoted strings.
pub fn parse_json_value(input: &str) -> Result<serde_json::Value, DataError> {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) => Ok(value),
        Err(json_err) => json5::from_str::<serde_json::Value>(input)
            .map_err(|_| DataError::Parse(json_err.to_string())),
    }
}

pub fn parse_funnel(input: &str) -> Result<Funnel, DataError> {
    let value = parse_json_value(input)?;
    let funnel: Funnel =
        serde_json::from_value(value).map_err(|err| DataError::Parse(err.to_string()))?;
    funnel.validate()?;
    Ok(funnel)
}
