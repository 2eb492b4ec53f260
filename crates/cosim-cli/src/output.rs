//! Output formatting for cosim-replay (text, table, json)

use clap::ValueEnum;
use colored::Colorize;
use cosim_gateway::{Frame, GatewayError, Value};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per call (default)
    #[default]
    Text,
    /// ASCII table after the replay
    Table,
    /// JSON array after the replay
    Json,
}

/// Error as reported to hosts
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: u16,
    pub message: String,
}

impl From<&GatewayError> for ErrorReport {
    fn from(e: &GatewayError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Result of one replayed call
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub step: usize,
    pub opcode: u8,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Opcode")]
    opcode: u8,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&Outcome> for OutcomeRow {
    fn from(o: &Outcome) -> Self {
        let (status, result) = match (&o.result, &o.error) {
            (_, Some(e)) => (format!("error {}", e.code), e.message.clone()),
            (Some(frame), None) => ("ok".to_string(), format_frame(frame)),
            (None, None) => ("ok".to_string(), String::new()),
        };
        Self {
            step: o.step,
            opcode: o.opcode,
            operation: o.operation.clone(),
            status,
            result,
        }
    }
}

/// Compact rendering of a result frame
pub fn format_frame(frame: &Frame) -> String {
    frame
        .values()
        .iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_value(value: &Value) -> String {
    match value {
        Value::UInt8(v) => v.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int32(v) if v.len() == 1 => v[0].to_string(),
        Value::Int32(v) => format!("{:?}", v),
        Value::Float64(m) if m.is_scalar() => m.data.iter().map(f64::to_string).collect(),
        Value::Float64(m) => format!("{}x{} {:?}", m.rows, m.cols, m.data),
        Value::Str(s) => format!("{:?}", s),
    }
}

/// Collects outcomes and prints them in the configured format
pub struct OutputContext {
    pub format: OutputFormat,
    outcomes: Vec<Outcome>,
}

impl OutputContext {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            outcomes: Vec::new(),
        }
    }

    /// Record an outcome; text output is printed immediately
    pub fn record(&mut self, outcome: Outcome) {
        if self.format == OutputFormat::Text {
            print_line(&outcome);
        }
        self.outcomes.push(outcome);
    }

    /// Print everything not yet printed
    pub fn finish(&self) {
        match self.format {
            OutputFormat::Text => {}
            OutputFormat::Table => {
                let rows: Vec<OutcomeRow> = self.outcomes.iter().map(OutcomeRow::from).collect();
                println!("{}", Table::new(rows));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&self.outcomes).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }
}

fn print_line(o: &Outcome) {
    let head = format!("[{:>3}] {:>2} {}", o.step, o.opcode, o.operation);
    match (&o.result, &o.error) {
        (_, Some(e)) => println!("{} {}", head, format!("error {}: {}", e.code, e.message).red()),
        (Some(frame), None) if !frame.is_empty() => {
            println!("{} {} {}", head, "->".green(), format_frame(frame))
        }
        _ => println!("{} {}", head, "ok".green()),
    }
}
