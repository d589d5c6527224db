use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

/// One row of the complexity report. Missing fields default to zero/empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexityWarning {
    pub file: String,
    pub name: String,
    pub lines: i64,
    pub nesting: i64,
    pub params: i64,
    pub score: i64,
}

/// Complexity warnings grouped by file, each group ranked worst first.
#[derive(Debug, Default)]
pub struct ComplexityReport {
    by_file: HashMap<String, Vec<ComplexityWarning>>,
}

impl ComplexityReport {
    /// Load the JSON report at `path`.
    ///
    /// Absent or malformed reports are empty. Within a well-formed array,
    /// rows that cannot be used are skipped one by one.
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Vec<Value>>(&contents) {
            Ok(rows) => Self::from_rows(rows.iter().filter_map(warning_from_value)),
            Err(err) => {
                debug!("ignoring complexity report {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = ComplexityWarning>) -> Self {
        let mut by_file: HashMap<String, Vec<ComplexityWarning>> = HashMap::new();
        for row in rows {
            if row.file.is_empty() {
                continue;
            }
            by_file.entry(row.file.clone()).or_default().push(row);
        }
        // Stable sort: equal rows keep report order.
        for warnings in by_file.values_mut() {
            warnings.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.lines.cmp(&a.lines)));
        }
        Self { by_file }
    }

    /// The highest-ranked warning for `file`.
    pub fn top_warning(&self, file: &str) -> Option<&ComplexityWarning> {
        self.by_file.get(file).and_then(|w| w.first())
    }
}

/// Convert one report row. Numeric fields accept null (as 0), floats
/// (truncated) and numeric strings; anything else rejects the row.
fn warning_from_value(row: &Value) -> Option<ComplexityWarning> {
    let obj = row.as_object()?;
    let file = match obj.get("file") {
        Some(Value::String(file)) => file.clone(),
        _ => return None,
    };
    let name = match obj.get("name") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
    };
    Some(ComplexityWarning {
        file,
        name,
        lines: count_field(obj.get("lines"))?,
        nesting: count_field(obj.get("nesting"))?,
        params: count_field(obj.get("params"))?,
        score: count_field(obj.get("score"))?,
    })
}

fn count_field(value: Option<&Value>) -> Option<i64> {
    match value {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Some(_) => None,
    }
}
