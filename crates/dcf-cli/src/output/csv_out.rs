use serde_json::Value;
use std::io;

/// Write output as two-column `field,value` CSV to stdout. Nested values are
/// flattened into dotted paths (`projections.0.fcf`, `assumptions_echo.ticker`).
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let _ = wtr.write_record(["field", "value"]);
    for (field, val) in flatten(body) {
        let _ = wtr.write_record([field.as_str(), val.as_str()]);
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        for (i, w) in warnings.iter().enumerate() {
            let _ = wtr.write_record([format!("warnings.{i}"), format_csv_value(w)]);
        }
    }

    let _ = wtr.flush();
}

/// Flatten a JSON value into `(path, scalar)` rows in key order.
fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into(value, String::new(), &mut rows);
    rows
}

fn flatten_into(value: &Value, prefix: String, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten_into(val, child_path(&prefix, key), rows);
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                flatten_into(val, child_path(&prefix, &i.to_string()), rows);
            }
        }
        scalar => rows.push((prefix, format_csv_value(scalar))),
    }
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
