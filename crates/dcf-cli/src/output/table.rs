use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

const PROJECTION_COLUMNS: [&str; 5] = ["year", "growth_rate", "fcf", "discount_factor", "pv_fcf"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_valuation(result, map),
            _ => print_flat_object(map),
        },
        _ => println!("{}", value),
    }
}

fn print_valuation(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    // Summary: every scalar result field
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result {
        if !val.is_object() && !val.is_array() {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Array(rows)) = result.get("projections") {
        if !rows.is_empty() {
            println!("\nProjection:");
            println!("{}", projection_table(rows));
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn projection_table(rows: &[Value]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(PROJECTION_COLUMNS);
    for row in rows {
        let record: Vec<String> = PROJECTION_COLUMNS
            .iter()
            .map(|col| row.get(*col).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(record);
    }
    Table::from(builder)
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
