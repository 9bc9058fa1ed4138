use querygrade_core::model::{Row, Value};
use querygrade_core::Grader;

use super::{exit_codes, report_error};
use crate::cli::args::{RowFormat, RunArgs};

pub async fn run(grader: &Grader, args: RunArgs) -> anyhow::Result<i32> {
    let rows = match grader.run_query(&args.sql).await {
        Ok(rows) => rows,
        Err(e) => return Ok(report_error(grader, &e)),
    };

    match args.format {
        RowFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        RowFormat::Table => print!("{}", render_table(&rows)),
    }
    Ok(exit_codes::OK)
}

pub(crate) fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => s.clone(),
        other => serde_json::to_value(other)
            .map(|j| match j {
                serde_json::Value::String(s) => s,
                j => j.to_string(),
            })
            .unwrap_or_default(),
    }
}

/// Plain aligned columns; the header comes from the first row.
pub(crate) fn render_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "(0 rows)\n".to_string();
    };
    let header: Vec<String> = first.columns().map(str::to_string).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|(_, v)| cell_text(v)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (i, cell) in line.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let fmt_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&fmt_line(&header));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for line in &body {
        out.push_str(&fmt_line(line));
        out.push('\n');
    }
    out.push_str(&format!(
        "({} row{})\n",
        rows.len(),
        if rows.len() != 1 { "s" } else { "" }
    ));
    out
}
