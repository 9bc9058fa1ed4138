use querygrade_core::Grader;
use serde_json::json;

use super::exit_codes;
use crate::cli::args::{Format, ValidateArgs};

pub async fn run(grader: &Grader, args: ValidateArgs) -> anyhow::Result<i32> {
    let report = grader.check_catalog().await;

    if args.format == Format::Json {
        let output = json!({
            "schema_version": 1,
            "ok": report.is_ok(),
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if report.is_ok() {
            eprintln!("✔ Catalog OK ({} exercises)", report.total);
        } else {
            eprintln!(
                "✖ Catalog check failed ({} of {} reference solution{} failed)",
                report.failed,
                report.total,
                if report.total != 1 { "s" } else { "" }
            );
        }
        for e in &report.entries {
            match (&e.error, e.rows) {
                (Some(err), _) => eprintln!("  ✖ {:<24} {}", e.id, err),
                (None, Some(rows)) => eprintln!("  ✔ {:<24} {} rows, {}ms", e.id, rows, e.duration_ms),
                (None, None) => eprintln!("  ✔ {}", e.id),
            }
        }
    }

    Ok(if report.is_ok() {
        exit_codes::OK
    } else {
        exit_codes::CONFIG_ERROR
    })
}
