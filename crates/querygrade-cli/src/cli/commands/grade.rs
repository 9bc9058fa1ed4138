use querygrade_core::model::Verdict;
use querygrade_core::Grader;

use super::run::render_table;
use super::{exit_codes, report_error};
use crate::cli::args::{Format, GradeArgs};

pub async fn run(grader: &Grader, args: GradeArgs) -> anyhow::Result<i32> {
    let verdict = match grader.grade_submission(&args.problem, &args.sql).await {
        Ok(v) => v,
        Err(e) => return Ok(report_error(grader, &e)),
    };

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
        Format::Text => print!("{}", render_verdict(&args.problem, &verdict)),
    }

    Ok(if verdict.correct {
        exit_codes::OK
    } else {
        exit_codes::TEST_FAILED
    })
}

fn render_verdict(problem: &str, v: &Verdict) -> String {
    let mut s = String::new();
    if v.correct {
        s.push_str(&format!("✔ {problem}: correct\n"));
    } else {
        s.push_str(&format!("✖ {problem}: incorrect\n"));
    }
    s.push_str(&format!(
        "rows: expected {}, got {}\n",
        v.expected_count, v.actual_count
    ));
    if !v.correct {
        s.push_str("\nexpected (sample):\n");
        s.push_str(&render_table(&v.sample_expected));
        s.push_str("\nyours (sample):\n");
        s.push_str(&render_table(&v.sample_actual));
    }
    s
}
