use querygrade_core::Grader;

use super::{exit_codes, report_error};
use crate::cli::args::{ExercisesArgs, ExercisesSub, Format};

pub fn run(grader: &Grader, args: ExercisesArgs) -> anyhow::Result<i32> {
    let res = match args.cmd {
        ExercisesSub::List { format } => {
            let views = grader.list_exercises();
            if format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                for v in &views {
                    println!("{:<24} {:<7} {}", v.id, difficulty(v.difficulty), v.title);
                }
            }
            Ok(())
        }
        ExercisesSub::Show { id } => match grader.exercise(&id) {
            Ok(v) => {
                println!("{}", serde_json::to_string_pretty(&v)?);
                Ok(())
            }
            Err(e) => Err(e),
        },
        ExercisesSub::Hint { id } => grader.extract_hints(&id).map(|verbs| {
            if verbs.is_empty() {
                println!("(no hints)");
            } else {
                println!("{}", verbs.join(", "));
            }
        }),
        ExercisesSub::Next { id } => grader.next_exercise(&id).map(|next| match next {
            Some(n) => println!("{n}"),
            None => eprintln!("`{id}` is the last exercise"),
        }),
        ExercisesSub::Solution { id } => grader.solution(&id).map(|sql| println!("{sql}")),
    };

    Ok(match res {
        Ok(()) => exit_codes::OK,
        Err(e) => report_error(grader, &e),
    })
}

fn difficulty(d: querygrade_core::model::Difficulty) -> &'static str {
    use querygrade_core::model::Difficulty::*;
    match d {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}
