//! Exercise handler: show the task, run an attempt and ask the tutor for feedback.

use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;

use crate::course::Course;
use crate::execution::SessionController;
use crate::printer::{MarkdownPrinter, ResultPrinter};
use crate::tutor::Tutor;
use crate::utils::{edit_in_editor, read_source_file};

#[derive(Debug, Clone, Default)]
pub struct ExerciseArgs {
    pub file: Option<String>,
    pub editor: bool,
    pub hint: bool,
    pub solution: bool,
    pub check: bool,
    pub markdown: bool,
}

pub async fn run(
    controller: &SessionController,
    course: &Course,
    tutor: Option<&Tutor>,
    id: &str,
    args: &ExerciseArgs,
) -> Result<bool> {
    let (located, exercise) = course
        .exercise(id)
        .ok_or_else(|| anyhow!("unknown exercise '{}' (see --list)", id))?;
    let md = MarkdownPrinter::default();

    let title = exercise.title.unwrap_or("Exercise");
    println!("{}  {}", title.yellow().bold(), format!("[{}]", located.section.id).dimmed());
    if args.markdown {
        md.print(exercise.instruction);
    } else {
        println!("{}\n", exercise.instruction);
    }

    if args.hint {
        match exercise.hint {
            Some(hint) => println!("{} {}\n", "Hint:".cyan().bold(), hint),
            None => println!("{}\n", "No hint for this exercise.".dimmed()),
        }
    }
    if args.solution {
        if let Some(solution) = exercise.solution {
            println!("{}", "Solution:".green().bold());
            md.print_code(solution);
        }
    }

    let code = match (&args.file, args.editor) {
        (Some(path), _) => read_source_file(path)?,
        (None, true) => edit_in_editor(exercise.prefill)?,
        (None, false) => {
            if !args.solution {
                println!("{}", "Starter code:".bold());
                md.print_code(exercise.prefill);
                println!(
                    "{}",
                    format!("Run your attempt with: pycourse --exercise {} --editor (or --file PATH) --check", id).dimmed()
                );
            }
            return Ok(true);
        }
    };
    if code.trim().is_empty() {
        println!("{}", "Nothing to run.".dimmed());
        return Ok(true);
    }

    println!("{}", "Output:".bold());
    let result = controller.execute(code.as_str()).await;
    ResultPrinter { color: args.markdown }.print(&result);

    if args.check {
        let tutor = tutor.ok_or_else(|| anyhow!("the AI tutor is not configured"))?;
        println!("\n{}", "Tutor feedback:".magenta().bold());
        let feedback = tutor.check_exercise(exercise.instruction, &code, &result).await;
        if args.markdown {
            md.print(&feedback);
        } else {
            println!("{}", feedback);
        }
    }
    Ok(result.is_success())
}
