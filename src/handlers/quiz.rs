//! Quiz handler: ask a section's questions and score the answers.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::course::{Course, Quiz};

/// Outcome of one answered question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answered {
    pub choice: usize,
    pub correct: bool,
}

pub fn grade(quiz: &Quiz<'_>, choice: usize) -> Answered {
    Answered { choice, correct: quiz.is_correct(choice) }
}

/// Accepts `2` (1-based) or a letter `b`.
pub fn parse_choice(input: &str, options: usize) -> Option<usize> {
    let s = input.trim();
    let index = match s.parse::<usize>() {
        Ok(n) => n.checked_sub(1)?,
        Err(_) => {
            let mut chars = s.chars();
            let c = chars.next()?.to_ascii_lowercase();
            if chars.next().is_some() || !c.is_ascii_lowercase() {
                return None;
            }
            (c as u8 - b'a') as usize
        }
    };
    (index < options).then_some(index)
}

/// `answers` are 1-based and consumed in question order; missing ones are asked on stdin.
pub fn run(course: &Course, section_id: &str, answers: &[usize]) -> Result<()> {
    let located = course
        .section(section_id)
        .ok_or_else(|| anyhow!("unknown section '{}' (see --list)", section_id))?;
    let quizzes: Vec<Quiz<'_>> = located.section.quizzes().collect();
    if quizzes.is_empty() {
        println!("{}", format!("Section '{}' has no quiz.", section_id).dimmed());
        return Ok(());
    }

    let interactive = io::stdin().is_terminal();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut score = 0;

    for (i, quiz) in quizzes.iter().enumerate() {
        println!("{} {}", format!("Q{}.", i + 1).magenta().bold(), quiz.question);
        for (n, option) in quiz.options.iter().enumerate() {
            println!("  {}) {}", n + 1, option);
        }

        let choice = match answers.get(i) {
            Some(&n) => n.checked_sub(1).filter(|c| *c < quiz.options.len()),
            None => loop {
                if interactive {
                    print!("Your answer [1-{}]: ", quiz.options.len());
                    io::stdout().flush()?;
                }
                let Some(line) = lines.next().transpose()? else { break None };
                match parse_choice(&line, quiz.options.len()) {
                    Some(c) => break Some(c),
                    None if interactive => println!("{}", "Pick one of the listed options.".dimmed()),
                    None => break None,
                }
            },
        };

        let Some(choice) = choice else {
            println!("{} {}\n", "Skipped. Answer:".dimmed(), quiz.answer_text());
            continue;
        };
        let answered = grade(quiz, choice);
        if answered.correct {
            score += 1;
            println!("{}", "Correct!".green().bold());
        } else {
            println!("{} {}", "Not quite. Answer:".red().bold(), quiz.answer_text());
        }
        if let Some(explanation) = quiz.explanation {
            println!("{}", explanation.dimmed());
        }
        println!();
    }
    println!("Score: {}/{}", score, quizzes.len());
    Ok(())
}
