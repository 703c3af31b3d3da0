use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "pycourse", about = "Interactive Python course with a persistent sandbox", version)]
#[command(group(ArgGroup::new("mode").args(["list", "show", "run", "code", "run_examples", "exercise", "quiz", "ask", "figure", "repl"]).multiple(false)))]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
#[command(group(ArgGroup::new("source").args(["file", "editor"]).multiple(false)))]
pub struct Cli {
    /// List modules, sections and exercises.
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Show a section's lesson content.
    #[arg(short = 's', long, value_name = "SECTION")]
    pub show: Option<String>,

    /// Run a Python file in the sandbox ("-" or no value reads stdin).
    #[arg(short = 'r', long, value_name = "FILE", num_args = 0..=1, default_missing_value = "-")]
    pub run: Option<String>,

    /// Run the given Python code in the sandbox.
    #[arg(short = 'c', long, value_name = "CODE")]
    pub code: Option<String>,

    /// Run every code example of a section, sharing one namespace.
    #[arg(long = "run-examples", value_name = "SECTION")]
    pub run_examples: Option<String>,

    /// Work on an exercise by id.
    #[arg(short = 'e', long, value_name = "ID")]
    pub exercise: Option<String>,

    /// Read the exercise attempt from a file ("-" for stdin).
    #[arg(long, requires = "exercise")]
    pub file: Option<String>,

    /// Write the exercise attempt in $EDITOR, starting from the starter code.
    #[arg(long, requires = "exercise")]
    pub editor: bool,

    /// Show the exercise hint.
    #[arg(long, requires = "exercise")]
    pub hint: bool,

    /// Show the reference solution.
    #[arg(long, requires = "exercise")]
    pub solution: bool,

    /// Ask the AI tutor to grade the attempt.
    #[arg(long, requires = "exercise")]
    pub check: bool,

    /// Take a section's quiz.
    #[arg(short = 'q', long, value_name = "SECTION")]
    pub quiz: Option<String>,

    /// Answer quiz questions non-interactively (1-based, repeatable).
    #[arg(long = "answer", requires = "quiz", action = clap::ArgAction::Append)]
    pub answers: Vec<usize>,

    /// Ask the course assistant a question.
    #[arg(short = 'a', long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Generate the explanatory figures of a section.
    #[arg(long, value_name = "SECTION")]
    pub figure: Option<String>,

    /// Directory for generated figures.
    #[arg(long, value_name = "DIR", default_value = ".", requires = "figure")]
    pub out: PathBuf,

    /// Start the interactive sandbox REPL.
    #[arg(long)]
    pub repl: bool,

    /// Execution timeout in seconds (0 disables it).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Large language model used by the tutor.
    #[arg(long)]
    pub model: Option<String>,

    /// Prettify Markdown output.
    #[arg(long)]
    pub md: bool,
    /// Print lessons and tutor replies without Markdown rendering.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Debug logging to stderr.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
