mod cli;

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Result};
use is_terminal::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pycourse::{
    config::Config,
    course::Course,
    execution::SessionController,
    handlers::{self, exercise::ExerciseArgs},
    tutor::Tutor,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let mut cfg = Config::load();
    if let Some(secs) = args.timeout {
        cfg.set("EXECUTION_TIMEOUT", secs.to_string());
    }
    if let Some(model) = &args.model {
        cfg.set("DEFAULT_MODEL", model.clone());
    }

    // The TUI owns the terminal, so it only logs when asked to
    let filter = if args.verbose {
        "pycourse=debug".to_string()
    } else if args.repl {
        "off".to_string()
    } else {
        std::env::var("RUST_LOG")
            .ok()
            .or_else(|| cfg.get("LOG_FILTER"))
            .unwrap_or_else(|| "warn".into())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let course = Course::load(&cfg)?;
    let md = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN") && io::stdout().is_terminal()
    };

    if args.list {
        handlers::lesson::list(&course);
        return Ok(());
    }
    if let Some(section) = &args.show {
        return handlers::lesson::show(&course, section, md);
    }
    if let Some(section) = &args.quiz {
        return handlers::quiz::run(&course, section, &args.answers);
    }
    if let Some(question) = &args.ask {
        return handlers::ask::run(&cfg, &course, question, md).await;
    }
    if let Some(section) = &args.figure {
        let tutor = Tutor::from_config(&cfg)?;
        handlers::figure::run(&tutor, &course, section, &args.out).await?;
        return Ok(());
    }

    // Everything below runs code and owns an interpreter
    let controller = Arc::new(SessionController::from_config(&cfg));
    let outcome = route(&args, &cfg, &course, &controller, md).await;
    controller.runtime().shutdown().await;

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => Err(e),
    }
}

/// Returns false when the code that ran raised.
async fn route(
    args: &cli::Cli,
    cfg: &Config,
    course: &Course,
    controller: &Arc<SessionController>,
    md: bool,
) -> Result<bool> {
    if args.repl {
        handlers::repl::run(Arc::clone(controller), cfg, course).await?;
        return Ok(true);
    }
    if let Some(code) = &args.code {
        return Ok(handlers::run::run(controller, code, md).await.is_success());
    }
    if let Some(path) = &args.run {
        let source = pycourse::utils::read_source_file(path)?;
        return Ok(handlers::run::run(controller, &source, md).await.is_success());
    }
    if let Some(section) = &args.run_examples {
        return handlers::lesson::run_examples(controller, course, section, md).await;
    }
    if let Some(id) = &args.exercise {
        let tutor = if args.check { Some(Tutor::from_config(cfg)?) } else { None };
        let exercise_args = ExerciseArgs {
            file: args.file.clone(),
            editor: args.editor,
            hint: args.hint,
            solution: args.solution,
            check: args.check,
            markdown: md,
        };
        return handlers::exercise::run(controller, course, tutor.as_ref(), id, &exercise_args).await;
    }

    // piped stdin without a mode runs it as a script
    if !io::stdin().is_terminal() {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        if source.trim().is_empty() {
            bail!("no code on stdin");
        }
        return Ok(handlers::run::run(controller, &source, md).await.is_success());
    }

    handlers::lesson::list(course);
    println!("\nUse --show SECTION to read a lesson, --repl for the sandbox, --help for everything else.");
    Ok(true)
}
