use std::time::Duration;

use pycourse::config::Config;
use pycourse::course::Course;
use pycourse::execution::{ExecutionPolicy, ExecutionRequest, SandboxStatus};
use pycourse::handlers::quiz::{grade, parse_choice};
use pycourse::tui::ReplCommand;

#[test]
fn repl_input_is_classified() {
    assert_eq!(ReplCommand::parse("   "), None);
    assert_eq!(ReplCommand::parse("print(1)"), Some(ReplCommand::Run("print(1)".into())));
    assert_eq!(
        ReplCommand::parse("for x in levels:\n    print(x)\n"),
        Some(ReplCommand::Run("for x in levels:\n    print(x)".into()))
    );
    assert_eq!(ReplCommand::parse("? what is a DataFrame"), Some(ReplCommand::Ask("what is a DataFrame".into())));
    assert_eq!(ReplCommand::parse("?"), None);
    assert_eq!(ReplCommand::parse(":vars"), Some(ReplCommand::Variables));
    assert_eq!(ReplCommand::parse(":retry"), Some(ReplCommand::Retry));
    assert_eq!(ReplCommand::parse(":help"), Some(ReplCommand::Help));
    assert_eq!(ReplCommand::parse("exit()"), Some(ReplCommand::Quit));
    assert_eq!(ReplCommand::parse(":bogus"), Some(ReplCommand::Unknown("bogus".into())));
}

#[test]
fn quiz_choices_accept_numbers_and_letters() {
    assert_eq!(parse_choice("2", 4), Some(1));
    assert_eq!(parse_choice(" c ", 4), Some(2));
    assert_eq!(parse_choice("0", 4), None);
    assert_eq!(parse_choice("5", 4), None);
    assert_eq!(parse_choice("maybe", 4), None);

    let course = Course::builtin().expect("course");
    let section = course.section("2-first-script").expect("section").section;
    let quiz = section.quizzes().next().expect("quiz");
    assert!(grade(&quiz, 2).correct);
    assert!(!grade(&quiz, 0).correct);
}

#[test]
fn policy_follows_config() {
    let cfg = Config::from_pairs([("EXECUTION_TIMEOUT", "0"), ("PRESERVE_PARTIAL_OUTPUT", "false")]);
    let policy = ExecutionPolicy::from_config(&cfg);
    assert_eq!(policy.timeout, None);
    assert!(!policy.preserve_partial_output);

    let defaults = ExecutionPolicy::from_config(&Config::from_pairs(Vec::<(String, String)>::new()));
    assert_eq!(defaults.timeout, Some(Duration::from_secs(30)));
    assert!(defaults.preserve_partial_output);
}

#[test]
fn config_lists_and_keys() {
    let mut cfg = Config::from_pairs([("GEMINI_API_KEY", "g"), ("INSTALL_PACKAGES", " openpyxl , ,xlrd ")]);
    assert_eq!(cfg.api_key().as_deref(), Some("g"));
    assert_eq!(cfg.get_list("INSTALL_PACKAGES"), vec!["openpyxl".to_string(), "xlrd".to_string()]);
    cfg.set("API_KEY", "primary");
    assert_eq!(cfg.api_key().as_deref(), Some("primary"));
    assert_eq!(cfg.python_path(), "python3");
}

#[test]
fn requests_and_status_render() {
    let request: ExecutionRequest = "print('x')".into();
    assert_eq!(request.source(), "print('x')");
    assert_eq!(SandboxStatus::Failed("no python".into()).to_string(), "failed: no python");
    assert_eq!(SandboxStatus::Idle.to_string(), "idle");
}
