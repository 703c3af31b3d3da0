//! Command handlers behind the CLI flags.

pub mod ask;
pub mod exercise;
pub mod figure;
pub mod lesson;
pub mod quiz;
pub mod repl;
pub mod run;
