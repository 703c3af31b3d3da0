//! Course catalog: modules, sections and the blocks they are made of.

use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

const BUILTIN_COURSE: &str = include_str!("course.json");

pub const COURSE_TITLE: &str = "BIM Python Master";

#[derive(Error, Debug)]
pub enum CourseError {
    #[error("failed to read course file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid course JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("course has no modules")]
    Empty,
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("module '{0}' has no sections")]
    EmptyModule(String),
    #[error("quiz in section '{section}' points at option {index} of {options}")]
    AnswerOutOfRange { section: String, index: usize, options: usize },
    #[error("exercise in section '{0}' has no id")]
    MissingExerciseId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    Markdown,
    CodeExample,
    Exercise,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Borrowed view of an `EXERCISE` block.
#[derive(Debug, Clone, Copy)]
pub struct Exercise<'a> {
    pub id: &'a str,
    pub title: Option<&'a str>,
    pub instruction: &'a str,
    pub prefill: &'a str,
    pub hint: Option<&'a str>,
    pub solution: Option<&'a str>,
}

/// Borrowed view of a `QUIZ` block.
#[derive(Debug, Clone, Copy)]
pub struct Quiz<'a> {
    pub question: &'a str,
    pub options: &'a [String],
    pub answer: usize,
    pub explanation: Option<&'a str>,
}

impl Quiz<'_> {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }

    pub fn answer_text(&self) -> &str {
        self.options.get(self.answer).map(String::as_str).unwrap_or_default()
    }
}

impl CourseBlock {
    pub fn as_exercise(&self) -> Option<Exercise<'_>> {
        if self.kind != BlockKind::Exercise {
            return None;
        }
        Some(Exercise {
            id: self.id.as_deref()?,
            title: self.title.as_deref(),
            instruction: &self.content,
            prefill: self.prefill.as_deref().unwrap_or_default(),
            hint: self.hint.as_deref(),
            solution: self.solution.as_deref(),
        })
    }

    pub fn as_quiz(&self) -> Option<Quiz<'_>> {
        if self.kind != BlockKind::Quiz {
            return None;
        }
        Some(Quiz {
            question: &self.content,
            options: &self.options,
            answer: self.correct_answer_index?,
            explanation: self.explanation.as_deref(),
        })
    }

    /// Code examples are the only blocks run as-is.
    pub fn is_runnable(&self) -> bool {
        self.kind == BlockKind::CodeExample
            && self.language.as_deref().map_or(true, |l| l.eq_ignore_ascii_case("python"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: String,
    pub title: String,
    pub blocks: Vec<CourseBlock>,
}

impl CourseSection {
    pub fn runnable_blocks(&self) -> impl Iterator<Item = &CourseBlock> {
        self.blocks.iter().filter(|b| b.is_runnable())
    }

    pub fn exercises(&self) -> impl Iterator<Item = Exercise<'_>> {
        self.blocks.iter().filter_map(CourseBlock::as_exercise)
    }

    pub fn quizzes(&self) -> impl Iterator<Item = Quiz<'_>> {
        self.blocks.iter().filter_map(CourseBlock::as_quiz)
    }

    pub fn visual_prompts(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| b.visual_prompt.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub sections: Vec<CourseSection>,
}

/// A section together with the module that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub module: &'a CourseModule,
    pub section: &'a CourseSection,
}

/// Previous and next sections in reading order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors<'a> {
    pub previous: Option<Located<'a>>,
    pub next: Option<Located<'a>>,
}

#[derive(Debug, Clone)]
pub struct Course {
    modules: Vec<CourseModule>,
}

impl Course {
    pub fn builtin() -> Result<Self, CourseError> {
        Self::from_json(BUILTIN_COURSE)
    }

    pub fn from_json(raw: &str) -> Result<Self, CourseError> {
        let modules: Vec<CourseModule> = serde_json::from_str(raw)?;
        let course = Self { modules };
        course.validate()?;
        Ok(course)
    }

    pub fn from_path(path: &Path) -> Result<Self, CourseError> {
        let raw = fs::read_to_string(path).map_err(|source| CourseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// `COURSE_PATH` when configured, otherwise the built-in catalog.
    pub fn load(cfg: &Config) -> Result<Self, CourseError> {
        match cfg.get_path("COURSE_PATH") {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading course file");
                Self::from_path(&path)
            }
            None => Self::builtin(),
        }
    }

    fn validate(&self) -> Result<(), CourseError> {
        if self.modules.is_empty() {
            return Err(CourseError::Empty);
        }
        let mut modules = HashSet::new();
        let mut sections = HashSet::new();
        let mut exercises = HashSet::new();
        for module in &self.modules {
            if !modules.insert(module.id.as_str()) {
                return Err(CourseError::DuplicateId { kind: "module", id: module.id.clone() });
            }
            if module.sections.is_empty() {
                return Err(CourseError::EmptyModule(module.id.clone()));
            }
            for section in &module.sections {
                if !sections.insert(section.id.as_str()) {
                    return Err(CourseError::DuplicateId { kind: "section", id: section.id.clone() });
                }
                for block in &section.blocks {
                    match block.kind {
                        BlockKind::Exercise => {
                            let id = block
                                .id
                                .as_deref()
                                .ok_or_else(|| CourseError::MissingExerciseId(section.id.clone()))?;
                            if !exercises.insert(id) {
                                return Err(CourseError::DuplicateId { kind: "exercise", id: id.to_string() });
                            }
                        }
                        BlockKind::Quiz => {
                            let index = block.correct_answer_index.unwrap_or(usize::MAX);
                            if index >= block.options.len() {
                                return Err(CourseError::AnswerOutOfRange {
                                    section: section.id.clone(),
                                    index,
                                    options: block.options.len(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    pub fn modules(&self) -> &[CourseModule] {
        &self.modules
    }

    pub fn module(&self, id: &str) -> Option<&CourseModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Every section in reading order.
    pub fn outline(&self) -> impl Iterator<Item = Located<'_>> {
        self.modules
            .iter()
            .flat_map(|module| module.sections.iter().map(move |section| Located { module, section }))
    }

    pub fn section(&self, id: &str) -> Option<Located<'_>> {
        self.outline().find(|l| l.section.id == id)
    }

    pub fn exercise(&self, id: &str) -> Option<(Located<'_>, Exercise<'_>)> {
        self.outline().find_map(|located| {
            located.section.exercises().find(|e| e.id == id).map(|e| (located, e))
        })
    }

    pub fn neighbors(&self, section_id: &str) -> Neighbors<'_> {
        let all: Vec<Located<'_>> = self.outline().collect();
        let Some(pos) = all.iter().position(|l| l.section.id == section_id) else {
            return Neighbors::default();
        };
        Neighbors {
            previous: pos.checked_sub(1).and_then(|i| all.get(i).copied()),
            next: all.get(pos + 1).copied(),
        }
    }

    /// Resolve a navigation target; the section must belong to the named module.
    pub fn resolve_link(&self, module_id: &str, section_id: &str) -> Option<Located<'_>> {
        self.section(section_id).filter(|l| l.module.id == module_id)
    }

    /// Compact outline embedded in the assistant's instructions.
    pub fn context_summary(&self) -> String {
        let mut out = String::new();
        for module in &self.modules {
            out.push_str(&format!("Module {} (id: {})\n", module.title, module.id));
            for section in &module.sections {
                out.push_str(&format!("  - {} (id: {})\n", section.title, section.id));
                let summary: Vec<String> = section
                    .blocks
                    .iter()
                    .filter(|b| b.kind == BlockKind::Markdown)
                    .map(|b| format!("{}...", b.content.chars().take(100).collect::<String>()))
                    .collect();
                if !summary.is_empty() {
                    out.push_str(&format!("    Summary: {}\n", summary.join(" ").replace('\n', " ")));
                }
            }
        }
        out
    }
}
