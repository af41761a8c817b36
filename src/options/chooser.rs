use crate::error::ResolveError;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::collections::HashMap;
use tracing::debug;

/// Source of answers while an option tree is walked
pub trait ValueChooser {
    /// Picks one of `candidates` for the axis named `title`
    fn choose_one(&mut self, title: &str, candidates: &[String]) -> Result<String, ResolveError>;

    /// Asks for a value that cannot be enumerated
    fn free_text(&mut self, title: &str) -> Result<String, ResolveError>;
}

/// Prompts on the terminal
#[derive(Debug, Default)]
pub struct InteractiveChooser;

impl InteractiveChooser {
    pub fn new() -> Self {
        Self
    }
}

impl ValueChooser for InteractiveChooser {
    fn choose_one(&mut self, title: &str, candidates: &[String]) -> Result<String, ResolveError> {
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Select: {}", title))
            .items(candidates)
            .default(0)
            .interact()
            .map_err(|e| ResolveError::Chooser {
                title: title.to_string(),
                message: e.to_string(),
            })?;

        Ok(candidates[selection].clone())
    }

    fn free_text(&mut self, title: &str) -> Result<String, ResolveError> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Provide: {}", title))
            .interact_text()
            .map_err(|e| ResolveError::Chooser {
                title: title.to_string(),
                message: e.to_string(),
            })
    }
}

/// Unattended answers: the first candidate, or a preset answer for free text
#[derive(Debug, Clone, Default)]
pub struct AutoChooser {
    answers: HashMap<String, String>,
}

impl AutoChooser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers free-text prompts titled `title` with `value`
    pub fn with_answer(mut self, title: impl Into<String>, value: impl Into<String>) -> Self {
        self.answers.insert(title.into(), value.into());
        self
    }
}

impl ValueChooser for AutoChooser {
    fn choose_one(&mut self, title: &str, candidates: &[String]) -> Result<String, ResolveError> {
        let first = candidates.first().ok_or_else(|| ResolveError::NoConfigSelected {
            title: title.to_string(),
            value: String::new(),
        })?;
        debug!(title = title, value = %first, "Auto-selected first candidate");
        Ok(first.clone())
    }

    fn free_text(&mut self, title: &str) -> Result<String, ResolveError> {
        self.answers
            .get(title)
            .cloned()
            .ok_or_else(|| ResolveError::InputRequired {
                title: title.to_string(),
            })
    }
}
