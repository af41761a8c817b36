//! Error types for tree construction, resolution, detection and rendering

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conflicts raised while building an option tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("value '{value}' of option '{title}' is already bound to a config")]
    ValueBoundToConfig { title: String, value: String },

    #[error("value '{value}' of option '{title}' is already bound to a child option")]
    ValueBoundToChild { title: String, value: String },

    #[error("option '{title}' has no values")]
    EmptyValues { title: String },

    #[error("value '{value}' of option '{title}' is bound to neither a child nor a config")]
    UnboundValue { title: String, value: String },
}

/// Failures while walking an option tree to a single config
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no config selected: value '{value}' of option '{title}' leads nowhere")]
    NoConfigSelected { title: String, value: String },

    #[error("failed to ask for '{title}': {message}")]
    Chooser { title: String, message: String },

    #[error("input required for '{title}' but running unattended")]
    InputRequired { title: String },
}

/// A single detector failed; the scan continues with the others
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("[{detector}] failed to read {}: {message}", path.display())]
    Io {
        detector: String,
        path: PathBuf,
        message: String,
    },

    #[error("[{detector}] failed to parse {}: {message}", path.display())]
    Parse {
        detector: String,
        path: PathBuf,
        message: String,
    },

    #[error("[{detector}] {message}")]
    Invalid { detector: String, message: String },
}

impl DetectionError {
    pub fn detector(&self) -> &str {
        match self {
            DetectionError::Io { detector, .. }
            | DetectionError::Parse { detector, .. }
            | DetectionError::Invalid { detector, .. } => detector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Carries the errors of detectors that recognised their platform but failed
    #[error("{}", no_platform_message(search_dir, errors))]
    NoPlatformDetected {
        search_dir: PathBuf,
        errors: Vec<DetectionError>,
    },
}

fn no_platform_message(search_dir: &Path, errors: &[DetectionError]) -> String {
    let mut message = format!("no known platform detected in {}", search_dir.display());
    for error in errors {
        message.push_str("\n  ");
        message.push_str(&error.to_string());
    }
    message
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("{field}: no substitution for placeholder '{key}'")]
    MissingSubstitution { field: String, key: String },

    #[error("{field}: malformed template: {message}")]
    Malformed { field: String, message: String },

    #[error("failed to parse config template: {0}")]
    Parse(String),

    #[error("platform '{platform}' has no config named '{config}'")]
    UnknownConfig { platform: String, config: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("trigger workflow not defined: '{workflow}' is missing or has no steps")]
    TriggerWorkflowNotDefined { workflow: String },

    #[error("failed to serialize pipeline definition: {0}")]
    Serialize(String),
}

/// Umbrella error for the end-to-end "resolve configuration" operation
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Option(#[from] OptionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Resolution or rendering of one platform's config failed
    #[error("{platform}: {source}")]
    Platform {
        platform: String,
        #[source]
        source: Box<InitError>,
    },

    #[error("unknown platform selected: {0}")]
    UnknownPlatform(String),

    #[error("search directory not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InitError {
    /// Hint shown below the error when the user can do something about it
    pub fn help_message(&self) -> Option<String> {
        match self {
            InitError::Scan(ScanError::NoPlatformDetected { errors, .. }) if !errors.is_empty() => {
                Some(
                    "A platform was recognised but its options could not be collected. \
                     Fix the errors above, or run `stepinit manual-config` for the default configs."
                        .to_string(),
                )
            }
            InitError::Scan(ScanError::NoPlatformDetected { .. }) => Some(
                "Run `stepinit manual-config` to get the default configs of every supported platform."
                    .to_string(),
            ),
            InitError::Platform { source, .. } => source.help_message(),
            InitError::Resolve(ResolveError::InputRequired { title }) => Some(format!(
                "'{}' needs a value that cannot be detected. Run without --ci to enter it.",
                title
            )),
            InitError::PathNotFound(_) => {
                Some("Check that --dir points at an existing project directory.".to_string())
            }
            InitError::Generation(GenerationError::TriggerWorkflowNotDefined { .. }) => {
                Some("The detector produced an empty primary workflow.".to_string())
            }
            _ => None,
        }
    }
}
