//! Unified error types for dte.

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;

use crate::engine::{CompileFailure, RuntimeFailure};
use crate::position::PositionMap;
use crate::report;

/// All errors that can occur while creating or rendering templates.
#[derive(Error, Debug)]
pub enum DteError {
    // --- Configuration ---

    /// The configuration file was not found or could not be read.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration could not be written.
    #[error("failed to write config to {path}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- Templates ---

    /// A template file could not be read.
    #[error("failed to read template {path}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated script did not compile; the message shows template context.
    #[error(transparent)]
    Parsing(#[from] TemplateParsingError),

    /// Any other failure while setting up the compiled script.
    #[error("failed to parse template script (your template may contain an error or be trying to use expressions not currently supported): {0}")]
    ScriptSetup(String),

    /// The template failed while rendering; frames are already relocated.
    #[error(transparent)]
    Render(#[from] RuntimeFailure),

    // --- General ---

    /// I/O failure of the template source while it was being parsed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, DteError>`.
pub type Result<T> = std::result::Result<T, DteError>;

/// Compile failure of a generated script, carrying everything needed to point
/// at the offending template lines.
///
/// The message is only assembled the first time it is asked for.
pub struct TemplateParsingError {
    template: String,
    script: String,
    positions: PositionMap,
    cause: CompileFailure,
    message: OnceLock<String>,
}

impl TemplateParsingError {
    pub fn new(
        template: impl Into<String>,
        script: impl Into<String>,
        positions: PositionMap,
        cause: CompileFailure,
    ) -> Self {
        Self {
            template: template.into(),
            script: script.into(),
            positions,
            cause,
            message: OnceLock::new(),
        }
    }

    pub fn template_source(&self) -> &str {
        &self.template
    }

    pub fn parsed_script(&self) -> &str {
        &self.script
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    pub fn cause(&self) -> &CompileFailure {
        &self.cause
    }

    /// The full diagnostic report, built on first access.
    pub fn message(&self) -> &str {
        self.message.get_or_init(|| {
            report::describe(&self.cause, &self.template, &self.script, &self.positions)
        })
    }

    /// Whether [`message`](Self::message) has been built already.
    pub fn is_message_built(&self) -> bool {
        self.message.get().is_some()
    }
}

impl fmt::Display for TemplateParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl fmt::Debug for TemplateParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateParsingError")
            .field("cause", &self.cause)
            .field("mappings", &self.positions.len())
            .finish_non_exhaustive()
    }
}

impl std::error::Error for TemplateParsingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
