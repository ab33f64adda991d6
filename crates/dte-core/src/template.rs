//! Templates: parse, compile through a [`ScriptEngine`], render with relocated failures.
//!
//! ## Usage
//!
//! ```ignore
//! use dte_core::engine::Binding;
//! use dte_core::template::TemplateEngine;
//!
//! let engine = TemplateEngine::new(dte_rhai::RhaiEngine::new());
//! let template = engine.create_template("Hello <%= name %>!", "greeting")?;
//! let output = template.render_to_string(&Binding::new().with("name", "World"))?;
//! assert_eq!(output, "Hello World!");
//! ```

use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{Binding, CompileError, FrameOrigin, RuntimeFailure, ScriptEngine};
use crate::error::{DteError, Result, TemplateParsingError};
use crate::parser;
use crate::position::{Position, PositionMap};

/// Numbers anonymous templates across the whole process.
static ANONYMOUS_TEMPLATES: AtomicUsize = AtomicUsize::new(1);

/// Creates [`Template`]s backed by one script engine.
pub struct TemplateEngine<E> {
    engine: Arc<E>,
    config: EngineConfig,
}

impl<E: ScriptEngine> TemplateEngine<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, EngineConfig::default())
    }

    /// The configured limits are handed to `engine` before it is shared.
    pub fn with_config(mut engine: E, config: EngineConfig) -> Self {
        engine.apply_limits(config.limits);
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn script_engine(&self) -> &E {
        &self.engine
    }

    /// Parse `text` and compile the generated script under `name`.
    pub fn create_template(&self, text: &str, name: &str) -> Result<Template<E>> {
        let parsed = parser::parse_str(text, self.engine.dialect())?;

        if self.config.verbose {
            tracing::info!(
                template = name,
                "\n-- script source --\n{}\n-- script end --",
                parsed.script
            );
        } else {
            tracing::debug!(template = name, script = %parsed.script, "generated script");
        }

        let unit = match self.engine.compile(&parsed.script, name) {
            Ok(unit) => unit,
            Err(CompileError::Syntax(failure)) => {
                tracing::debug!(template = name, errors = failure.errors.len(), "script did not compile");
                return Err(TemplateParsingError::new(
                    text,
                    parsed.script,
                    parsed.positions,
                    failure,
                )
                .into());
            }
            Err(CompileError::Setup(e)) => return Err(DteError::ScriptSetup(e.to_string())),
        };

        Ok(Template {
            name: name.to_string(),
            source: text.to_string(),
            script: parsed.script,
            positions: parsed.positions,
            unit,
            engine: Arc::clone(&self.engine),
        })
    }

    /// Like [`create_template`](Self::create_template), with a generated unique name.
    pub fn create_template_anonymous(&self, text: &str) -> Result<Template<E>> {
        let name = self.next_anonymous_name();
        self.create_template(text, &name)
    }

    /// Read the whole template from `reader` first, then create it.
    pub fn create_template_from_reader(&self, mut reader: impl Read, name: &str) -> Result<Template<E>> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.create_template(&text, name)
    }

    /// Create a template from a file; the script is named after the file.
    pub fn create_template_from_path(&self, path: &Path) -> Result<Template<E>> {
        let text = std::fs::read_to_string(path).map_err(|e| DteError::TemplateRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.next_anonymous_name());
        self.create_template(&text, &name)
    }

    fn next_anonymous_name(&self) -> String {
        let n = ANONYMOUS_TEMPLATES.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.config.name_prefix, n)
    }
}

/// A parsed and compiled template.
///
/// The generated script and its position map never change after creation, so a
/// template can be rendered any number of times.
pub struct Template<E: ScriptEngine> {
    name: String,
    source: String,
    script: String,
    positions: PositionMap,
    unit: E::Unit,
    engine: Arc<E>,
}

impl<E: ScriptEngine> Template<E> {
    /// Name the generated script was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Generated script text.
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Render with `binding` into `out`.
    ///
    /// A runtime failure is returned with its first generated-script frame
    /// moved to template coordinates.
    pub fn render(&self, binding: &Binding, out: &mut dyn io::Write) -> std::result::Result<(), RuntimeFailure> {
        self.engine
            .execute(&self.unit, binding, out)
            .map_err(|mut failure| {
                relocate(&mut failure, &self.positions);
                failure
            })
    }

    /// Render into a `String`.
    pub fn render_to_string(&self, binding: &Binding) -> Result<String> {
        let mut out = Vec::new();
        self.render(binding, &mut out)?;
        String::from_utf8(out).map_err(|e| DteError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

impl<E: ScriptEngine> fmt::Debug for Template<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("script", &self.script)
            .field("mappings", &self.positions.len())
            .finish_non_exhaustive()
    }
}

/// Rewrite the line of the first generated-script frame of `failure` to the
/// template line it came from. Returns whether a frame was rewritten; a frame
/// without a recorded position is left as it is.
pub fn relocate(failure: &mut RuntimeFailure, positions: &PositionMap) -> bool {
    let Some(frame) = failure
        .frames
        .iter_mut()
        .find(|frame| frame.origin == FrameOrigin::GeneratedScript)
    else {
        return false;
    };

    match positions.get(Position::at(frame.line, 1)) {
        Some(source) => {
            tracing::debug!(
                function = %frame.function,
                script_line = frame.line,
                template_line = source.line,
                "relocated failure frame"
            );
            frame.line = source.line;
            frame.relocated = true;
            true
        }
        None => {
            tracing::warn!(
                function = %frame.function,
                script_line = frame.line,
                "no template position for failure frame"
            );
            false
        }
    }
}
