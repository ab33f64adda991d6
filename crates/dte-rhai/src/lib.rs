//! Rhai backend for dte.
//!
//! Generated scripts use Rhai back-tick strings for literal text, so `${ expr }`
//! interpolation works natively and `print` output is captured through the
//! engine's print callback.
//!
//! Runtime errors are unwound from Rhai's nested function-call errors into a
//! frame list, innermost first. Frames whose source is the template's own
//! script are marked [`FrameOrigin::GeneratedScript`] so the template layer can
//! move them back to template lines.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dte_core::config::ScriptLimits;
use dte_core::dialect::Dialect;
use dte_core::engine::{
    Binding, CompileError, CompileFailure, Frame, FrameOrigin, RuntimeFailure, ScriptEngine,
    SyntaxError,
};
use rhai::{Engine, EvalAltResult, Position, Scope, AST};

/// Function name of frames running top-level script code.
const TOP_LEVEL: &str = "<script>";

/// Numbers compiled scripts so each gets a source id no module can share.
static COMPILED_SCRIPTS: AtomicUsize = AtomicUsize::new(1);

/// A compiled template script.
///
/// Rhai tags errors with source strings only. The AST is registered under a
/// per-compile id instead of the template name, so a module that happens to be
/// named like the template is still told apart from the template's own code.
#[derive(Debug, Clone)]
pub struct RhaiScript {
    ast: AST,
    name: String,
    source_id: String,
}

impl RhaiScript {
    /// Template name the script was compiled for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ast(&self) -> &AST {
        &self.ast
    }
}

/// Compiles and runs template scripts with a fresh [`rhai::Engine`] per call.
#[derive(Debug, Clone, Default)]
pub struct RhaiEngine {
    limits: ScriptLimits,
}

impl RhaiEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limits(&self) -> ScriptLimits {
        self.limits
    }

    fn engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.limits.max_operations);
        engine.set_max_call_levels(self.limits.max_call_levels);
        engine
    }
}

impl ScriptEngine for RhaiEngine {
    type Unit = RhaiScript;

    fn dialect(&self) -> Dialect {
        Dialect::BACKTICK
    }

    fn apply_limits(&mut self, limits: ScriptLimits) {
        self.limits = limits;
    }

    fn compile(&self, script: &str, name: &str) -> Result<RhaiScript, CompileError> {
        let mut ast = self.engine().compile(script).map_err(|err| {
            let position = err.position();
            CompileError::Syntax(CompileFailure {
                errors: vec![SyntaxError {
                    message: err.err_type().to_string(),
                    line: position.line().unwrap_or(0),
                    column: position.position().unwrap_or(0),
                }],
            })
        })?;
        let source_id = format!(
            "{name}#{}",
            COMPILED_SCRIPTS.fetch_add(1, Ordering::Relaxed)
        );
        ast.set_source(source_id.as_str());
        tracing::debug!(script = name, source = %source_id, "compiled");
        Ok(RhaiScript {
            ast,
            name: name.to_string(),
            source_id,
        })
    }

    fn execute(
        &self,
        unit: &RhaiScript,
        binding: &Binding,
        out: &mut dyn io::Write,
    ) -> Result<(), RuntimeFailure> {
        let printed = Arc::new(Mutex::new(String::new()));
        let mut engine = self.engine();
        let sink = Arc::clone(&printed);
        engine.on_print(move |text| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_str(text);
        });

        let mut scope = Scope::new();
        for (name, value) in binding.iter() {
            let value = rhai::serde::to_dynamic(value).map_err(|e| {
                RuntimeFailure::new(format!("cannot bind variable `{name}`: {e}"), Vec::new())
            })?;
            scope.push_dynamic(name.clone(), value);
        }

        let result = engine.run_ast_with_scope(&mut scope, &unit.ast);

        // Output printed before a failure is still written, as a streaming
        // writer would have done.
        let text = std::mem::take(&mut *printed.lock().unwrap_or_else(PoisonError::into_inner));
        out.write_all(text.as_bytes())?;

        result.map_err(|err| runtime_failure(*err, unit))
    }
}

/// A function call the error passed through on its way out.
struct Call {
    function: String,
    source: String,
    position: Position,
}

/// Unwind nested call errors into a frame list, innermost first.
fn runtime_failure(err: EvalAltResult, script: &RhaiScript) -> RuntimeFailure {
    let mut calls = Vec::new();
    let mut current = err;
    let mut innermost = loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(function, source, inner, position) => {
                calls.push(Call {
                    function,
                    source,
                    position,
                });
                current = *inner;
            }
            EvalAltResult::ErrorInModule(module, inner, position) => {
                calls.push(Call {
                    function: TOP_LEVEL.to_string(),
                    source: module,
                    position,
                });
                current = *inner;
            }
            other => break other,
        }
    };
    let position = innermost.take_position();

    let mut frames = Vec::with_capacity(calls.len() + 1);
    let (function, source) = match calls.last() {
        Some(call) => (call.function.as_str(), call.source.as_str()),
        None => (TOP_LEVEL, script.source_id.as_str()),
    };
    frames.push(frame(function, source, position, script));

    // Each call site lives in the caller's code: the previous call, or the script.
    for i in (0..calls.len()).rev() {
        let (function, source) = match i.checked_sub(1).map(|j| &calls[j]) {
            Some(caller) => (caller.function.as_str(), caller.source.as_str()),
            None => (TOP_LEVEL, script.source_id.as_str()),
        };
        frames.push(frame(function, source, calls[i].position, script));
    }

    let failure = RuntimeFailure::new(innermost.to_string(), frames);
    tracing::debug!(error = %failure.message, frames = failure.frames.len(), "script failed");
    failure
}

fn frame(function: &str, source: &str, position: Position, script: &RhaiScript) -> Frame {
    let generated = source.is_empty() || source == script.source_id;
    Frame {
        function: function.to_string(),
        source: if generated { script.name.as_str() } else { source }.to_string(),
        line: position.line().unwrap_or(0),
        origin: if generated {
            FrameOrigin::GeneratedScript
        } else {
            FrameOrigin::External
        },
        relocated: false,
    }
}
