use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ScriptLimits;
use crate::dialect::Dialect;

/// Variables visible to a template while it renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Binding(Map<String, Value>);

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Binding from a JSON object; `None` for any other JSON value.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

/// One syntax error reported by a script compiler, in generated-script coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// A script that failed to compile, with every syntax error the compiler reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileFailure {
    pub errors: Vec<SyntaxError>,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} compilation error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  line {}, column {}: {}", e.line, e.column, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}

/// Why a generated script could not be turned into an executable unit.
#[derive(Debug)]
pub enum CompileError {
    /// The script text is malformed.
    Syntax(CompileFailure),
    /// Anything else that went wrong while setting the script up.
    Setup(anyhow::Error),
}

/// Where a stack frame's code lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameOrigin {
    /// Code of the generated template script; its lines can be mapped back.
    GeneratedScript,
    /// Code the template called into (modules, host functions).
    External,
}

/// One entry of a runtime failure's call stack, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub function: String,
    pub source: String,
    pub line: usize,
    pub origin: FrameOrigin,
    /// The line was rewritten from script to template coordinates.
    #[serde(default)]
    pub relocated: bool,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} ({}:{})", self.function, self.source, self.line)
    }
}

/// Failure raised while a compiled template runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFailure {
    pub message: String,
    pub frames: Vec<Frame>,
}

impl RuntimeFailure {
    pub fn new(message: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            message: message.into(),
            frames,
        }
    }

    /// Innermost frame, where the failure was raised.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.first()
    }
}

impl From<io::Error> for RuntimeFailure {
    fn from(e: io::Error) -> Self {
        Self::new(format!("failed to write template output: {e}"), Vec::new())
    }
}

impl fmt::Display for RuntimeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for frame in &self.frames {
            write!(f, "\n\t{frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeFailure {}

/// A script language able to compile and run generated template scripts.
pub trait ScriptEngine {
    /// Compiled, reusable form of a script.
    type Unit;

    /// Literal-emission syntax the parser must produce for this engine.
    fn dialect(&self) -> Dialect;

    /// Adopt the resource limits of the engine configuration. Called once by
    /// [`TemplateEngine::with_config`](crate::template::TemplateEngine::with_config);
    /// backends without limits ignore it.
    fn apply_limits(&mut self, _limits: ScriptLimits) {}

    /// Compile `script`, registering it under `name`.
    fn compile(&self, script: &str, name: &str) -> Result<Self::Unit, CompileError>;

    /// Run a compiled unit with `binding` as its variables, writing all
    /// printed output to `out`.
    fn execute(
        &self,
        unit: &Self::Unit,
        binding: &Binding,
        out: &mut dyn io::Write,
    ) -> Result<(), RuntimeFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_builder() {
        let binding = Binding::new().with("name", "World").with("count", 3);
        assert_eq!(binding.len(), 2);
        assert_eq!(binding.get("name"), Some(&Value::from("World")));
        assert_eq!(binding.get("count"), Some(&Value::from(3)));
    }

    #[test]
    fn test_binding_from_json() {
        let binding = Binding::from_json(serde_json::json!({ "flag": true })).unwrap();
        assert_eq!(binding.get("flag"), Some(&Value::Bool(true)));
        assert!(Binding::from_json(serde_json::json!([1, 2])).is_none());
    }

    #[test]
    fn test_runtime_failure_display() {
        let failure = RuntimeFailure::new(
            "Runtime error: boom",
            vec![Frame {
                function: "<script>".into(),
                source: "page.rhai".into(),
                line: 4,
                origin: FrameOrigin::GeneratedScript,
                relocated: true,
            }],
        );
        assert_eq!(
            failure.to_string(),
            "Runtime error: boom\n\tat <script> (page.rhai:4)"
        );
        assert_eq!(failure.top().map(|f| f.line), Some(4));
    }

    #[test]
    fn test_compile_failure_display() {
        let failure = CompileFailure {
            errors: vec![SyntaxError {
                message: "unexpected '}'".into(),
                line: 2,
                column: 5,
            }],
        };
        assert_eq!(
            failure.to_string(),
            "1 compilation error(s)\n  line 2, column 5: unexpected '}'"
        );
    }
}
