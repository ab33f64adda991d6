use std::path::Path;

use anyhow::{Context, Result};

use dte_core::config::EngineConfig;
use dte_core::engine::ScriptEngine;
use dte_core::parser;
use dte_core::template::TemplateEngine;
use dte_rhai::RhaiEngine;

use crate::output;

/// Translate a template and print the generated script.
///
/// The script is only generated, never compiled, so templates with broken
/// code blocks can be inspected too.
pub fn run(config_path: &Path, template_path: &Path, show_map: bool) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path)?;
    let engine = TemplateEngine::with_config(RhaiEngine::new(), config);

    let text = std::fs::read_to_string(template_path)
        .with_context(|| format!("failed to read template {}", template_path.display()))?;
    let parsed = parser::parse_str(&text, engine.script_engine().dialect())?;

    output::print_header("dte script");
    output::print_key_value("Template", &template_path.display().to_string());
    output::print_key_value("Mappings", &parsed.positions.len().to_string());

    output::print_numbered(&parsed.script);

    if show_map {
        println!("{}", serde_json::to_string_pretty(&parsed.positions)?);
    }

    Ok(())
}
