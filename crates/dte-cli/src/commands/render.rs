use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use dte_core::config::EngineConfig;
use dte_core::engine::Binding;
use dte_core::template::TemplateEngine;
use dte_rhai::RhaiEngine;

use crate::output;

/// Render a template to stdout.
///
/// Variables are taken from the `--vars` JSON file first; `--var` pairs are
/// applied on top of it. Compile errors are reported against template lines
/// and runtime failures carry frames relocated to the template.
pub fn run(
    config_path: &Path,
    template_path: &Path,
    vars_path: Option<&Path>,
    pairs: &[String],
    name: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let config = engine_config(config_path, verbose)?;
    let binding = load_binding(vars_path, pairs)?;
    tracing::info!(variables = binding.len(), "binding loaded");

    let engine = TemplateEngine::with_config(RhaiEngine::new(), config);
    let template = match name {
        Some(name) => {
            let text = std::fs::read_to_string(template_path)
                .with_context(|| format!("failed to read template {}", template_path.display()))?;
            engine.create_template(&text, name)?
        }
        None => engine.create_template_from_path(template_path)?,
    };

    let mut stdout = std::io::stdout().lock();
    template.render(&binding, &mut stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Config file settings; `-v` on the command line also turns on script dumps.
fn engine_config(config_path: &Path, verbose: bool) -> Result<EngineConfig> {
    let mut config = EngineConfig::load_or_default(config_path)?;
    config.verbose |= verbose;
    Ok(config)
}

/// Build the binding from an optional JSON file and `KEY=VALUE` overrides.
fn load_binding(vars_path: Option<&Path>, pairs: &[String]) -> Result<Binding> {
    let mut binding = match vars_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read variables from {}", path.display()))?;
            let value: Value = serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON in {}", path.display()))?;
            match Binding::from_json(value) {
                Some(binding) => binding,
                None => bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => Binding::new(),
    };

    for pair in pairs {
        let (key, value) = parse_var(pair)?;
        if binding.get(&key).is_some() {
            output::print_warning(&format!("--var {key} overrides the value from the vars file"));
        }
        binding.insert(key, value);
    }

    Ok(binding)
}

/// Split `KEY=VALUE`. The value is parsed as JSON when possible
/// (`count=3`, `tags=["a"]`), otherwise kept as a string.
fn parse_var(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("invalid --var '{pair}': expected KEY=VALUE");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("invalid --var '{pair}': empty variable name");
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_json_and_string_values() {
        assert_eq!(parse_var("count=3").unwrap(), ("count".into(), Value::from(3)));
        assert_eq!(parse_var("ok=true").unwrap(), ("ok".into(), Value::Bool(true)));
        assert_eq!(
            parse_var("name=World").unwrap(),
            ("name".into(), Value::from("World"))
        );
        assert_eq!(
            parse_var("expr=a=b").unwrap(),
            ("expr".into(), Value::from("a=b"))
        );
        assert_eq!(parse_var("empty=").unwrap(), ("empty".into(), Value::from("")));
    }

    #[test]
    fn test_parse_var_rejects_malformed_pairs() {
        assert!(parse_var("novalue").is_err());
        assert!(parse_var(" =1").is_err());
    }

    #[test]
    fn test_verbose_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dte.config.json");
        EngineConfig::default().save(&path).unwrap();

        assert!(!engine_config(&path, false).unwrap().verbose);
        assert!(engine_config(&path, true).unwrap().verbose);

        let loud = EngineConfig {
            verbose: true,
            ..EngineConfig::default()
        };
        loud.save(&path).unwrap();
        assert!(engine_config(&path, false).unwrap().verbose);
    }

    #[test]
    fn test_load_binding_merges_file_and_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        std::fs::write(&path, r#"{ "name": "file", "count": 1 }"#).unwrap();

        let binding = load_binding(Some(&path), &["name=cli".to_string()]).unwrap();
        assert_eq!(binding.get("name"), Some(&Value::from("cli")));
        assert_eq!(binding.get("count"), Some(&Value::from(1)));
    }

    #[test]
    fn test_load_binding_requires_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = load_binding(Some(&path), &[]).unwrap_err();
        assert!(err.to_string().contains("must contain a JSON object"));
    }

    #[test]
    fn test_render_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("hello.tpl");
        std::fs::write(&template, "Hello ${name}").unwrap();

        let result = run(
            &dir.path().join("dte.config.json"),
            &template,
            None,
            &["name=World".to_string()],
            None,
            true,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_render_reports_compile_errors() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("broken.tpl");
        std::fs::write(&template, "Title\n<% if ready { %>\nBody").unwrap();

        let err = run(&dir.path().join("dte.config.json"), &template, None, &[], None, false)
            .unwrap_err();
        assert!(err.to_string().contains("   1:Title"));
    }
}
