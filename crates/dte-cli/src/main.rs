//! dte CLI: render templates and inspect the scripts they are translated into.
//!
//! Templates run on the Rhai backend ([`dte_rhai::RhaiEngine`]). Settings come
//! from an optional `dte.config.json` ([`dte_core::config::EngineConfig`]).

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dte",
    about = "Debuggable template engine: templates with errors reported at template lines",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to dte.config.json (default: ./dte.config.json, optional)
    #[arg(long, global = true, default_value = dte_core::config::CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to stdout
    Render {
        /// Template file
        template: PathBuf,

        /// JSON file with an object of template variables
        #[arg(long)]
        vars: Option<PathBuf>,

        /// Single variable as KEY=VALUE; VALUE is read as JSON, or as a plain string
        #[arg(long = "var", value_name = "KEY=VALUE")]
        var: Vec<String>,

        /// Script name used in error frames (default: the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the script a template is translated into
    Script {
        /// Template file
        template: PathBuf,

        /// Also print the generated-to-template position map as JSON
        #[arg(long)]
        map: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            template,
            vars,
            var,
            name,
        } => {
            commands::render::run(
                &cli.config,
                &template,
                vars.as_deref(),
                &var,
                name.as_deref(),
                cli.verbose > 0,
            )?;
        }
        Commands::Script { template, map } => {
            commands::script::run(&cli.config, &template, map)?;
        }
    }

    Ok(())
}
