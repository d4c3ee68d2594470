//! The `infradoc` executable
//!
//! Runs the module helper against a module directory by hand, for inspecting
//! and repairing module documents outside of the modules themselves.

mod logging;

use std::{
    io::{IsTerminal as _, Write as _},
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use infradoc_core::Document;
use infradoc_module::ModuleHelper;
use infradoc_schema::{awsbi, azbi, azks, state};
use tracing::warn;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    let color = match args.options.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };
    logging::set_up(args.options.verbose, color)?;

    let helper = ModuleHelper::new(&args.dir, &args.module_version);
    match args.module {
        Module::Azbi => run::<azbi::v0::Config, azbi::v0::State>(&args.command, &helper),
        Module::Awsbi => run::<awsbi::v0::Config, state::v0::State>(&args.command, &helper),
        Module::Azks => run::<azks::v0::Config, state::v0::State>(&args.command, &helper),
    }
}

fn run<C: Document, S: Document>(command: &Commands, helper: &ModuleHelper) -> Result<()> {
    match command {
        Commands::Init => {
            let (config, state) = helper.initialize::<C, S>()?;
            helper.save(&config, &state)?;
            println!("initialized {}", helper.module_directory.display());
        }
        Commands::Load => {
            let (config, state) = helper.load::<C, S>()?;
            report_unused("config", config.unused());
            report_unused("state", state.unused());
            println!(
                "loaded {} {} and {} {}",
                C::SCHEMA.kind,
                C::SCHEMA.version,
                S::SCHEMA.kind,
                S::SCHEMA.version
            );
        }
        Commands::Upgrade => {
            let (config, state) = helper.load::<C, S>()?;
            helper.save(&config, &state)?;
            println!(
                "{} is at {} {} and {} {}",
                helper.module_directory.display(),
                C::SCHEMA.kind,
                C::SCHEMA.version,
                S::SCHEMA.kind,
                S::SCHEMA.version
            );
        }
        Commands::Print => {
            let config = load_document::<C>(&helper.config_path())?;
            let bytes = config.print()?;
            let mut out = std::io::stdout().lock();
            out.write_all(&bytes)?;
            writeln!(out)?;
        }
        Commands::Validate => {
            let config = load_document::<C>(&helper.config_path())?;
            let state = load_document::<S>(&helper.state_path())?;
            report_unused("config", config.unused());
            report_unused("state", state.unused());
            println!("config and state are valid");
        }
    }
    Ok(())
}

fn load_document<D: Document>(path: &Path) -> Result<D> {
    D::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn report_unused(what: &str, unused: &[String]) {
    for field in unused {
        warn!("{} field is not used: {}", what, field);
    }
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("infradoc error: {:?}", e);
            exit(1);
        }
    }
}

/// Inspect and maintain the documents of an infrastructure module directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,

    /// The module whose documents live in the directory
    #[arg(long, value_enum)]
    module: Module,

    /// The module directory
    #[arg(long)]
    dir: PathBuf,

    /// Module version to stamp into newly created documents
    #[arg(long, default_value = "dev")]
    module_version: String,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Module {
    Azbi,
    Awsbi,
    Azks,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the documents, creating or upgrading them as needed, and save them
    Init,

    /// Load the documents; both must exist
    Load,

    /// Upgrade stale documents and save them
    Upgrade,

    /// Print the configuration in canonical form
    Print,

    /// Check both documents without touching the directory
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse() {
        let args = Args::try_parse_from([
            "infradoc", "--module", "azks", "--dir", "/tmp/m", "-v", "validate",
        ])
        .unwrap();
        assert!(matches!(args.module, Module::Azks));
        assert!(matches!(args.command, Commands::Validate));
        assert!(args.options.verbose);
        assert_eq!(args.module_version, "dev");
    }

    #[test]
    fn test_print_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let helper = ModuleHelper::new(dir.path(), "v0.1.0");
        run::<azks::v0::Config, state::v0::State>(&Commands::Init, &helper).unwrap();
        run::<azks::v0::Config, state::v0::State>(&Commands::Validate, &helper).unwrap();
        run::<azks::v0::Config, state::v0::State>(&Commands::Print, &helper).unwrap();
        assert!(helper.config_path().exists());
        assert!(helper.state_path().exists());
    }
}
