//! HCL2 Spec Generator CLI
//!
//! Command-line interface for generating flat projections and decode specs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hcl2spec::{
    generate, load_universe_auto, render, write_artifact, Diagnostic, GenerateOptions, Generation,
    OverrideTable, Registry, Severity,
};

#[derive(Parser)]
#[command(name = "hcl2spec")]
#[command(about = "Generate flat HCL2 projections and decode specs for configuration structs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate projections and decode specs for root types
    Generate {
        /// Type universe: file, directory holding one .json file, or URL
        universe: String,

        /// Root types to project (comma separated or repeated)
        #[arg(long = "type", short = 't', value_delimiter = ',', required = true)]
        types: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Prefix used to name projections
        #[arg(long, default_value = hcl2spec::DEFAULT_PROJECTION_PREFIX)]
        prefix: String,

        /// JSON override table merged over the standard one
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Diagnostics format: text (default) or json
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Generate in memory and check the naming contract between projections
    Check {
        /// Type universe: file, directory holding one .json file, or URL
        universe: String,

        /// Root types to project (comma separated or repeated)
        #[arg(long = "type", short = 't', value_delimiter = ',', required = true)]
        types: Vec<String>,

        /// Prefix used to name projections
        #[arg(long, default_value = hcl2spec::DEFAULT_PROJECTION_PREFIX)]
        prefix: String,

        /// JSON override table merged over the standard one
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            universe,
            types,
            output,
            pretty,
            prefix,
            overrides,
            strict,
            format,
        } => run_generate(GenerateArgs {
            universe,
            types,
            output,
            pretty,
            prefix,
            overrides,
            strict,
            json_output: format == "json",
        }),

        Commands::Check {
            universe,
            types,
            prefix,
            overrides,
            strict,
            format,
        } => run_check(
            &universe,
            &types,
            &prefix,
            overrides.as_deref(),
            strict,
            format == "json",
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct GenerateArgs {
    universe: String,
    types: Vec<String>,
    output: Option<PathBuf>,
    pretty: bool,
    prefix: String,
    overrides: Option<PathBuf>,
    strict: bool,
    json_output: bool,
}

fn run_generate(args: GenerateArgs) -> Result<(), u8> {
    let GenerateArgs {
        universe,
        types,
        output,
        pretty,
        prefix,
        overrides,
        strict,
        json_output,
    } = args;

    let generation = load_and_generate(&universe, &types, &prefix, overrides.as_deref())?;

    let invocation: Vec<String> = std::env::args().skip(1).collect();
    let rendered = render(&generation, &invocation.join(" "), pretty).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if json_output {
        let diagnostics = serde_json::to_string(&generation.diagnostics).map_err(|e| {
            eprintln!("Error serializing diagnostics: {}", e);
            2u8
        })?;
        eprintln!("{}", diagnostics);
    } else {
        for diag in &generation.diagnostics {
            eprintln!("{}", colored(diag));
        }
    }

    // nothing is written when --strict rejects the run
    if strict && generation.warnings() > 0 {
        if !json_output {
            eprintln!(
                "\x1b[31m✗ {} warning(s) with --strict\x1b[0m",
                generation.warnings()
            );
        }
        return Err(1);
    }

    match output {
        Some(path) => write_artifact(&path, &rendered).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => println!("{}", rendered),
    }

    Ok(())
}

fn run_check(
    universe: &str,
    types: &[String],
    prefix: &str,
    overrides: Option<&Path>,
    strict: bool,
    json_output: bool,
) -> Result<(), u8> {
    let generation = load_and_generate(universe, types, prefix, overrides)?;

    let mut registry = Registry::new();
    registry.record(&generation);

    let mut diagnostics = generation.diagnostics.clone();
    diagnostics.extend(registry.validate());

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;
    let passed = errors == 0 && (!strict || warnings == 0);

    if json_output {
        let projections: Vec<String> = generation
            .projections
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        let output = serde_json::json!({
            "ok": passed,
            "projections": projections,
            "errors": errors,
            "warnings": warnings,
            "diagnostics": diagnostics,
        });
        println!("{}", output);
    } else {
        for projection in &generation.projections {
            println!("  {} -> {}", projection.root, projection.name);
        }
        for diag in &diagnostics {
            println!("    {}", colored(diag));
        }
        println!();

        if passed {
            println!(
                "\x1b[32m✓ {} projections checked, all passed\x1b[0m",
                generation.projections.len()
            );
        } else {
            println!(
                "\x1b[31m✗ {} projections checked ({} errors, {} warnings)\x1b[0m",
                generation.projections.len(),
                errors,
                warnings
            );
        }
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}

fn load_and_generate(
    universe_source: &str,
    types: &[String],
    prefix: &str,
    overrides: Option<&Path>,
) -> Result<Generation, u8> {
    let universe = load_universe_auto(universe_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut options = GenerateOptions::new(types).prefix(prefix);
    if let Some(path) = overrides {
        let table = OverrideTable::load(path).map_err(|e| {
            eprintln!("Error loading overrides: {}", e);
            e.exit_code() as u8
        })?;
        options = options.overrides(OverrideTable::standard().merge(table));
    }

    generate(&universe, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn colored(diag: &Diagnostic) -> String {
    let color = match diag.severity {
        Severity::Error => "\x1b[31m",
        Severity::Warning => "\x1b[33m",
    };
    format!(
        "{}{}[{}]\x1b[0m: {} - {}",
        color,
        diag.severity.as_str(),
        diag.code.code_str(),
        diag.path,
        diag.message
    )
}
