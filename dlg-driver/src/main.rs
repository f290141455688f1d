//! Delegate Graph Lowering Driver
//!
//! Command-line front end: reads a program (graph + export signature) as
//! JSON, optionally runs the quantization boundary pass, and writes the
//! lowered graph.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dlg_backend::{lower_program, LoweringOptions, Registry};
use dlg_graph::{NodeRole, Program};
use dlg_passes::insert_io_qdq;
use log::{info, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dlgc")]
#[command(about = "Delegate graph lowering")]
#[command(version = "0.1.0")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a program to the backend graph
    Lower {
        /// Input program (JSON)
        input: PathBuf,

        /// Output file for the lowered graph; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Insert quantize/dequantize nodes at the graph boundary first
        #[arg(long)]
        insert_io_qdq: bool,

        /// Lowering options (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Version tag written into the lowered graph
        #[arg(long)]
        version_tag: Option<String>,

        /// Print a one-line-per-op summary instead of JSON
        #[arg(long)]
        summary: bool,
    },

    /// Run only the quantization boundary pass and write the rewritten program
    InsertIoQdq {
        /// Input program (JSON)
        input: PathBuf,

        /// Output file for the rewritten program; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in operator kinds
    Ops,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Lower {
            input,
            output,
            insert_io_qdq,
            config,
            version_tag,
            summary,
        } => lower_command(
            &input,
            output.as_deref(),
            insert_io_qdq,
            config.as_deref(),
            version_tag,
            summary,
        ),
        Commands::InsertIoQdq { input, output } => insert_io_qdq_command(&input, output.as_deref()),
        Commands::Ops => ops_command(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_program(path: &Path) -> Result<Program> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let program = Program::from_json(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        "Loaded {}: {} nodes, {} inputs",
        path.display(),
        program.graph.len(),
        program.graph.count_role(NodeRole::Placeholder)
    );
    Ok(program)
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn load_options(config: Option<&Path>) -> Result<LoweringOptions> {
    let Some(path) = config else {
        return Ok(LoweringOptions::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    LoweringOptions::from_json(&text).with_context(|| format!("invalid lowering options in {}", path.display()))
}

fn lower_command(
    input: &Path,
    output: Option<&Path>,
    insert_io_qdq: bool,
    config: Option<&Path>,
    version_tag: Option<String>,
    summary: bool,
) -> Result<()> {
    let mut options = load_options(config)?;
    if insert_io_qdq {
        options.insert_io_qdq = true;
    }
    if let Some(tag) = version_tag {
        options.version = tag;
    }

    let program = read_program(input)?;
    let registry = Registry::with_builtins()?;
    let lowered = lower_program(&program, &registry, &options)
        .with_context(|| format!("failed to lower {}", input.display()))?;

    let text = if summary {
        lowered.summary()
    } else {
        lowered.to_json()?
    };
    write_output(output, &text)
}

fn insert_io_qdq_command(input: &Path, output: Option<&Path>) -> Result<()> {
    let program = read_program(input)?;
    let result = insert_io_qdq(&program.graph, &program.signature)?;
    if !result.modified {
        info!("No quantized boundary values in {}", input.display());
    }
    let rewritten = Program::new(result.graph, program.signature);
    write_output(output, &rewritten.to_json()?)
}

fn ops_command() -> Result<()> {
    let registry = Registry::with_builtins()?;
    for kind in registry.kinds() {
        println!("{}", kind);
    }
    Ok(())
}
