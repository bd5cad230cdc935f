use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use scarab::debug::disassemble_chunk;
use scarab::prelude::*;

#[derive(ClapParser)]
#[command(name = "scarab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scarab bytecode interpreter", long_about = None)]
struct Cli {
    /// Script file to run.
    script: Option<PathBuf>,

    /// Evaluate source given on the command line instead of a file.
    #[arg(short = 'e', long = "eval", value_name = "SOURCE", conflicts_with = "script")]
    eval: Option<String>,

    /// Print the compiled bytecode listing before running.
    #[arg(long)]
    disassemble: bool,

    /// Print every instruction and the value stack while running.
    #[arg(long)]
    trace: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (source, name) = match (&cli.script, &cli.eval) {
        (Some(path), _) => match fs::read_to_string(path) {
            Ok(source) => (source, path.display().to_string()),
            Err(error) => {
                eprintln!("scarab: cannot read {}: {error}", path.display());
                process::exit(74);
            }
        },
        (None, Some(source)) => (source.clone(), "<eval>".to_string()),
        (None, None) => {
            eprintln!("scarab: no script given (try --help)");
            process::exit(64);
        }
    };

    let chunk = match scarab::compiler::compile(&source) {
        Ok(chunk) => chunk,
        Err(error) => {
            eprintln!("{error}");
            process::exit(65);
        }
    };

    if cli.disassemble {
        disassemble_chunk(&chunk, &name);
    }

    let options = Options {
        capture: false,
        trace: cli.trace,
    };
    if let Err(error) = VM::with_options(chunk, options).run() {
        eprintln!("{error}");
        process::exit(70);
    }
}
