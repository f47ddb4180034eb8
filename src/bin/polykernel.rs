//! Command line driver for the polynomial kernel.
//!
//! Usage:
//! `polykernel build [--source FILE] [--output FILE] [--debug-names]`
//! `polykernel eval --module FILE --x X C0 C1 ...`
//! `polykernel inspect FILE`

use clap::{Parser, Subcommand};
use log::{debug, error};
use polykernel::bridge::PolynomialHost;
use polykernel::core::config::{BuildConfig, DEFAULT_OUTPUT, DEFAULT_SOURCE};
use polykernel::pipeline;
use polykernel::runtime::Module;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "polykernel")]
#[command(about = "Build and run the WebAssembly polynomial kernel")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the kernel text into a binary module
    Build {
        /// Module text to compile
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: PathBuf,

        /// Where to write the binary module
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Emit the `name` custom section
        #[arg(long)]
        debug_names: bool,
    },

    /// Evaluate a polynomial with a compiled kernel
    Eval {
        /// Compiled kernel
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        module: PathBuf,

        /// Evaluation point
        #[arg(long, allow_negative_numbers = true)]
        x: f64,

        /// Coefficients, highest degree first
        #[arg(allow_negative_numbers = true)]
        coefficients: Vec<f64>,
    },

    /// Print the types, functions, memory and exports of a binary module
    Inspect {
        module: PathBuf,
    },
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Build {
            source,
            output,
            debug_names,
        } => {
            let config = BuildConfig::new(source, output).with_debug_names(debug_names);
            let report = pipeline::build(&config)?;
            debug!("{} bytes written", report.size);
        }
        Command::Eval {
            module,
            x,
            coefficients,
        } => {
            let bytes = fs::read(&module)
                .map_err(|e| format!("failed to read {}: {e}", module.display()))?;
            let mut host = PolynomialHost::from_binary(&bytes)?;
            let result = host.evaluate(&coefficients, x)?;
            println!("{result}");
        }
        Command::Inspect { module } => {
            let bytes = fs::read(&module)
                .map_err(|e| format!("failed to read {}: {e}", module.display()))?;
            let loaded = Module::from_binary(&bytes)?;
            println!("{}: {} bytes", module.display(), bytes.len());
            print!("{}", loaded.summary());
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args.command) {
        error!("{e}");
        process::exit(1);
    }
}
