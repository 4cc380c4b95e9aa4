use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use tinyjit::programs::{self, Listing};
use tinyjit::{DumpFormat, JitConfig, JitResult, Program};

// Wrapper types for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgramArg {
    Constant,
    Identity,
    Increment,
}

impl From<ProgramArg> for Program {
    fn from(arg: ProgramArg) -> Self {
        match arg {
            ProgramArg::Constant => Program::Constant,
            ProgramArg::Identity => Program::Identity,
            ProgramArg::Increment => Program::Increment,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DumpFormatArg {
    #[default]
    Human,
    Json,
}

impl From<DumpFormatArg> for DumpFormat {
    fn from(arg: DumpFormatArg) -> Self {
        match arg {
            DumpFormatArg::Human => DumpFormat::Human,
            DumpFormatArg::Json => DumpFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "tinyjit")]
#[command(about = "Generate x86-64 machine code at runtime and call it", long_about = None)]
struct Cli {
    /// Load settings from a TOML file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Trace every encoded instruction and memory transition
    #[arg(long, global = true)]
    trace_jit: bool,

    /// Minimum executable region size in bytes
    #[arg(long, global = true)]
    arena_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a program, call it and print the result
    Run {
        #[arg(value_enum)]
        program: ProgramArg,

        /// Constant to return, or argument to pass
        #[arg(default_value = "0", allow_hyphen_values = true)]
        value: i64,
    },
    /// Print the generated code without running it
    Dump {
        #[arg(value_enum)]
        program: ProgramArg,

        /// Constant to embed (only used by `constant`)
        #[arg(default_value = "0", allow_hyphen_values = true)]
        value: i64,

        /// Output format (human or json)
        #[arg(long, value_enum)]
        format: Option<DumpFormatArg>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match JitConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => JitConfig::default(),
    };
    config.trace_jit |= cli.trace_jit;
    if let Some(size) = cli.arena_size {
        config.arena_size = size;
    }

    init_logger(&config);

    match execute(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logger(config: &JitConfig) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if config.trace_jit {
        builder.filter_module("tinyjit", log::LevelFilter::Trace);
    }
    builder.init();
}

fn execute(command: Commands, config: &JitConfig) -> JitResult<()> {
    match command {
        Commands::Run { program, value } => {
            let result = programs::run(program.into(), value, config)?;
            println!("{}", result);
        }
        Commands::Dump {
            program,
            value,
            format,
        } => {
            let program = Program::from(program);
            let listing = program.listing(value)?;
            let format = format.map(DumpFormat::from).unwrap_or(config.dump_format);
            print_listing(program, &listing, format);
        }
    }
    Ok(())
}

fn print_listing(program: Program, listing: &Listing, format: DumpFormat) {
    match format {
        DumpFormat::Human => {
            println!("; {} ({} bytes)", program.name(), listing.code().len());
            for line in &listing.lines {
                let hex: Vec<String> = line.bytes.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{:04x}  {:<24} {}", line.offset, hex.join(" "), line.text);
            }
        }
        DumpFormat::Json => {
            let doc = serde_json::json!({
                "program": program,
                "size": listing.code().len(),
                "lines": listing.lines,
            });
            println!("{}", doc);
        }
    }
}
