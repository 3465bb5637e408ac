mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::show::Table;
use commands::EXIT_FAILURE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "otp-mmap",
    version,
    about = "Deterministic OTP memory map layout generator"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a memory map and write documentation tables and the template context.
    Generate {
        /// Path to the memory map TOML file.
        #[arg(default_value = "otp_ctrl_mmap.toml")]
        spec: PathBuf,
        /// Seed overriding the one in the memory map file.
        #[arg(long)]
        seed: Option<u64>,
        /// Directory the generated files are written to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Validate a memory map without generating constants.
    Check {
        /// Path to the memory map TOML file.
        #[arg(default_value = "otp_ctrl_mmap.toml")]
        spec: PathBuf,
    },
    /// Print one of the documentation tables to stdout.
    Show {
        /// Path to the memory map TOML file.
        #[arg(default_value = "otp_ctrl_mmap.toml")]
        spec: PathBuf,
        /// Seed overriding the one in the memory map file.
        #[arg(long)]
        seed: Option<u64>,
        /// Table to print.
        #[arg(long, value_enum, default_value_t = Table::Mmap)]
        table: Table,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("OTP_MMAP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Generate {
            spec,
            seed,
            out_dir,
        } => commands::generate::run(&spec, seed, &out_dir, json_output),
        Commands::Check { spec } => commands::check::run(&spec, json_output),
        Commands::Show { spec, seed, table } => {
            commands::show::run(&spec, seed, table, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
