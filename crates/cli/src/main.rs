// custrecon CLI - customer master-data reconciliation, headless

mod exit_codes;
mod recon;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use custrecon_engine::{LayoutKind, ReconError};

use exit_codes::{for_engine_code, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "custrecon")]
#[command(about = "Reconcile customer master-data exports across systems")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check in a reconciliation config (exit 0 = clean, 1 = differences)
    #[command(after_help = "\
Examples:
  custrecon run customers.recon.toml
  custrecon run customers.recon.toml --json
  custrecon run customers.recon.toml --xlsx-dir out/ --show
  custrecon run --dir exports/          # built-in KNA1/KNVV/KNVP/MACE checks")]
    Run {
        /// Path to the .toml config. Without it the built-in customer
        /// checks run against kna1.xlsx, knvv.xlsx, knvp.xlsx and mace.xlsx.
        config: Option<PathBuf>,

        /// Directory holding the input files for the built-in config
        #[arg(long, conflicts_with = "config")]
        dir: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long, conflicts_with = "show")]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one xlsx report per check into this directory
        #[arg(long)]
        xlsx_dir: Option<PathBuf>,

        /// Print every report sheet as a numbered table
        #[arg(long)]
        show: bool,
    },

    /// Validate a config without running it
    #[command(after_help = "\
Examples:
  custrecon validate customers.recon.toml")]
    Validate {
        /// Path to the .toml config
        config: PathBuf,
    },

    /// Keys present in one export but not the other
    #[command(after_help = "\
Examples:
  custrecon diff kna1.xlsx knvv.xlsx
  custrecon diff kna1.xlsx knvv.xlsx --xlsx kna1_vs_knvv.xlsx --merged merged.xlsx")]
    Diff {
        left: PathBuf,
        right: PathBuf,

        /// Key column on both sides
        #[arg(long, default_value = "Customer")]
        key: String,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        left_layout: Layout,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        right_layout: Layout,

        /// Also write the left-joined view (csv, tsv or xlsx)
        #[arg(long)]
        merged: Option<PathBuf>,

        #[command(flatten)]
        out: AdHocOutput,
    },

    /// Compare mapped fields against the downstream system of record
    #[command(after_help = "\
Examples:
  custrecon mapping merged.xlsx mace.xlsx
  custrecon mapping merged.xlsx mace.xlsx --xlsx mismatches.xlsx --show")]
    Mapping {
        primary: PathBuf,
        downstream: PathBuf,

        #[arg(long, default_value = "Customer")]
        primary_key: String,

        #[arg(long, default_value = "CUSTOMER_NATURAL_ID")]
        secondary_key: String,

        #[arg(long, value_enum, default_value_t = Layout::Plain)]
        primary_layout: Layout,

        #[arg(long, value_enum, default_value_t = Layout::Plain)]
        secondary_layout: Layout,

        #[command(flatten)]
        out: AdHocOutput,
    },

    /// Compare sales-area fields against partner-function groups
    #[command(after_help = "\
Examples:
  custrecon grouped knvv.xlsx knvp.xlsx
  custrecon grouped knvv.xlsx knvp.xlsx --field 'Sales Org.' --field Division")]
    Grouped {
        sales_view: PathBuf,
        partner: PathBuf,

        #[arg(long, default_value = "Customer")]
        key: String,

        /// Field to compare (repeatable). Default: Sales Org., Distr. Channel, Division
        #[arg(long = "field")]
        fields: Vec<String>,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        left_layout: Layout,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        right_layout: Layout,

        #[command(flatten)]
        out: AdHocOutput,
    },

    /// Write the left-joined view of two exports
    #[command(after_help = "\
Examples:
  custrecon merge kna1.xlsx knvv.xlsx --xlsx merged.xlsx")]
    Merge {
        left: PathBuf,
        right: PathBuf,

        #[arg(long, default_value = "Customer")]
        key: String,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        left_layout: Layout,

        #[arg(long, value_enum, default_value_t = Layout::Offset)]
        right_layout: Layout,

        /// Output file (csv, tsv or xlsx)
        #[arg(long)]
        xlsx: PathBuf,
    },
}

/// Output flags shared by the two-file commands.
#[derive(Args)]
struct AdHocOutput {
    /// Write the report workbook here
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Output JSON to stdout instead of human summary
    #[arg(long, conflicts_with = "show")]
    json: bool,

    /// Print report sheets as numbered tables
    #[arg(long)]
    show: bool,
}

/// Where the header sits in an input file.
#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// Header on row 5, row 6 blank (report-style export)
    Offset,
    /// Header on the first row
    Plain,
}

impl From<Layout> for LayoutKind {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Offset => LayoutKind::OffsetHeader,
            Layout::Plain => LayoutKind::PlainHeader,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  custrecon-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  custrecon-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, dir, json, output, xlsx_dir, show } => {
            recon::cmd_run(config, dir, recon::RunOutput { json, output, xlsx_dir, show })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Diff { left, right, key, left_layout, right_layout, merged, out } => recon::cmd_diff(
            recon::Pair::new(left, right, left_layout.into(), right_layout.into()),
            key,
            merged,
            out.into(),
        ),
        Commands::Mapping {
            primary,
            downstream,
            primary_key,
            secondary_key,
            primary_layout,
            secondary_layout,
            out,
        } => recon::cmd_mapping(
            recon::Pair::new(primary, downstream, primary_layout.into(), secondary_layout.into()),
            primary_key,
            secondary_key,
            out.into(),
        ),
        Commands::Grouped { sales_view, partner, key, fields, left_layout, right_layout, out } => {
            recon::cmd_grouped(
                recon::Pair::new(sales_view, partner, left_layout.into(), right_layout.into()),
                key,
                fields,
                out.into(),
            )
        }
        Commands::Merge { left, right, key, left_layout, right_layout, xlsx } => recon::cmd_merge(
            recon::Pair::new(left, right, left_layout.into(), right_layout.into()),
            key,
            xlsx,
        ),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

impl From<AdHocOutput> for recon::AdHocOutput {
    fn from(out: AdHocOutput) -> Self {
        Self { xlsx: out.xlsx, json: out.json, show: out.show }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self::new(for_engine_code(err.code()), err.to_string())
    }
}
