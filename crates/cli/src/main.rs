// oxldut - keeps the DriverCore catalog in step with vendor support feeds

mod exit_codes;
mod logging;
mod report;
mod settings;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};

use drivercore_catalog_client::HttpCatalogClient;
use drivercore_io::{open_source, SourceKind};
use drivercore_recon::config::{DelimitedLayout, MalformedPolicy};
use drivercore_recon::{RunConfig, SynthesisContext};

use exit_codes::{EXIT_ABORTED, EXIT_INPUT, EXIT_ROW_FAILURES, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "oxldut")]
#[command(about = "Reconcile vendor driver-support feeds with the DriverCore catalog")]
#[command(long_version = long_version())]
#[command(version)]
#[command(group(ArgGroup::new("input").required(true).args(["csv", "xml"])))]
#[command(after_help = "\
Examples:
  oxldut --csv hp-win11.csv --oem HP
  oxldut --xml surface.xml --oem Microsoft --endpoint https://catalog.example.com
  oxldut --csv dell-win10.csv --oem Dell --on-malformed abort --json > run.json")]
struct Cli {
    /// Delimited feed (release-flag or dated layout)
    #[arg(long, value_name = "CSV_FILE")]
    csv: Option<PathBuf>,

    /// Attribute-tagged XML feed
    #[arg(long, value_name = "XML_FILE")]
    xml: Option<PathBuf>,

    /// OEM the feed belongs to (used when rows carry no oem column)
    #[arg(long)]
    oem: String,

    /// Catalog base URL
    #[arg(long, env = "OXLDUT_ENDPOINT")]
    endpoint: Option<String>,

    /// Run config file (default: <config dir>/oxldut/config.toml if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Column layout of the CSV feed
    #[arg(long, value_enum, requires = "csv")]
    layout: Option<LayoutArg>,

    /// What to do with rows that are too short or carry a bad date
    #[arg(long, value_enum)]
    on_malformed: Option<PolicyArg>,

    /// Retry failed catalog calls up to N times (re-looking up first)
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Print the run report as JSON to stdout
    #[arg(long)]
    json: bool,

    /// Write the run report as JSON to a file
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Exit 1 if any row failed or matched several catalog records
    #[arg(long)]
    strict_exit: bool,

    /// Only print errors (overrides OXLDUT_LOG / RUST_LOG)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More diagnostics (-v info, -vv debug; overrides OXLDUT_LOG / RUST_LOG)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Auto,
    ReleaseFlags,
    Dated,
}

impl From<LayoutArg> for DelimitedLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Auto => DelimitedLayout::Auto,
            LayoutArg::ReleaseFlags => DelimitedLayout::ReleaseFlags,
            LayoutArg::Dated => DelimitedLayout::Dated,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Skip,
    Abort,
}

impl From<PolicyArg> for MalformedPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => MalformedPolicy::Skip,
            PolicyArg::Abort => MalformedPolicy::Abort,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  drivercore-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  drivercore-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cmd_run(cli) {
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

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(cli: Cli) -> Result<(), CliError> {
    let oem = cli.oem.trim().to_string();
    if oem.is_empty() {
        return Err(CliError::usage("--oem must not be empty"));
    }

    let config = settings::resolve(
        cli.config.as_deref(),
        &settings::Overrides {
            endpoint: cli.endpoint.clone(),
            layout: cli.layout.map(Into::into),
            on_malformed: cli.on_malformed.map(Into::into),
            retries: cli.retries,
        },
    )?;

    let (path, kind) = match (&cli.csv, &cli.xml) {
        (Some(path), None) => (path.as_path(), SourceKind::Delimited(config.ingest.layout)),
        (None, Some(path)) => (path.as_path(), SourceKind::Markup(config.markup.clone())),
        // clap's ArgGroup rejects every other combination
        _ => return Err(CliError::usage("exactly one of --csv or --xml is required")),
    };

    let rows = open_input(path, &kind)?;

    let client = HttpCatalogClient::from_config(&config.catalog)
        .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;
    log::info!("catalog endpoint {}", client.endpoint());

    let ctx = SynthesisContext {
        processed_at: Some(chrono::Utc::now()),
        ..SynthesisContext::new(oem, path)
    };
    log::info!("{}: oem {}, inferred release {}", path.display(), ctx.oem, ctx.inferred_release);

    let run_report = execute(rows, &ctx, &client, &config, path, cli.quiet);

    if !cli.quiet {
        eprintln!("{}", report::summary_line(&run_report));
    }

    if cli.json || cli.output.is_some() {
        let json = report::to_json(&run_report)?;
        if let Some(ref out) = cli.output {
            report::write_json(out, &json)?;
            if !cli.quiet {
                eprintln!("wrote {}", out.display());
            }
        }
        if cli.json {
            println!("{json}");
        }
    }

    if let Some(reason) = run_report.aborted {
        return Err(CliError::new(EXIT_ABORTED, format!("run aborted: {reason}"))
            .with_hint("rows before the failure were applied; fix the input and re-run"));
    }

    let s = &run_report.summary;
    if cli.strict_exit && (s.failed > 0 || s.conflicts > 0) {
        return Err(CliError::new(
            EXIT_ROW_FAILURES,
            format!("{} failed, {} duplicate uids", s.failed, s.conflicts),
        ));
    }

    Ok(())
}

fn open_input(path: &Path, kind: &SourceKind) -> Result<Box<dyn drivercore_io::RowSource>, CliError> {
    if !path.is_file() {
        return Err(CliError::new(EXIT_INPUT, format!("input file not found: {}", path.display())));
    }
    open_source(path, kind).map_err(|e| CliError::new(EXIT_INPUT, e.to_string()))
}

fn execute(
    rows: Box<dyn drivercore_io::RowSource>,
    ctx: &SynthesisContext,
    client: &HttpCatalogClient,
    config: &RunConfig,
    path: &Path,
    quiet: bool,
) -> drivercore_recon::RunReport {
    let source = path.display().to_string();
    drivercore_recon::run(rows, ctx, client, config, &source, |outcome| {
        if !quiet {
            eprintln!("{}", report::outcome_line(outcome));
        }
    })
}
