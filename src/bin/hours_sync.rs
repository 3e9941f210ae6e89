use {
    anyhow::{
        Context,
        Result,
        anyhow,
    },
    clap::{
        Parser,
        Subcommand,
        ValueEnum,
    },
    hours_sync::sync::{
        Syncer,
        config::Config,
        services::render_table,
    },
    std::{
        io::IsTerminal,
        path::PathBuf,
    },
    tracing_subscriber::{
        EnvFilter,
        prelude::*,
    },
};

#[derive(Parser, Debug)]
#[clap(version)]
/// Hours Sync - keep listing opening hours in line with the CRM
struct Arguments {
    #[clap(short, long, default_value = "config/config.toml")]
    /// Path to configuration file
    config: PathBuf,

    #[clap(short = 'L', long)]
    /// Whether to print file:line info for each log statement
    log_locations: bool,

    #[clap(long)]
    /// Ignore cached snapshots and read both systems afresh
    no_cache: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push the CRM's hours to every listing location that differs
    Reconcile {
        #[clap(long)]
        /// Log the directives instead of writing them
        dry_run: bool,
    },
    /// Print both systems' hours side by side
    Report {
        #[clap(long, value_enum, default_value_t = ReportFormat::Table)]
        /// Print a table or save a CSV file under the report directory
        format: ReportFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ReportFormat {
    Table,
    Csv,
}

fn main() -> Result<()> {
    let args = Arguments::parse();

    // Initialize a Tracing Subscriber
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_file(args.log_locations)
        .with_line_number(args.log_locations)
        .with_thread_ids(true)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Use the compact formatter if we're in a terminal, otherwise use the JSON formatter.
    if std::io::stderr().is_terminal() {
        registry.with(fmt_layer.compact()).init();
    } else {
        registry.with(fmt_layer.json()).init();
    }

    if !args.config.as_path().exists() {
        return Err(anyhow!("No config found under {:?}", args.config.to_str()));
    }

    eprintln!("Loading config from {:?}", args.config.display());

    let config = Config::new(&args.config).context("Could not parse config")?;

    // If it fails, print the full error chain. RUST_BACKTRACE should be set
    // to 1 for the backtrace to include more than the top-level error.
    if let Err(err) = start(config, args.no_cache, args.command) {
        eprintln!("{}", err.backtrace());
        err.chain().for_each(|cause| eprintln!("{cause}"));
        return Err(err);
    }

    Ok(())
}

fn start(config: Config, no_cache: bool, command: Command) -> Result<()> {
    let syncer = Syncer::new(config);
    match command {
        Command::Reconcile { dry_run } => {
            let summary = syncer.reconcile(no_cache, dry_run)?;
            println!(
                "{} updated, {} unchanged, {} skipped, {} failed",
                summary.updated(),
                summary.unchanged(),
                summary.skipped(),
                summary.failed(),
            );
            if summary.failed() > 0 {
                return Err(anyhow!("{} location(s) failed to reconcile", summary.failed()));
            }
        }
        Command::Report { format } => {
            let rows = syncer.report(no_cache)?;
            match format {
                ReportFormat::Table => println!("{}", render_table(&rows)),
                ReportFormat::Csv => {
                    let path = syncer.write_csv_report(&rows)?;
                    println!("CSV report saved to: {}", path.display());
                }
            }
        }
    }
    Ok(())
}
