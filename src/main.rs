//! scorm2lfa - IMS content package to LFA book migrator

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use scorm2lfa::{HttpFetcher, MigrateConfig, Migration, PackageConfig, PageSource, RetryPolicy};

#[derive(Parser)]
#[command(name = "scorm2lfa")]
#[command(version, about = "Migrate IMS content packages into LFA books", long_about = None)]
#[command(after_help = "EXAMPLES:
    scorm2lfa course/ book/           Convert the package in course/ into book/
    scorm2lfa -l course/              List the table of contents
    scorm2lfa --retries 0 course/ book/
                                      Fail pages on the first network error")]
struct Cli {
    /// Directory containing imsmanifest.xml
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Directory to write the book into
    #[arg(value_name = "DESTINATION", required_unless_present = "list")]
    destination: Option<PathBuf>,

    /// List the table of contents without converting
    #[arg(short, long)]
    list: bool,

    /// Retries after a connection reset or timeout
    #[arg(long, value_name = "N", default_value_t = scorm2lfa::fetch::DEFAULT_MAX_RETRIES)]
    retries: u32,

    /// Delay between retries, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    backoff_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Package name prefix in .lfa/package.json
    #[arg(long, value_name = "PREFIX", default_value = "scorm")]
    name_prefix: String,

    /// Only show warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show every processing step
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> MigrateConfig {
        MigrateConfig {
            retry: RetryPolicy {
                max_retries: self.retries,
                backoff: Duration::from_millis(self.backoff_ms),
            },
            timeout: Duration::from_secs(self.timeout_secs),
            package: PackageConfig {
                name_prefix: self.name_prefix.clone(),
                ..PackageConfig::default()
            },
        }
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    let result = match &cli.destination {
        Some(destination) if !cli.list => convert(&cli, destination),
        _ => list(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn list(cli: &Cli) -> scorm2lfa::Result<()> {
    let migration = Migration::load(&cli.source, cli.destination.as_deref().unwrap_or(&cli.source))?;

    println!("Title: {}", migration.title());
    for entry in migration.entries() {
        let indent = "  ".repeat(entry.chapter_code.depth().saturating_sub(1));
        let title = entry.title.as_deref().unwrap_or("(untitled)");
        let source = match &entry.source {
            PageSource::Url(url) => url.as_str(),
            PageSource::NoContent => "(no content)",
            PageSource::Unknown => "(unknown page type)",
        };
        println!("{indent}{} {title}  {source}", entry.chapter_code);
    }
    println!("Entries: {}", migration.entries().len());

    Ok(())
}

fn convert(cli: &Cli, destination: &Path) -> scorm2lfa::Result<()> {
    let migration = Migration::load(&cli.source, destination)?;
    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let fetcher = HttpFetcher::new(config.timeout)?;
        migration.run(&fetcher, &config).await
    })?;

    Ok(())
}
