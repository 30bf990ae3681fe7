use anyhow::Result;
use clap::Parser;
use po_loader::{Cli, Command, PersistSettings, RunSettings, run, setup_logging, write_report};
use tracing::{error, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_format)?;

    let store = cli.store();
    let busy_timeout = cli.busy_timeout();
    match cli.command {
        Command::Init => store.init_schema()?,
        Command::Seed { buyers, products } => {
            let report = store.seed_from_files(&buyers, &products)?;
            for line in &report.unprocessable {
                warn!(%line, "unprocessable reference row skipped");
            }
        }
        Command::Process {
            input,
            chunk_size,
            max_in_flight,
            dry_run,
        } => {
            let settings = RunSettings {
                database: cli.database,
                busy_timeout,
                input,
                persist: PersistSettings {
                    chunk_size,
                    max_in_flight,
                },
                dry_run,
            };
            let summary = run(&settings)?;

            write_report(&summary.result, std::io::stdout().lock())?;

            if let Some(report) = summary.persisted {
                for failure in report.failures() {
                    if let Some(err) = &failure.error {
                        error!(chunk = failure.index, rows = failure.rows, "{err}");
                    }
                }
                report.into_result()?;
            }
        }
    }

    Ok(())
}
