use anyhow::Result;
use clap::Parser;
use classgrab_capture::{CaptureEngine, CaptureSettings, RunOutcome, TokioTicker};
use classgrab_common::observability::{LogConfig, init_logging};
use classgrab_common::{CaptureError, PROGRESS_TARGET};
use classgrab_config::{ClassgrabConfig, ClassgrabConfigLoader};
use classgrab_convert::{ConvertError, Converter, StartDate, launcher_dir};
use classgrab_drivers::WebDriverConnector;
use cli::{Cli, Command};
use std::io::BufRead;
use std::process::ExitCode;
use tracing::{error, info, warn};
mod cli;

const BROWSER_HINT: &str = "Install Microsoft Edge, Google Chrome or Mozilla Firefox together with its \
WebDriver (msedgedriver, chromedriver or geckodriver) on PATH, then run classgrab again.";

// Single run thread; the only suspension point is the poll sleep.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1) Load config (env wins over file)
    let cfg = match ClassgrabConfigLoader::new()
        .discover(cli.config.as_deref())
        .load()
    {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return fail(cli.no_pause);
        }
    };

    match init_logging(log_config(&cfg)) {
        Ok(init) => {
            if let Some(err) = init.file_error {
                warn!(
                    target: "classgrab::app",
                    error = %format!("{err:#}"),
                    "log file unavailable; logging to the console only"
                );
            }
        }
        Err(err) => eprintln!("Logging disabled: {err:#}"),
    }

    let result = match cli.command.unwrap_or(Command::Capture) {
        Command::Capture => capture(&cfg).await,
        Command::Convert { date } => convert(&cfg, &date).await,
        Command::Config => print_config(&cfg),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: "classgrab::app", error = %format!("{err:#}"), "run failed");
            eprintln!("\nError: {err:#}");
            if matches!(
                err.downcast_ref::<CaptureError>(),
                Some(CaptureError::DriverUnavailable { .. })
            ) {
                eprintln!("{BROWSER_HINT}");
            }
            fail(cli.no_pause)
        }
    }
}

fn log_config(cfg: &ClassgrabConfig) -> LogConfig {
    LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    }
}

async fn capture(cfg: &ClassgrabConfig) -> Result<()> {
    let mut engine = CaptureEngine::new(
        CaptureSettings::from_config(cfg),
        WebDriverConnector,
        TokioTicker,
    );
    match engine.run().await? {
        RunOutcome::Captured(report) => {
            info!(
                target: "classgrab::app",
                run_id = %engine.run_id(),
                path = %report.path.display(),
                "capture finished"
            );
        }
        RunOutcome::BrowserClosed => {
            info!(target: PROGRESS_TARGET, "Nothing was captured.");
        }
    }
    Ok(())
}

async fn convert(cfg: &ClassgrabConfig, date: &str) -> Result<()> {
    let date: StartDate = date.parse()?;
    if !date.is_sunday() {
        info!(target: PROGRESS_TARGET, "Note: {date} is not a Sunday.");
    }

    let working_dir = std::env::current_dir()?;
    let converter = Converter::from_config(
        &cfg.converter,
        &cfg.capture.artifact,
        &launcher_dir(),
        &working_dir,
    );

    info!(target: PROGRESS_TARGET, "Parsing the timetable and generating the calendar...");
    match converter.convert(&date).await {
        Ok(outcome) => {
            info!(
                target: PROGRESS_TARGET,
                "Calendar written to {}. Import it into your calendar app.",
                outcome.calendar.display()
            );
            Ok(())
        }
        Err(ConvertError::Failed { status, message }) => {
            // The converter's own diagnostics are shown as-is.
            eprint!("{message}");
            Err(anyhow::anyhow!("converter exited with {status}"))
        }
        Err(err) => Err(err.into()),
    }
}

fn print_config(cfg: &ClassgrabConfig) -> Result<()> {
    print!("{}", cfg.to_yaml()?);
    Ok(())
}

fn fail(no_pause: bool) -> ExitCode {
    if !no_pause {
        println!("Press Enter to exit...");
        let _ = std::io::stdin().lock().read_line(&mut String::new());
    }
    ExitCode::FAILURE
}
