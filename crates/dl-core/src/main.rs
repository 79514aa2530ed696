use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use dl_backend::{OracleClient, OracleError};
use dl_core::aggregate::{load_claims, summarize, DataError};
use dl_core::cli::{Cli, Command};
use dl_core::config::Config;
use dl_core::export::{
    export_reply, export_report, export_workbook, portfolio_report, ExportError,
};
use dl_core::session::{drive, OracleSession, SessionError, TurnOutcome};
use dl_protocol::ChatRequest;
use dl_report::{PageGeometry, Theme};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Settings after command-line overrides.
struct Resolved {
    config: Config,
    theme: Theme,
    geometry: PageGeometry,
    out_dir: PathBuf,
    today: NaiveDate,
}

fn init_tracing() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

fn resolve(cli: &Cli, mut config: Config) -> Resolved {
    if let Some(theme) = &cli.theme {
        config.report.theme = theme.clone();
    }
    if let Some(page) = &cli.page {
        config.report.page = page.clone();
    }
    let out_dir = cli
        .out
        .clone()
        .unwrap_or_else(|| config.report.resolve_output_dir());
    Resolved {
        theme: config.report.theme(),
        geometry: config.report.geometry(),
        out_dir,
        today: Local::now().date_naive(),
        config,
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let resolved = resolve(&cli, Config::load_or_default());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    match runtime.block_on(run(cli.command, &resolved)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

async fn run(command: Command, resolved: &Resolved) -> Result<i32, AppError> {
    match command {
        Command::Ask {
            question,
            claims,
            export,
        } => {
            let mut session = load_session(&claims, resolved)?;
            let request = session.begin_turn(&question)?;
            converse(&mut session, request, export, resolved).await
        }
        Command::Quick {
            action,
            claims,
            export,
        } => {
            let mut session = load_session(&claims, resolved)?;
            let request = session.quick_action(action)?;
            converse(&mut session, request, export, resolved).await
        }
        Command::Export { input } => {
            let text = read_input(&input)?;
            let path = export_reply(
                &text,
                &resolved.theme,
                &resolved.geometry,
                &resolved.out_dir,
                resolved.today,
            )?;
            println!("{}", path.display());
            Ok(0)
        }
        Command::Portfolio { claims } => {
            let records = load_claims(&claims)?;
            let snapshot = summarize(&records, resolved.config.oracle.sample_rows);
            let report = portfolio_report(&snapshot, resolved.today);
            let path = export_report(
                &report,
                &resolved.theme,
                &resolved.geometry,
                &resolved.out_dir,
                resolved.today,
            )?;
            println!("{}", path.display());
            Ok(0)
        }
        Command::Workbook { claims } => {
            let records = load_claims(&claims)?;
            let snapshot = summarize(&records, resolved.config.oracle.sample_rows);
            let path = export_workbook(
                &snapshot,
                &resolved.theme,
                &resolved.out_dir,
                resolved.today,
            )?;
            println!("{}", path.display());
            Ok(0)
        }
    }
}

fn load_session(claims: &Path, resolved: &Resolved) -> Result<OracleSession, AppError> {
    let records = load_claims(claims)?;
    let mut session = OracleSession::new().with_model(resolved.config.oracle.model.clone());
    session.set_snapshot(summarize(&records, resolved.config.oracle.sample_rows));
    Ok(session)
}

/// Stream one turn to stdout. Ctrl-C abandons the turn.
async fn converse(
    session: &mut OracleSession,
    request: ChatRequest,
    export: bool,
    resolved: &Resolved,
) -> Result<i32, AppError> {
    let oracle = &resolved.config.oracle;
    let api_key = oracle.resolve_api_key()?;
    let client = OracleClient::with_options(&oracle.endpoint, api_key, &oracle.options())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            on_interrupt.cancel();
        }
    });

    let mut stdout = io::stdout();
    let outcome = drive(session, client.send(&request), &cancel, |text| {
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    })
    .await;
    watcher.abort();
    println!();

    match outcome {
        TurnOutcome::Completed => {
            if export {
                if let Some(reply) = session.last_reply() {
                    let path = export_reply(
                        reply,
                        &resolved.theme,
                        &resolved.geometry,
                        &resolved.out_dir,
                        resolved.today,
                    )?;
                    eprintln!("saved {}", path.display());
                }
            }
            Ok(0)
        }
        TurnOutcome::Failed(message) => {
            eprintln!("error: {message}");
            Ok(EXIT_FAILURE)
        }
        TurnOutcome::Cancelled => {
            eprintln!("cancelled");
            Ok(EXIT_CANCELLED)
        }
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}
