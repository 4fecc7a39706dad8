use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mexsync::catalog::HttpCatalogClient;
use mexsync::engine::{BatchFiles, Engine};
use mexsync::mapper::AvailabilityPolicy;
use mexsync::model::Session;
use mexsync::session::{self, SESSION_FILE, SessionStore};
use mexsync::{Result, SyncError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;

    let session_path = cli
        .session
        .clone()
        .unwrap_or_else(|| cli.dir.join(SESSION_FILE));
    let store = SessionStore::new(session_path);

    let session = match store.load()? {
        Some(session) => session,
        None => {
            println!("No stored session found. Please log in.\n");
            login_loop(&store)?
        }
    };

    let client = HttpCatalogClient::new(session)?;
    let engine = Engine::new(&client, BatchFiles::new(cli.dir)).with_policy(cli.policy.into());

    println!("\nChoose an operation:");
    println!("1. Export menu to list-product.csv");
    println!("2. Update products from list-product.csv");
    println!("3. Add products from list-upload-new.csv");
    println!("4. Reprice products from pos-export.csv");
    println!("5. Delete products from delete-product.csv\n");

    let choice = prompt("Enter a number: ")?;
    match choice.trim() {
        "1" => {
            let rows = engine.export()?;
            println!("Exported {rows} products.");
        }
        "2" => report(engine.update()?),
        "3" => report(engine.add()?),
        "4" => {
            let raw = prompt("Markup percent (e.g. 10 for +10%): ")?;
            let percent: i64 = raw
                .trim()
                .parse()
                .map_err(|_| SyncError::InvalidPercent(raw.trim().to_string()))?;
            report(engine.reprice(percent)?);
        }
        "5" => report(engine.delete()?),
        other => return Err(SyncError::InvalidChoice(other.to_string())),
    }

    Ok(())
}

/// Prompts for credentials until the portal accepts them. There is no
/// attempt limit; every failure prints its reason and asks again.
fn login_loop(store: &SessionStore) -> Result<Session> {
    loop {
        let username = prompt("Username: ")?;
        let password = prompt("Password: ")?;
        match session::login(username.trim(), password.trim()) {
            Ok(session) => {
                store.save(&session)?;
                return Ok(session);
            }
            Err(error) => {
                eprintln!("Login failed: {error}");
                println!("Please try again.\n");
            }
        }
    }
}

fn report(summary: mexsync::engine::BatchSummary) {
    println!(
        "Done: {} attempted, {} succeeded, {} failed, {} skipped.",
        summary.attempted, summary.succeeded, summary.failed, summary.skipped
    );
    if let Some(path) = summary.failure_file {
        println!("Failed rows written to {}.", path.display());
    }
}

fn prompt(question: &str) -> Result<String> {
    print!("{question}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| SyncError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Batch-synchronise a merchant menu with CSV files."
)]
struct Cli {
    /// Directory holding the CSV files and failure outputs.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Session file location. Defaults to merchant-session.json in --dir.
    #[arg(long)]
    session: Option<PathBuf>,

    /// How the update batch derives an item's availability status.
    #[arg(long, value_enum, default_value = "stock-override")]
    policy: PolicyArg,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    /// Zero parsed stock forces the out-of-stock status.
    StockOverride,
    /// The row's declared status is always used verbatim.
    Declared,
}

impl From<PolicyArg> for AvailabilityPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::StockOverride => AvailabilityPolicy::StockDrivenOverride,
            PolicyArg::Declared => AvailabilityPolicy::DeclaredStatus,
        }
    }
}
