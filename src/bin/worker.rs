use dotenvy::dotenv;
use sea_orm::{Database, DatabaseConnection};
use sponsorlink::jobs::run_funding_reconciliation;
use std::env;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load .env (if present) so DATABASE_URL from file is visible
    let _ = dotenv();

    // Command‑line flags
    let args: Vec<String> = env::args().collect();
    let run_once = args.iter().any(|a| a == "--reconcile-once");

    // Establish DB connection (if DATABASE_URL is set) — optional for local runs
    let db_conn: Option<DatabaseConnection> = match env::var("DATABASE_URL") {
        Ok(url) => match Database::connect(&url).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                error!(?e, "failed to connect to database");
                None
            }
        },
        Err(_) => {
            info!("DATABASE_URL not set; continuing without DB");
            None
        }
    };

    // Run reconciliation once if flag is set
    if run_once {
        if let Err(e) = run_funding_reconciliation(db_conn.as_ref()).await {
            error!(?e, "reconciliation job failed");
        }
        return;
    }

    info!("Worker starting; reconciling campaigns every 15 minutes");

    let mut ticker = interval(Duration::from_secs(15 * 60));
    loop {
        ticker.tick().await;
        info!("Running scheduled reconciliation...");

        if let Err(e) = run_funding_reconciliation(db_conn.as_ref()).await {
            error!(?e, "reconciliation job failed");
        }
        info!("Scheduled reconciliation finished.");
    }
}
