use anyhow::Context;
use clap::{Parser, Subcommand};
use migration::Migrator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Operator tool for the beacon schema.
#[derive(Parser, Debug)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every pending migration (default)
    Up,
    /// List registered migrations and when they were applied
    Status,
    /// Roll back the most recently applied migration
    Down,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let db = sea_orm::Database::connect(cli.database_url.as_str())
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => Migrator::run(&db).await?,
        Command::Status => {
            for status in Migrator::status(&db).await? {
                match status.applied_at {
                    Some(at) => println!("{:<32} applied {}", status.id, at.to_rfc3339()),
                    None => println!("{:<32} pending", status.id),
                }
            }
        }
        Command::Down => match Migrator::rollback_last(&db).await? {
            Some(id) => info!(migration = id, "Rollback complete"),
            None => info!("Nothing to roll back"),
        },
    }

    Ok(())
}
