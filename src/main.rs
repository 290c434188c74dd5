use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use company_directory::api::middleware::SecurityConfig;
use company_directory::{api, curation, db, import};

#[derive(Parser)]
#[command(name = "company-directory")]
#[command(about = "Company directory and curated-list server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the directory server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Import companies from a JSON document
    Import {
        /// Path to the JSON file (an array of company rows)
        file: PathBuf,
    },
    /// Create an actor and print its bearer token
    AddActor {
        name: String,
        /// Grant the general manage capability
        #[arg(long)]
        manager: bool,
        /// Grant edit permission on every record
        #[arg(long)]
        edit_all: bool,
    },
    /// Grant an actor edit permission on one record
    Grant { actor_id: i64, record_id: i64 },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "company_directory=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        Some(Commands::Import { file }) => {
            let db = db::Database::open_default()?;
            db.migrate()?;

            let imported = import::import_file(&db, &file)?;
            println!("Imported {imported} companies");
        }
        Some(Commands::AddActor {
            name,
            manager,
            edit_all,
        }) => {
            let db = db::Database::open_default()?;
            db.migrate()?;

            let (actor, token) = db.create_actor(&name, manager, edit_all)?;
            println!("Actor '{}' created with id {}", actor.name, actor.id);
            println!("Bearer token: {token}");
        }
        Some(Commands::Grant {
            actor_id,
            record_id,
        }) => {
            let db = db::Database::open_default()?;
            db.migrate()?;

            db.grant_edit(actor_id, record_id)?;
            println!("Actor {actor_id} may now edit record {record_id}");
        }
        None => serve(3000).await?,
    }

    Ok(())
}

async fn serve(port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting company directory server on port {}", port);

    let db = db::Database::open_default()?;
    db.migrate()?;
    curation::bootstrap_default_list(&db)?;

    let app = api::create_router(db, SecurityConfig::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(
        "Company directory server listening on http://127.0.0.1:{}",
        port
    );

    axum::serve(listener, app).await?;
    Ok(())
}
