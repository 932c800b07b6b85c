mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod test_utils;

use std::io;
use std::path::PathBuf;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::ingredient_service::IngredientService;
use crate::services::user_service::UserService;

#[derive(Parser)]
#[command(name = "foodgram-backend", about = "Foodgram REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Démarre le serveur HTTP (par défaut)
    Serve,
    /// Charge les ingrédients depuis un fichier JSON [{name, measurement_unit}]
    LoadIngredients { path: PathBuf },
}

fn to_io<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> io::Error + '_ {
    move |e| io::Error::other(format!("{context}: {e}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().map_err(to_io("Invalid configuration"))?;

    info!("Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(to_io("Failed to connect to database"))?;
    db::create_schema(&db)
        .await
        .map_err(to_io("Failed to create schema"))?;
    info!("Database connected");

    let purged = UserService::purge_revoked_tokens(&db)
        .await
        .map_err(to_io("Failed to purge revoked tokens"))?;
    if purged > 0 {
        info!(purged, "expired revoked tokens removed");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::LoadIngredients { path } => {
            let inserted = IngredientService::load_fixture(&db, &path)
                .await
                .map_err(to_io("Failed to load ingredients"))?;
            info!(inserted, path = %path.display(), "fixture loaded");
            Ok(())
        }
        Command::Serve => {
            tokio::fs::create_dir_all(&config.media_root).await?;

            let bind_addr = config.bind_addr.clone();
            info!("Starting server on http://{}", bind_addr);

            let db = web::Data::new(db);
            let config = web::Data::new(config);

            HttpServer::new(move || {
                App::new()
                    .wrap(Logger::default())
                    .app_data(db.clone())
                    .app_data(config.clone())
                    .configure(routes::configure_routes)
            })
            .bind(bind_addr)?
            .run()
            .await
        }
    }
}
