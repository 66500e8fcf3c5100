use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use mongodb::Client;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use splitsettle::config::Config;
use splitsettle::routes;
use splitsettle::settlement::SettlementResolver;
use splitsettle::store::{LedgerStore, MemoryStore, MongoStore};

fn cors(origins: &[String]) -> Cors {
    let cors = if origins.iter().any(|origin| origin == "*") {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config =
        Config::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let store: Arc<dyn LedgerStore> = match &config.mongodb_uri {
        Some(uri) => {
            let client = Client::with_uri_str(uri)
                .await
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            tracing::info!(database = %config.database_name, "connected to MongoDB");
            Arc::new(MongoStore::new(&client, &config.database_name))
        }
        None => {
            tracing::warn!("MONGODB_URI not set, keeping groups in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let store = web::Data::from(store);
    let resolver = web::Data::new(SettlementResolver::new(config.settlement_tolerance));

    tracing::info!(host = %config.host, port = config.port, "starting server");
    let origins = config.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .app_data(store.clone())
            .app_data(resolver.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
