#[cfg(feature = "server")]
use actix_cors::Cors;
#[cfg(feature = "server")]
use actix_web::{App, HttpServer, middleware, web};

#[cfg(feature = "server")]
use crate::db::establish_connection_pool;
#[cfg(feature = "server")]
use crate::models::config::ServerConfig;
#[cfg(feature = "server")]
use crate::repository::DieselRepository;
#[cfg(feature = "server")]
use crate::routes::api::{api_v1_search_clients, api_v1_search_managers};
#[cfg(feature = "server")]
use crate::search::cursor::HmacCursorSigner;
#[cfg(feature = "server")]
use crate::services::search::{PageBounds, SearchCatalog};

pub mod db;
pub mod domain;
pub mod dto;
pub mod models;
pub mod repository;
#[cfg(feature = "server")]
pub mod routes;
pub mod schema;
pub mod search;
pub mod services;

/// Builds and runs the Actix-Web HTTP server using the provided configuration.
#[cfg(feature = "server")]
pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
    // Cursors cannot be issued without a secret.
    let signer = HmacCursorSigner::new(&server_config.cursor_secret)
        .map_err(|e| std::io::Error::other(format!("Invalid cursor secret: {e}")))?;

    let catalog = SearchCatalog::new()
        .map_err(|e| std::io::Error::other(format!("Invalid search options: {e}")))?;

    // Establish Diesel connection pool for the SQLite database.
    let pool = establish_connection_pool(&server_config.database_url).map_err(|e| {
        std::io::Error::other(format!("Failed to establish database connection: {e}"))
    })?;

    let repo = DieselRepository::new(pool);
    let bounds = PageBounds::from(&server_config);

    let signer = web::Data::new(signer);
    let catalog = web::Data::new(catalog);

    let bind_address = (server_config.address.clone(), server_config.port);
    log::info!(
        "Starting server on {}:{} (page size {}, max {})",
        bind_address.0,
        bind_address.1,
        bounds.default_page_size,
        bounds.max_page_size
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .app_data(routes::json_config())
            .service(
                web::scope("/api")
                    .service(api_v1_search_clients)
                    .service(api_v1_search_managers),
            )
            .app_data(web::Data::new(repo.clone()))
            .app_data(signer.clone())
            .app_data(catalog.clone())
            .app_data(web::Data::new(bounds))
    })
    .bind(bind_address)?
    .run()
    .await
}
