pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
mod test_support;

use std::fmt::Display;
use std::future::Future;

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::order_service::OrderService;
use crate::infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Order service as wired for HTTP: backed by the Diesel repository.
pub type AppOrderService = OrderService<DieselOrderRepository>;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::list_user_orders,
        handlers::admin_orders::delete_order,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::CreateOrderItemRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
    )),
    tags(
        (name = "orders", description = "Order creation and queries"),
        (name = "admin", description = "Administrative order operations"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(OrderService::new(DieselOrderRepository::new(pool)));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route(
                        "/user/{user_id}",
                        web::get().to(handlers::orders::list_user_orders),
                    )
                    .route("/{id}", web::get().to(handlers::orders::get_order)),
            )
            .service(web::scope("/admin/orders").route(
                "/{id}",
                web::delete().to(handlers::admin_orders::delete_order),
            ))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

/// Awaits a background worker and logs how it ended the moment it ends, so a
/// worker that fails at startup does not go unnoticed while the server runs.
/// Returns whether it stopped cleanly.
pub async fn log_worker_exit<F, E>(worker: &str, run: F) -> bool
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match run.await {
        Ok(()) => {
            info!("{} stopped", worker);
            true
        }
        Err(e) => {
            error!("{} stopped with error: {}", worker, e);
            false
        }
    }
}
