use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use living_timeline::config::Config;
use living_timeline::middleware::RateLimit;
use std::path::Path;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Configuration problems are fatal before any connection is attempted.
    let config = Config::from_env().expect("Configuration is incomplete.");

    let db = living_timeline::db::connect(&config.database_url)
        .await
        .expect("Database connection was not established.");

    // The server must not come up against a schema we cannot guarantee is current.
    living_timeline::migrate::run_migrations(&db, Path::new("migrations"))
        .await
        .expect("Migrations failed.");

    let db = Data::new(db);
    let rate_limit = RateLimit::new(config.rate_limit_requests, config.rate_limit_window_minutes);
    let origins = config.allowed_origins.clone();

    log::info!("Starting server on port {}", config.port);

    HttpServer::new(move || {
        // Middleware executes in reverse registration order: Logger, CORS, RateLimit.
        App::new()
            .app_data(db.clone())
            .wrap(rate_limit.clone())
            .wrap(living_timeline::web::cors_policy(&origins))
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(living_timeline::web::configure)
    })
    .shutdown_timeout(30)
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
