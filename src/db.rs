use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Opens a bounded connection pool against the database URL.
///
/// The pool is the only shared mutable resource in the process. It is handed to
/// the web server through `actix_web::web::Data` rather than a static so tests
/// can substitute their own connection.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(30 * 60))
        .sqlx_logging(true);

    Database::connect(opt).await
}
