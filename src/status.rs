use actix_web::{get, HttpResponse, Responder};

/// Liveness probe. Answers as long as the process is up; it deliberately does
/// not touch the database.
#[get("/health")]
pub async fn view_health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
