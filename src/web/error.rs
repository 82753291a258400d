use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct RateLimitBody {
    error: String,
    limit: usize,
    window_minutes: i64,
}

pub fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorBody { error: message })
}

/// Caller-facing message only; operational detail belongs in the log.
pub fn internal_error(message: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorBody { error: message })
}

pub fn too_many_requests(limit: usize, window_minutes: i64) -> HttpResponse {
    HttpResponse::TooManyRequests().json(RateLimitBody {
        error: format!(
            "Rate limit exceeded. Maximum {} posts per {} minutes.",
            limit, window_minutes
        ),
        limit,
        window_minutes,
    })
}
