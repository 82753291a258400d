pub mod error;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web::JsonConfig;

/// Configures the web app.
///
/// The route table is a fixed set of (path, method) services; method dispatch
/// never happens inside a handler.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.app_data(json_config())
        .service(crate::post::create_post)
        .service(crate::post::view_posts)
        .service(crate::event::view_events)
        .service(crate::status::view_health);
}

/// Cross-origin policy for the configured front-end hosts.
///
/// Requests without an Origin header are not CORS requests and pass untouched.
pub fn cors_policy(origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
        ])
        .max_age(300);

    if origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Malformed JSON bodies become the same structured 400 the validators produce.
fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _req| {
        let response = error::bad_request("Invalid request body");
        actix_web::error::InternalError::from_response(err, response).into()
    })
}
