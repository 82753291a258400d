use crate::identity::PostIdentity;
use crate::web;
use actix_utils::future::{ok, Ready};
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::Method;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage};
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use sea_orm::DatabaseConnection;
use std::rc::Rc;

/// Sliding-window rate limit gate over the write path.
///
/// Holds no counters of its own; every check is a fresh count against the
/// database, so any number of service instances sharing that database agree
/// on the same window.
#[derive(Clone, Debug)]
pub struct RateLimit {
    limit: usize,
    window_minutes: i64,
}

impl RateLimit {
    pub fn new(limit: usize, window_minutes: i64) -> Self {
        Self {
            limit,
            window_minutes,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitMiddleware {
            service: Rc::new(service),
            limit: self.limit,
            window_minutes: self.window_minutes,
        })
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limit: usize,
    window_minutes: i64,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limit = self.limit;
        let window_minutes = self.window_minutes;

        async move {
            // Only writes are gated. Reads and preflights always pass.
            if req.method() != Method::POST {
                return service.call(req).await.map(|res| res.map_into_left_body());
            }

            let db = match req.app_data::<Data<DatabaseConnection>>() {
                Some(db) => db.clone(),
                None => {
                    log::error!("rate limit: no DatabaseConnection in app data");
                    return Ok(req
                        .into_response(web::error::internal_error("Internal server error"))
                        .map_into_right_body());
                }
            };

            let identity = PostIdentity::from_http_request(req.request());

            match crate::post::count_recent_by_ip(&db, identity.as_str(), window_minutes).await {
                // Fail closed. Under storage failure, shielding the store from
                // a flood outranks availability of the write path.
                Err(err) => {
                    log::error!("rate limit count query failed: {}", err);
                    Ok(req
                        .into_response(web::error::internal_error("Internal server error"))
                        .map_into_right_body())
                }
                Ok(count) if count >= limit => Ok(req
                    .into_response(web::error::too_many_requests(limit, window_minutes))
                    .map_into_right_body()),
                Ok(_) => {
                    // Hand the checked identity to the write handler so the
                    // identity recorded matches the identity counted.
                    req.extensions_mut().insert(identity);
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
            }
        }
        .boxed_local()
    }
}
