use actix_utils::future::{ok, Ready};
use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};

/// Fixed salt appended to the caller address before hashing so stored digests
/// cannot be reversed into raw addresses by simple enumeration.
const IP_SALT: &str = "living-timeline-salt";

/// Anonymous rate-limit identity for one request.
///
/// The rate limiter computes this once per gated request and stashes it in the
/// request extensions; the write handler pulls the same value back out through
/// `FromRequest` so the identity checked is the identity recorded.
#[derive(Clone, Debug)]
pub struct PostIdentity(String);

impl PostIdentity {
    pub fn from_http_request(req: &HttpRequest) -> Self {
        Self(addr_digest(&client_addr(req)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for PostIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = match req.extensions().get::<PostIdentity>() {
            Some(identity) => identity.clone(),
            None => PostIdentity::from_http_request(req),
        };
        ok(identity)
    }
}

/// Best-effort client address: first X-Forwarded-For entry, then X-Real-IP,
/// then the transport peer address with the port stripped.
pub fn client_addr(req: &HttpRequest) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// One-way salted digest of a client address, hex encoded.
pub fn addr_digest(addr: &str) -> String {
    blake3::hash(format!("{}{}", addr, IP_SALT).as_bytes())
        .to_hex()
        .to_string()
}
