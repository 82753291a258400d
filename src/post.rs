use crate::identity::PostIdentity;
use crate::orm::posts;
use crate::web;
use actix_web::web::{Data, Json, Query};
use actix_web::{get, post, Error, HttpResponse};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::Deserialize;

pub const EVENT_NAME_MAX: usize = 200;
pub const CONTENT_MAX: usize = 5000;
pub const LOCATION_MAX: usize = 200;
pub const GENDER_MAX: usize = 20;
pub const AGE_MIN: i32 = 1;
pub const AGE_MAX: i32 = 120;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug, Deserialize)]
pub struct NewPostData {
    pub event_name: String,
    pub content: String,
    pub age: i32,
    #[serde(default)]
    pub gender: Option<String>,
    pub location: String,
}

/// Paging values stay raw strings so an unparseable value falls back to the
/// default instead of failing the extractor before the handler runs.
#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub event: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[post("/posts")]
pub async fn create_post(
    db: Data<DatabaseConnection>,
    identity: PostIdentity,
    data: Json<NewPostData>,
) -> Result<HttpResponse, Error> {
    let data = match validate_new_post(data.into_inner()) {
        Ok(data) => data,
        Err(message) => return Ok(web::error::bad_request(&message)),
    };

    match insert_post(&db, data, identity.as_str()).await {
        Ok(model) => Ok(HttpResponse::Created().json(model)),
        Err(err) => {
            log::error!("failed to create post: {}", err);
            Ok(web::error::internal_error("Failed to create post"))
        }
    }
}

#[get("/posts")]
pub async fn view_posts(
    db: Data<DatabaseConnection>,
    query: Query<PostsQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let event = query
        .event
        .as_deref()
        .map(str::trim)
        .filter(|event| !event.is_empty());

    let limit = clamp_limit(query.limit.as_deref());
    let offset = clamp_offset(query.offset.as_deref());

    match get_posts(&db, event, limit, offset).await {
        // Always a JSON array; an empty table serializes as [].
        Ok(posts) => Ok(HttpResponse::Ok().json(posts)),
        Err(err) => {
            log::error!("failed to query posts: {}", err);
            Ok(web::error::internal_error("Failed to retrieve posts"))
        }
    }
}

/// Trims free-text fields and enforces presence and length bounds.
pub fn validate_new_post(mut data: NewPostData) -> Result<NewPostData, String> {
    data.event_name = data.event_name.trim().to_owned();
    data.content = data.content.trim().to_owned();
    data.location = data.location.trim().to_owned();
    data.gender = data
        .gender
        .map(|gender| gender.trim().to_owned())
        .filter(|gender| !gender.is_empty());

    if data.event_name.is_empty() {
        return Err("event_name is required".to_owned());
    }
    if data.event_name.len() > EVENT_NAME_MAX {
        return Err(format!(
            "event_name must be {} characters or less",
            EVENT_NAME_MAX
        ));
    }
    if data.content.is_empty() {
        return Err("content is required".to_owned());
    }
    if data.content.len() > CONTENT_MAX {
        return Err(format!("content must be {} characters or less", CONTENT_MAX));
    }
    if data.age < AGE_MIN || data.age > AGE_MAX {
        return Err(format!("age must be between {} and {}", AGE_MIN, AGE_MAX));
    }
    if data.location.is_empty() {
        return Err("location is required".to_owned());
    }
    if data.location.len() > LOCATION_MAX {
        return Err(format!(
            "location must be {} characters or less",
            LOCATION_MAX
        ));
    }
    if let Some(gender) = &data.gender {
        if gender.len() > GENDER_MAX {
            return Err(format!("gender must be {} characters or less", GENDER_MAX));
        }
    }

    Ok(data)
}

pub fn clamp_limit(limit: Option<&str>) -> u64 {
    match limit.and_then(|raw| raw.trim().parse::<i64>().ok()) {
        Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n as u64,
        _ => DEFAULT_PAGE_SIZE as u64,
    }
}

pub fn clamp_offset(offset: Option<&str>) -> u64 {
    match offset.and_then(|raw| raw.trim().parse::<i64>().ok()) {
        Some(n) if n >= 0 => n as u64,
        _ => 0,
    }
}

pub async fn insert_post(
    db: &DatabaseConnection,
    data: NewPostData,
    ip_hash: &str,
) -> Result<posts::Model, DbErr> {
    posts::ActiveModel {
        event_name: Set(data.event_name),
        content: Set(data.content),
        age: Set(data.age),
        gender: Set(data.gender),
        location: Set(data.location),
        ip_hash: Set(ip_hash.to_owned()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Newest posts first, optionally filtered to one event.
pub async fn get_posts(
    db: &DatabaseConnection,
    event: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<Vec<posts::Model>, DbErr> {
    let mut select = posts::Entity::find();
    if let Some(event) = event {
        select = select.filter(posts::Column::EventName.eq(event));
    }

    select
        .order_by_desc(posts::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}

/// Posts recorded for this identity strictly inside the trailing window.
///
/// The cutoff is recomputed from "now" on every call, so the window slides
/// continuously instead of resetting at fixed boundaries.
pub async fn count_recent_by_ip(
    db: &DatabaseConnection,
    ip_hash: &str,
    window_minutes: i64,
) -> Result<usize, DbErr> {
    let cutoff = window_cutoff(window_minutes);

    posts::Entity::find()
        .filter(posts::Column::IpHash.eq(ip_hash))
        .filter(posts::Column::CreatedAt.gt(cutoff))
        .count(db)
        .await
}

/// Start of the trailing window, as an absolute instant.
pub fn window_cutoff(window_minutes: i64) -> DateTime<FixedOffset> {
    (Utc::now() - Duration::minutes(window_minutes)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_post() -> NewPostData {
        NewPostData {
            event_name: "Reunion".to_owned(),
            content: "Hello".to_owned(),
            age: 30,
            gender: None,
            location: "Chicago".to_owned(),
        }
    }

    #[test]
    fn a_valid_post_passes() {
        assert!(validate_new_post(valid_post()).is_ok());
    }

    #[test]
    fn age_bounds_are_inclusive() {
        for age in [1, 120] {
            let mut data = valid_post();
            data.age = age;
            assert!(validate_new_post(data).is_ok(), "age {} should pass", age);
        }
        for age in [0, 121] {
            let mut data = valid_post();
            data.age = age;
            assert!(validate_new_post(data).is_err(), "age {} should fail", age);
        }
    }

    #[test]
    fn content_length_boundary() {
        let mut data = valid_post();
        data.content = "x".repeat(CONTENT_MAX);
        assert!(validate_new_post(data).is_ok());

        let mut data = valid_post();
        data.content = "x".repeat(CONTENT_MAX + 1);
        assert!(validate_new_post(data).is_err());
    }

    #[test]
    fn required_fields_must_not_be_blank() {
        for field in ["event_name", "content", "location"] {
            let mut data = valid_post();
            match field {
                "event_name" => data.event_name = "   ".to_owned(),
                "content" => data.content = "".to_owned(),
                _ => data.location = " ".to_owned(),
            }
            let err = validate_new_post(data).unwrap_err();
            assert!(err.contains(field), "{} missing from error: {}", field, err);
        }
    }

    #[test]
    fn blank_gender_is_normalized_to_none() {
        let mut data = valid_post();
        data.gender = Some("  ".to_owned());
        assert_eq!(validate_new_post(data).unwrap().gender, None);

        let mut data = valid_post();
        data.gender = Some("x".repeat(GENDER_MAX + 1));
        assert!(validate_new_post(data).is_err());
    }

    #[test]
    fn limit_is_clamped_into_range_with_default() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some("0")), 50);
        assert_eq!(clamp_limit(Some("101")), 50);
        assert_eq!(clamp_limit(Some("-3")), 50);
        assert_eq!(clamp_limit(Some("100")), 100);
        assert_eq!(clamp_limit(Some("1")), 1);
    }

    #[test]
    fn offset_is_clamped_to_zero_or_more() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some("-1")), 0);
        assert_eq!(clamp_offset(Some("20")), 20);
    }

    #[test]
    fn unparseable_paging_values_fall_back_to_defaults() {
        assert_eq!(clamp_limit(Some("abc")), 50);
        assert_eq!(clamp_limit(Some("")), 50);
        assert_eq!(clamp_offset(Some("abc")), 0);
    }

    #[actix_rt::test]
    async fn non_numeric_paging_still_reaches_the_handler() {
        use actix_web::http::StatusCode;
        use actix_web::{test, App};

        async fn echo_paging(query: Query<PostsQuery>) -> HttpResponse {
            let query = query.into_inner();
            HttpResponse::Ok().body(format!(
                "{} {}",
                clamp_limit(query.limit.as_deref()),
                clamp_offset(query.offset.as_deref())
            ))
        }

        let app = test::init_service(
            App::new().route("/posts", actix_web::web::get().to(echo_paging)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/posts?limit=abc&offset=-5")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            test::read_body(res).await,
            actix_web::web::Bytes::from_static(b"50 0")
        );
    }

    #[test]
    fn window_cutoff_trails_now_by_the_window() {
        let cutoff = window_cutoff(60);
        let lag = Utc::now().signed_duration_since(cutoff);
        assert!(lag >= Duration::minutes(60));
        assert!(lag < Duration::minutes(60) + Duration::seconds(5));
    }

    #[actix_rt::test]
    async fn recent_count_comes_from_the_store() {
        use sea_orm::{DatabaseBackend, MockDatabase, Value};
        use std::collections::BTreeMap;

        let mut row = BTreeMap::new();
        row.insert("num_items", Value::BigInt(Some(6)));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![row]])
            .into_connection();

        assert_eq!(count_recent_by_ip(&db, "digest", 60).await.unwrap(), 6);
    }
}
