use crate::orm::posts;
use crate::web;
use actix_web::web::Data;
use actix_web::{get, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

#[derive(Debug, FromQueryResult)]
struct EventName {
    event_name: String,
}

#[get("/events")]
pub async fn view_events(db: Data<DatabaseConnection>) -> Result<HttpResponse, Error> {
    match get_event_names(&db).await {
        Ok(events) => Ok(HttpResponse::Ok().json(events)),
        Err(err) => {
            log::error!("failed to query events: {}", err);
            Ok(web::error::internal_error("Failed to retrieve events"))
        }
    }
}

/// Distinct event names, most recently posted-to first.
pub async fn get_event_names(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    Ok(posts::Entity::find()
        .select_only()
        .column(posts::Column::EventName)
        .group_by(posts::Column::EventName)
        .order_by_desc(posts::Column::CreatedAt.max())
        .into_model::<EventName>()
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.event_name)
        .collect())
}
