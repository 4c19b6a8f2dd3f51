use actix_web::{delete, get, post, web, HttpRequest, Responder};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    types::{
        DeleteResponse, SubscriptionDelete, SubscriptionPrune,
        SubscriptionUpsert, UserQuery,
    },
};

#[post("/subscriptions")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    subscription: web::Json<SubscriptionUpsert>,
    req: HttpRequest,
) -> Result<impl Responder, Error> {
    let mut subscription = subscription.into_inner();

    if subscription.user_agent.is_none() {
        subscription.user_agent = match req.headers().get("user-agent") {
            Some(item) => item.to_str().ok().map(str::to_owned),
            None => None,
        };
    }

    subscription.validate()?;
    let row = state.store.upsert(&subscription).await?;

    Ok(web::Json(row))
}

#[get("/subscriptions")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
    query: web::Query<UserQuery>,
) -> Result<impl Responder, Error> {
    let user_id = query
        .user_id
        .to_owned()
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or_else(|| Error::MissingParams(String::from("user_id")))?;

    let rows = state.store.get_by_user(&user_id).await?;

    Ok(web::Json(rows))
}

#[delete("/subscriptions")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    body: web::Json<SubscriptionDelete>,
) -> Result<impl Responder, Error> {
    body.validate()?;

    let deleted = state
        .store
        .delete_by_endpoint(&body.user_id, &body.endpoint)
        .await?;

    Ok(web::Json(DeleteResponse { deleted }))
}

#[post("/subscriptions/prune")]
pub async fn prune_index(
    state: web::Data<AppState<State>>,
    body: web::Json<SubscriptionPrune>,
) -> Result<impl Responder, Error> {
    body.validate()?;

    if body.ids.is_empty() {
        return Ok(web::Json(DeleteResponse { deleted: 0 }));
    }

    let deleted = state.store.delete_by_ids(&body.user_id, &body.ids).await?;
    info!(user_id = %body.user_id, deleted, "Pruned subscriptions");

    Ok(web::Json(DeleteResponse { deleted }))
}
