use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[get("/health")]
pub async fn index() -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(Response {
        status: "ok",
        version: VERSION,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response<'a> {
    pub status: &'a str,
    pub version: Option<&'a str>,
}
