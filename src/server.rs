use actix_cors::Cors;
use actix_web::{dev::Server, http::header, middleware, web, App, HttpServer};
use std::net::TcpListener;

use crate::{
    configuration::{AppState, State},
    controller::{health, subscription},
    error::Error,
};

/// Push endpoints and keys are short, but leave room for long endpoints.
const JSON_LIMIT: usize = 16 * 1024;

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;
    let listener = TcpListener::bind((host.as_str(), port))?;

    tracing::info!("Listening on {}:{}", host, port);

    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app, listener)?;
        server.await?;
        Ok(())
    })
    .await?
}

pub fn init_server(
    app_state: AppState<State>,
    listener: TcpListener,
) -> Result<Server, Error> {
    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
            .allowed_header(header::CONTENT_TYPE);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT))
            .service(
                web::scope("/api")
                    .service(health::index)
                    .service(subscription::get_index)
                    .service(subscription::post_index)
                    .service(subscription::delete_index)
                    .service(subscription::prune_index),
            )
    })
    .listen(listener)?
    .disable_signals()
    .run();
    Ok(server)
}
