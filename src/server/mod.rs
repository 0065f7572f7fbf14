mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::API;
use crate::auth::DynAuthenticator;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{admin, fares, packages, rides, users};

pub type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI, authenticator: DynAuthenticator) -> Router {
    Router::new()
        .route("/api/packages", get(packages::list).post(packages::create))
        .route("/api/packages/:id", get(packages::find))
        .route(
            "/api/rides/:ride_id",
            get(rides::find_or_list).post(rides::collection_action),
        )
        .route("/api/rides/:ride_id/cancel", patch(rides::cancel))
        .route("/api/rides/:ride_id/rate", patch(rides::rate))
        .route("/api/rides/:ride_id/accept", patch(rides::accept))
        .route("/api/rides/:ride_id/start", patch(rides::start))
        .route("/api/rides/:ride_id/complete", patch(rides::complete))
        .route("/api/users/register", post(users::register))
        .route("/api/users/profile", get(users::profile).patch(users::update_profile))
        .route("/api/users/stats", get(users::stats))
        .route("/api/admin/users", get(admin::members))
        .route("/api/admin/rides", get(admin::rides))
        .route("/api/admin/drivers/:id/verify", patch(admin::verify_driver))
        .route("/api/fares/estimate", post(fares::estimate))
        .route("/api/fares/config", get(fares::config))
        .route("/api/fares/live", get(fares::live))
        .layer(Extension(api))
        .layer(Extension(authenticator))
}

pub async fn serve<T: API + Sync + Send + 'static>(
    api: T,
    authenticator: DynAuthenticator,
    addr: SocketAddr,
) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;
    let app = router(api, authenticator);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {}", err);
            unexpected_error()
        })
}
