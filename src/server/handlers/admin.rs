use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{Page, Pagination};
use crate::auth::User;
use crate::entities::{Member, Ride, RideStatus, Role};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberParams {
    role: Option<Role>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RideParams {
    status: Option<RideStatus>,
    page: Option<i64>,
    limit: Option<i64>,
}

pub async fn members(
    Extension(api): Extension<DynAPI>,
    user: User,
    Query(params): Query<MemberParams>,
) -> Result<Json<Page<Member>>, Error> {
    let page = api
        .list_members(user, params.role, Pagination::new(params.page, params.limit))
        .await?;

    Ok(page.into())
}

pub async fn rides(
    Extension(api): Extension<DynAPI>,
    user: User,
    Query(params): Query<RideParams>,
) -> Result<Json<Page<Ride>>, Error> {
    let page = api
        .list_rides(user, params.status, Pagination::new(params.page, params.limit))
        .await?;

    Ok(page.into())
}

pub async fn verify_driver(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, Error> {
    let driver = api.verify_driver(user, id).await?;

    Ok(driver.into())
}
