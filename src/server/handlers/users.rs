use axum::extract::{Extension, Json};

use crate::api::{Registration, Stats};
use crate::auth::User;
use crate::entities::{Member, ProfileUpdate};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn register(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<Registration>,
) -> Result<Json<Member>, Error> {
    let member = api.register_member(user, params).await?;

    Ok(member.into())
}

pub async fn profile(Extension(api): Extension<DynAPI>, user: User) -> Result<Json<Member>, Error> {
    let member = api.find_profile(user).await?;

    Ok(member.into())
}

pub async fn update_profile(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Member>, Error> {
    let member = api.update_profile(user, update).await?;

    Ok(member.into())
}

pub async fn stats(Extension(api): Extension<DynAPI>, user: User) -> Result<Json<Stats>, Error> {
    let stats = api.member_stats(user).await?;

    Ok(stats.into())
}
