use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{Page, PackageFilter, Pagination};
use crate::auth::User;
use crate::entities::{NewPackage, Package, PriceRange};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    destination: Option<String>,
    price_range: Option<String>,
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Package>>, Error> {
    let price_range = match params.price_range.as_deref() {
        Some(range) if !range.trim().is_empty() => PriceRange::parse(range)?,
        _ => PriceRange::default(),
    };

    let filter = PackageFilter {
        destination: params.destination,
        price_range,
    };

    let page = api
        .list_packages(filter, Pagination::new(params.page, params.limit))
        .await?;

    Ok(page.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Package>, Error> {
    let package = api.find_package(id).await?;

    Ok(package.into())
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<NewPackage>,
) -> Result<Json<Package>, Error> {
    let package = api.create_package(user, params).await?;

    Ok(package.into())
}
