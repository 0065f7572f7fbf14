use axum::extract::{Extension, Json, Path, Query};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BookRide, Pagination};
use crate::auth::User;
use crate::entities::{Ride, RideStatus, RideType};
use crate::error::{invalid_input_error, not_found_error, Error};
use crate::server::DynAPI;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<RideStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindDriversParams {
    pickup_location: Option<String>,
    ride_type: Option<RideType>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelParams {
    reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateParams {
    rating: u8,
    feedback: Option<String>,
}

fn ride_id(segment: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(segment).map_err(|_| not_found_error())
}

fn body<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|err| {
        tracing::debug!("rejected request body: {}", err);
        invalid_input_error()
    })
}

/// `GET /api/rides/my-rides` and `GET /api/rides/:ride_id` share one path segment.
pub async fn find_or_list(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(segment): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response, Error> {
    if segment == "my-rides" {
        let page = api
            .list_my_rides(user, params.status, Pagination::new(params.page, params.limit))
            .await?;

        return Ok(Json(page).into_response());
    }

    let ride = api.find_ride(user, ride_id(&segment)?).await?;

    Ok(Json(ride).into_response())
}

/// `POST /api/rides/book` and `POST /api/rides/find-drivers`.
pub async fn collection_action(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(segment): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, Error> {
    match segment.as_str() {
        "book" => {
            let params: BookRide = body(payload)?;
            let ride = api.book_ride(user, params).await?;

            Ok(Json(ride).into_response())
        }
        "find-drivers" => {
            let params: FindDriversParams = body(payload)?;
            tracing::debug!(pickup = ?params.pickup_location, "finding drivers");
            let drivers = api.find_drivers(user, params.ride_type).await?;

            Ok(Json(drivers).into_response())
        }
        _ => Err(not_found_error()),
    }
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    params: Option<Json<CancelParams>>,
) -> Result<Json<Ride>, Error> {
    let reason = params.and_then(|Json(params)| params.reason);
    let ride = api.cancel_ride(user, id, reason).await?;

    Ok(ride.into())
}

pub async fn rate(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<RateParams>,
) -> Result<Json<Ride>, Error> {
    let ride = api.rate_ride(user, id, params.rating, params.feedback).await?;

    Ok(ride.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.accept_ride(user, id).await?;

    Ok(ride.into())
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.start_ride(user, id).await?;

    Ok(ride.into())
}

pub async fn complete(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.complete_ride(user, id).await?;

    Ok(ride.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn book_body_requires_known_ride_type() {
        let ok: Result<BookRide, Error> = body(json!({
            "pickupLocation": "Park Street",
            "dropoffLocation": "Howrah Station",
            "rideType": "comfort",
            "distanceKm": 7.8,
            "paymentMethod": "upi"
        }));
        assert_eq!(ok.unwrap().ride_type, RideType::Comfort);

        let bad: Result<BookRide, Error> = body(json!({
            "pickupLocation": "Park Street",
            "dropoffLocation": "Howrah Station",
            "rideType": "helicopter",
            "distanceKm": 7.8,
            "paymentMethod": "upi"
        }));
        assert_eq!(bad.unwrap_err(), invalid_input_error());
    }

    #[test]
    fn non_uuid_segments_are_not_found() {
        assert!(ride_id("my-ride").unwrap_err().is_not_found_error());
        assert!(ride_id("6f1c1f4e-9f59-4b0e-a1f3-33c0b7f2a1d1").is_ok());
    }
}
