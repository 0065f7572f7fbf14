use super::helpers::{
    fetch_member_for_update, fetch_ride_for_update, free_driver, update_member, update_ride,
};
use super::Engine;

use async_trait::async_trait;
use rand_distr::{Distribution, Uniform};
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{BookRide, DriverMatch, Page, Pagination, RideAPI},
    auth::{Platform, User},
    entities::{Member, Ride, RideStatus, RideType, Role},
    error::{forbidden_error, not_found_error, Error},
};

// speed used to turn the mock driver distance into an ETA
const CITY_SPEED_KMH: f64 = 20.0;

/// Mock distance/ETA for a driver; no live location data exists.
fn mock_proximity(rng: &mut impl rand::Rng) -> (f64, u32) {
    let distance: f64 = Uniform::new_inclusive(0.5, 5.0).sample(rng);
    let distance_km = (distance * 10.0).round() / 10.0;
    let eta_minutes = ((distance_km / CITY_SPEED_KMH) * 60.0).ceil().max(1.0) as u32;

    (distance_km, eta_minutes)
}

#[async_trait]
impl RideAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn book_ride(&self, user: User, params: BookRide) -> Result<Ride, Error> {
        self.authorize(user.clone(), "book_ride", Platform::default())?;

        let ride = Ride::new(
            user.id,
            params.pickup_location,
            params.dropoff_location,
            params.ride_type,
            params.distance_km,
            params.payment_method,
        )?;

        let mut conn = self.pool.acquire().await?;
        conn.execute(
            sqlx::query(
                "INSERT INTO rides (id, customer_id, driver_id, status, data) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&ride.id)
            .bind(&ride.customer_id)
            .bind(&ride.driver_id)
            .bind(ride.status.name())
            .bind(Json(&ride)),
        )
        .await?;

        tracing::info!(ride_id = %ride.id, fare = ride.estimated_fare, "ride booked");

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn find_ride(&self, user: User, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(ride): Json<Ride> = conn
            .fetch_optional(sqlx::query("SELECT data FROM rides WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(not_found_error)?
            .try_get("data")?;

        self.authorize(user.clone(), "read", ride.clone())?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn list_my_rides(
        &self,
        user: User,
        status: Option<RideStatus>,
        pagination: Pagination,
    ) -> Result<Page<Ride>, Error> {
        let column = match user.primary_role() {
            Role::Driver => "driver_id",
            _ => "customer_id",
        };
        let status = status.map(|status| status.name());

        let conditions = format!("{} = $1 AND ($2::VARCHAR IS NULL OR status = $2)", column);

        let mut conn = self.pool.acquire().await?;

        let total: i64 = conn
            .fetch_one(
                sqlx::query(&format!(
                    "SELECT COUNT(*) AS total FROM rides WHERE {}",
                    conditions
                ))
                .bind(&user.id)
                .bind(&status),
            )
            .await?
            .try_get("total")?;

        let rows = conn
            .fetch_all(
                sqlx::query(&format!(
                    "SELECT data FROM rides WHERE {} ORDER BY data->>'requestedAt' DESC LIMIT $3 OFFSET $4",
                    conditions
                ))
                .bind(&user.id)
                .bind(&status)
                .bind(pagination.limit)
                .bind(pagination.offset()),
            )
            .await?;

        let mut rides = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let Json(ride): Json<Ride> = row.try_get("data")?;
            rides.push(ride);
        }

        Ok(Page::new(rides, total, pagination))
    }

    #[tracing::instrument(skip(self))]
    async fn find_drivers(
        &self,
        user: User,
        ride_type: Option<RideType>,
    ) -> Result<Vec<DriverMatch>, Error> {
        self.authorize(user.clone(), "find_drivers", Platform::default())?;

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query(
                "SELECT data FROM members WHERE role = 'driver' AND status = 'verified' AND (data->'driver'->>'isAvailable')::BOOLEAN",
            ))
            .await?;

        let mut drivers = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let Json(driver): Json<Member> = row.try_get("data")?;
            drivers.push(driver);
        }

        let mut rng = rand::thread_rng();
        let mut matches: Vec<DriverMatch> = drivers
            .into_iter()
            .filter(|driver| driver.is_available_driver())
            .filter(|driver| match (ride_type, &driver.driver) {
                (Some(ride_type), Some(details)) => details.vehicle.vehicle_type == ride_type,
                _ => true,
            })
            .map(|driver| {
                let (distance_km, eta_minutes) = mock_proximity(&mut rng);
                DriverMatch {
                    driver,
                    distance_km,
                    eta_minutes,
                }
            })
            .collect();

        matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        tracing::info!("found {} available drivers", matches.len());

        Ok(matches)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_ride(
        &self,
        user: User,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        self.authorize(user.clone(), "cancel", ride.clone())?;

        let freed_driver = ride.cancel(reason)?;

        update_ride(&mut tx, &ride).await?;

        if let Some(driver_id) = freed_driver {
            free_driver(&mut tx, &driver_id).await?;
        }

        tx.commit().await?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn rate_ride(
        &self,
        user: User,
        id: Uuid,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        self.authorize(user.clone(), "rate", ride.clone())?;

        ride.rate(rating, feedback)?;

        update_ride(&mut tx, &ride).await?;

        tx.commit().await?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn accept_ride(&self, user: User, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        self.authorize(user.clone(), "accept", ride.clone())?;

        let mut driver = fetch_member_for_update(&mut tx, &user.id)
            .await
            .map_err(|err| {
                if err.is_not_found_error() {
                    forbidden_error()
                } else {
                    err
                }
            })?;

        driver.claim_for_ride().map_err(|err| {
            tracing::info!("driver cannot accept ride: {}", err);
            err
        })?;
        ride.accept(driver.id)?;

        update_ride(&mut tx, &ride).await?;
        update_member(&mut tx, &driver).await?;

        tx.commit().await?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn start_ride(&self, user: User, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        self.authorize(user.clone(), "start", ride.clone())?;

        ride.start()?;

        update_ride(&mut tx, &ride).await?;

        tx.commit().await?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn complete_ride(&self, user: User, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        self.authorize(user.clone(), "complete", ride.clone())?;

        ride.complete()?;

        update_ride(&mut tx, &ride).await?;
        free_driver(&mut tx, &user.id).await?;

        tx.commit().await?;

        Ok(ride)
    }
}
