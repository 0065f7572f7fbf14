use sqlx::{types::Json, Executor, Row, Transaction};
use uuid::Uuid;

use crate::{
    db::Database,
    entities::{Member, Ride},
    error::{not_found_error, Error},
};

#[tracing::instrument(skip(tx))]
pub async fn fetch_ride_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Ride, Error> {
    let Json(ride): Json<Ride> = tx
        .fetch_optional(sqlx::query("SELECT data FROM rides WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(not_found_error)?
        .try_get("data")?;

    Ok(ride)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_member_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Member, Error> {
    let Json(member): Json<Member> = tx
        .fetch_optional(sqlx::query("SELECT data FROM members WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(not_found_error)?
        .try_get("data")?;

    Ok(member)
}

#[tracing::instrument(skip(tx, ride), fields(ride_id = %ride.id))]
pub async fn update_ride(tx: &mut Transaction<'_, Database>, ride: &Ride) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE rides SET driver_id = $2, status = $3, data = $4 WHERE id = $1")
            .bind(&ride.id)
            .bind(&ride.driver_id)
            .bind(ride.status.name())
            .bind(Json(ride)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx, member), fields(member_id = %member.id))]
pub async fn update_member(
    tx: &mut Transaction<'_, Database>,
    member: &Member,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE members SET role = $2, status = $3, data = $4 WHERE id = $1")
            .bind(&member.id)
            .bind(member.role.name())
            .bind(member.status.name())
            .bind(Json(member)),
    )
    .await?;

    Ok(())
}

/// Marks the driver holding a ride as available again.
pub async fn free_driver(tx: &mut Transaction<'_, Database>, driver_id: &Uuid) -> Result<(), Error> {
    let mut driver = fetch_member_for_update(tx, driver_id).await?;

    if driver.is_verified() {
        driver.set_available(true)?;
        update_member(tx, &driver).await?;
    }

    Ok(())
}
