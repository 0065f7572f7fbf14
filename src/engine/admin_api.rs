use super::helpers::{fetch_member_for_update, update_member};
use super::Engine;

use async_trait::async_trait;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{AdminAPI, Page, Pagination},
    auth::{Platform, User},
    entities::{Member, Ride, RideStatus, Role},
    error::Error,
};

#[async_trait]
impl AdminAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_members(
        &self,
        user: User,
        role: Option<Role>,
        pagination: Pagination,
    ) -> Result<Page<Member>, Error> {
        self.authorize(user.clone(), "manage_members", Platform::default())?;

        let role = role.map(|role| role.name());
        let mut conn = self.pool.acquire().await?;

        let total: i64 = conn
            .fetch_one(
                sqlx::query(
                    "SELECT COUNT(*) AS total FROM members WHERE ($1::VARCHAR IS NULL OR role = $1)",
                )
                .bind(&role),
            )
            .await?
            .try_get("total")?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT data FROM members WHERE ($1::VARCHAR IS NULL OR role = $1) ORDER BY data->>'createdAt' DESC LIMIT $2 OFFSET $3")
                    .bind(&role)
                    .bind(pagination.limit)
                    .bind(pagination.offset()),
            )
            .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let Json(member): Json<Member> = row.try_get("data")?;
            members.push(member);
        }

        Ok(Page::new(members, total, pagination))
    }

    #[tracing::instrument(skip(self))]
    async fn list_rides(
        &self,
        user: User,
        status: Option<RideStatus>,
        pagination: Pagination,
    ) -> Result<Page<Ride>, Error> {
        self.authorize(user.clone(), "list_all_rides", Platform::default())?;

        let status = status.map(|status| status.name());
        let mut conn = self.pool.acquire().await?;

        let total: i64 = conn
            .fetch_one(
                sqlx::query(
                    "SELECT COUNT(*) AS total FROM rides WHERE ($1::VARCHAR IS NULL OR status = $1)",
                )
                .bind(&status),
            )
            .await?
            .try_get("total")?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT data FROM rides WHERE ($1::VARCHAR IS NULL OR status = $1) ORDER BY data->>'requestedAt' DESC LIMIT $2 OFFSET $3")
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
    async fn verify_driver(&self, user: User, id: Uuid) -> Result<Member, Error> {
        self.authorize(user.clone(), "manage_members", Platform::default())?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut driver = fetch_member_for_update(&mut tx, &id).await?;

        driver.verify()?;

        update_member(&mut tx, &driver).await?;

        tx.commit().await?;

        tracing::info!(driver_id = %driver.id, "driver verified");

        Ok(driver)
    }
}
