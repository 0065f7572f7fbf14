use super::helpers::{fetch_member_for_update, update_member};
use super::Engine;

use async_trait::async_trait;
use sqlx::{types::Json, Acquire, Executor, Row};

use crate::{
    api::{MemberAPI, Registration, Stats},
    auth::User,
    entities::{Member, ProfileUpdate, Role},
    error::{not_found_error, Error},
};

#[async_trait]
impl MemberAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn register_member(&self, user: User, params: Registration) -> Result<Member, Error> {
        let member = Member::new(
            user.id,
            user.email.clone(),
            params.name,
            params.phone,
            user.primary_role(),
            params.driver,
        )?;

        let mut conn = self.pool.acquire().await?;
        conn.execute(
            sqlx::query("INSERT INTO members (id, role, status, data) VALUES ($1, $2, $3, $4)")
                .bind(&member.id)
                .bind(member.role.name())
                .bind(member.status.name())
                .bind(Json(&member)),
        )
        .await?;

        tracing::info!(member_id = %member.id, role = %member.role.name(), "member registered");

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn find_profile(&self, user: User) -> Result<Member, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM members WHERE id = $1").bind(&user.id))
            .await?;

        let result = maybe_result.ok_or_else(not_found_error)?;
        let Json(member) = result.try_get("data")?;

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn update_profile(&self, user: User, update: ProfileUpdate) -> Result<Member, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut member = fetch_member_for_update(&mut tx, &user.id).await?;

        member.apply(update)?;

        update_member(&mut tx, &member).await?;

        tx.commit().await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn member_stats(&self, user: User) -> Result<Stats, Error> {
        let mut conn = self.pool.acquire().await?;

        let stats = match user.primary_role() {
            Role::Customer => {
                let row = conn
                    .fetch_one(
                        sqlx::query(
                            "
                            SELECT
                                COUNT(*) AS total_rides,
                                COUNT(*) FILTER (WHERE status = 'completed') AS completed_rides,
                                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_rides,
                                COALESCE(SUM((data->>'estimatedFare')::FLOAT8) FILTER (WHERE status = 'completed'), 0) AS total_spent
                            FROM
                                rides
                            WHERE
                                customer_id = $1
                            ",
                        )
                        .bind(&user.id),
                    )
                    .await?;

                Stats::Customer {
                    total_rides: row.try_get("total_rides")?,
                    completed_rides: row.try_get("completed_rides")?,
                    cancelled_rides: row.try_get("cancelled_rides")?,
                    total_spent: row.try_get("total_spent")?,
                }
            }
            Role::Driver => {
                let row = conn
                    .fetch_one(
                        sqlx::query(
                            "
                            SELECT
                                COUNT(*) AS total_trips,
                                COUNT(*) FILTER (WHERE status = 'completed') AS completed_trips,
                                COALESCE(SUM((data->>'estimatedFare')::FLOAT8) FILTER (WHERE status = 'completed'), 0) AS total_earnings,
                                AVG((data->>'rating')::FLOAT8) AS average_rating
                            FROM
                                rides
                            WHERE
                                driver_id = $1
                            ",
                        )
                        .bind(&user.id),
                    )
                    .await?;

                Stats::Driver {
                    total_trips: row.try_get("total_trips")?,
                    completed_trips: row.try_get("completed_trips")?,
                    total_earnings: row.try_get("total_earnings")?,
                    average_rating: row.try_get("average_rating")?,
                }
            }
            Role::Admin => {
                let members = conn
                    .fetch_one(sqlx::query(
                        "
                        SELECT
                            COUNT(*) FILTER (WHERE role = 'customer') AS total_customers,
                            COUNT(*) FILTER (WHERE role = 'driver') AS total_drivers,
                            COUNT(*) FILTER (WHERE role = 'driver' AND status = 'pending_verification') AS pending_drivers
                        FROM
                            members
                        ",
                    ))
                    .await?;

                let rides = conn
                    .fetch_one(sqlx::query(
                        "
                        SELECT
                            COUNT(*) AS total_rides,
                            COUNT(*) FILTER (WHERE status = 'completed') AS completed_rides,
                            COALESCE(SUM((data->>'estimatedFare')::FLOAT8) FILTER (WHERE status = 'completed'), 0) AS total_revenue
                        FROM
                            rides
                        ",
                    ))
                    .await?;

                Stats::Admin {
                    total_customers: members.try_get("total_customers")?,
                    total_drivers: members.try_get("total_drivers")?,
                    pending_drivers: members.try_get("pending_drivers")?,
                    total_rides: rides.try_get("total_rides")?,
                    completed_rides: rides.try_get("completed_rides")?,
                    total_revenue: rides.try_get("total_revenue")?,
                }
            }
        };

        Ok(stats)
    }
}
