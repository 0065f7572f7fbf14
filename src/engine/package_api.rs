use super::Engine;

use async_trait::async_trait;
use sqlx::{types::Json, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{Page, PackageAPI, PackageFilter, Pagination},
    auth::{Platform, User},
    entities::{NewPackage, Package},
    error::{not_found_error, Error},
};

#[async_trait]
impl PackageAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_packages(
        &self,
        filter: PackageFilter,
        pagination: Pagination,
    ) -> Result<Page<Package>, Error> {
        let destination = filter
            .destination
            .map(|destination| destination.trim().to_string())
            .filter(|destination| !destination.is_empty())
            .map(|destination| format!("%{}%", destination));

        let conditions = "
            (data->>'isActive')::BOOLEAN
            AND ($1::TEXT IS NULL OR data->>'destination' ILIKE $1)
            AND ($2::FLOAT8 IS NULL OR (data->>'price')::FLOAT8 >= $2)
            AND ($3::FLOAT8 IS NULL OR (data->>'price')::FLOAT8 <= $3)
        ";

        let mut conn = self.pool.acquire().await?;

        let total: i64 = conn
            .fetch_one(
                sqlx::query(&format!(
                    "SELECT COUNT(*) AS total FROM packages WHERE {}",
                    conditions
                ))
                .bind(&destination)
                .bind(filter.price_range.min)
                .bind(filter.price_range.max),
            )
            .await?
            .try_get("total")?;

        let rows = conn
            .fetch_all(
                sqlx::query(&format!(
                    "SELECT data FROM packages WHERE {} ORDER BY data->>'createdAt' DESC LIMIT $4 OFFSET $5",
                    conditions
                ))
                .bind(&destination)
                .bind(filter.price_range.min)
                .bind(filter.price_range.max)
                .bind(pagination.limit)
                .bind(pagination.offset()),
            )
            .await?;

        let mut packages = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let Json(package): Json<Package> = row.try_get("data")?;
            packages.push(package);
        }

        Ok(Page::new(packages, total, pagination))
    }

    #[tracing::instrument(skip(self))]
    async fn find_package(&self, id: Uuid) -> Result<Package, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM packages WHERE id = $1").bind(&id))
            .await?;

        let result = maybe_result.ok_or_else(not_found_error)?;
        let Json(package) = result.try_get("data")?;

        Ok(package)
    }

    #[tracing::instrument(skip(self))]
    async fn create_package(&self, user: User, params: NewPackage) -> Result<Package, Error> {
        self.authorize(user.clone(), "create_package", Platform::default())?;

        let package = Package::new(params, user.id)?;

        let mut conn = self.pool.acquire().await?;
        conn.execute(
            sqlx::query("INSERT INTO packages (id, data) VALUES ($1, $2)")
                .bind(&package.id)
                .bind(Json(&package)),
        )
        .await?;

        tracing::info!(package_id = %package.id, "package created");

        Ok(package)
    }
}
