use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use crate::error::Error;

pub type Database = Postgres;

#[tracing::instrument(skip(db_uri))]
pub async fn connect(db_uri: &str, max_connections: u32) -> Result<Pool<Database>, Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_uri)
        .await?;

    migrate(&pool).await?;

    Ok(pool)
}

/// Creates tables and indexes that do not exist yet; existing data is kept.
pub async fn migrate(pool: &Pool<Database>) -> Result<(), Error> {
    // member service
    pool.execute("CREATE TABLE IF NOT EXISTS members (id UUID PRIMARY KEY, role VARCHAR NOT NULL, status VARCHAR NOT NULL, data JSONB NOT NULL)")
        .await?;
    pool.execute("CREATE UNIQUE INDEX IF NOT EXISTS members_email_idx ON members ((data->>'email'))")
        .await?;
    pool.execute("CREATE UNIQUE INDEX IF NOT EXISTS members_license_idx ON members ((data->'driver'->>'licenseNumber')) WHERE data->'driver' IS NOT NULL AND jsonb_typeof(data->'driver') = 'object'")
        .await?;
    pool.execute("CREATE UNIQUE INDEX IF NOT EXISTS members_plate_idx ON members ((data->'driver'->'vehicle'->>'plateNumber')) WHERE data->'driver' IS NOT NULL AND jsonb_typeof(data->'driver') = 'object'")
        .await?;

    // package service
    pool.execute("CREATE TABLE IF NOT EXISTS packages (id UUID PRIMARY KEY, data JSONB NOT NULL)")
        .await?;

    // ride service
    pool.execute("CREATE TABLE IF NOT EXISTS rides (id UUID PRIMARY KEY, customer_id UUID NOT NULL, driver_id UUID, status VARCHAR NOT NULL, data JSONB NOT NULL)")
        .await?;
    pool.execute("CREATE INDEX IF NOT EXISTS rides_customer_idx ON rides (customer_id)")
        .await?;
    pool.execute("CREATE INDEX IF NOT EXISTS rides_driver_idx ON rides (driver_id)")
        .await?;

    Ok(())
}
