use std::sync::Arc;

use dotenv::dotenv;

use yatra::auth::{DynAuthenticator, SupabaseAuthenticator};
use yatra::config::Config;
use yatra::db;
use yatra::engine::Engine;
use yatra::error::Error;
use yatra::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    let engine = Engine::new(pool, &config)?;
    let authenticator: DynAuthenticator = Arc::new(SupabaseAuthenticator::new(&config.auth));

    serve(engine, authenticator, config.bind_addr).await
}
