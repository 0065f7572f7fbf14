mod admin_api;
mod fare_api;
mod helpers;
mod member_api;
mod package_api;
mod ride_api;

use std::sync::Arc;

use oso::Oso;
use sqlx::Pool;

use crate::{
    api::API,
    auth::authorizor,
    config::Config,
    db::Database,
    error::{forbidden_error, Error},
    external::google_maps::GoogleMaps,
    fare::{
        DirectionsRouteSource, DynRouteSource, FareService, LocalRouteSource, PricingCalculator,
        RouteTable, SystemClock,
    },
};

pub struct Engine {
    pool: Pool<Database>,
    authorizor: Oso,
    fares: FareService,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(pool: Pool<Database>, config: &Config) -> Result<Self, Error> {
        let source: DynRouteSource = match &config.maps {
            Some(maps) => {
                tracing::info!("estimating fares with the directions API");
                Arc::new(DirectionsRouteSource::new(GoogleMaps::new(
                    maps.api_base.clone(),
                    maps.api_key.clone(),
                )))
            }
            None => {
                tracing::info!("no directions API key configured, estimating fares offline");
                Arc::new(LocalRouteSource::new(RouteTable::kolkata()))
            }
        };

        let calculator = PricingCalculator::new(
            config.pricing.clone(),
            Arc::new(SystemClock),
            config.utc_offset,
        )?;

        Ok(Self {
            pool,
            authorizor: authorizor::new()?,
            fares: FareService::new(source, calculator, config.debounce),
        })
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(forbidden_error())
    }
}

impl API for Engine {}
