use super::Engine;

use async_trait::async_trait;

use crate::{
    api::FareAPI,
    error::{validation_error, Error},
    fare::{normalize, Estimator, FareEstimate, PricingConfig},
};

#[async_trait]
impl FareAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn estimate_fare(&self, pickup: String, destination: String) -> Result<FareEstimate, Error> {
        let (origin, target) = (normalize(&pickup), normalize(&destination));

        if origin.is_empty() || target.is_empty() {
            return Err(validation_error("pickup and destination are required"));
        }

        if origin == target {
            return Err(validation_error("pickup and destination must differ"));
        }

        let estimate = self.fares.estimate(&pickup, &destination).await?;

        Ok(estimate)
    }

    fn pricing_config(&self) -> PricingConfig {
        self.fares.calculator().config().clone()
    }

    fn estimator(&self) -> Estimator {
        self.fares.estimator()
    }
}
