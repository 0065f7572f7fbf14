use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::error::EstimationError;
use super::routes::{RouteInfo, RouteSourceKind};

/// Source of the current time for time-of-day pricing.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum PricingStrategy {
    /// One rate for the whole distance, picked by which side of the threshold the trip falls.
    TieredDistance {
        short_rate: f64,
        long_rate: f64,
        threshold_km: f64,
    },
    FlatRate {
        rate: f64,
    },
}

impl PricingStrategy {
    pub fn tiered() -> Self {
        Self::TieredDistance {
            short_rate: 12.0,
            long_rate: 14.0,
            threshold_km: 10.0,
        }
    }

    pub fn flat() -> Self {
        Self::FlatRate { rate: 12.0 }
    }

    pub fn per_km_rate(&self, distance_km: f64) -> f64 {
        match *self {
            Self::TieredDistance {
                short_rate,
                long_rate,
                threshold_km,
            } => {
                if distance_km <= threshold_km {
                    short_rate
                } else {
                    long_rate
                }
            }
            Self::FlatRate { rate } => rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub base_fare: f64,
    pub strategy: PricingStrategy,
    pub petrol_price_reference: f64,
    pub peak_surge_multiplier: f64,
    pub night_charge_multiplier: f64,
    pub toll_charges: u32,
}

impl PricingConfig {
    pub fn new(strategy: PricingStrategy) -> Self {
        Self {
            base_fare: 50.0,
            strategy,
            petrol_price_reference: 105.0,
            peak_surge_multiplier: 1.5,
            night_charge_multiplier: 1.25,
            toll_charges: 0,
        }
    }

    pub fn validate(&self) -> Result<(), EstimationError> {
        if !(self.base_fare >= 0.0) || !(self.petrol_price_reference >= 0.0) {
            return Err(EstimationError::InvalidConfig);
        }

        if !(self.peak_surge_multiplier >= 1.0) || !(self.night_charge_multiplier >= 1.0) {
            return Err(EstimationError::InvalidConfig);
        }

        match self.strategy {
            PricingStrategy::TieredDistance {
                short_rate,
                long_rate,
                threshold_km,
            } => {
                // a cheaper long band would make the fare drop when crossing the threshold
                if !(short_rate >= 0.0) || !(long_rate >= short_rate) || !(threshold_km >= 0.0) {
                    return Err(EstimationError::InvalidConfig);
                }
            }
            PricingStrategy::FlatRate { rate } => {
                if !(rate >= 0.0) {
                    return Err(EstimationError::InvalidConfig);
                }
            }
        }

        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::new(PricingStrategy::tiered())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCategory {
    Standard,
    Peak,
    Night,
}

/// Monetary part of an estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub base_fare: u32,
    pub distance_fare: u32,
    pub per_km_rate_used: f64,
    pub surge_multiplier: f64,
    pub night_charge_multiplier: f64,
    pub toll_charges: u32,
    pub total_fare: u32,
    pub price_category: PriceCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareEstimate {
    pub distance_text: String,
    pub duration_text: String,
    pub distance_km: f64,
    pub duration_minutes: u32,
    #[serde(flatten)]
    pub breakdown: FareBreakdown,
    pub route_source: RouteSourceKind,
}

impl FareEstimate {
    pub fn total_fare(&self) -> u32 {
        self.breakdown.total_fare
    }
}

pub fn is_night_time(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

pub fn is_peak_hour(hour: u32) -> bool {
    (8..=10).contains(&hour) || (17..=20).contains(&hour)
}

// Half-up rounding to whole currency units; inputs are never negative here.
// The cast saturates at u32::MAX.
fn round_currency(amount: f64) -> u32 {
    (amount + 0.5).floor() as u32
}

pub fn compute_fare(
    config: &PricingConfig,
    distance_km: f64,
    hour: u32,
) -> Result<FareBreakdown, EstimationError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(EstimationError::InvalidDistance);
    }

    if hour >= 24 {
        return Err(EstimationError::InvalidHour);
    }

    let night = is_night_time(hour);
    let peak = is_peak_hour(hour);

    let surge_multiplier = if peak { config.peak_surge_multiplier } else { 1.0 };
    let night_charge_multiplier = if night {
        config.night_charge_multiplier
    } else {
        1.0
    };

    let per_km_rate = config.strategy.per_km_rate(distance_km);
    let distance_fare = distance_km * per_km_rate;

    let subtotal = (config.base_fare + distance_fare) * surge_multiplier * night_charge_multiplier;
    let total_fare = round_currency(subtotal).saturating_add(config.toll_charges);

    let price_category = match (peak, night) {
        (true, _) => PriceCategory::Peak,
        (_, true) => PriceCategory::Night,
        _ => PriceCategory::Standard,
    };

    Ok(FareBreakdown {
        base_fare: round_currency(config.base_fare),
        distance_fare: round_currency(distance_fare),
        per_km_rate_used: per_km_rate,
        surge_multiplier,
        night_charge_multiplier,
        toll_charges: config.toll_charges,
        total_fare,
        price_category,
    })
}

pub fn format_distance(distance_km: f64) -> String {
    format!("{:.1} km", distance_km)
}

pub fn format_duration(minutes: u32) -> String {
    let plural = |n: u32, unit: &str| match n {
        1 => format!("1 {}", unit),
        n => format!("{} {}s", n, unit),
    };

    match (minutes / 60, minutes % 60) {
        (0, m) => plural(m, "min"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "min")),
    }
}

/// Prices routes against the wall-clock hour supplied by an injected clock.
#[derive(Clone, Debug)]
pub struct PricingCalculator {
    config: PricingConfig,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl PricingCalculator {
    pub fn new(
        config: PricingConfig,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Result<Self, EstimationError> {
        config.validate()?;

        Ok(Self {
            config,
            clock,
            offset,
        })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn current_hour(&self) -> u32 {
        self.clock.now().with_timezone(&self.offset).hour()
    }

    pub fn estimate(&self, route: &RouteInfo) -> Result<FareEstimate, EstimationError> {
        self.estimate_at(route, self.current_hour())
    }

    pub fn estimate_at(&self, route: &RouteInfo, hour: u32) -> Result<FareEstimate, EstimationError> {
        let breakdown = compute_fare(&self.config, route.distance_km, hour)?;

        let duration_minutes = match is_peak_hour(hour) {
            true => (route.base_time_minutes as f64 * route.traffic_multiplier).round() as u32,
            false => route.base_time_minutes,
        };

        Ok(FareEstimate {
            distance_text: format_distance(route.distance_km),
            duration_text: format_duration(duration_minutes),
            distance_km: route.distance_km,
            duration_minutes,
            breakdown,
            route_source: route.source,
        })
    }
}
