//! Fare estimation: static route table, time-of-day pricing and debounced estimation.

mod error;
mod estimator;
mod pricing;
mod routes;

pub use error::EstimationError;
pub use estimator::{
    DirectionsRouteSource, DynRouteSource, EstimationState, Estimator, FareService,
    LocalRouteSource, RouteSource, DEFAULT_DEBOUNCE,
};
pub use pricing::{
    compute_fare, format_distance, format_duration, is_night_time, is_peak_hour, Clock,
    FareBreakdown, FareEstimate, FixedClock, PriceCategory, PricingCalculator, PricingConfig,
    PricingStrategy, SystemClock,
};
pub use routes::{
    normalize, route_key, RouteEntry, RouteInfo, RouteSourceKind, RouteTable,
    DEFAULT_DISTANCE_KM, DEFAULT_TIME_MINUTES,
};
