use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationError {
    /// The directions service knows no route between the two places.
    RouteNotFound,
    /// The directions service could not be reached or refused the request.
    EstimationUnavailable,
    InvalidDistance,
    InvalidHour,
    InvalidConfig,
}

impl Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::RouteNotFound => "no route between pickup and destination",
            Self::EstimationUnavailable => "fare estimation is currently unavailable",
            Self::InvalidDistance => "distance must be a non-negative number",
            Self::InvalidHour => "hour must be between 0 and 23",
            Self::InvalidConfig => "invalid pricing configuration",
        };

        f.write_str(message)
    }
}

impl std::error::Error for EstimationError {}
