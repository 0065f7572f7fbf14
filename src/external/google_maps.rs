use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, route_not_found_error, upstream_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Leg {
    pub distance: TextValue,
    pub duration: TextValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DirectionsRoute {
    legs: Vec<Leg>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

/// Driving distance and time between two places, summed over all legs.
#[derive(Clone, Debug, PartialEq)]
pub struct Directions {
    pub distance_meters: u64,
    pub duration_seconds: u64,
}

#[async_trait]
pub trait DirectionsClient: Send + Sync {
    async fn find_directions(&self, origin: &str, destination: &str) -> Result<Directions, Error>;
}

pub type DynDirectionsClient = Arc<dyn DirectionsClient>;

#[derive(Clone, Debug)]
pub struct GoogleMaps {
    client: reqwest::Client,
    api_base: String,
    key: String,
}

impl GoogleMaps {
    pub fn new(api_base: String, key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            key,
        }
    }
}

#[async_trait]
impl DirectionsClient for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn find_directions(&self, origin: &str, destination: &str) -> Result<Directions, Error> {
        let url = format!("https://{}/maps/api/directions/json", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("key", self.key.as_str())])
            .query(&[("origin", origin)])
            .query(&[("destination", destination)])
            .query(&[("mode", "driving")])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let data: Response = res.json().await?;

        parse_directions(data)
    }
}

fn parse_directions(data: Response) -> Result<Directions, Error> {
    match data.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => return Err(route_not_found_error()),
        status => {
            tracing::warn!("directions request failed with status {}", status);
            return Err(upstream_error());
        }
    }

    let route = data
        .routes
        .into_iter()
        .next()
        .ok_or_else(route_not_found_error)?;

    if route.legs.is_empty() {
        return Err(route_not_found_error());
    }

    Ok(Directions {
        distance_meters: route.legs.iter().map(|leg| leg.distance.value).sum(),
        duration_seconds: route.legs.iter().map(|leg| leg.duration.value).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> Response {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn sums_legs() {
        let data = response(json!({
            "status": "OK",
            "routes": [{
                "legs": [
                    { "distance": { "text": "5.0 km", "value": 5000 }, "duration": { "text": "12 mins", "value": 720 } },
                    { "distance": { "text": "2.8 km", "value": 2800 }, "duration": { "text": "6 mins", "value": 360 } }
                ]
            }]
        }));

        let directions = parse_directions(data).unwrap();

        assert_eq!(directions.distance_meters, 7800);
        assert_eq!(directions.duration_seconds, 1080);
    }

    #[test]
    fn zero_results_is_route_not_found() {
        let err = parse_directions(response(json!({ "status": "ZERO_RESULTS" }))).unwrap_err();
        assert!(err.is_route_not_found_error());
    }

    #[test]
    fn quota_errors_are_upstream() {
        let err = parse_directions(response(json!({ "status": "OVER_QUERY_LIMIT" }))).unwrap_err();
        assert_eq!(err, upstream_error());
    }
}
