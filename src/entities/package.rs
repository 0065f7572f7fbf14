use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{validation_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub title: String,
    pub destination: String,
    pub description: String,
    pub price: f64,
    pub duration_days: u32,
    pub image_url: Option<String>,
    pub inclusions: Vec<String>,
    pub rating: Option<f64>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub duration_days: u32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub inclusions: Vec<String>,
}

impl Package {
    pub fn new(params: NewPackage, created_by: Uuid) -> Result<Self, Error> {
        if params.title.trim().is_empty() || params.destination.trim().is_empty() {
            return Err(validation_error("title and destination are required"));
        }

        if !params.price.is_finite() || params.price < 0.0 {
            return Err(validation_error("price must be a non-negative number"));
        }

        if params.duration_days == 0 {
            return Err(validation_error("duration must be at least one day"));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            title: params.title.trim().to_string(),
            destination: params.destination.trim().to_string(),
            description: params.description,
            price: params.price,
            duration_days: params.duration_days,
            image_url: params.image_url,
            inclusions: params.inclusions,
            rating: None,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Inclusive price bounds parsed from `"min-max"`, `"min-"` or `"-max"`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = || validation_error("priceRange must look like min-max");

        let (min, max) = input.trim().split_once('-').ok_or_else(invalid)?;

        let bound = |value: &str| -> Result<Option<f64>, Error> {
            match value.trim() {
                "" => Ok(None),
                value => value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(Some)
                    .ok_or_else(invalid),
            }
        };

        let range = Self {
            min: bound(min)?,
            max: bound(max)?,
        };

        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(invalid());
            }
        }

        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NewPackage {
        NewPackage {
            title: "Darjeeling Getaway".into(),
            destination: "Darjeeling".into(),
            description: "Tea gardens and toy train".into(),
            price: 18500.0,
            duration_days: 4,
            image_url: None,
            inclusions: vec!["Hotel".into(), "Breakfast".into()],
        }
    }

    #[test]
    fn creates_active_package() {
        let package = Package::new(params(), Uuid::new_v4()).unwrap();

        assert!(package.is_active);
        assert_eq!(package.destination, "Darjeeling");
    }

    #[test]
    fn validates_fields() {
        let mut missing = params();
        missing.title = "".into();
        assert!(Package::new(missing, Uuid::new_v4()).is_err());

        let mut free_days = params();
        free_days.duration_days = 0;
        assert!(Package::new(free_days, Uuid::new_v4()).is_err());
    }

    #[test]
    fn price_ranges() {
        assert_eq!(
            PriceRange::parse("1000-5000").unwrap(),
            PriceRange {
                min: Some(1000.0),
                max: Some(5000.0)
            }
        );
        assert_eq!(PriceRange::parse("1000-").unwrap().max, None);
        assert_eq!(PriceRange::parse("-5000").unwrap().min, None);

        assert!(PriceRange::parse("5000-1000").is_err());
        assert!(PriceRange::parse("cheap").is_err());
        assert!(PriceRange::parse("a-b").is_err());
    }
}
