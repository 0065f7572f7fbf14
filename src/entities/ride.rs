use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_invocation_error, validation_error, Error};

/// Base fare charged on every booked ride.
pub const BOOKING_BASE_FARE: f64 = 50.0;

/// Longest trip a single booking may cover.
pub const MAX_RIDE_DISTANCE_KM: f64 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideType {
    Economy,
    Comfort,
    Luxury,
}

impl RideType {
    pub fn rate_per_km(&self) -> f64 {
        match self {
            Self::Economy => 12.0,
            Self::Comfort => 18.0,
            Self::Luxury => 25.0,
        }
    }

    pub fn booking_fare(&self, distance_km: f64) -> u32 {
        (BOOKING_BASE_FARE + distance_km * self.rate_per_km()).round() as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Requested => "requested".into(),
            Self::Accepted => "accepted".into(),
            Self::InProgress => "in_progress".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideType,
    pub distance_km: f64,
    pub estimated_fare: u32,
    pub payment_method: PaymentMethod,
    pub status: Status,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub cancellation_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Ride {
    pub fn new(
        customer_id: Uuid,
        pickup_location: String,
        dropoff_location: String,
        ride_type: RideType,
        distance_km: f64,
        payment_method: PaymentMethod,
    ) -> Result<Self, Error> {
        if pickup_location.trim().is_empty() || dropoff_location.trim().is_empty() {
            return Err(validation_error("pickup and dropoff locations are required"));
        }

        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(validation_error("distance must be a non-negative number"));
        }

        if distance_km > MAX_RIDE_DISTANCE_KM {
            return Err(validation_error(format!(
                "distance cannot exceed {} km",
                MAX_RIDE_DISTANCE_KM
            )));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            customer_id,
            driver_id: None,
            pickup_location: pickup_location.trim().to_string(),
            dropoff_location: dropoff_location.trim().to_string(),
            ride_type,
            distance_km,
            estimated_fare: ride_type.booking_fare(distance_km),
            payment_method,
            status: Status::Requested,
            rating: None,
            feedback: None,
            cancellation_reason: None,
            requested_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn is_customer(&self, user_id: String) -> bool {
        self.customer_id.to_string() == user_id
    }

    pub fn is_driver(&self, user_id: String) -> bool {
        self.driver_id
            .map_or(false, |driver_id| driver_id.to_string() == user_id)
    }

    fn transition(&mut self, status: Status) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    #[tracing::instrument(skip(self), fields(ride_id = %self.id))]
    pub fn accept(&mut self, driver_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Requested => {
                self.driver_id = Some(driver_id);
                self.transition(Status::Accepted);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    #[tracing::instrument(skip(self), fields(ride_id = %self.id))]
    pub fn start(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Accepted => {
                self.transition(Status::InProgress);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    #[tracing::instrument(skip(self), fields(ride_id = %self.id))]
    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.transition(Status::Completed);
                self.completed_at = Some(self.updated_at);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Cancels the ride, returning the driver that was holding it, if any.
    #[tracing::instrument(skip(self), fields(ride_id = %self.id))]
    pub fn cancel(&mut self, reason: Option<String>) -> Result<Option<Uuid>, Error> {
        match self.status {
            Status::Requested | Status::Accepted => {
                self.cancellation_reason = reason;
                self.transition(Status::Cancelled);
                Ok(self.driver_id)
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    pub fn rate(&mut self, rating: u8, feedback: Option<String>) -> Result<(), Error> {
        if !(1..=5).contains(&rating) {
            return Err(validation_error("rating must be between 1 and 5"));
        }

        match self.status {
            Status::Completed if self.rating.is_none() => {
                self.rating = Some(rating);
                self.feedback = feedback;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }
}

impl PolarClass for Ride {
    fn get_polar_class_builder() -> oso::ClassBuilder<Ride> {
        oso::Class::builder()
            .name("Ride")
            .add_attribute_getter("status", |recv: &Ride| recv.status.name())
            .add_method("is_customer", Ride::is_customer)
            .add_method("is_driver", Ride::is_driver)
    }

    fn get_polar_class() -> oso::Class {
        let builder = Ride::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride() -> Ride {
        Ride::new(
            Uuid::new_v4(),
            "Park Street".into(),
            "Howrah Station".into(),
            RideType::Comfort,
            7.8,
            PaymentMethod::Upi,
        )
        .unwrap()
    }

    #[test]
    fn booking_fare_uses_ride_type_rate() {
        assert_eq!(RideType::Economy.booking_fare(7.8), 144);
        assert_eq!(RideType::Comfort.booking_fare(7.8), 190);
        assert_eq!(RideType::Luxury.booking_fare(7.8), 245);
        assert_eq!(RideType::Economy.booking_fare(0.0), 50);
    }

    #[test]
    fn absurd_distances_are_rejected() {
        let book = |distance_km| {
            Ride::new(
                Uuid::new_v4(),
                "Park Street".into(),
                "Howrah Station".into(),
                RideType::Luxury,
                distance_km,
                PaymentMethod::Cash,
            )
        };

        let longest = book(MAX_RIDE_DISTANCE_KM).unwrap();
        assert_eq!(longest.estimated_fare, 25_050);

        let err = book(1e12).unwrap_err();
        assert_eq!(err.code, validation_error("").code);
    }

    #[test]
    fn new_ride_is_requested() {
        let ride = ride();

        assert_eq!(ride.status, Status::Requested);
        assert_eq!(ride.estimated_fare, 190);
        assert!(ride.driver_id.is_none());
    }

    #[test]
    fn booking_requires_locations_and_distance() {
        let customer = Uuid::new_v4();

        let missing = Ride::new(
            customer,
            " ".into(),
            "Esplanade".into(),
            RideType::Economy,
            3.0,
            PaymentMethod::Cash,
        );
        assert_eq!(missing.unwrap_err().code, 102);

        let negative = Ride::new(
            customer,
            "Gariahat".into(),
            "Esplanade".into(),
            RideType::Economy,
            -3.0,
            PaymentMethod::Cash,
        );
        assert_eq!(negative.unwrap_err().code, 102);
    }

    #[test]
    fn full_lifecycle() {
        let mut ride = ride();
        let driver_id = Uuid::new_v4();

        ride.accept(driver_id).unwrap();
        assert!(ride.is_driver(driver_id.to_string()));
        ride.start().unwrap();
        ride.complete().unwrap();

        assert_eq!(ride.status, Status::Completed);
        assert!(ride.completed_at.is_some());

        ride.rate(5, Some("smooth ride".into())).unwrap();
        assert_eq!(ride.rating, Some(5));
        // a ride is rated once
        assert!(ride.rate(4, None).is_err());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut ride = ride();

        assert!(ride.start().is_err());
        assert!(ride.complete().is_err());
        assert!(ride.rate(5, None).is_err());

        ride.accept(Uuid::new_v4()).unwrap();
        assert!(ride.accept(Uuid::new_v4()).is_err());
    }

    #[test]
    fn cancel_frees_driver_until_trip_starts() {
        let mut ride = ride();
        assert_eq!(ride.cancel(None).unwrap(), None);

        let mut ride = self::ride();
        let driver_id = Uuid::new_v4();
        ride.accept(driver_id).unwrap();
        assert_eq!(ride.cancel(Some("changed plans".into())).unwrap(), Some(driver_id));
        assert_eq!(ride.status, Status::Cancelled);

        let mut ride = self::ride();
        ride.accept(driver_id).unwrap();
        ride.start().unwrap();
        assert!(ride.cancel(None).is_err());
    }

    #[test]
    fn rating_out_of_range() {
        let mut ride = ride();
        ride.accept(Uuid::new_v4()).unwrap();
        ride.start().unwrap();
        ride.complete().unwrap();

        assert_eq!(ride.rate(0, None).unwrap_err().code, 102);
        assert_eq!(ride.rate(6, None).unwrap_err().code, 102);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(ride()).unwrap();

        assert_eq!(value["estimatedFare"], 190);
        assert_eq!(value["status"], "requested");
        assert_eq!(value["rideType"], "comfort");
    }
}
