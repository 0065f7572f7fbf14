use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RideType;
use crate::error::{forbidden_error, invalid_invocation_error, validation_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

impl Role {
    pub fn name(&self) -> String {
        match self {
            Self::Customer => "customer".into(),
            Self::Driver => "driver".into(),
            Self::Admin => "admin".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    PendingVerification,
    Verified,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::PendingVerification => "pending_verification".into(),
            Self::Verified => "verified".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub plate_number: String,
    pub vehicle_type: RideType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDetails {
    pub license_number: String,
    pub vehicle: Vehicle,
    pub is_available: bool,
}

/// Profile of a registered user; the id is the auth provider's subject id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub status: Status,
    pub driver: Option<DriverDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a member may change on their own profile.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_available: Option<bool>,
}

impl Member {
    pub fn new(
        id: Uuid,
        email: String,
        name: String,
        phone: Option<String>,
        role: Role,
        driver: Option<DriverDetails>,
    ) -> Result<Self, Error> {
        if name.trim().is_empty() {
            return Err(validation_error("name is required"));
        }

        let (status, driver) = match (role, driver) {
            (Role::Driver, Some(mut details)) => {
                if details.license_number.trim().is_empty()
                    || details.vehicle.plate_number.trim().is_empty()
                {
                    return Err(validation_error(
                        "licence number and plate number are required for drivers",
                    ));
                }

                details.license_number = details.license_number.trim().to_uppercase();
                details.vehicle.plate_number = details.vehicle.plate_number.trim().to_uppercase();
                details.is_available = false;

                (Status::PendingVerification, Some(details))
            }
            (Role::Driver, None) => {
                return Err(validation_error("driver details are required for drivers"));
            }
            (_, _) => (Status::Verified, None),
        };

        let now = Utc::now();

        Ok(Self {
            id,
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            phone,
            avatar_url: None,
            role,
            status,
            driver,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.status, Status::Verified)
    }

    pub fn is_available_driver(&self) -> bool {
        self.role == Role::Driver
            && self.is_verified()
            && self.driver.as_ref().map_or(false, |d| d.is_available)
    }

    pub fn apply(&mut self, update: ProfileUpdate) -> Result<(), Error> {
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(validation_error("name cannot be empty"));
            }
            self.name = name.trim().to_string();
        }

        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }

        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = Some(avatar_url);
        }

        if let Some(is_available) = update.is_available {
            self.set_available(is_available)?;
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_available(&mut self, is_available: bool) -> Result<(), Error> {
        if is_available && !self.is_verified() {
            return Err(invalid_invocation_error());
        }

        match self.driver.as_mut() {
            Some(details) => {
                details.is_available = is_available;
                self.updated_at = Utc::now();
                Ok(())
            }
            None => Err(invalid_invocation_error()),
        }
    }

    /// Takes the driver off the market for a newly accepted ride.
    pub fn claim_for_ride(&mut self) -> Result<(), Error> {
        if self.role != Role::Driver || !self.is_verified() {
            return Err(forbidden_error());
        }

        if !self.is_available_driver() {
            return Err(invalid_invocation_error());
        }

        self.set_available(false)
    }

    #[tracing::instrument(skip(self), fields(member_id = %self.id))]
    pub fn verify(&mut self) -> Result<(), Error> {
        match (self.role, self.status) {
            (Role::Driver, Status::PendingVerification) => {
                self.status = Status::Verified;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> DriverDetails {
        DriverDetails {
            license_number: " wb-0120230012345 ".into(),
            vehicle: Vehicle {
                make: "Maruti".into(),
                model: "Dzire".into(),
                plate_number: "wb 02 ab 1234".into(),
                vehicle_type: RideType::Economy,
            },
            is_available: true,
        }
    }

    fn driver() -> Member {
        Member::new(
            Uuid::new_v4(),
            "Driver@Example.com".into(),
            "Anil".into(),
            None,
            Role::Driver,
            Some(details()),
        )
        .unwrap()
    }

    #[test]
    fn customers_are_verified_immediately() {
        let customer = Member::new(
            Uuid::new_v4(),
            "rupa@example.com".into(),
            "Rupa".into(),
            Some("+91 98300 00000".into()),
            Role::Customer,
            Some(details()),
        )
        .unwrap();

        assert!(customer.is_verified());
        assert!(customer.driver.is_none());
    }

    #[test]
    fn drivers_start_unverified_and_unavailable() {
        let driver = driver();

        assert_eq!(driver.status, Status::PendingVerification);
        assert_eq!(driver.email, "driver@example.com");
        let details = driver.driver.as_ref().unwrap();
        assert_eq!(details.vehicle.plate_number, "WB 02 AB 1234");
        assert_eq!(details.license_number, "WB-0120230012345");
        assert!(!details.is_available);
        assert!(!driver.is_available_driver());
    }

    #[test]
    fn drivers_need_details() {
        let result = Member::new(
            Uuid::new_v4(),
            "x@example.com".into(),
            "X".into(),
            None,
            Role::Driver,
            None,
        );

        assert_eq!(result.unwrap_err().code, 102);
    }

    #[test]
    fn unverified_driver_cannot_go_online() {
        let mut driver = driver();
        assert!(driver.set_available(true).is_err());

        driver.verify().unwrap();
        driver
            .apply(ProfileUpdate {
                is_available: Some(true),
                ..Default::default()
            })
            .unwrap();

        assert!(driver.is_available_driver());
        assert!(driver.verify().is_err());
    }

    #[test]
    fn profile_update_is_whitelisted() {
        let mut driver = driver();
        let update: ProfileUpdate = serde_json::from_value(serde_json::json!({
            "name": "Anil Kumar",
            "phone": "+91 90000 00000",
            "role": "admin",
            "email": "evil@example.com"
        }))
        .unwrap();

        driver.apply(update).unwrap();

        assert_eq!(driver.name, "Anil Kumar");
        assert_eq!(driver.role, Role::Driver);
        assert_eq!(driver.email, "driver@example.com");
    }

    #[test]
    fn busy_driver_cannot_claim_another_ride() {
        let mut driver = driver();
        driver.verify().unwrap();
        driver.set_available(true).unwrap();

        driver.claim_for_ride().unwrap();
        assert!(!driver.is_available_driver());

        let err = driver.claim_for_ride().unwrap_err();
        assert_eq!(err, invalid_invocation_error());
    }

    #[test]
    fn unverified_driver_cannot_claim_a_ride() {
        let mut driver = driver();

        assert_eq!(driver.claim_for_ride().unwrap_err(), forbidden_error());
    }
}
