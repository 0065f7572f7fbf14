use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{
    DriverDetails, Member, NewPackage, Package, PaymentMethod, PriceRange, ProfileUpdate, Ride,
    RideStatus, RideType, Role,
};
use crate::error::Error;
use crate::fare::{Estimator, FareEstimate, PricingConfig};

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, i64::MAX / MAX_PAGE_LIMIT),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            current_page: pagination.page,
            total_pages: pagination.total_pages(total),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PackageFilter {
    pub destination: Option<String>,
    pub price_range: PriceRange,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRide {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideType,
    pub distance_km: f64,
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverMatch {
    pub driver: Member,
    pub distance_km: f64,
    pub eta_minutes: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub phone: Option<String>,
    pub driver: Option<DriverDetails>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Stats {
    #[serde(rename_all = "camelCase")]
    Customer {
        total_rides: i64,
        completed_rides: i64,
        cancelled_rides: i64,
        total_spent: f64,
    },
    #[serde(rename_all = "camelCase")]
    Driver {
        total_trips: i64,
        completed_trips: i64,
        total_earnings: f64,
        average_rating: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Admin {
        total_customers: i64,
        total_drivers: i64,
        pending_drivers: i64,
        total_rides: i64,
        completed_rides: i64,
        total_revenue: f64,
    },
}

#[async_trait]
pub trait PackageAPI {
    async fn list_packages(
        &self,
        filter: PackageFilter,
        pagination: Pagination,
    ) -> Result<Page<Package>, Error>;
    async fn find_package(&self, id: Uuid) -> Result<Package, Error>;
    async fn create_package(&self, user: User, params: NewPackage) -> Result<Package, Error>;
}

#[async_trait]
pub trait RideAPI {
    async fn book_ride(&self, user: User, params: BookRide) -> Result<Ride, Error>;
    async fn find_ride(&self, user: User, id: Uuid) -> Result<Ride, Error>;
    async fn list_my_rides(
        &self,
        user: User,
        status: Option<RideStatus>,
        pagination: Pagination,
    ) -> Result<Page<Ride>, Error>;
    async fn find_drivers(
        &self,
        user: User,
        ride_type: Option<RideType>,
    ) -> Result<Vec<DriverMatch>, Error>;
    async fn cancel_ride(&self, user: User, id: Uuid, reason: Option<String>)
        -> Result<Ride, Error>;
    async fn rate_ride(
        &self,
        user: User,
        id: Uuid,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<Ride, Error>;
    async fn accept_ride(&self, user: User, id: Uuid) -> Result<Ride, Error>;
    async fn start_ride(&self, user: User, id: Uuid) -> Result<Ride, Error>;
    async fn complete_ride(&self, user: User, id: Uuid) -> Result<Ride, Error>;
}

#[async_trait]
pub trait MemberAPI {
    async fn register_member(&self, user: User, params: Registration) -> Result<Member, Error>;
    async fn find_profile(&self, user: User) -> Result<Member, Error>;
    async fn update_profile(&self, user: User, update: ProfileUpdate) -> Result<Member, Error>;
    async fn member_stats(&self, user: User) -> Result<Stats, Error>;
}

#[async_trait]
pub trait AdminAPI {
    async fn list_members(
        &self,
        user: User,
        role: Option<Role>,
        pagination: Pagination,
    ) -> Result<Page<Member>, Error>;
    async fn list_rides(
        &self,
        user: User,
        status: Option<RideStatus>,
        pagination: Pagination,
    ) -> Result<Page<Ride>, Error>;
    async fn verify_driver(&self, user: User, id: Uuid) -> Result<Member, Error>;
}

#[async_trait]
pub trait FareAPI {
    async fn estimate_fare(&self, pickup: String, destination: String)
        -> Result<FareEstimate, Error>;
    fn pricing_config(&self) -> PricingConfig;
    fn estimator(&self) -> Estimator;
}

pub trait API: PackageAPI + RideAPI + MemberAPI + AdminAPI + FareAPI {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(Pagination::default(), Pagination { page: 1, limit: 10 });
        assert_eq!(
            Pagination::new(Some(0), Some(1000)),
            Pagination { page: 1, limit: 100 }
        );
        assert_eq!(Pagination::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn huge_pages_do_not_overflow_offset() {
        let pagination = Pagination::new(Some(i64::MAX), Some(MAX_PAGE_LIMIT));

        assert_eq!(pagination.page, i64::MAX / MAX_PAGE_LIMIT);
        assert!(pagination.offset() >= 0);
        assert!(pagination.offset() <= i64::MAX - MAX_PAGE_LIMIT);
    }

    #[test]
    fn page_counts_round_up() {
        let pagination = Pagination::new(Some(1), Some(10));

        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(10), 1);
        assert_eq!(pagination.total_pages(11), 2);
    }

    #[test]
    fn stats_are_tagged_by_role() {
        let stats = Stats::Customer {
            total_rides: 3,
            completed_rides: 2,
            cancelled_rides: 1,
            total_spent: 420.0,
        };

        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["role"], "customer");
        assert_eq!(value["totalSpent"], 420.0);
    }
}
