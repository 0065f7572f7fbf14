mod member;
mod package;
mod ride;

pub use member::{DriverDetails, Member, ProfileUpdate, Role, Status as MemberStatus, Vehicle};
pub use package::{NewPackage, Package, PriceRange};
pub use ride::{PaymentMethod, Ride, RideType, Status as RideStatus, BOOKING_BASE_FARE};
