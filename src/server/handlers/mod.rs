pub mod admin;
pub mod fares;
pub mod packages;
pub mod rides;
pub mod users;
