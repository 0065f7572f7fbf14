use oso::{Oso, OsoError, PolarClass};

use crate::auth::{Platform, User};
use crate::entities::Ride;

pub fn new() -> Result<Oso, OsoError> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;
    o.register_class(Ride::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
fn user(roles: &[&str]) -> User {
    User {
        id: uuid::Uuid::new_v4(),
        email: "someone@example.com".into(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
    }
}

#[cfg(test)]
fn ride_for(customer: &User) -> Ride {
    use crate::entities::{PaymentMethod, RideType};

    Ride::new(
        customer.id,
        "Park Street".into(),
        "Howrah Station".into(),
        RideType::Economy,
        7.8,
        PaymentMethod::Cash,
    )
    .unwrap()
}

#[test]
fn platform_admin_test() {
    let authorizor = new().unwrap();

    let admin = user(&["admin"]);
    let customer = user(&["customer"]);

    let result = authorizor.is_allowed(admin.clone(), "create_package", Platform::default());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(customer.clone(), "create_package", Platform::default());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(customer.clone(), "manage_members", Platform::default());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(customer.clone(), "book_ride", Platform::default());
    assert_eq!(result.unwrap(), true);
}

#[test]
fn drivers_cannot_book_test() {
    let authorizor = new().unwrap();

    let driver = user(&["driver"]);

    let result = authorizor.is_allowed(driver.clone(), "book_ride", Platform::default());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn ride_customer_role_test() {
    let authorizor = new().unwrap();

    let customer = user(&["customer"]);
    let stranger = user(&["customer"]);
    let ride = ride_for(&customer);

    let result = authorizor.is_allowed(customer.clone(), "read", ride.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(customer.clone(), "cancel", ride.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(customer.clone(), "start", ride.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(stranger.clone(), "read", ride.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(stranger.clone(), "cancel", ride.clone());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn ride_driver_role_test() {
    let authorizor = new().unwrap();

    let customer = user(&["customer"]);
    let driver = user(&["driver"]);
    let other_driver = user(&["driver"]);
    let mut ride = ride_for(&customer);

    // before accept

    let result = authorizor.is_allowed(driver.clone(), "accept", ride.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(customer.clone(), "accept", ride.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(driver.clone(), "read", ride.clone());
    assert_eq!(result.unwrap(), false);

    ride.accept(driver.id).unwrap();

    // after accept

    let result = authorizor.is_allowed(other_driver.clone(), "accept", ride.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(driver.clone(), "read", ride.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(driver.clone(), "start", ride.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(other_driver.clone(), "complete", ride.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(driver.clone(), "rate", ride.clone());
    assert_eq!(result.unwrap(), false);
}
