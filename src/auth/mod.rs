mod authenticator;
pub mod authorizor;
mod platform;
mod user;

pub use authenticator::{Authenticator, DynAuthenticator, SupabaseAuthenticator};
pub use platform::Platform;
pub use user::{bearer_token, User};
