pub mod auth_service;
pub mod payment_service;
pub mod plan_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::*;
pub use payment_service::*;
pub use plan_service::*;
pub use user_service::*;
