pub mod common;
pub mod dashboard;
pub mod plan;
pub mod transaction;
pub mod user;

pub use common::*;
pub use dashboard::*;
pub use plan::*;
pub use transaction::*;
pub use user::*;
