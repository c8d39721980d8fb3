pub mod jwt;
pub mod password;
pub mod phone;
pub mod timestamp;

pub use jwt::*;
pub use password::*;
pub use phone::*;
pub use timestamp::*;
