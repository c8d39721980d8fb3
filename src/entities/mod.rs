pub mod plans;
pub mod transactions;
pub mod users;

pub use plans as plan_entity;
pub use transactions as transaction_entity;
pub use transactions::{TransactionStatus, TransactionType};
pub use users as user_entity;
