pub mod gateway;
pub mod mpesa;

pub use gateway::*;
pub use mpesa::*;
