pub mod audit;
pub mod leave;
pub mod notification;
pub mod role;
