pub mod audit;
pub mod bulk;
pub mod leave;
pub mod notification;
pub mod reports;
pub mod review;
