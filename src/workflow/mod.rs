pub mod bulk;
pub mod policy;
pub mod review;
