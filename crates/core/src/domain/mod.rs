pub mod review;
pub mod review_type;
pub mod user;
