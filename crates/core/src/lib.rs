pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod source;

pub use domain::review::{Review, ReviewEnvelope, ReviewId, ReviewsData};
pub use domain::review_type::ReviewType;
pub use domain::user::User;
pub use errors::{InterfaceError, SwarmError};
pub use source::ReviewSource;
