pub mod error;
pub mod route;
pub mod response;

pub use error::ApiError;
pub use route::create_router;
pub use response::items_with_total_count;
