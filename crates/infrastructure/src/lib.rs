pub mod http;
pub mod observability;

pub use http::*;
pub use observability::*;
