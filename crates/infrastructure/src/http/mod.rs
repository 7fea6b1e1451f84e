//! REST clients for the remote authorities

pub mod catalog_client;
pub mod connector;
pub mod dispositioning_client;
pub mod operation_client;
pub mod rest_client;

pub use catalog_client::HttpResourceCatalog;
pub use connector::HttpAuthorityConnector;
pub use dispositioning_client::HttpDispositioningAuthority;
pub use operation_client::HttpOperationAuthority;
pub use rest_client::RestClient;
