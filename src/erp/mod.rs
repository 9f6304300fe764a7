//! Access to the host ERP's generic record query endpoint.

pub mod api_types;
pub mod client;
pub mod service;
pub mod types;

pub use client::ErpClient;
pub use service::QueryService;
pub use types::{Condition, Record, SearchOptions};
