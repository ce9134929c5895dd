//! Client and snapshot store for the province/ward reference datasets.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod store;

pub use client::GeoClient;
pub use error::GeoError;
pub use store::{GeoLookupStore, GeoSnapshot, RefreshSummary};
