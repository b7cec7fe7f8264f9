//! HTTP clients for the external detection and search services.
//!
//! - [`MlClient`]: inference service hosting the clothing and person
//!   detectors and the per-category similarity indices
//! - [`JewelryApiClient`]: hosted jewelry detector
//!
//! Requests are made exactly once; callers decide how to handle failures.

pub mod client;
pub mod error;
pub mod jewelry;
pub mod types;

pub use client::{MlClient, MlClientConfig, PERSON_LABEL_ID};
pub use error::{MlError, MlResult};
pub use jewelry::{JewelryApiClient, JewelryApiConfig};
pub use types::*;
