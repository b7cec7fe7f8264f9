//! Request handlers.

pub mod bundles;
pub mod health;
pub mod results;
pub mod videos;

pub use bundles::*;
pub use health::*;
pub use results::*;
pub use videos::*;
