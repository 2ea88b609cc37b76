//! Data models for the NoodlePicks web layer.
//!
//! These mirror the backend's JSON payloads field for field; deserializing into
//! them is the schema check for every response the client consumes.

mod metrics;
mod movie;
mod rating;
mod recommendation;
mod user;

pub use metrics::*;
pub use movie::*;
pub use rating::*;
pub use recommendation::*;
pub use user::*;
