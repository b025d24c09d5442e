//! Data models for the LinkVault application.
//!
//! Field names serialize in camelCase to match the web client.

mod collection;
mod dashboard;
mod highlight;
mod link;
mod revision;
mod rss;
mod tag;
mod user;

pub use collection::*;
pub use dashboard::*;
pub use highlight::*;
pub use link::*;
pub use revision::*;
pub use rss::*;
pub use tag::*;
pub use user::*;
