//! Reactive value stores.

mod query;
mod writable;

pub use query::{QueryParam, QueryStore};
pub use writable::{Subscription, Writable};
