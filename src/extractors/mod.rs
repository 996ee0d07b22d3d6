//! Request extractors shared by the gateway handlers.

mod body;
mod caller;
mod query;

pub use body::JsonBody;
pub use caller::Caller;
pub use query::QueryPairs;
