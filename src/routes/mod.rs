mod common;
mod gateway;

pub use common::common_routes;
pub use gateway::gateway_routes;
