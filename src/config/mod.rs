pub mod types;
pub mod loader;
pub mod validator;
pub mod introspect;

pub use types::*;
pub use loader::*;
pub use validator::*;
pub use introspect::introspect_pool;
