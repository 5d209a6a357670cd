pub mod server;
pub mod handlers;
pub mod identity;
pub mod types;

pub use server::{router, RpcServer, RpcState};
pub use identity::{Identity, USER_ID_COOKIE};
pub use types::ApiError;
