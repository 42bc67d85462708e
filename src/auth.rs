mod admin_guard;
mod credentials;
mod tokens;

pub use admin_guard::Administrator;
pub use credentials::BearerToken;
pub use tokens::{AdminRole, AdminTokens, ROLE_HEADER};
