mod auth;
mod health_check;
mod sessions;

pub use auth::{get_current_user, login, logout, renew_access_token};
pub use health_check::health_check;
pub use sessions::{revoke_own_sessions, revoke_session, revoke_user_sessions};
