//! Authentication helpers: password hashing for the in-memory accounts and the
//! session key the web layer stores the signed-in user under.

mod password;
mod session;

pub use password::{hash_password, verify_password};
pub use session::SESSION_USER_KEY;
