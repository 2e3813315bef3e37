//! Authentication module for authgate

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtError, JwtManager, VerifyError};
pub use middleware::{
    is_public_operation, require_auth, AuthError, AuthMethod, AuthState, AuthUser,
    PLAYGROUND_USER_ID, PUBLIC_OPERATIONS,
};
pub use password::{PasswordError, PasswordService};
