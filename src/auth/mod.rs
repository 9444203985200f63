//! Authentication: password hashing, session tokens and the request gate

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, IssuedToken, JwtService};
pub use middleware::{authenticate, extract_token, jwt_auth_middleware, AuthContext};
pub use password::PasswordHasher;
