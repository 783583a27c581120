//! Authentication module
//!
//! - Token issuance and verification (signed, then encrypted to the server's own key)
//! - Password hashing with Argon2
//! - Middleware that resolves the bearer token into a request identity
//! - Login service

pub mod codec;
pub mod identity;
pub mod keys;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use codec::{CodecError, Encrypter, RsaTokenCodec, Signer, TokenCodec};
pub use identity::AuthenticatedUser;
pub use keys::{KeyError, RsaKeyPair};
pub use middleware::{auth_middleware, bearer_token, AuthError};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthService, LoginRequest, LoginResponse};
pub use token::{Claims, TokenAuthority, TokenError};
