//! `aurum-auth` — user records and token validation.
//!
//! Authentication itself is delegated to an external identity provider; this
//! crate keeps the mirrored user record (with its `is_admin` gate) and the
//! claims/token plumbing needed to resolve a bearer token to a `UserId`.

pub mod claims;
pub mod token;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use token::{Hs256TokenCodec, TokenError};
pub use user::{User, require_admin};
