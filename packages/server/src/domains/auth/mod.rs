//! Auth domain - verifies bearer tokens issued to gateway callers
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET` and checked against
//! `JWT_ISSUER`. Issuing tokens is the caller's identity provider's job; the
//! gateway only mints them for tests and local tooling.

pub mod jwt;

pub use jwt::{Claims, JwtService};
