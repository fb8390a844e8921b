// Business domains
pub mod auth;
