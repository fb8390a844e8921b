// Research Gateway - API Core
//
// HTTP gateway over the Gemini deep research provider. The job lifecycle
// lives in the gemini-client package; this crate owns configuration, auth
// and the HTTP surface.

pub mod config;
pub mod domains;
pub mod server;

pub use config::*;
