// HTTP routes
pub mod deep_research;
pub mod health;

pub use deep_research::*;
pub use health::*;
