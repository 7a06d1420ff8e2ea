pub mod preferences;
pub mod query;
pub mod sinks;

pub use preferences::*;
pub use query::*;
pub use sinks::*;
