pub mod catalog_item;
pub mod genre;
pub mod preferences;
pub mod request;

pub use catalog_item::*;
pub use genre::*;
pub use preferences::*;
pub use request::*;
