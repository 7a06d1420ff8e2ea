//! Browse grid for a TV media catalog: card geometry, aspect selection and an
//! incrementally loaded item collection driven by a focus-based controller.

pub mod browse;
pub mod config;
pub mod error;
pub mod input;
pub mod layout;
pub mod models;
pub mod services;

pub use browse::{BrowseController, BrowseEvent, BrowseServices, BrowseState, FolderContext};
pub use config::BrowseConfig;
pub use error::{BrowseError, QueryError, Result};
pub use layout::{GridGeometry, GridSolver, Viewport};
