pub mod aspect;
pub mod card;
pub mod geometry_cache;
pub mod grid;

pub use aspect::{resolve, AspectQuery, CardShape, PlaceholderKind};
pub use card::{CardHeights, CardModel, CardResolver, EdgeBanner, ResolutionBadge, WatchedBadge};
pub use geometry_cache::{GeometryCache, GeometryKey};
pub use grid::{viewport_from_display, GridGeometry, GridSolver, Viewport};
