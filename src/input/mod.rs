pub mod navigation;

pub use navigation::{Direction, FocusGrid, InputAction};
