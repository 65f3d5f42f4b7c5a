mod item;
mod layout;
mod navigation;
pub mod ruler;
mod scale;

pub use item::TimelineItems;
pub use layout::{LayoutParams, TimelineLayout};
pub use navigation::{Navigator, ZoomAnchor};
pub use scale::Scale;
