mod engine;
pub mod palette;

pub use engine::{GroupEngine, GroupId};
