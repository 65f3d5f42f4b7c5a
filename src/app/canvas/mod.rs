mod build;
mod interaction;
mod view;

pub(in crate::app) use build::{AXIS_PROPERTY_KINDS, resolve_saved_property, ruler_for};
