//! Askama view models and rendering helpers.

pub mod views;
