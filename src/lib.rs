//! Chorus: a server-rendered community blog with groups, comments, and a follow graph.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
