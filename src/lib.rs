//! buildstash - commit-keyed build artifact cache
//!
//! Locates the nearest ancestor of a checkout that is published on an
//! upstream branch, searches its lineage for a cached build, restores it and
//! publishes fresh builds keyed to that ancestor.

pub mod archive;
pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod factory;
pub mod lineage;
pub mod resolver;
pub mod ui;
pub mod vcs;

pub use error::{StashError, StashResult};
