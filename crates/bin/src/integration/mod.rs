//! Integration module for the command-line pipeline.
//!
//! Provides the quote cache location and the sequential price download that
//! feeds [`bilbao::analyze`].

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
