//! API handlers for all routes
//!
//! This module contains the HTTP handlers for the ingest and admin surface.

pub mod blocks;
pub mod campaigns;
pub mod dashboard;
pub mod events;
pub mod rules;
pub mod settings;
