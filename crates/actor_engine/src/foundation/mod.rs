//! Foundation module - Core utilities and types
//!
//! - Math types for transforms
//! - Single-owner resources and weak observers
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod resource;
pub mod time;
pub mod logging;
