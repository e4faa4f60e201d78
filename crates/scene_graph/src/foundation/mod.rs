//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types, the [`math::Transform`] value type and matrix construction
//! - Logging utilities

pub mod math;
pub mod logging;
