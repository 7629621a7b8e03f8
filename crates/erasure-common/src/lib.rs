//! Common types and utilities for the erasure toolkit.
//!
//! This crate provides foundational types used across all erasure crates:
//! - String interning (`Atom`, `ShardedInterner`)
//! - Centralized recursion and stack limits

// String interning for member and type names
pub mod interner;
pub use interner::{Atom, ShardedInterner};

// Centralized limits and thresholds
pub mod limits;
