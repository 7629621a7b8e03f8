//! Centralized limits and thresholds.
//!
//! This module provides shared constants for recursion depths and stack
//! growth used by the expression rewriter, the evaluator and the codec.
//!
//! # Comparator and unifier limits
//!
//! Recursion limits for type-level algorithms (structural comparison,
//! unification, type rewriting) are centralized in
//! `erasure_types::recursion::RecursionProfile` rather than here. The
//! profiles are the single source of truth for type-level recursion.

// =============================================================================
// Recursion Depth Limits (Expressions / Values)
// =============================================================================

/// Maximum nesting depth of an expression tree accepted by the rewriter.
///
/// Each nested node adds a frame; deeper trees are rejected with
/// `ExprError::DepthExceeded` instead of overflowing the stack.
pub const MAX_EXPR_REWRITE_DEPTH: u32 = 2_000;

/// Maximum depth of a constant object graph walked during conversion.
///
/// Cycles never count against this limit: an object already being converted
/// is resolved through the identity memo. The limit only bounds long acyclic
/// chains (for example a linked list with thousands of nodes).
pub const MAX_CONSTANT_GRAPH_DEPTH: u32 = 10_000;

/// Maximum nesting depth for the evaluator.
pub const MAX_EVAL_DEPTH: u32 = 2_000;

// =============================================================================
// Stack growth
// =============================================================================

/// Remaining stack (in bytes) below which recursive walkers grow the stack.
pub const STACK_RED_ZONE: usize = 128 * 1024;

/// Size (in bytes) of each new stack segment allocated by `stacker`.
pub const STACK_GROWTH: usize = 2 * 1024 * 1024;
