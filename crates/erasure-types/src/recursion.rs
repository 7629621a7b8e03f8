//! Recursion guards for the recursive walks over types, expressions and
//! constant object graphs.
//!
//! Two guards are provided:
//!
//! - [`RecursionGuard`]: cycle detection over keys plus depth and iteration
//!   limits. Used where re-entering the same key means a cycle (entity type
//!   resolution, wildcard resolution).
//! - [`DepthCounter`]: depth limit only. Used where the same node may be
//!   legitimately revisited (expression rewriting, constant conversion).
//!
//! [`RecursionProfile`] names the limit presets so call sites document why a
//! guard exists instead of carrying magic numbers.
//!
//! In debug builds both guards panic when dropped with active entries, which
//! catches a forgotten `leave()` on an early-return path.

use rustc_hash::FxHashSet;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// RecursionProfile
// ---------------------------------------------------------------------------

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Structural comparison of generated types.
    ///
    /// depth = 200, iterations = 100,000
    StructuralComparison,

    /// Resolution of wildcard bindings after unification.
    ///
    /// depth = 100, iterations = 100,000
    Unification,

    /// Rewriting of types reachable from entity types.
    ///
    /// depth = 500, iterations = 1,000,000
    TypeRewrite,

    /// Expression tree rewriting and evaluation.
    ///
    /// depth = 2,000
    ExpressionRewrite,

    /// Constant object graph conversion. Long acyclic chains (linked lists)
    /// nest as deep as they are long.
    ///
    /// depth = 10,000
    ConstantGraph,

    /// Read-only discovery of entity types.
    ///
    /// depth = 500, iterations = 1,000,000
    EntityDiscovery,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    /// Maximum recursion depth for this profile.
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::StructuralComparison => 200,
            Self::Unification => 100,
            Self::TypeRewrite => 500,
            Self::ExpressionRewrite => erasure_common::limits::MAX_EXPR_REWRITE_DEPTH,
            Self::ConstantGraph => erasure_common::limits::MAX_CONSTANT_GRAPH_DEPTH,
            Self::EntityDiscovery => 500,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    /// Maximum iteration count for this profile.
    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::StructuralComparison | Self::Unification => 100_000,
            Self::TypeRewrite | Self::EntityDiscovery => 1_000_000,
            Self::ExpressionRewrite | Self::ConstantGraph => u32::MAX,
            Self::Custom { max_iterations, .. } => max_iterations,
        }
    }
}

// ---------------------------------------------------------------------------
// RecursionResult
// ---------------------------------------------------------------------------

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    /// Proceed with the computation.
    Entered,
    /// This key is already being visited.
    Cycle,
    /// Maximum recursion depth exceeded.
    DepthExceeded,
    /// Maximum iteration count exceeded.
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    /// Returns `true` if any limit was exceeded (depth or iterations).
    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

// ---------------------------------------------------------------------------
// RecursionGuard
// ---------------------------------------------------------------------------

/// Tracks the keys currently being visited together with depth and
/// iteration counters.
///
/// ```ignore
/// let mut guard = RecursionGuard::with_profile(RecursionProfile::TypeRewrite);
/// match guard.enter(ty) {
///     RecursionResult::Entered => {
///         let result = resolve(ty);
///         guard.leave(ty);
///         result
///     }
///     RecursionResult::Cycle => handle_cycle(),
///     _ => handle_exceeded(),
/// }
/// ```
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    /// Create a guard with explicit limits.
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter a recursive computation for `key`.
    ///
    /// On [`RecursionResult::Entered`] the caller must call
    /// [`leave`](Self::leave) with the same key when done.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.visiting.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }

        self.visiting.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    /// Leave a computation previously entered with [`enter`](Self::enter).
    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` inside a guarded scope for `key`.
    pub fn scope<T>(&mut self, key: K, f: impl FnOnce() -> T) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let result = f();
                self.leave(key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Sticky: stays `true` until [`reset`](Self::reset).
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    /// Reset all state while preserving configured limits.
    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len(),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// DepthCounter
// ---------------------------------------------------------------------------

/// Depth-only guard for stack overflow protection.
///
/// ```ignore
/// if !counter.enter() {
///     return Err(ExprError::DepthExceeded { limit: counter.max_depth() });
/// }
/// let result = rewrite(node);
/// counter.leave();
/// result
/// ```
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
    exceeded: bool,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            exceeded: false,
        }
    }

    /// Only the profile's `max_depth` is used.
    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    /// Try to enter a deeper level. On `false` the depth is not incremented
    /// and `leave()` must not be called.
    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave() called at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn reset(&mut self) {
        self.depth = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!(
                "DepthCounter dropped with depth {}; enter() without matching leave()",
                self.depth
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_detects_cycle() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(1u32), RecursionResult::Cycle);
        assert_eq!(guard.enter(2u32), RecursionResult::Entered);
        assert_eq!(guard.depth(), 2);
        guard.leave(2);
        guard.leave(1);
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_guard_depth_limit_is_sticky() {
        let mut guard = RecursionGuard::new(1, 100);
        assert!(guard.enter(1u32).is_entered());
        assert_eq!(guard.enter(2u32), RecursionResult::DepthExceeded);
        guard.leave(1);
        assert!(guard.is_exceeded());
        guard.reset();
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn test_guard_iteration_limit() {
        let mut guard = RecursionGuard::new(10, 2);
        assert!(guard.enter(1u32).is_entered());
        guard.leave(1);
        assert!(guard.enter(1u32).is_entered());
        guard.leave(1);
        assert_eq!(guard.enter(1u32), RecursionResult::IterationExceeded);
    }

    #[test]
    fn test_scope_leaves_on_return() {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::Unification);
        let value = guard.scope(7u32, || 42).expect("entered");
        assert_eq!(value, 42);
        assert!(!guard.is_visiting(&7));
    }

    #[test]
    fn test_depth_counter_limit() {
        let mut counter = DepthCounter::new(2);
        assert!(counter.enter());
        assert!(counter.enter());
        assert!(!counter.enter());
        assert!(counter.is_exceeded());
        counter.leave();
        counter.leave();
        assert_eq!(counter.depth(), 0);
    }

    #[test]
    fn test_profiles_use_shared_limits() {
        assert_eq!(
            RecursionProfile::ConstantGraph.max_depth(),
            erasure_common::limits::MAX_CONSTANT_GRAPH_DEPTH
        );
        let custom = RecursionProfile::Custom {
            max_depth: 3,
            max_iterations: 9,
        };
        assert_eq!(custom.max_depth(), 3);
        assert_eq!(custom.max_iterations(), 9);
    }
}
