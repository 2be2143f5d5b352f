use std::collections::HashMap;

use crate::model::MethodIdentity;

/// Tracks which methods are active on a context's stack and tags reentrant
/// calls with a recursion depth.
///
/// The first active call of a method records under its base identity; a
/// call made while `n` calls of the same method are already active records
/// under the variant tagged `n`. Bounded recursion therefore stays a finite
/// chain `m`, `m-1`, `m-2`, ... instead of a cycle.
#[derive(Debug, Clone, Default)]
pub struct RecursionResolver {
    active: HashMap<MethodIdentity, u32>,
}

impl RecursionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity a new call of `candidate` should be recorded under.
    pub fn resolve(&self, candidate: &MethodIdentity) -> MethodIdentity {
        let base = candidate.base();
        match self.active.get(&base) {
            Some(&depth) if depth > 0 => base.variant(depth),
            _ => base,
        }
    }

    /// Number of calls of this method (any depth) currently active.
    pub fn active_calls(&self, identity: &MethodIdentity) -> u32 {
        self.active.get(&identity.base()).copied().unwrap_or(0)
    }

    pub fn push(&mut self, identity: &MethodIdentity) {
        *self.active.entry(identity.base()).or_default() += 1;
    }

    pub fn pop(&mut self, identity: &MethodIdentity) {
        let base = identity.base();
        if let Some(count) = self.active.get_mut(&base) {
            *count -= 1;
            if *count == 0 {
                self.active.remove(&base);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_uses_base_identity() {
        let resolver = RecursionResolver::new();
        let m = MethodIdentity::global("simple");
        assert_eq!(resolver.resolve(&m), m);
    }

    #[test]
    fn reentry_is_tagged_with_active_count() {
        let mut resolver = RecursionResolver::new();
        let m = MethodIdentity::global("simple");

        resolver.push(&m);
        let first = resolver.resolve(&m);
        assert_eq!(first.full_name(), "simple-1");

        resolver.push(&first);
        let second = resolver.resolve(&m);
        assert_eq!(second.full_name(), "simple-2");
        assert_eq!(resolver.active_calls(&m), 2);

        resolver.pop(&first);
        resolver.pop(&m);
        assert_eq!(resolver.active_calls(&m), 0);
        assert_eq!(resolver.resolve(&m), m);
    }

    #[test]
    fn other_methods_do_not_interfere() {
        let mut resolver = RecursionResolver::new();
        resolver.push(&MethodIdentity::global("a"));
        let b = MethodIdentity::global("b");
        assert_eq!(resolver.resolve(&b), b);
    }
}
