//! Marks call sites that sit below another call of the same method.
//!
//! A call site is *minimal* when no ancestor on its path calls the same
//! method, recursion variants included. Summing totals over minimal call
//! sites only never counts a nested self-recursive span twice.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::model::{CallTree, MethodIdentity, NodeId};

enum Step<K> {
    Enter(NodeId),
    Exit(K),
}

/// Call sites having an ancestor whose target maps to the same key.
fn nested_by<K, F>(tree: &CallTree, key: F) -> HashSet<NodeId>
where
    K: Hash + Eq + Clone,
    F: Fn(&MethodIdentity) -> K,
{
    let mut nested = HashSet::new();
    let mut active: HashMap<K, u32> = HashMap::new();
    let mut stack: Vec<Step<K>> = tree.root().map(Step::Enter).into_iter().collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                let Ok(node) = tree.node(id) else {
                    continue;
                };
                let k = key(node.target());
                let count = active.entry(k.clone()).or_default();
                if *count > 0 {
                    nested.insert(id);
                }
                *count += 1;
                stack.push(Step::Exit(k));
                stack.extend(node.children().iter().rev().map(|&c| Step::Enter(c)));
            }
            Step::Exit(k) => {
                if let Some(count) = active.get_mut(&k) {
                    *count -= 1;
                }
            }
        }
    }
    nested
}

/// Set the minimal flag of every node. Recomputing on an unchanged tree
/// yields the same flags.
pub fn mark_minimal(tree: &mut CallTree) {
    let nested = nested_by(tree, MethodIdentity::base);
    for id in tree.preorder() {
        if let Ok(node) = tree.node_mut(id) {
            node.minimal = !nested.contains(&id);
        }
    }
}

/// Call sites below another call site of the exact same identity.
pub(crate) fn nested_exact(tree: &CallTree) -> HashSet<NodeId> {
    nested_by(tree, MethodIdentity::clone)
}
