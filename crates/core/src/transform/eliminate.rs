use indexmap::IndexSet;
use regex::Regex;
use tracing::info;

use crate::error::{IntegrityError, Result, StaleReferenceError};
use crate::model::{CallTree, ExecutionContext, MethodIdentity, NodeId, ProfileResult};

/// Selects methods by canonical full name.
#[derive(Debug, Clone)]
pub enum MethodPattern {
    Name(String),
    Regex(Regex),
    Names(Vec<String>),
}

impl MethodPattern {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, IntegrityError> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, identity: &MethodIdentity) -> bool {
        let full_name = identity.full_name();
        match self {
            Self::Name(name) => name == full_name,
            Self::Regex(re) => re.is_match(full_name),
            Self::Names(names) => names.iter().any(|n| n == full_name),
        }
    }

    /// Literal names that must each match at least one method.
    fn literals(&self) -> &[String] {
        match self {
            Self::Name(name) => std::slice::from_ref(name),
            Self::Regex(_) => &[],
            Self::Names(names) => names,
        }
    }
}

impl ProfileResult {
    /// Remove every method matching `pattern` from all contexts, folding
    /// each call site's self time into its caller and re-parenting its
    /// callees onto the caller.
    ///
    /// Returns the eliminated identities in first-seen order. Nothing is
    /// modified when a root would be eliminated or a literal name matches
    /// no method; a regular expression matching nothing is not an error.
    pub fn eliminate(&mut self, pattern: &MethodPattern) -> Result<Vec<MethodIdentity>> {
        self.ensure_live()?;

        for context in &self.contexts {
            if let Some(root) = context.root()
                && pattern.matches(root.target())
            {
                return Err(IntegrityError::RootElimination {
                    method: root.target().full_name().to_string(),
                    context: context.id(),
                }
                .into());
            }
        }
        for literal in pattern.literals() {
            let known = self
                .contexts
                .iter()
                .any(|c| c.methods().any(|m| m.full_name() == literal));
            if !known {
                return Err(IntegrityError::UnknownMethod(literal.clone()).into());
            }
        }

        let mut eliminated: IndexSet<MethodIdentity> = IndexSet::new();
        for context in &mut self.contexts {
            let removed = eliminate_in(context, pattern)?;
            eliminated.extend(removed);
        }

        info!(
            result = self.id,
            methods = eliminated.len(),
            "eliminated methods"
        );
        Ok(eliminated.into_iter().collect())
    }
}

fn eliminate_in(
    context: &mut ExecutionContext,
    pattern: &MethodPattern,
) -> Result<Vec<MethodIdentity>, StaleReferenceError> {
    let order: Vec<MethodIdentity> = context.methods.keys().cloned().collect();
    let removed: Vec<MethodIdentity> = order
        .iter()
        .filter(|identity| pattern.matches(identity))
        .cloned()
        .collect();
    if removed.is_empty() {
        return Ok(removed);
    }

    // Deepest first, so every node's matching descendants are gone before
    // its children are re-parented.
    let doomed: Vec<NodeId> = context
        .tree
        .preorder()
        .into_iter()
        .filter(|&id| {
            context
                .tree
                .node(id)
                .is_ok_and(|node| pattern.matches(node.target()))
        })
        .collect();
    for id in doomed.into_iter().rev() {
        if context.tree.contains(id) {
            splice_out(&mut context.tree, id)?;
        }
    }

    context.reindex_methods(order);
    Ok(removed)
}

/// Replace a non-root node by its children, keeping the tree's totals.
fn splice_out(tree: &mut CallTree, id: NodeId) -> Result<(), StaleReferenceError> {
    let node = tree.node(id)?;
    let Some(parent) = node.parent else {
        return Ok(());
    };
    let measurement = node.measurement;
    let children = node.children.clone();

    let parent_node = tree.node_mut(parent)?;
    let mut position = parent_node
        .children
        .iter()
        .position(|&c| c == id)
        .unwrap_or(parent_node.children.len());
    parent_node.children.retain(|&c| c != id);
    parent_node.measurement.absorb_self(&measurement);

    for child in children {
        let target = tree.node(child)?.target.clone();
        match tree.child_with_target(parent, &target) {
            Some(existing) => tree.absorb(existing, child)?,
            None => {
                tree.node_mut(child)?.parent = Some(parent);
                let siblings = &mut tree.node_mut(parent)?.children;
                let at = position.min(siblings.len());
                siblings.insert(at, child);
                position += 1;
            }
        }
    }

    if let Ok(node) = tree.node_mut(id) {
        node.children.clear();
    }
    tree.nodes.remove(id);
    Ok(())
}
