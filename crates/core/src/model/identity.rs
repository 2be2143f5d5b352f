use std::sync::Arc;

pub use proftree_protocol::DispatchKind;
use proftree_protocol::IdentitySnapshot;

/// Key identifying a method, and for recursive reentry one recursion depth of
/// it.
///
/// The base identity has `recursion_depth == 0`. Each variant produced by
/// reentering the method while it is already active is a distinct identity
/// whose full name carries a `-N` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentity {
    full_name: Arc<str>,
    scope: Arc<str>,
    kind: DispatchKind,
    name: Arc<str>,
    source_file: Option<Arc<str>>,
    source_line: u32,
    recursion_depth: u32,
}

impl MethodIdentity {
    pub fn new(scope: impl Into<Arc<str>>, kind: DispatchKind, name: impl Into<Arc<str>>) -> Self {
        let scope = scope.into();
        let name = name.into();
        let full_name = Self::compose(&scope, kind, &name, 0);
        Self {
            full_name,
            scope,
            kind,
            name,
            source_file: None,
            source_line: 0,
            recursion_depth: 0,
        }
    }

    pub fn instance(scope: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self::new(scope, DispatchKind::Instance, name)
    }

    pub fn singleton(scope: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self::new(scope, DispatchKind::Singleton, name)
    }

    pub fn global(name: impl Into<Arc<str>>) -> Self {
        Self::new("", DispatchKind::Global, name)
    }

    /// Attach the source location of the method definition.
    pub fn at(mut self, file: impl Into<Arc<str>>, line: u32) -> Self {
        self.source_file = Some(file.into());
        self.source_line = line;
        self
    }

    fn compose(scope: &str, kind: DispatchKind, name: &str, depth: u32) -> Arc<str> {
        let mut full = match kind {
            DispatchKind::Instance => format!("{scope}#{name}"),
            DispatchKind::Singleton => format!("<Class::{scope}>#{name}"),
            DispatchKind::Module => format!("<Module::{scope}>#{name}"),
            DispatchKind::Global if scope.is_empty() => name.to_string(),
            DispatchKind::Global => format!("{scope}::{name}"),
        };
        if depth > 0 {
            full.push('-');
            full.push_str(&depth.to_string());
        }
        Arc::from(full)
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn kind(&self) -> DispatchKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn source_line(&self) -> u32 {
        self.source_line
    }

    pub fn recursion_depth(&self) -> u32 {
        self.recursion_depth
    }

    pub fn is_variant(&self) -> bool {
        self.recursion_depth > 0
    }

    /// The identity with any recursion suffix removed.
    pub fn base(&self) -> MethodIdentity {
        self.variant(0)
    }

    /// The identity tagged with the given recursion depth.
    pub fn variant(&self, depth: u32) -> MethodIdentity {
        if depth == self.recursion_depth {
            return self.clone();
        }
        Self {
            full_name: Self::compose(&self.scope, self.kind, &self.name, depth),
            recursion_depth: depth,
            ..self.clone()
        }
    }

    /// Whether both identities name the same method, ignoring recursion depth.
    pub fn same_method(&self, other: &MethodIdentity) -> bool {
        self.kind == other.kind
            && self.scope == other.scope
            && self.name == other.name
            && self.source_file == other.source_file
            && self.source_line == other.source_line
    }
}

impl From<&MethodIdentity> for IdentitySnapshot {
    fn from(identity: &MethodIdentity) -> Self {
        Self {
            scope: identity.scope.to_string(),
            kind: identity.kind,
            name: identity.name.to_string(),
            source_file: identity.source_file.as_deref().map(str::to_string),
            source_line: identity.source_line,
            recursion_depth: identity.recursion_depth,
        }
    }
}

impl From<&IdentitySnapshot> for MethodIdentity {
    fn from(snapshot: &IdentitySnapshot) -> Self {
        let base = Self {
            source_file: snapshot.source_file.as_deref().map(Arc::from),
            source_line: snapshot.source_line,
            ..Self::new(snapshot.scope.as_str(), snapshot.kind, snapshot.name.as_str())
        };
        base.variant(snapshot.recursion_depth)
    }
}

impl std::fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name)
    }
}
