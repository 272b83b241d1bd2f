//! Attributed type information and assignability
//!
//! A `TypeDescriptor` is the front end's answer to "what type is this":
//! fully-qualified name, declared supertype chain and (for generics) the
//! type arguments. It is sufficient to decide assignability without asking
//! the front end again.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Fully resolved type with its declared hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    qualified_name: String,
    supertypes: Vec<Arc<TypeDescriptor>>,
    type_args: Vec<Arc<TypeDescriptor>>,
}

impl TypeDescriptor {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            supertypes: Vec::new(),
            type_args: Vec::new(),
        }
    }

    pub fn with_supertype(mut self, supertype: Arc<TypeDescriptor>) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn with_type_args(mut self, args: Vec<Arc<TypeDescriptor>>) -> Self {
        self.type_args = args;
        self
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Last segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    pub fn supertypes(&self) -> &[Arc<TypeDescriptor>] {
        &self.supertypes
    }

    pub fn type_args(&self) -> &[Arc<TypeDescriptor>] {
        &self.type_args
    }

    pub fn is_parameterized(&self) -> bool {
        !self.type_args.is_empty()
    }

    /// Whether `qualified` names this type or anything in its declared
    /// supertype/interface closure (reflexive, transitive).
    pub fn hierarchy_contains(&self, qualified: &str) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&TypeDescriptor> = VecDeque::new();
        queue.push_back(self);
        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty.qualified_name.as_str()) {
                continue;
            }
            if ty.qualified_name == qualified {
                return true;
            }
            for sup in &ty.supertypes {
                queue.push_back(sup);
            }
        }
        false
    }
}

/// `from` is assignable to `to` when they name the same type, or any type in
/// `from`'s declared supertype closure names `to`.
///
/// Type arguments are erased for the check unless both sides are fully
/// parameterized, in which case they must be pairwise assignable.
pub fn is_assignable_to(from: &Arc<TypeDescriptor>, to: &Arc<TypeDescriptor>) -> bool {
    if Arc::ptr_eq(from, to) {
        return true;
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&Arc<TypeDescriptor>> = VecDeque::new();
    queue.push_back(from);
    while let Some(ty) = queue.pop_front() {
        if !seen.insert(ty.qualified_name()) {
            continue;
        }
        if same_named_assignable(ty, to) {
            return true;
        }
        for sup in ty.supertypes() {
            queue.push_back(sup);
        }
    }
    false
}

fn same_named_assignable(from: &Arc<TypeDescriptor>, to: &Arc<TypeDescriptor>) -> bool {
    if from.qualified_name() != to.qualified_name() {
        return false;
    }
    // Raw on either side erases the comparison.
    if !from.is_parameterized() || !to.is_parameterized() {
        return true;
    }
    from.type_args().len() == to.type_args().len()
        && from
            .type_args()
            .iter()
            .zip(to.type_args())
            .all(|(a, b)| is_assignable_to(a, b))
}

/// Attribution attached to a node: either a resolved descriptor or an
/// explicit "the front end could not resolve this" marker.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Unresolved,
    Resolved(Arc<TypeDescriptor>),
}

impl TypeRef {
    pub fn resolved(&self) -> Option<&Arc<TypeDescriptor>> {
        match self {
            TypeRef::Resolved(desc) => Some(desc),
            TypeRef::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, TypeRef::Unresolved)
    }

    /// Conservative assignability: an unresolved side never matches.
    pub fn assignable_to(&self, other: &TypeRef) -> bool {
        match (self, other) {
            (TypeRef::Resolved(from), TypeRef::Resolved(to)) => is_assignable_to(from, to),
            _ => false,
        }
    }
}

/// Per-unit table of known types, keyed by qualified and simple name.
///
/// Populated by the front end; primitive types are pre-registered so that
/// synthesized fragments can be attributed without extra setup.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    by_qualified: HashMap<String, Arc<TypeDescriptor>>,
    by_simple: HashMap<String, Arc<TypeDescriptor>>,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "int", "long", "float", "double", "char", "void",
];

impl TypeEnv {
    pub fn new() -> Self {
        let mut env = Self {
            by_qualified: HashMap::new(),
            by_simple: HashMap::new(),
        };
        for name in PRIMITIVES {
            env.register(Arc::new(TypeDescriptor::new(*name)));
        }
        env.register(Arc::new(TypeDescriptor::new("java.lang.Object")));
        env.register(Arc::new(TypeDescriptor::new("java.lang.String")));
        env
    }

    pub fn register(&mut self, desc: Arc<TypeDescriptor>) {
        self.by_simple
            .insert(desc.simple_name().to_string(), desc.clone());
        self.by_qualified
            .insert(desc.qualified_name().to_string(), desc);
    }

    /// Look a type up by qualified name, falling back to simple name.
    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_qualified
            .get(name)
            .or_else(|| self.by_simple.get(name))
            .cloned()
    }

    pub fn boolean(&self) -> Arc<TypeDescriptor> {
        self.builtin("boolean")
    }

    pub fn int(&self) -> Arc<TypeDescriptor> {
        self.builtin("int")
    }

    pub fn string(&self) -> Arc<TypeDescriptor> {
        self.builtin("java.lang.String")
    }

    fn builtin(&self, name: &str) -> Arc<TypeDescriptor> {
        // Every env starts from `new`, which registers these.
        self.lookup(name).expect("builtin registered in TypeEnv::new")
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}
