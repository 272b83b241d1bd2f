//! Typed templates with splice coordinates
//!
//! A template is a parsed snippet with `${N}` / `${N:Type}` slots.
//! Compilation is cached per snippet text. Applying a template binds
//! captured subtrees to the slots, attributes the synthesized fragment from
//! the application site, and splices it at a coordinate relative to the
//! cursor node. Any attribution failure abandons the whole edit; the caller
//! keeps the original node and records a diagnostic.

mod parser;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;

use revisor_core::{
    Cursor, Node, NodeId, NodeKind, Trivia, Tree, TypeDescriptor, TypeEnv, TypeRef, UnaryOp,
};

pub use parser::TemplateParseError;

/// Errors from [`compile`]
#[derive(Error, Debug)]
pub enum TemplateCompileError {
    #[error(transparent)]
    Parse(#[from] TemplateParseError),

    #[error("placeholder indices must be dense from zero; missing ${{{0}}}")]
    SparseIndices(usize),

    #[error("placeholder ${{{0}}} declared with conflicting types `{1}` and `{2}`")]
    ConflictingTypes(usize, String, String),
}

/// Errors from [`Template::apply`]; every one abandons the edit.
#[derive(Error, Debug)]
pub enum TemplateApplyError {
    #[error("expected {expected} bindings, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("unresolved identifier `{0}` in synthesized fragment")]
    UnresolvedIdentifier(String),

    #[error("unknown type `{0}` in synthesized fragment")]
    UnresolvedType(String),

    #[error("binding for ${{{index}}} is not assignable to `{expected}`")]
    PlaceholderTypeMismatch { index: usize, expected: String },

    #[error("coordinate `{0}` does not apply at a `{1}` node")]
    BadCoordinate(&'static str, &'static str),

    #[error("no child with id {0} under the cursor node")]
    UnknownAnchor(NodeId),
}

/// Where an applied fragment lands, relative to the cursor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    /// Replace the cursor node; the fragment takes over its trivia.
    Replace,
    /// Insert before the cursor-node child with this id.
    Before(NodeId),
    /// Insert after the cursor-node child with this id.
    After(NodeId),
    /// Prepend to the cursor node, which must be a block.
    FirstStatement,
    /// Append to the cursor node, which must be a block.
    LastStatement,
    /// Add an annotation to the cursor node, a class or method declaration.
    Annotate,
}

impl Coordinate {
    fn label(self) -> &'static str {
        match self {
            Coordinate::Replace => "replace",
            Coordinate::Before(_) => "before",
            Coordinate::After(_) => "after",
            Coordinate::FirstStatement => "first-statement",
            Coordinate::LastStatement => "last-statement",
            Coordinate::Annotate => "annotate",
        }
    }
}

/// One slot of a compiled template.
#[derive(Debug, Clone)]
pub struct PlaceholderSpec {
    pub index: usize,
    pub expected: Option<String>,
}

/// A compiled, immutable snippet shared through the process-wide cache.
pub struct Template {
    text: String,
    root: Arc<Node>,
    arity: usize,
    placeholders: Vec<PlaceholderSpec>,
}

static CACHE: OnceLock<Mutex<HashMap<String, Arc<Template>>>> = OnceLock::new();

/// Compile `text`, reusing the cached template for repeated snippets.
pub fn compile(text: &str) -> Result<Arc<Template>, TemplateCompileError> {
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Some(hit) = cache.lock().ok().and_then(|c| c.get(text).cloned()) {
        return Ok(hit);
    }
    let root = parser::parse_snippet(text)?.arc();
    let placeholders = placeholder_specs(&root)?;
    let template = Arc::new(Template {
        text: text.to_string(),
        arity: placeholders.len(),
        root,
        placeholders,
    });
    if let Ok(mut cache) = cache.lock() {
        cache.insert(text.to_string(), template.clone());
    }
    Ok(template)
}

fn collect_into(node: &Node, found: &mut Vec<(usize, Option<String>)>) {
    if let NodeKind::Placeholder { index, expected } = node.kind() {
        found.push((*index, expected.clone()));
    }
    for child in node.children() {
        collect_into(child, found);
    }
}

fn placeholder_specs(root: &Node) -> Result<Vec<PlaceholderSpec>, TemplateCompileError> {
    let mut found = Vec::new();
    collect_into(root, &mut found);
    let arity = found.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
    let mut specs: Vec<PlaceholderSpec> = (0..arity)
        .map(|index| PlaceholderSpec {
            index,
            expected: None,
        })
        .collect();
    let mut present = vec![false; arity];
    for (index, expected) in found {
        present[index] = true;
        let Some(expected) = expected else { continue };
        match specs[index].expected.take() {
            None => specs[index].expected = Some(expected),
            Some(existing) if existing == expected => specs[index].expected = Some(existing),
            Some(existing) => {
                return Err(TemplateCompileError::ConflictingTypes(
                    index, existing, expected,
                ));
            }
        }
    }
    if let Some(missing) = present.iter().position(|p| !p) {
        return Err(TemplateCompileError::SparseIndices(missing));
    }
    Ok(specs)
}

impl Template {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of bindings `apply` requires.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Bind, attribute and splice. Returns the node that stands at the
    /// cursor's position afterwards; the caller hands it back from its
    /// traversal.
    ///
    /// `anchor` is the node currently standing at the cursor's position.
    /// A transform's `exit` runs against children already rewritten this
    /// traversal, so it must pass the rebuilt node it was handed, not
    /// `cursor.node()`; splicing into the stale version would revert those
    /// edits.
    pub fn apply(
        &self,
        tree: &Tree,
        cursor: &Cursor<'_>,
        anchor: &Arc<Node>,
        coordinate: Coordinate,
        bindings: &[Arc<Node>],
    ) -> Result<Arc<Node>, TemplateApplyError> {
        if bindings.len() != self.arity {
            return Err(TemplateApplyError::ArityMismatch {
                expected: self.arity,
                got: bindings.len(),
            });
        }
        let env = tree.env();
        self.check_binding_types(env, bindings)?;
        let substituted = substitute(&self.root, bindings);
        let fragment = attribute(&substituted, cursor, env)?;
        // Fresh ids throughout: the cached template skeleton and the
        // bindings both already have ids living elsewhere.
        let fragment = Arc::new(fragment.with_fresh_ids());
        splice(&fragment, anchor, coordinate)
    }

    fn check_binding_types(
        &self,
        env: &TypeEnv,
        bindings: &[Arc<Node>],
    ) -> Result<(), TemplateApplyError> {
        for spec in &self.placeholders {
            let Some(expected_name) = &spec.expected else {
                continue;
            };
            let Some(expected) = env.lookup(expected_name) else {
                return Err(TemplateApplyError::UnresolvedType(expected_name.clone()));
            };
            let binding = &bindings[spec.index];
            let assignable = matches!(
                binding.ty(),
                Some(TypeRef::Resolved(actual))
                    if revisor_core::is_assignable_to(actual, &expected)
            );
            if !assignable {
                return Err(TemplateApplyError::PlaceholderTypeMismatch {
                    index: spec.index,
                    expected: expected_name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Replace placeholder nodes by their bindings; the binding takes the
/// placeholder's trivia so the template's spacing governs.
fn substitute(node: &Arc<Node>, bindings: &[Arc<Node>]) -> Arc<Node> {
    if let NodeKind::Placeholder { index, .. } = node.kind() {
        let bound = (*bindings[*index]).clone().with_trivia(node.trivia().clone());
        return Arc::new(bound);
    }
    let mut changed = false;
    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        let rebuilt = substitute(child, bindings);
        if !Arc::ptr_eq(&rebuilt, child) {
            changed = true;
        }
        children.push(rebuilt);
    }
    if changed {
        Arc::new(node.with_children(children))
    } else {
        node.clone()
    }
}

/// Bottom-up attribution of a synthesized fragment. Nodes that already
/// carry a type (everything inside a binding) are left alone.
fn attribute(
    node: &Arc<Node>,
    cursor: &Cursor<'_>,
    env: &TypeEnv,
) -> Result<Arc<Node>, TemplateApplyError> {
    if node.ty().is_some() {
        return Ok(node.clone());
    }
    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        children.push(attribute(child, cursor, env)?);
    }
    let rebuilt = node.with_children(children);
    let rebuilt = match infer_type(&rebuilt, cursor, env)? {
        Some(desc) => rebuilt.with_type(TypeRef::Resolved(desc)),
        None => rebuilt,
    };
    Ok(Arc::new(rebuilt))
}

fn infer_type(
    node: &Node,
    cursor: &Cursor<'_>,
    env: &TypeEnv,
) -> Result<Option<Arc<TypeDescriptor>>, TemplateApplyError> {
    match node.kind() {
        NodeKind::Identifier { name } => {
            if name == "this" {
                let class =
                    cursor.self_or_ancestor(|n| matches!(n.kind(), NodeKind::ClassDecl { .. }));
                return class
                    .and_then(|c| c.node().name().map(str::to_string))
                    .and_then(|n| env.lookup(&n))
                    .map(Some)
                    .ok_or_else(|| {
                        TemplateApplyError::UnresolvedIdentifier("this".to_string())
                    });
            }
            // Locals and parameters first, then static receivers by type name.
            resolve_in_scope(cursor, env, name)
                .or_else(|| env.lookup(name))
                .map(Some)
                .ok_or_else(|| TemplateApplyError::UnresolvedIdentifier(name.clone()))
        }
        NodeKind::TypeName { name } => match env.lookup(name) {
            Some(desc) => Ok(Some(desc)),
            None => Err(TemplateApplyError::UnresolvedType(name.clone())),
        },
        NodeKind::Literal { text } => Ok(literal_type(text, env)),
        NodeKind::Binary { op } if op.is_boolean() => Ok(Some(env.boolean())),
        NodeKind::Binary { .. } => Ok(resolved_child_type(node, 0)),
        NodeKind::Unary { op } => match op {
            UnaryOp::Not => Ok(Some(env.boolean())),
            UnaryOp::Neg => Ok(resolved_child_type(node, 0)),
        },
        NodeKind::Paren | NodeKind::New => Ok(resolved_child_type(node, 0)),
        _ => Ok(None),
    }
}

fn resolved_child_type(node: &Node, index: usize) -> Option<Arc<TypeDescriptor>> {
    node.child(index)
        .and_then(|c| c.ty())
        .and_then(TypeRef::resolved)
        .cloned()
}

fn literal_type(text: &str, env: &TypeEnv) -> Option<Arc<TypeDescriptor>> {
    if text == "true" || text == "false" {
        return Some(env.boolean());
    }
    if text.starts_with('"') {
        return Some(env.string());
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return Some(env.int());
    }
    // `null` and anything exotic stay untyped.
    None
}

/// Walk the cursor chain looking for a declaration of `name`: earlier
/// statements of each enclosing block, then the enclosing method's
/// parameters.
fn resolve_in_scope(
    cursor: &Cursor<'_>,
    env: &TypeEnv,
    name: &str,
) -> Option<Arc<TypeDescriptor>> {
    // The cursor node itself counts as a level with everything visible;
    // block-level coordinates apply with the cursor at the block.
    if let Some(found) = lookup_level(cursor.node(), cursor.node().children().len(), name, env) {
        return Some(found);
    }
    let mut below_index = cursor.index();
    let mut current = cursor.parent();
    while let Some(level) = current {
        if let Some(found) = lookup_level(level.node(), below_index, name, env) {
            return Some(found);
        }
        below_index = level.index();
        current = level.parent();
    }
    None
}

fn lookup_level(
    node: &Node,
    upto: usize,
    name: &str,
    env: &TypeEnv,
) -> Option<Arc<TypeDescriptor>> {
    match node.kind() {
        NodeKind::Block => {
            let limit = upto.min(node.children().len());
            node.children()[..limit]
                .iter()
                .rev()
                .find_map(|stmt| match stmt.kind() {
                    NodeKind::VarDecl { name: n } if n == name => declared_type(stmt, env),
                    _ => None,
                })
        }
        NodeKind::MethodDecl { .. } => {
            node.children().iter().find_map(|child| match child.kind() {
                NodeKind::ParamDecl { name: n } if n == name => declared_type(child, env),
                _ => None,
            })
        }
        _ => None,
    }
}

fn declared_type(decl: &Node, env: &TypeEnv) -> Option<Arc<TypeDescriptor>> {
    let ty = decl.child(0)?;
    if let Some(TypeRef::Resolved(desc)) = ty.ty() {
        return Some(desc.clone());
    }
    ty.name().and_then(|n| env.lookup(n))
}

/// Indentation for a statement inserted next to `reference`: its leading
/// trivia from the last newline on, or a single space inside one-line
/// blocks.
fn statement_leading(reference: &Node) -> String {
    let leading = &reference.trivia().leading;
    match leading.rfind('\n') {
        Some(pos) => leading[pos..].to_string(),
        None => " ".to_string(),
    }
}

fn splice(
    fragment: &Arc<Node>,
    anchor: &Arc<Node>,
    coordinate: Coordinate,
) -> Result<Arc<Node>, TemplateApplyError> {
    match coordinate {
        Coordinate::Replace => Ok(Arc::new(
            (**fragment).clone().with_trivia(anchor.trivia().clone()),
        )),
        Coordinate::Before(id) | Coordinate::After(id) => {
            let Some(position) = anchor.children().iter().position(|c| c.id() == id) else {
                return Err(TemplateApplyError::UnknownAnchor(id));
            };
            let leading = statement_leading(&anchor.children()[position]);
            let formatted = Arc::new((**fragment).clone().with_leading(leading));
            let insert_at = match coordinate {
                Coordinate::Before(_) => position,
                _ => position + 1,
            };
            let mut children = anchor.children().to_vec();
            children.insert(insert_at, formatted);
            Ok(Arc::new(anchor.with_children(children)))
        }
        Coordinate::FirstStatement => {
            if !matches!(anchor.kind(), NodeKind::Block) {
                return Err(TemplateApplyError::BadCoordinate(
                    coordinate.label(),
                    anchor.kind().label(),
                ));
            }
            let mut children = anchor.children().to_vec();
            let formatted = match children.first() {
                Some(first) => (**fragment).clone().with_leading(statement_leading(first)),
                None => (**fragment).clone().with_trivia(Trivia::new("\n    ", "\n")),
            };
            children.insert(0, Arc::new(formatted));
            Ok(Arc::new(anchor.with_children(children)))
        }
        Coordinate::LastStatement => {
            if !matches!(anchor.kind(), NodeKind::Block) {
                return Err(TemplateApplyError::BadCoordinate(
                    coordinate.label(),
                    anchor.kind().label(),
                ));
            }
            let mut children = anchor.children().to_vec();
            let formatted = match children.pop() {
                Some(last) => {
                    // The old last statement's trailing trivia is the text
                    // before the closing brace; the fragment inherits it.
                    let leading = statement_leading(&last);
                    let trailing = last.trivia().trailing.clone();
                    children.push(Arc::new((*last).clone().with_trailing("")));
                    (**fragment).clone().with_trivia(Trivia::new(leading, trailing))
                }
                None => (**fragment).clone().with_trivia(Trivia::new("\n    ", "\n")),
            };
            children.push(Arc::new(formatted));
            Ok(Arc::new(anchor.with_children(children)))
        }
        Coordinate::Annotate => {
            if !matches!(
                anchor.kind(),
                NodeKind::ClassDecl { .. } | NodeKind::MethodDecl { .. }
            ) {
                return Err(TemplateApplyError::BadCoordinate(
                    coordinate.label(),
                    anchor.kind().label(),
                ));
            }
            if !matches!(fragment.kind(), NodeKind::Annotation { .. }) {
                return Err(TemplateApplyError::BadCoordinate(
                    coordinate.label(),
                    fragment.kind().label(),
                ));
            }
            let children = anchor.children();
            let slot = children
                .iter()
                .position(|c| !matches!(c.kind(), NodeKind::Annotation { .. }))
                .unwrap_or(children.len());
            let leading = children
                .get(slot)
                .map(|c| statement_leading(c))
                .unwrap_or_else(|| "\n".to_string());
            let mut children = children.to_vec();
            children.insert(slot, Arc::new((**fragment).clone().with_leading(leading)));
            Ok(Arc::new(anchor.with_children(children)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revisor_core::{build, print};

    fn test_env() -> Arc<TypeEnv> {
        let mut env = TypeEnv::new();
        env.register(Arc::new(TypeDescriptor::new("com.example.Color")));
        Arc::new(env)
    }

    // ==================== Compilation ====================

    #[test]
    fn test_compile_is_cached() {
        let a = compile("${0} != null").unwrap();
        let b = compile("${0} != null").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.arity(), 1);
    }

    #[test]
    fn test_compile_rejects_sparse_indices() {
        assert!(matches!(
            compile("${1} == ${2}"),
            Err(TemplateCompileError::SparseIndices(0))
        ));
    }

    #[test]
    fn test_compile_rejects_conflicting_types() {
        assert!(matches!(
            compile("${0:int} + ${0:long}"),
            Err(TemplateCompileError::ConflictingTypes(0, _, _))
        ));
    }

    #[test]
    fn test_duplicate_placeholder_unifies_with_untyped() {
        let template = compile("${0:int} + ${0}").unwrap();
        assert_eq!(template.arity(), 1);
    }

    // ==================== Application ====================

    #[test]
    fn test_replace_takes_anchor_trivia() {
        let env = test_env();
        let color = env.lookup("com.example.Color").unwrap();
        let call = build::call(
            "equals",
            build::ident("a").with_type(TypeRef::Resolved(color.clone())),
            vec![build::ident("b").with_type(TypeRef::Resolved(color))],
        )
        .with_leading(" ");
        let tree = Tree::new(build::unit(vec![build::expr_stmt(call)]), env);

        let root = Cursor::root(tree.root());
        let stmt = root.child(0).unwrap();
        let call_cursor = stmt.child(0).unwrap();
        let bindings = vec![
            call_cursor.node().children()[0].clone(),
            call_cursor.node().children()[1].clone(),
        ];

        let template = compile("${0} == ${1}").unwrap();
        let result = template
            .apply(
                &tree,
                &call_cursor,
                call_cursor.node(),
                Coordinate::Replace,
                &bindings,
            )
            .unwrap();
        assert_eq!(print(&result), " a == b");
        // Boolean comparison, attributed without front-end help.
        assert!(matches!(
            result.ty(),
            Some(TypeRef::Resolved(desc)) if desc.qualified_name() == "boolean"
        ));
    }

    #[test]
    fn test_arity_mismatch_fails_fast() {
        let env = test_env();
        let tree = Tree::new(build::unit(vec![]), env);
        let root = Cursor::root(tree.root());
        let template = compile("${0} == ${1}").unwrap();
        assert!(matches!(
            template.apply(&tree, &root, root.node(), Coordinate::Replace, &[]),
            Err(TemplateApplyError::ArityMismatch {
                expected: 2,
                got: 0
            })
        ));
    }

    #[test]
    fn test_typed_placeholder_rejects_mismatched_binding() {
        let env = test_env();
        let int_ty = env.lookup("int").unwrap();
        let boolean = env.lookup("boolean").unwrap();
        let tree = Tree::new(build::unit(vec![]), env);
        let root = Cursor::root(tree.root());

        let template = compile("!${0:boolean}").unwrap();
        let wrong = build::lit("3").with_type(TypeRef::Resolved(int_ty)).arc();
        assert!(matches!(
            template.apply(&tree, &root, root.node(), Coordinate::Replace, &[wrong]),
            Err(TemplateApplyError::PlaceholderTypeMismatch { index: 0, .. })
        ));

        let right = build::ident("flag")
            .with_type(TypeRef::Resolved(boolean))
            .arc();
        assert!(template
            .apply(&tree, &root, root.node(), Coordinate::Replace, &[right])
            .is_ok());
    }

    #[test]
    fn test_identifier_resolves_from_earlier_declaration() {
        let env = test_env();
        let count_decl = build::var_decl(
            "count",
            build::type_name("int"),
            Some(build::lit("0").with_leading(" ")),
        )
        .with_trivia(Trivia::new("\n    ", ""));
        let target = build::expr_stmt(build::call("run", build::ident("task"), vec![]))
            .with_trivia(Trivia::new("\n    ", "\n"));
        let tree = Tree::new(
            build::unit(vec![build::block(vec![count_decl, target])]),
            env,
        );

        let root = Cursor::root(tree.root());
        let block = root.child(0).unwrap();
        let stmt = block.child(1).unwrap();
        let expr = stmt.child(0).unwrap();

        let template = compile("count + 1").unwrap();
        let result = template
            .apply(&tree, &expr, expr.node(), Coordinate::Replace, &[])
            .unwrap();
        assert!(matches!(
            result.ty(),
            Some(TypeRef::Resolved(desc)) if desc.qualified_name() == "int"
        ));
    }

    #[test]
    fn test_unresolved_identifier_abandons_edit() {
        let env = test_env();
        let tree = Tree::new(build::unit(vec![]), env);
        let root = Cursor::root(tree.root());
        let template = compile("missing + 1").unwrap();
        assert!(matches!(
            template.apply(&tree, &root, root.node(), Coordinate::Replace, &[]),
            Err(TemplateApplyError::UnresolvedIdentifier(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_this_resolves_to_enclosing_class() {
        let mut env = TypeEnv::new();
        env.register(Arc::new(TypeDescriptor::new("com.example.Widget")));
        let env = Arc::new(env);

        let body = build::block(vec![build::expr_stmt(build::call(
            "refresh",
            build::ident("view"),
            vec![],
        ))
        .with_trivia(Trivia::new("\n        ", "\n    "))]);
        let method = build::method_decl("redraw", vec![], build::type_name("void"), vec![], body);
        let class = build::class_decl("Widget", vec![], build::block(vec![method]));
        let tree = Tree::new(build::unit(vec![class]), env);

        let root = Cursor::root(tree.root());
        let class_cursor = root.child(0).unwrap();
        let members = class_cursor.child(0).unwrap();
        let method_cursor = members.child(0).unwrap();
        let body_cursor = method_cursor.child(1).unwrap();
        let stmt = body_cursor.child(0).unwrap();
        let expr = stmt.child(0).unwrap();

        let template = compile("this").unwrap();
        let result = template
            .apply(&tree, &expr, expr.node(), Coordinate::Replace, &[])
            .unwrap();
        assert!(matches!(
            result.ty(),
            Some(TypeRef::Resolved(desc)) if desc.qualified_name() == "com.example.Widget"
        ));
    }

    // ==================== Splicing ====================

    #[test]
    fn test_last_statement_inherits_closing_trivia() {
        let env = test_env();
        let color = env.lookup("com.example.Color").unwrap();
        let first = build::expr_stmt(build::call(
            "run",
            build::ident("task").with_type(TypeRef::Resolved(color)),
            vec![],
        ))
        .with_trivia(Trivia::new("\n    ", "\n"));
        let tree = Tree::new(build::unit(vec![build::block(vec![first])]), env);

        let root = Cursor::root(tree.root());
        let block = root.child(0).unwrap();

        let template = compile("task.stop();").unwrap();
        let result = template
            .apply(&tree, &block, block.node(), Coordinate::LastStatement, &[])
            .unwrap_err();
        // `task` is not declared anywhere in scope.
        assert!(matches!(
            result,
            TemplateApplyError::UnresolvedIdentifier(name) if name == "task"
        ));

        // With the receiver bound instead, the splice goes through.
        let receiver = block.node().children()[0].children()[0].children()[0].clone();
        let template = compile("${0}.stop();").unwrap();
        let result = template
            .apply(
                &tree,
                &block,
                block.node(),
                Coordinate::LastStatement,
                &[receiver],
            )
            .unwrap();
        assert_eq!(print(&result), "{\n    task.run();\n    task.stop();\n}");
    }

    #[test]
    fn test_insertion_splices_into_rebuilt_node() {
        let env = test_env();
        let color = env.lookup("com.example.Color").unwrap();
        let stmt = build::expr_stmt(build::call(
            "run",
            build::ident("a").with_type(TypeRef::Resolved(color.clone())),
            vec![],
        ))
        .with_trivia(Trivia::new("\n    ", "\n"));
        let tree = Tree::new(build::unit(vec![build::block(vec![stmt])]), env);

        let root = Cursor::root(tree.root());
        let block = root.child(0).unwrap();

        // A transform's exit hands over the block with children already
        // rewritten in the same traversal; the splice has to keep those
        // edits, not fall back to the cursor's pre-rewrite version.
        let renamed = Arc::new(build::ident("b").with_type(TypeRef::Resolved(color)));
        let old_stmt = &block.node().children()[0];
        let call = Arc::new(old_stmt.children()[0].with_children(vec![renamed.clone()]));
        let rebuilt_stmt = Arc::new(old_stmt.with_children(vec![call]));
        let rebuilt = Arc::new(block.node().with_children(vec![rebuilt_stmt]));

        let template = compile("${0}.stop();").unwrap();
        let result = template
            .apply(
                &tree,
                &block,
                &rebuilt,
                Coordinate::LastStatement,
                &[renamed],
            )
            .unwrap();
        assert_eq!(print(&result), "{\n    b.run();\n    b.stop();\n}");
    }

    #[test]
    fn test_first_statement_into_empty_block() {
        let env = test_env();
        let color = env.lookup("com.example.Color").unwrap();
        let tree = Tree::new(build::unit(vec![build::block(vec![])]), env);
        let root = Cursor::root(tree.root());
        let block = root.child(0).unwrap();

        let template = compile("${0}.check();").unwrap();
        let binding = build::ident("c")
            .with_type(TypeRef::Resolved(color))
            .arc();
        let result = template
            .apply(
                &tree,
                &block,
                block.node(),
                Coordinate::FirstStatement,
                &[binding],
            )
            .unwrap();
        assert_eq!(print(&result), "{\n    c.check();\n}");
    }

    #[test]
    fn test_annotate_method_declaration() {
        let env = test_env();
        let method = build::method_decl(
            "size",
            vec![],
            build::type_name("int").with_leading("\n    "),
            vec![],
            build::block(vec![]).with_leading(" "),
        );
        let tree = Tree::new(build::unit(vec![method]), env);
        let root = Cursor::root(tree.root());
        let method_cursor = root.child(0).unwrap();

        let template = compile("@Deprecated").unwrap();
        let result = template
            .apply(
                &tree,
                &method_cursor,
                method_cursor.node(),
                Coordinate::Annotate,
                &[],
            )
            .unwrap();
        assert_eq!(print(&result), "\n    @Deprecated\n    int size() {}");
    }

    #[test]
    fn test_bad_coordinate_reports_kinds() {
        let env = test_env();
        let tree = Tree::new(build::unit(vec![build::expr_stmt(build::ident("a"))]), env);
        let root = Cursor::root(tree.root());
        let stmt = root.child(0).unwrap();

        let template = compile("true").unwrap();
        assert!(matches!(
            template.apply(&tree, &stmt, stmt.node(), Coordinate::LastStatement, &[]),
            Err(TemplateApplyError::BadCoordinate("last-statement", _))
        ));
    }

    #[test]
    fn test_unknown_anchor_is_rejected() {
        let env = test_env();
        let stray = build::ident("elsewhere");
        let stray_id = stray.id();
        let tree = Tree::new(build::unit(vec![build::block(vec![])]), env);
        let root = Cursor::root(tree.root());
        let block = root.child(0).unwrap();

        let template = compile("true").unwrap();
        assert!(matches!(
            template.apply(
                &tree,
                &block,
                block.node(),
                Coordinate::Before(stray_id),
                &[]
            ),
            Err(TemplateApplyError::UnknownAnchor(id)) if id == stray_id
        ));
    }

    #[test]
    fn test_repeated_application_yields_fresh_ids() {
        let env = test_env();
        let boolean = env.lookup("boolean").unwrap();
        let tree = Tree::new(build::unit(vec![]), env);
        let root = Cursor::root(tree.root());

        let template = compile("!${0}").unwrap();
        let binding = build::ident("flag")
            .with_type(TypeRef::Resolved(boolean))
            .arc();
        let first = template
            .apply(
                &tree,
                &root,
                root.node(),
                Coordinate::Replace,
                &[binding.clone()],
            )
            .unwrap();
        let second = template
            .apply(
                &tree,
                &root,
                root.node(),
                Coordinate::Replace,
                &[binding.clone()],
            )
            .unwrap();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.children()[0].id(), second.children()[0].id());
        assert_ne!(first.children()[0].id(), binding.id());
    }
}
