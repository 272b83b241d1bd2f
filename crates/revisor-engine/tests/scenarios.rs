//! End-to-end rule scenarios
//!
//! These tests wire the full pipeline together: signature matching over an
//! attributed tree, template application at a cursor, and the scheduler
//! driving registered rules to a fixpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use revisor_core::{
    build, print, scan, Cursor, Node, NodeKind, Scan, Transform, Tree, Trivia, TypeDescriptor,
    TypeEnv, TypeRef,
};
use revisor_engine::{
    check, compile, node_scan, Coordinate, DiagnosticKind, MethodSignature, Precondition, Rule,
    RuleContext, Scheduler, Template,
};

fn enum_env() -> Arc<TypeEnv> {
    let mut env = TypeEnv::new();
    let object = env
        .lookup("java.lang.Object")
        .expect("Object is pre-registered");
    let enum_ty = Arc::new(TypeDescriptor::new("java.lang.Enum").with_supertype(object));
    let color = Arc::new(TypeDescriptor::new("com.example.Color").with_supertype(enum_ty.clone()));
    env.register(enum_ty);
    env.register(color);
    Arc::new(env)
}

/// `class Color { boolean same() { return left.equals(right); } }` with the
/// idents attributed as `com.example.Color`.
fn comparison_unit(env: &Arc<TypeEnv>) -> Tree {
    let color = env.lookup("com.example.Color").expect("registered above");
    let call = build::call(
        "equals",
        build::ident("left").with_type(TypeRef::Resolved(color.clone())),
        vec![build::ident("right").with_type(TypeRef::Resolved(color))],
    )
    .with_leading(" ");
    let body = build::block(vec![
        build::ret(Some(call)).with_trivia(Trivia::new("\n        ", "\n    "))
    ])
    .with_trivia(Trivia::new(" ", "\n"));
    let method = build::method_decl(
        "same",
        vec![],
        build::type_name("boolean").with_leading("\n    "),
        vec![],
        body,
    );
    let class = build::class_decl("Color", vec![], build::block(vec![method]).with_leading(" "));
    Tree::new(build::unit(vec![class]), env.clone())
}

/// Replaces `Enum.equals(Object)` calls with an identity comparison.
struct EnumEqualsRule {
    signature: MethodSignature,
    template: Arc<Template>,
}

impl EnumEqualsRule {
    fn new() -> Self {
        Self {
            signature: MethodSignature::parse("java.lang.Enum.equals(java.lang.Object)")
                .expect("well-formed signature"),
            template: compile("${0} == ${1}").expect("well-formed template"),
        }
    }
}

impl Rule for EnumEqualsRule {
    fn name(&self) -> &'static str {
        "enum_equals_to_identity"
    }

    fn description(&self) -> &'static str {
        "Replaces Enum.equals(Object) calls with == comparison"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["java", "enum"]
    }

    fn precondition(&self) -> Option<Arc<dyn Precondition>> {
        Some(node_scan(|n| {
            matches!(n.kind(), NodeKind::MethodCall { name } if name == "equals")
        }))
    }

    fn rewrite(&self, tree: &Tree, ctx: &mut RuleContext) -> Tree {
        struct Visitor<'a> {
            tree: &'a Tree,
            rule: &'a EnumEqualsRule,
            ctx: &'a mut RuleContext,
        }
        impl Transform for Visitor<'_> {
            fn exit(&mut self, cursor: &Cursor<'_>, node: Arc<Node>) -> Arc<Node> {
                if !self.rule.signature.matches_call(self.tree, &node) {
                    return node;
                }
                let bindings = node.children().to_vec();
                match self
                    .rule
                    .template
                    .apply(self.tree, cursor, &node, Coordinate::Replace, &bindings)
                {
                    Ok(fragment) => fragment,
                    Err(error) => {
                        self.ctx.template_failure(node.id(), &error);
                        node
                    }
                }
            }
        }
        revisor_core::rewrite(
            tree,
            &mut Visitor {
                tree,
                rule: self,
                ctx,
            },
        )
    }
}

// ==================== Detect and rewrite ====================

#[test]
fn test_enum_equals_rewritten_to_identity() {
    let env = enum_env();
    let tree = comparison_unit(&env);
    let before = tree.print();

    let scheduler = Scheduler::new(vec![Arc::new(EnumEqualsRule::new())]);
    let outcome = scheduler.run(&tree);

    assert!(outcome.changed);
    assert!(outcome.diagnostics.is_empty());
    let after = outcome.tree.print();
    assert!(after.contains("return left == right;"), "got: {after}");
    // Everything outside the rewritten expression is byte-identical.
    assert_eq!(
        after,
        before.replace("left.equals(right)", "left == right")
    );
}

#[test]
fn test_rewrite_is_idempotent() {
    let env = enum_env();
    let tree = comparison_unit(&env);
    let scheduler = Scheduler::new(vec![Arc::new(EnumEqualsRule::new())]);

    let first = scheduler.run(&tree);
    assert!(first.changed);
    assert_eq!(first.passes, 2);

    let second = scheduler.run(&first.tree);
    assert!(!second.changed);
    assert!(second.tree.same_as(&first.tree));
}

#[test]
fn test_unrelated_receiver_left_alone() {
    let mut env = TypeEnv::new();
    env.register(Arc::new(TypeDescriptor::new("com.example.Point")));
    let env = Arc::new(env);
    let point = env.lookup("com.example.Point").expect("registered above");
    let object = env.lookup("java.lang.Object").expect("pre-registered");

    let call = build::call(
        "equals",
        build::ident("a").with_type(TypeRef::Resolved(point)),
        vec![build::ident("b").with_type(TypeRef::Resolved(object))],
    );
    let tree = Tree::new(build::unit(vec![build::expr_stmt(call)]), env);

    let scheduler = Scheduler::new(vec![Arc::new(EnumEqualsRule::new())]);
    let outcome = scheduler.run(&tree);
    assert!(!outcome.changed);
    assert!(outcome.tree.same_as(&tree));
}

// ==================== Wildcard signatures ====================

#[test]
fn test_wildcard_signature_over_mixed_arities() {
    let mut env = TypeEnv::new();
    let arrays = Arc::new(TypeDescriptor::new("java.util.Arrays"));
    let lists = Arc::new(TypeDescriptor::new("com.example.Lists"));
    env.register(arrays.clone());
    env.register(lists.clone());
    let env = Arc::new(env);
    let int_ty = env.lookup("int").expect("pre-registered");

    let typed_lit = |text: &str, leading: &str| {
        build::lit(text)
            .with_type(TypeRef::Resolved(int_ty.clone()))
            .with_leading(leading)
    };
    let as_list = |receiver: Arc<TypeDescriptor>, name: &str, args: Vec<Node>| {
        build::expr_stmt(build::call(
            "asList",
            build::ident(name).with_type(TypeRef::Resolved(receiver)),
            args,
        ))
    };

    let tree = Tree::new(
        build::unit(vec![
            as_list(arrays.clone(), "Arrays", vec![]),
            as_list(arrays.clone(), "Arrays", vec![typed_lit("1", "")]),
            as_list(
                arrays,
                "Arrays",
                vec![
                    typed_lit("1", ""),
                    typed_lit("2", " "),
                    typed_lit("3", " "),
                ],
            ),
            as_list(lists, "Lists", vec![typed_lit("1", "")]),
        ]),
        env,
    );

    struct Matches<'a> {
        tree: &'a Tree,
        signature: &'a MethodSignature,
        found: Vec<String>,
    }
    impl Scan for Matches<'_> {
        fn visit(&mut self, node: &Node) -> bool {
            if self.signature.matches_call(self.tree, node) {
                self.found.push(print(node));
            }
            true
        }
    }

    let signature = MethodSignature::parse("java.util.Arrays.asList(..)").expect("well-formed");
    let mut matches = Matches {
        tree: &tree,
        signature: &signature,
        found: Vec::new(),
    };
    scan(tree.root(), &mut matches);

    assert_eq!(
        matches.found,
        vec![
            "Arrays.asList()".to_string(),
            "Arrays.asList(1)".to_string(),
            "Arrays.asList(1, 2, 3)".to_string(),
        ]
    );
}

// ==================== Abandoned edits ====================

/// Tries to rewrite every literal with a template that cannot attribute.
struct BrokenTemplateRule {
    template: Arc<Template>,
}

impl BrokenTemplateRule {
    fn new() -> Self {
        Self {
            template: compile("nowhere + ${0}").expect("well-formed template"),
        }
    }
}

impl Rule for BrokenTemplateRule {
    fn name(&self) -> &'static str {
        "broken_template"
    }

    fn description(&self) -> &'static str {
        "References an identifier no scope declares"
    }

    fn rewrite(&self, tree: &Tree, ctx: &mut RuleContext) -> Tree {
        struct Visitor<'a> {
            tree: &'a Tree,
            template: &'a Template,
            ctx: &'a mut RuleContext,
        }
        impl Transform for Visitor<'_> {
            fn exit(&mut self, cursor: &Cursor<'_>, node: Arc<Node>) -> Arc<Node> {
                if !matches!(node.kind(), NodeKind::Literal { .. }) {
                    return node;
                }
                let bindings = vec![node.clone()];
                match self
                    .template
                    .apply(self.tree, cursor, &node, Coordinate::Replace, &bindings)
                {
                    Ok(fragment) => fragment,
                    Err(error) => {
                        self.ctx.template_failure(node.id(), &error);
                        node
                    }
                }
            }
        }
        revisor_core::rewrite(
            tree,
            &mut Visitor {
                tree,
                template: &self.template,
                ctx,
            },
        )
    }
}

#[test]
fn test_failed_attribution_keeps_tree_and_reports() {
    let env = Arc::new(TypeEnv::new());
    let int_ty = env.lookup("int").expect("pre-registered");
    let tree = Tree::new(
        build::unit(vec![build::expr_stmt(
            build::lit("42").with_type(TypeRef::Resolved(int_ty)),
        )]),
        env,
    );

    let scheduler = Scheduler::new(vec![Arc::new(BrokenTemplateRule::new())]);
    let outcome = scheduler.run(&tree);

    assert!(!outcome.changed);
    assert!(outcome.tree.same_as(&tree));
    assert_eq!(outcome.diagnostics.len(), 1);
    let diag = &outcome.diagnostics[0];
    assert_eq!(diag.kind, DiagnosticKind::TemplateApply);
    assert_eq!(diag.rule, "broken_template");
    assert!(diag.message.contains("nowhere"), "got: {}", diag.message);
}

// ==================== Structural violations ====================

/// Asks for an edit at a node id that was never part of the tree.
struct StaleEditRule;

impl Rule for StaleEditRule {
    fn name(&self) -> &'static str {
        "stale_edit"
    }

    fn description(&self) -> &'static str {
        "Targets a node id from a previous tree version"
    }

    fn rewrite(&self, tree: &Tree, ctx: &mut RuleContext) -> Tree {
        let orphan = build::ident("orphan");
        let stale_id = orphan.id();
        match tree.replace(stale_id, build::lit("0")) {
            Ok(next) => next,
            Err(error) => {
                ctx.structural_violation(stale_id, error.to_string());
                tree.clone()
            }
        }
    }
}

#[test]
fn test_stale_edit_reports_violation_and_keeps_tree() {
    let env = enum_env();
    let tree = comparison_unit(&env);

    let scheduler = Scheduler::new(vec![Arc::new(StaleEditRule)]);
    let outcome = scheduler.run(&tree);

    assert!(!outcome.changed);
    assert!(outcome.tree.same_as(&tree));
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::StructuralViolation
    );
}

// ==================== Precondition gating ====================

struct CountingRule {
    calls: Arc<AtomicUsize>,
}

impl Rule for CountingRule {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn description(&self) -> &'static str {
        "Counts how often its rewrite runs"
    }

    fn rewrite(&self, tree: &Tree, _ctx: &mut RuleContext) -> Tree {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tree.clone()
    }
}

#[test]
fn test_unmatched_precondition_skips_rewrite_entirely() {
    let env = enum_env();
    let tree = comparison_unit(&env);

    let calls = Arc::new(AtomicUsize::new(0));
    let gated = check(
        node_scan(|n| matches!(n.kind(), NodeKind::While)),
        Arc::new(CountingRule {
            calls: calls.clone(),
        }),
    );
    let scheduler = Scheduler::new(vec![gated]);
    let outcome = scheduler.run(&tree);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!outcome.changed);
    assert!(outcome.tree.same_as(&tree));
}

// ==================== Parallel units ====================

#[test]
fn test_independent_units_rewritten_in_parallel() {
    let env = enum_env();
    let units = vec![
        comparison_unit(&env),
        comparison_unit(&env),
        comparison_unit(&env),
    ];

    let scheduler = Scheduler::new(vec![Arc::new(EnumEqualsRule::new())]);
    let outcomes = scheduler.run_units(&units);

    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        assert!(outcome.changed);
        assert!(outcome.tree.print().contains("return left == right;"));
    }
}
