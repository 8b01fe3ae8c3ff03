#[cfg(test)]
mod resolver_tests {
    use rox::ast::*;
    use rox::error::Diagnostics;
    use rox::resolver::{Locals, Resolver};
    use std::collections::HashSet;

    fn resolve_source(source: &str) -> (Vec<Stmt<'_>>, Locals, Diagnostics) {
        let (tokens, scan_diagnostics) = rox::scan(source);
        assert!(scan_diagnostics.is_empty(), "unexpected scan errors");

        let (statements, parse_diagnostics) = rox::parse(&tokens);
        assert!(parse_diagnostics.is_empty(), "unexpected parse errors");

        let (locals, diagnostics) = rox::resolve(&statements);
        (statements, locals, diagnostics)
    }

    fn messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_resolver_01_clean_program() {
        let (_, _, diagnostics) =
            resolve_source("var a = 1; fun f(x) { return x + a; } print f(2);");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_resolver_02_globals_are_left_out() {
        let (_, locals, _) = resolve_source("var a = 1; print a; a = 2;");

        assert!(locals.is_empty());
    }

    #[test]
    fn test_resolver_03_local_distances() {
        let (statements, locals, diagnostics) = resolve_source("{ var a = 1; { print a; } }");

        assert!(diagnostics.is_empty());

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected a block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected a nested block");
        };
        let Stmt::Print {
            value: Expr::Variable(var),
            ..
        } = &inner[0]
        else {
            panic!("expected print of a variable");
        };

        assert_eq!(locals.get(&var.id), Some(&1));
    }

    #[test]
    fn test_resolver_04_closure_sees_declaration_scope() {
        let source = "var a = \"global\"; { fun show() { print a; } show(); var a = \"local\"; }";
        let (_, locals, diagnostics) = resolve_source(source);

        assert!(diagnostics.is_empty());

        // `a` inside show() binds to the global, `show` itself is a local.
        assert_eq!(locals.len(), 1);
    }

    #[test]
    fn test_resolver_05_own_initializer() {
        let (_, _, diagnostics) = resolve_source("{ var a = a; }");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_resolver_06_global_own_initializer_is_allowed() {
        let (_, _, diagnostics) = resolve_source("var a = a;");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_resolver_07_duplicate_local() {
        let (_, _, diagnostics) = resolve_source("fun f() { var a; var a; }");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_resolver_08_duplicate_global_is_allowed() {
        let (_, _, diagnostics) = resolve_source("var a = 1; var a = 2;");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_resolver_09_top_level_return() {
        let (_, _, diagnostics) = resolve_source("return 1;");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_resolver_10_return_value_from_initializer_is_allowed() {
        let (_, _, diagnostics) = resolve_source("class A { init() { return 1; } }");

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_resolver_11_self_inheritance() {
        let (_, _, diagnostics) = resolve_source("class A < A {}");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_resolver_12_this_outside_class() {
        let (_, _, diagnostics) = resolve_source("print this;\nfun f() { return this; }");

        assert_eq!(
            messages(&diagnostics),
            vec![
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'this': Can't use 'this' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_resolver_13_super_misuse() {
        let source = "print super.x;\nclass A { f() { super.f(); } }";
        let (_, _, diagnostics) = resolve_source(source);

        assert_eq!(
            messages(&diagnostics),
            vec![
                "[line 1] Error at 'super': Can't use 'super' outside of a class.",
                "[line 2] Error at 'super': Can't use 'super' in a class with no superclass.",
            ]
        );
    }

    #[test]
    fn test_resolver_14_super_and_this_distances() {
        let source = "class A {} class B < A { f() { super.f(); this; } }";
        let (statements, locals, diagnostics) = resolve_source(source);

        assert!(diagnostics.is_empty());

        let Stmt::Class { methods, .. } = &statements[1] else {
            panic!("expected class B");
        };
        let body = &methods[0].body;

        let Stmt::Expression(Expr::Call { callee, .. }) = &body[0] else {
            panic!("expected a call");
        };
        let Expr::Super { id: super_id, .. } = &**callee else {
            panic!("expected super access");
        };
        let Stmt::Expression(Expr::This { id: this_id, .. }) = &body[1] else {
            panic!("expected this");
        };

        // body scope → `this` scope → `super` scope
        assert_eq!(locals.get(super_id), Some(&2));
        assert_eq!(locals.get(this_id), Some(&1));
    }

    #[test]
    fn test_resolver_15_reports_every_error() {
        let (_, _, diagnostics) = resolve_source("return;\n{ var b = b; }\nprint this;");

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.exit_code(), 65);
    }

    #[test]
    fn test_resolver_16_initializer_reads_shadowed_local() {
        let source = "{ var a = 1; { var a = a + 1; print a; } }";
        let (statements, locals, diagnostics) = resolve_source(source);

        assert!(diagnostics.is_empty(), "diagnostics:\n{}", diagnostics);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected a block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected a nested block");
        };
        let Stmt::Var {
            initializer: Some(Expr::Binary { left, .. }),
            ..
        } = &inner[0]
        else {
            panic!("expected `var a = a + 1`");
        };
        let Expr::Variable(read) = &**left else {
            panic!("expected a variable read");
        };
        let Stmt::Print {
            value: Expr::Variable(printed),
            ..
        } = &inner[1]
        else {
            panic!("expected print of a variable");
        };

        // The initializer sees the outer `a`, the print sees the new one.
        assert_eq!(locals.get(&read.id), Some(&1));
        assert_eq!(locals.get(&printed.id), Some(&0));
    }

    #[test]
    fn test_resolver_17_initializer_reads_shadowed_global() {
        let (statements, locals, diagnostics) =
            resolve_source("var a = 1; { var a = a + 1; print a; }");

        assert!(diagnostics.is_empty(), "diagnostics:\n{}", diagnostics);

        let Stmt::Block(block) = &statements[1] else {
            panic!("expected a block");
        };
        let Stmt::Print {
            value: Expr::Variable(printed),
            ..
        } = &block[1]
        else {
            panic!("expected print of a variable");
        };

        // Only the print is local; the initializer's read is global.
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.get(&printed.id), Some(&0));
    }

    #[test]
    fn test_resolver_18_global_declared_later_does_not_count() {
        let (_, _, diagnostics) = resolve_source("{ var a = a; }\nvar a = 1;");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_resolver_19_known_globals() {
        let (tokens, _) = rox::scan("{ var a = a; }");
        let (statements, _) = rox::parse(&tokens);

        let known: HashSet<String> = HashSet::from(["a".to_string()]);
        let (locals, diagnostics) = Resolver::with_globals(known).resolve(&statements);

        assert!(diagnostics.is_empty());
        assert!(locals.is_empty());
    }
}
