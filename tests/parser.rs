#[cfg(test)]
mod parser_tests {
    use rox::ast::*;
    use rox::error::{Diagnostics, LoxError};
    use rox::token::TokenType;

    fn parse_source(source: &str) -> (Vec<Stmt<'_>>, Diagnostics) {
        let (tokens, scan_diagnostics) = rox::scan(source);
        assert!(scan_diagnostics.is_empty(), "unexpected scan errors");

        rox::parse(&tokens)
    }

    fn messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_parser_01_factor_binds_tighter_than_term() {
        let (statements, diagnostics) = parse_source("1 + 2 * 3;");

        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);

        let Stmt::Expression(Expr::Binary {
            left,
            operator,
            right,
        }) = &statements[0]
        else {
            panic!("expected a binary expression, got {:?}", statements[0]);
        };

        assert_eq!(operator.token_type, TokenType::PLUS);
        assert_eq!(**left, Expr::Literal(LiteralValue::Number(1.0)));
        assert!(matches!(
            &**right,
            Expr::Binary { operator, .. } if operator.token_type == TokenType::STAR
        ));
    }

    #[test]
    fn test_parser_02_binary_operators_are_left_associative() {
        let (statements, diagnostics) = parse_source("8 - 4 - 2;");

        assert!(diagnostics.is_empty());

        let Stmt::Expression(Expr::Binary { left, right, .. }) = &statements[0] else {
            panic!("expected a binary expression");
        };

        assert!(matches!(&**left, Expr::Binary { .. }));
        assert_eq!(**right, Expr::Literal(LiteralValue::Number(2.0)));
    }

    #[test]
    fn test_parser_03_assignment_is_right_associative() {
        let (statements, diagnostics) = parse_source("a = b = 3;");

        assert!(diagnostics.is_empty());

        let Stmt::Expression(Expr::Assign { name, value, .. }) = &statements[0] else {
            panic!("expected an assignment");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(&**value, Expr::Assign { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn test_parser_04_for_desugars_to_while() {
        let (statements, diagnostics) =
            parse_source("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected the loop to be wrapped in a block");
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { condition, body } = &outer[1] else {
            panic!("expected a while loop");
        };

        assert!(matches!(condition, Expr::Binary { .. }));

        let Stmt::Block(inner) = &**body else {
            panic!("expected the body and increment in a block");
        };

        assert!(matches!(inner[0], Stmt::Print { .. }));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_parser_05_empty_for_clauses_loop_forever() {
        let (statements, diagnostics) = parse_source("for (;;) print 1;");

        assert!(diagnostics.is_empty());

        let Stmt::While { condition, body } = &statements[0] else {
            panic!("expected a bare while loop");
        };

        assert_eq!(*condition, Expr::Literal(LiteralValue::True));
        assert!(matches!(**body, Stmt::Print { .. }));
    }

    #[test]
    fn test_parser_06_invalid_assignment_target() {
        let (statements, diagnostics) = parse_source("1 + 2 = 3; print 4;");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );

        // Reported without unwinding, so both statements survive.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_07_recovers_after_bad_statement() {
        let (statements, diagnostics) = parse_source("print ;\nvar = 1;\nprint 2;");

        assert_eq!(
            messages(&diagnostics),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at '=': Expect variable name.",
            ]
        );

        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print { .. }));
    }

    #[test]
    fn test_parser_08_missing_semicolon_at_end() {
        let (statements, diagnostics) = parse_source("print 1");

        assert!(statements.is_empty());
        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_parser_09_recovers_inside_block() {
        let (statements, diagnostics) = parse_source("{ print ; print 1; }");

        assert_eq!(diagnostics.len(), 1);

        let Stmt::Block(inner) = &statements[0] else {
            panic!("expected the block to survive");
        };

        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_parser_10_class_with_superclass_and_methods() {
        let source = "class B < A { init(x) { this.x = x; } say() { return super.say(); } }";
        let (statements, diagnostics) = parse_source(source);

        assert!(diagnostics.is_empty());

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected a class declaration");
        };

        assert_eq!(name.lexeme, "B");
        assert_eq!(superclass.as_ref().map(|s| s.name.lexeme), Some("A"));
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].params.len(), 1);

        assert!(matches!(
            &methods[0].body[0],
            Stmt::Expression(Expr::Set { object, .. }) if matches!(**object, Expr::This { .. })
        ));

        let Stmt::Return {
            value: Some(Expr::Call { callee, .. }),
            ..
        } = &methods[1].body[0]
        else {
            panic!("expected a returned call");
        };

        assert!(matches!(
            &**callee,
            Expr::Super { method, .. } if method.lexeme == "say"
        ));
    }

    #[test]
    fn test_parser_11_super_requires_dot() {
        let (_, diagnostics) = parse_source("class A < B { f() { super; } }");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at ';': Expect '.' after 'super'."]
        );
    }

    #[test]
    fn test_parser_12_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (statements, diagnostics) = parse_source(&source);

        assert_eq!(diagnostics.len(), 1);
        assert!(messages(&diagnostics)[0].ends_with("Can't have more than 255 arguments."));

        // The call is still built.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_13_call_chain_and_get() {
        let (statements, diagnostics) = parse_source("a.b(1)(2).c;");

        assert!(diagnostics.is_empty());

        let Stmt::Expression(Expr::Get { object, name }) = &statements[0] else {
            panic!("expected a property access");
        };

        assert_eq!(name.lexeme, "c");
        assert!(matches!(&**object, Expr::Call { arguments, .. } if arguments.len() == 1));
    }

    #[test]
    fn test_parser_14_variable_ids_are_distinct() {
        let (statements, _) = parse_source("a; a;");

        let ids: Vec<ExprId> = statements
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable(var)) => Some(var.id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_parser_15_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));
        let (statements, diagnostics) = parse_source(&source);

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );

        let Some(LoxError::Static { location, line, .. }) = diagnostics.iter().next() else {
            panic!("expected a static error");
        };

        assert_eq!(location, " at 'p255'");
        assert_eq!(*line, 1);

        // The declaration is still built.
        assert_eq!(statements.len(), 1);
    }
}
