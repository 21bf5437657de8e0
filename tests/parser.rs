use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::expr::Expr;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::stmt::Stmt;
use lox::token::Token;

fn parse(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
    let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

    Parser::new(tokens).parse()
}

/// Parse a single expression statement and print it in prefix form.
fn parse_expression(source: &str) -> String {
    let (statements, errors) = parse(source);

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

    match statements.as_slice() {
        [Stmt::Expression(expr)] => AstPrinter::print(expr),

        other => panic!("expected a single expression statement, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(parse_expression("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(
        parse_expression("(1 + 2) * 3;"),
        "(* (group (+ 1.0 2.0)) 3.0)"
    );
}

#[test]
fn comparison_binds_tighter_than_equality() {
    assert_eq!(
        parse_expression("1 < 2 == true;"),
        "(== (< 1.0 2.0) true)"
    );
}

#[test]
fn unary_operators_nest() {
    assert_eq!(parse_expression("!!true;"), "(! (! true))");
    assert_eq!(parse_expression("--1;"), "(- (- 1.0))");
}

#[test]
fn logical_or_is_looser_than_and() {
    assert_eq!(parse_expression("a or b and c;"), "(or a (and b c))");
}

#[test]
fn ternary_is_right_associative() {
    assert_eq!(parse_expression("a ? b : c;"), "(?: a b c)");
    assert_eq!(
        parse_expression("a ? b : c ? d : e;"),
        "(?: a b (?: c d e))"
    );
}

#[test]
fn comma_sequence_at_top_level() {
    assert_eq!(parse_expression("1, 2, 3;"), "(, 1.0 2.0 3.0)");
}

#[test]
fn parenthesized_single_expression_is_a_grouping() {
    assert_eq!(parse_expression("(1);"), "(group 1.0)");
}

#[test]
fn parenthesized_sequence_is_a_comma_expression() {
    assert_eq!(parse_expression("(1, 2);"), "(, 1.0 2.0)");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(parse_expression("a = b = 1;"), "(= a (= b 1.0))");
}

#[test]
fn property_assignment_becomes_a_set() {
    assert_eq!(parse_expression("a.b = 1;"), "(= (. a b) 1.0)");
}

#[test]
fn calls_chain_left_to_right() {
    assert_eq!(parse_expression("f(1)(2);"), "(call (call f 1.0) 2.0)");
    assert_eq!(parse_expression("a.b.c;"), "(. (. a b) c)");
}

#[test]
fn call_arguments_sit_below_the_comma_level() {
    assert_eq!(parse_expression("f(1, 2);"), "(call f 1.0 2.0)");
}

#[test]
fn printing_is_stable_across_parses() {
    let source = "1 + 2 * 3 - f(x).y ? a : b, c;";

    assert_eq!(parse_expression(source), parse_expression(source));
}

#[test]
fn invalid_assignment_target_is_reported_without_aborting() {
    let (statements, errors) = parse("1 = 2; print 3;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target"));

    // Both statements survive.
    assert_eq!(statements.len(), 2);
}

#[test]
fn missing_left_operand_is_reported_and_consumed() {
    let (statements, errors) = parse("== 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Expect left hand operand for =="));
    assert_eq!(statements.len(), 1);
}

#[test]
fn synchronize_recovers_at_statement_boundaries() {
    let (statements, errors) = parse("var = 1; print 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Expect variable name."));

    // The statement after the semicolon parses normally.
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0], Stmt::Print(_)));
}

#[test]
fn error_at_eof_is_located_at_end() {
    let (_, errors) = parse("print 1");

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at end: Expect ';' after value."
    );
}

#[test]
fn function_expression_in_initializer() {
    let (statements, errors) = parse("var f = fun(a, b) { return a; };");

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
    assert_eq!(statements.len(), 1);

    match &statements[0] {
        Stmt::Var {
            initializer: Some(Expr::Function(declaration)),
            ..
        } => {
            assert!(declaration.name.is_none());
            assert_eq!(declaration.params.as_ref().map(Vec::len), Some(2));
        }

        other => panic!("expected var with function initializer, got {:?}", other),
    }
}

#[test]
fn method_without_parameter_list_is_a_getter() {
    let (statements, errors) = parse("class Circle { area { return 1; } }");

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

    match &statements[0] {
        Stmt::Class { methods, .. } => {
            assert_eq!(methods.len(), 1);
            assert!(methods[0].params.is_none());
        }

        other => panic!("expected class declaration, got {:?}", other),
    }
}

#[test]
fn class_prefixed_member_is_a_static_method() {
    let (statements, errors) = parse("class Math { class square(n) { return n * n; } }");

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

    match &statements[0] {
        Stmt::Class {
            methods,
            class_methods,
            ..
        } => {
            assert!(methods.is_empty());
            assert_eq!(class_methods.len(), 1);
        }

        other => panic!("expected class declaration, got {:?}", other),
    }
}

#[test]
fn for_loop_desugars_into_block_and_while() {
    let (statements, errors) = parse("for (var i = 0; i < 3; i = i + 1) print i;");

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
    assert_eq!(statements.len(), 1);

    match &statements[0] {
        Stmt::Block(inner) => {
            assert_eq!(inner.len(), 2);
            assert!(matches!(inner[0], Stmt::Var { .. }));
            assert!(matches!(inner[1], Stmt::While { .. }));
        }

        other => panic!("expected desugared block, got {:?}", other),
    }
}

#[test]
fn for_loop_without_clauses_is_a_bare_while() {
    let (statements, errors) = parse("for (;;) break;");

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
    assert!(matches!(statements[0], Stmt::While { .. }));
}

#[test]
fn super_access_parses_to_method_reference() {
    assert_eq!(parse_expression("super.m();"), "(call (super m))");
}
