use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

/// Scan, parse, resolve; return the resolver diagnostics as strings.
fn resolve_errors(source: &str) -> Vec<String> {
    let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

    let (statements, parse_errors) = Parser::new(tokens).parse();
    assert!(
        parse_errors.is_empty(),
        "unexpected parse errors: {:?}",
        parse_errors
    );

    let mut interpreter: Interpreter<Vec<u8>> = Interpreter::new(Vec::new());

    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn assert_contains(errors: &[String], needle: &str) {
    assert!(
        errors.iter().any(|e| e.contains(needle)),
        "expected an error containing {:?}, got {:?}",
        needle,
        errors
    );
}

#[test]
fn top_level_return_is_rejected() {
    assert_contains(
        &resolve_errors("return 1;"),
        "Can't return from top-level code.",
    );
}

#[test]
fn return_inside_function_is_fine() {
    assert!(resolve_errors("fun f() { return 1; } print f();").is_empty());
}

#[test]
fn break_outside_loop_is_rejected() {
    assert_contains(
        &resolve_errors("break;"),
        "Must be inside a loop to use 'break'.",
    );
}

#[test]
fn break_inside_loop_is_fine() {
    assert!(resolve_errors("while (true) break;").is_empty());
}

#[test]
fn loop_context_does_not_cross_function_boundaries() {
    assert_contains(
        &resolve_errors("while (true) { fun f() { break; } f(); }"),
        "Must be inside a loop to use 'break'.",
    );
}

#[test]
fn this_outside_class_is_rejected() {
    assert_contains(
        &resolve_errors("print this;"),
        "Can't use 'this' outside of a class.",
    );
}

#[test]
fn this_inside_method_is_fine() {
    assert!(resolve_errors("class A { m() { return this; } } print A().m();").is_empty());
}

#[test]
fn super_outside_class_is_rejected() {
    assert_contains(
        &resolve_errors("super.m();"),
        "Can't use 'super' outside of a class.",
    );
}

#[test]
fn super_without_superclass_is_rejected() {
    assert_contains(
        &resolve_errors("class A { m() { super.m(); } } print A;"),
        "Can't use 'super' in a class with no superclass.",
    );
}

#[test]
fn class_cannot_inherit_from_itself() {
    assert_contains(
        &resolve_errors("class A < A {} print A;"),
        "A class can't inherit from itself.",
    );
}

#[test]
fn duplicate_declaration_in_one_scope_is_rejected() {
    assert_contains(
        &resolve_errors("{ var a = 1; var a = 2; print a; }"),
        "Already variable with this name in this scope.",
    );
}

#[test]
fn shadowing_in_a_nested_scope_is_fine() {
    assert!(resolve_errors("{ var a = 1; { var a = 2; print a; } print a; }").is_empty());
}

#[test]
fn reading_a_local_in_its_own_initializer_is_rejected() {
    assert_contains(
        &resolve_errors("{ var a = a; }"),
        "Can't read local variable in its own initializer.",
    );
}

#[test]
fn value_return_from_initializer_is_rejected() {
    assert_contains(
        &resolve_errors("class A { init() { return 1; } } print A;"),
        "Can't return a value from an initializer.",
    );
}

#[test]
fn bare_return_from_initializer_is_fine() {
    assert!(resolve_errors("class A { init() { return; } } print A;").is_empty());
}

#[test]
fn unused_local_is_reported_at_its_declaration() {
    let errors = resolve_errors("{\n  var lonely = 1;\n}");

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0],
        "[line 2] Error at 'lonely': Unused local variable."
    );
}

#[test]
fn assignment_alone_does_not_count_as_a_read() {
    assert_contains(
        &resolve_errors("{ var a; a = 1; }"),
        "Unused local variable.",
    );
}

#[test]
fn parameters_are_exempt_from_the_unused_diagnostic() {
    assert!(resolve_errors("fun f(unused) { return 1; } print f(0);").is_empty());
}

#[test]
fn function_declarations_are_exempt_from_the_unused_diagnostic() {
    assert!(resolve_errors("{ fun helper() {} helper; }").is_empty());
}

#[test]
fn globals_are_never_flagged_as_unused() {
    assert!(resolve_errors("var quiet = 1;").is_empty());
}

#[test]
fn resolution_continues_after_an_error() {
    let errors = resolve_errors("return 1; break;");

    assert_contains(&errors, "Can't return from top-level code.");
    assert_contains(&errors, "Must be inside a loop to use 'break'.");
}
