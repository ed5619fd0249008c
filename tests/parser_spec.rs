//! Spec tests for the Glint parser.
//!
//! Programs are parsed through `source::parse_source`; tests inspect the
//! resulting tree shapes, the statement disambiguation rules, and the fatal
//! error paths.

use glint::ast::{BinOp, Expr, LitKind, Stmt, UnOp};
use glint::source::parse_source;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse(src: &str) -> glint::ast::Program {
    parse_source(src).expect("parse failed")
}

fn parse_err(src: &str) -> String {
    parse_source(src).expect_err("expected a parse error").to_string()
}

/// The statements of the sole function's body block.
fn body_of(src: &str) -> Vec<Stmt> {
    let program = parse(src);
    assert_eq!(program.functions.len(), 1);
    match &program.functions[0].body {
        Stmt::Block(stmts) => stmts.clone(),
        other => panic!("function body is not a block: {:?}", other),
    }
}

fn int_lit(text: &str) -> Expr {
    Expr::Literal(LitKind::Int, text.to_string())
}

fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[test]
fn one_function_per_definition() {
    let program = parse("int main(){return 0;} int other(){return 1;}");
    assert_eq!(program.functions.len(), 2);
    assert_eq!(program.functions[0].name, "main");
    assert_eq!(program.functions[1].name, "other");
}

#[test]
fn add_function_shape() {
    let program = parse("int add(int a, int b){return a+b;}");
    assert_eq!(program.functions.len(), 1);
    let func = &program.functions[0];
    assert_eq!(func.return_type, "int");
    assert_eq!(
        func.params,
        vec![
            ("int".to_string(), "a".to_string()),
            ("int".to_string(), "b".to_string())
        ]
    );
    let Stmt::Block(stmts) = &func.body else {
        panic!("body is not a block");
    };
    assert_eq!(stmts.len(), 1);
    assert_eq!(
        stmts[0],
        Stmt::Return(Some(Expr::Binary(
            BinOp::Add,
            Box::new(ident("a")),
            Box::new(ident("b"))
        )))
    );
}

#[test]
fn missing_return_type_defaults_to_void() {
    let program = parse("main(){return;}");
    assert_eq!(program.functions[0].return_type, "void");
    assert_eq!(program.functions[0].name, "main");
}

#[test]
fn multi_line_function_parses() {
    let program = parse("int main() {\n    int x = 1;\n    print(x);\n    return 0;\n}\n");
    assert_eq!(program.functions.len(), 1);
}

// ---------------------------------------------------------------------------
// Expression precedence and associativity
// ---------------------------------------------------------------------------

#[test]
fn multiplication_binds_tighter_than_addition() {
    let body = body_of("void f(){x = a + b * c;}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    assert_eq!(
        **value,
        Expr::Binary(
            BinOp::Add,
            Box::new(ident("a")),
            Box::new(Expr::Binary(
                BinOp::Mul,
                Box::new(ident("b")),
                Box::new(ident("c"))
            ))
        )
    );
}

#[test]
fn comparison_binds_tighter_than_logical_and() {
    let body = body_of("void f(){x = a < b && c > d;}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    let Expr::Binary(BinOp::And, left, right) = value.as_ref() else {
        panic!("expected && at the top");
    };
    assert!(matches!(left.as_ref(), Expr::Binary(BinOp::Lt, _, _)));
    assert!(matches!(right.as_ref(), Expr::Binary(BinOp::Gt, _, _)));
}

#[test]
fn assignment_is_right_associative() {
    let body = body_of("void f(){x = y = 1;}");
    assert_eq!(
        body[0],
        Stmt::Expr(Expr::Assign(
            "x".to_string(),
            Box::new(Expr::Assign("y".to_string(), Box::new(int_lit("1"))))
        ))
    );
}

#[test]
fn comma_chains_to_the_right() {
    let body = body_of("void f(){x = (a, b, c);}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    assert_eq!(
        **value,
        Expr::Binary(
            BinOp::Comma,
            Box::new(ident("a")),
            Box::new(Expr::Binary(
                BinOp::Comma,
                Box::new(ident("b")),
                Box::new(ident("c"))
            ))
        )
    );
}

#[test]
fn unary_operators_nest() {
    let body = body_of("void f(){x = -a;}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    assert_eq!(**value, Expr::Unary(UnOp::Neg, Box::new(ident("a"))));
}

#[test]
fn parentheses_override_precedence() {
    let body = body_of("void f(){x = (a + b) * c;}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    assert!(matches!(value.as_ref(), Expr::Binary(BinOp::Mul, _, _)));
}

#[test]
fn postfix_index_parses() {
    let body = body_of("void f(){x = a[1];}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment statement");
    };
    assert_eq!(
        **value,
        Expr::Index(Box::new(ident("a")), Box::new(int_lit("1")))
    );
}

#[test]
fn true_and_false_lower_to_one_and_zero() {
    let body = body_of("void f(){x = true; y = false;}");
    let Stmt::Expr(Expr::Assign(_, t)) = &body[0] else {
        panic!()
    };
    let Stmt::Expr(Expr::Assign(_, f)) = &body[1] else {
        panic!()
    };
    assert_eq!(**t, Expr::Literal(LitKind::Bool, "1".to_string()));
    assert_eq!(**f, Expr::Literal(LitKind::Bool, "0".to_string()));
}

// ---------------------------------------------------------------------------
// Statement disambiguation
// ---------------------------------------------------------------------------

#[test]
fn assignment_at_statement_position_is_not_a_declaration() {
    let body = body_of("void f(){x = 42;}");
    assert_eq!(
        body[0],
        Stmt::Expr(Expr::Assign("x".to_string(), Box::new(int_lit("42"))))
    );
}

#[test]
fn identifier_pair_is_a_declaration() {
    let body = body_of("void f(){Sprite s;}");
    assert_eq!(
        body[0],
        Stmt::VarDecl {
            name: "s".to_string(),
            ty: "Sprite".to_string(),
            init: None,
        }
    );
}

#[test]
fn c_style_declaration_with_initializer() {
    let body = body_of("void f(){int x = 5;}");
    assert_eq!(
        body[0],
        Stmt::VarDecl {
            name: "x".to_string(),
            ty: "int".to_string(),
            init: Some(int_lit("5")),
        }
    );
}

#[test]
fn let_declaration() {
    let body = body_of("void f(){let x: int = 5;}");
    assert_eq!(
        body[0],
        Stmt::VarDecl {
            name: "x".to_string(),
            ty: "int".to_string(),
            init: Some(int_lit("5")),
        }
    );
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

#[test]
fn if_else_shape() {
    let body = body_of("void f(){if(x>5){print(1);} else {print(2);}}");
    let Stmt::If {
        else_branch: Some(_),
        ..
    } = &body[0]
    else {
        panic!("expected if with else");
    };
}

#[test]
fn elif_chains_into_nested_if() {
    let body = body_of("void f(){if(a){print(1);} elif(b){print(2);} else {print(3);}}");
    let Stmt::If {
        else_branch: Some(else_branch),
        ..
    } = &body[0]
    else {
        panic!("expected if with elif");
    };
    let Stmt::If {
        else_branch: Some(_),
        ..
    } = else_branch.as_ref()
    else {
        panic!("elif did not nest");
    };
}

#[test]
fn while_shape() {
    let body = body_of("void f(){while(i<3){i=i+1;}}");
    assert!(matches!(body[0], Stmt::While { .. }));
}

#[test]
fn for_with_declaration_init() {
    let body = body_of("void f(){for(int i=0;i<3;i=i+1){print(i);}}");
    let Stmt::For {
        init: Some(init),
        cond: Some(_),
        step: Some(_),
        ..
    } = &body[0]
    else {
        panic!("expected fully populated for");
    };
    assert!(matches!(init.as_ref(), Stmt::VarDecl { .. }));
}

#[test]
fn for_with_expression_init() {
    let body = body_of("void f(){for(i=0;i<3;i=i+1){print(i);}}");
    let Stmt::For {
        init: Some(init), ..
    } = &body[0]
    else {
        panic!("expected for with init");
    };
    assert!(matches!(init.as_ref(), Stmt::Expr(Expr::Assign(_, _))));
}

#[test]
fn for_with_empty_clauses() {
    let body = body_of("void f(){for(;;){print(1);}}");
    assert_eq!(
        body[0],
        Stmt::For {
            init: None,
            cond: None,
            step: None,
            body: Box::new(Stmt::Block(vec![Stmt::Print(int_lit("1"))])),
        }
    );
}

// ---------------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------------

#[test]
fn builtin_keywords_parse_as_calls() {
    let body = body_of("void f(){drawRect(0, 0, 10, 10, 255, 0, 0, 1);}");
    let Stmt::Expr(Expr::Call(name, args)) = &body[0] else {
        panic!("expected call statement");
    };
    assert_eq!(name, "drawRect");
    assert_eq!(args.len(), 8);
}

#[test]
fn bare_builtin_keyword_is_a_call_with_no_args() {
    let body = body_of("void f(){quit;}");
    assert_eq!(body[0], Stmt::Expr(Expr::Call("quit".to_string(), vec![])));
}

#[test]
fn input_with_prompt() {
    let body = body_of("void f(){string n = input(\"name: \");}");
    let Stmt::VarDecl {
        init: Some(Expr::Input(Some(prompt))),
        ..
    } = &body[0]
    else {
        panic!("expected input declaration");
    };
    assert_eq!(
        **prompt,
        Expr::Literal(LitKind::Str, "name: ".to_string())
    );
}

#[test]
fn input_without_parens() {
    let body = body_of("void f(){x = input;}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment");
    };
    assert_eq!(**value, Expr::Input(None));
}

#[test]
fn key_pressed_call() {
    let body = body_of("void f(){k = key_pressed();}");
    let Stmt::Expr(Expr::Assign(_, value)) = &body[0] else {
        panic!("expected assignment");
    };
    assert_eq!(**value, Expr::KeyPressed(None));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn literal_assignment_target_is_rejected() {
    let msg = parse_err("void f(){1 = 2;}");
    assert!(msg.contains("Invalid assignment target"), "{}", msg);
}

#[test]
fn call_on_non_identifier_is_rejected() {
    let msg = parse_err("void f(){x = (a + b)(1);}");
    assert!(msg.contains("Invalid function call"), "{}", msg);
}

#[test]
fn missing_close_paren_names_the_expectation() {
    let msg = parse_err("void f(){g(1, 2;}");
    assert!(msg.contains("Expected ')' after arguments"), "{}", msg);
}

#[test]
fn missing_semicolon_is_fatal() {
    let msg = parse_err("void f(){x = 1}");
    assert!(msg.contains("Expected ';'"), "{}", msg);
}

#[test]
fn unknown_token_surfaces_in_expression() {
    // A lone '&' lexes as Unknown and fails at expression-leading position
    let msg = parse_err("void f(){x = & 2;}");
    assert!(msg.contains("Unexpected token in expression"), "{}", msg);
}

#[test]
fn errors_carry_line_and_column() {
    let msg = parse_err("void f(){\nx = ;\n}");
    assert!(msg.starts_with("Parse error [2:"), "{}", msg);
}
