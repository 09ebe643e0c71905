//! Drives the embedded drawing interpreter through its public surface only
//! (no access to the private operand stack), checking that a user-defined
//! procedure composes with the built-in path operators.

use engrave_core::draw::{Interpreter, OverdrawRecord, Token, Value};
use std::collections::HashMap;

#[test]
fn user_defined_procedure_draws_a_triangle() {
    let mut procs = HashMap::new();
    procs.insert(
        "triangle".to_string(),
        vec![
            Token::Push(Value::Num(0.0)),
            Token::Push(Value::Num(0.0)),
            Token::Op("moveto".into()),
            Token::Push(Value::Num(10.0)),
            Token::Push(Value::Num(0.0)),
            Token::Op("lineto".into()),
            Token::Push(Value::Num(5.0)),
            Token::Push(Value::Num(8.0)),
            Token::Op("lineto".into()),
            Token::Op("fill".into()),
        ],
    );

    let mut interp = Interpreter::new(&procs);
    interp.run(&[Token::Op("triangle".into())]).unwrap();

    let records = interp.overdraw_records();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0], OverdrawRecord::MoveTo(0.0, 0.0));
    assert_eq!(records.last(), Some(&OverdrawRecord::Fill));
}

#[test]
fn division_by_zero_is_rejected() {
    let procs = HashMap::new();
    let mut interp = Interpreter::new(&procs);
    let result = interp.run(&[
        Token::Push(Value::Num(1.0)),
        Token::Push(Value::Num(0.0)),
        Token::Op("div".into()),
    ]);
    assert!(result.is_err());
}
