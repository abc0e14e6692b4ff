mod common;

use std::sync::Arc;

use common::*;
use tessel_format::{CycleMode, SerdeConfig, SerdeErrorKind, TokenBuffer, Value};
use tessel_testhelpers::test;

const LIMIT: usize = 4;

/// `depth` arrays nested inside each other.
fn nested(depth: usize) -> Value {
    let mut value = Value::Array(vec![]);
    for _ in 1..depth {
        value = Value::Array(vec![value]);
    }
    value
}

/// A chain of `len` nodes, each pointing to the next.
fn chain(len: usize) -> Arc<Node> {
    let head = Node::new("n0");
    let mut tail = head.clone();
    for i in 1..len {
        let next = Node::new(&format!("n{i}"));
        tail.point_to(&next);
        tail = next;
    }
    head
}

fn limited() -> SerdeConfig {
    SerdeConfig::default().with_max_depth(LIMIT)
}

#[test]
fn encoding_at_the_limit_succeeds() {
    let mapper = mapper(limited());
    let mut buffer = TokenBuffer::new();
    mapper.serialize_value(&nested(LIMIT), &mut buffer).unwrap();
    assert_eq!(render(&buffer.tokens()), "[[[[]]]]");
}

#[test]
fn encoding_past_the_limit_fails() {
    let mapper = mapper(limited());
    let err = mapper
        .serialize_value(&nested(LIMIT + 1), &mut TokenBuffer::new())
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::DepthLimitExceeded { max_depth: LIMIT }
    );
}

#[test]
fn decoding_at_the_limit_succeeds() {
    let mapper = mapper(limited());
    let value = mapper.deserialize_value(&mut input(&nested(LIMIT))).unwrap();
    assert_eq!(value, nested(LIMIT));
}

#[test]
fn decoding_past_the_limit_fails() {
    let mapper = mapper(limited());
    let err = mapper
        .deserialize_value(&mut input(&nested(LIMIT + 1)))
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::DepthLimitExceeded { max_depth: LIMIT }
    );
}

#[test]
fn object_graphs_respect_the_limit_on_both_sides() {
    let unlimited = mapper(SerdeConfig::default().with_cycles(CycleMode::Fail));
    let mapper = mapper(limited());

    let mut buffer = TokenBuffer::new();
    mapper.serialize(&*chain(LIMIT), &mut buffer).unwrap();
    let back: Node = mapper.deserialize(&mut buffer).unwrap();
    assert_eq!(back.name, "n0");

    let err = mapper
        .serialize(&*chain(LIMIT + 1), &mut TokenBuffer::new())
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::DepthLimitExceeded { max_depth: LIMIT }
    );

    let mut deep = TokenBuffer::new();
    unlimited.serialize(&*chain(LIMIT + 1), &mut deep).unwrap();
    let err = mapper.deserialize::<Node>(&mut deep).unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::DepthLimitExceeded { max_depth: LIMIT }
    );
}

#[test]
fn discriminator_search_is_bounded() {
    let mapper = mapper(SerdeConfig::default().with_max_lookahead_tokens(6));
    let padded = object([
        ("radius", Value::F64(1.5)),
        (
            "padding",
            array([
                Value::I64(1),
                Value::I64(2),
                Value::I64(3),
                Value::I64(4),
                Value::I64(5),
            ]),
        ),
        ("@type", string("circle")),
    ]);
    let err = mapper
        .deserialize_dyn(SHAPE, &mut input(&padded))
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::LookaheadExceeded { max_tokens: 6 }
    );

    let near = object([("radius", Value::F64(1.5)), ("@type", string("circle"))]);
    assert!(mapper.deserialize_dyn(SHAPE, &mut input(&near)).is_ok());
}
