use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use variant_stream::{FailureKind, FailurePolicy, Parser, ParserBuilder, ParserOptions};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Circle {
    radius: i64,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Line {
    length: i64,
}

#[derive(Debug, PartialEq)]
enum Shape {
    Circle(Circle),
    Line(Line),
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

impl From<Line> for Shape {
    fn from(l: Line) -> Self {
        Shape::Line(l)
    }
}

fn shape_parser() -> Parser<Shape> {
    ParserBuilder::<Shape>::new("Type")
        .map::<Circle>("circle")
        .unwrap()
        .map::<Line>("line")
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn every_registered_value_resolves_to_its_type() {
    let parser = shape_parser();
    let circle = parser.parse_element(0, &json!({"Type": "circle", "Radius": 1}));
    let line = parser.parse_element(1, &json!({"Type": "line", "Length": 2}));

    let circle = circle.decoded().expect("circle should decode");
    assert_eq!(circle.type_id, TypeId::of::<Circle>());
    assert!(circle.type_name.ends_with("Circle"));

    let line = line.decoded().expect("line should decode");
    assert_eq!(line.type_id, TypeId::of::<Line>());
}

#[test]
fn mixed_known_and_unknown_elements_yield_in_order() {
    let parser = shape_parser();
    let input = json!([
        {"Type": "circle", "Radius": 5},
        {"Type": "square", "Side": 2},
        {"Type": "line", "Length": 9},
    ]);

    let outcomes: Vec<_> = parser.parse(&input).collect();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0].value(),
        Some(&Shape::Circle(Circle { radius: 5 }))
    );
    assert!(matches!(
        outcomes[1].failure().map(|f| &f.kind),
        Some(FailureKind::UnknownDiscriminator { value }) if value == "square"
    ));
    assert_eq!(outcomes[2].value(), Some(&Shape::Line(Line { length: 9 })));
}

#[test]
fn element_without_discriminator_field_fails_as_missing() {
    let parser = shape_parser();
    let outcomes: Vec<_> = parser.parse(&json!([{"Radius": 5}])).collect();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].failure().map(|f| &f.kind),
        Some(FailureKind::MissingDiscriminator)
    ));
}

#[test]
fn schema_mismatch_surfaces_as_decode_failure_with_cause() {
    let parser = shape_parser();
    let outcomes: Vec<_> = parser
        .parse(&json!([{"Type": "circle", "Radius": "not-a-number"}]))
        .collect();
    assert_eq!(outcomes.len(), 1);
    let failure = outcomes[0].failure().expect("should fail");
    assert_eq!(failure.index, 0);
    match &failure.kind {
        FailureKind::Decode {
            discriminator,
            source,
        } => {
            assert_eq!(discriminator, "circle");
            assert!(!source.to_string().is_empty());
        }
        other => panic!("expected Decode failure, got {other:?}"),
    }
}

#[test]
fn output_has_one_outcome_per_element_in_source_order() {
    let parser = shape_parser();
    let input = json!([
        {"Type": "circle", "Radius": 1},
        {"Type": "nope"},
        {"Type": "line", "Length": 2},
        {"Radius": 3},
        {"Type": "circle", "Radius": 4},
        "bare string",
    ]);

    let outcomes: Vec<_> = parser.parse(&input).collect();
    assert_eq!(outcomes.len(), 6);
    for (position, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.index(), position);
    }
    let decoded: Vec<bool> = outcomes.iter().map(|o| o.is_decoded()).collect();
    assert_eq!(decoded, vec![true, false, true, false, true, false]);
}

#[test]
fn consuming_k_outcomes_decodes_exactly_k_elements() {
    let decodes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&decodes);
    let parser = ParserBuilder::<Shape>::new("Type")
        .map_with::<Circle, _>("circle", move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Shape::Circle(c)
        })
        .unwrap()
        .build()
        .unwrap();

    let input = json!([
        {"Type": "circle", "Radius": 1},
        {"Type": "circle", "Radius": 2},
        {"Type": "circle", "Radius": 3},
        {"Type": "circle", "Radius": 4},
        {"Type": "circle", "Radius": 5},
    ]);

    let taken: Vec<_> = parser.parse(&input).take(2).collect();
    assert_eq!(taken.len(), 2);
    assert_eq!(decodes.load(Ordering::SeqCst), 2);
}

#[test]
fn identical_registrations_route_identically() {
    let input = json!([
        {"Type": "circle", "Radius": 1},
        {"Type": "square", "Side": 2},
        {"Type": "line", "Length": 3},
        {"Radius": 4},
    ]);

    let first: Vec<String> = shape_parser().parse(&input).map(|o| format!("{o:?}")).collect();
    let second: Vec<String> = shape_parser().parse(&input).map(|o| format!("{o:?}")).collect();
    assert_eq!(first, second);
}

#[test]
fn parse_is_stateless_across_calls() {
    let parser = shape_parser();
    let input = json!([{"Type": "circle", "Radius": 1}, {"Type": "line", "Length": 2}]);

    let first: Vec<_> = parser.parse(&input).collect();
    let second: Vec<_> = parser.parse(&input).collect();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(first[1].value(), second[1].value());
}

#[test]
fn one_parser_serves_concurrent_parses() {
    let parser = shape_parser();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let parser = parser.clone();
            std::thread::spawn(move || {
                let input = json!([{"Type": "circle", "Radius": i}]);
                parser.parse(&input).filter(|o| o.is_decoded()).count()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}

#[test]
fn halt_policy_ends_the_sequence_at_first_failure() {
    let options = ParserOptions {
        failure_policy: FailurePolicy::Halt,
        ..ParserOptions::default()
    };
    let parser = ParserBuilder::<Shape>::with_options("Type", options)
        .map::<Circle>("circle")
        .unwrap()
        .build()
        .unwrap();

    let input = json!([
        {"Type": "circle", "Radius": 1},
        {"Type": "square", "Side": 2},
        {"Type": "circle", "Radius": 3},
    ]);

    let outcomes: Vec<_> = parser.parse(&input).collect();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_decoded());
    assert!(outcomes[1].is_failed());
}

#[test]
fn failure_display_carries_index_and_cause() {
    let parser = shape_parser();
    let input = json!([{"Type": "square"}]);
    let failure = parser
        .parse(&input)
        .next()
        .unwrap()
        .into_value()
        .unwrap_err();
    let rendered = failure.to_string();
    assert!(rendered.contains("element 0"));
    assert!(rendered.contains("square"));
}
