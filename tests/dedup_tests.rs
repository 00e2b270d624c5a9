//! Tests for canonical style keys and class-based deduplication.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use xlhtml::{
    deduplicate, CanonicalKey, Measurement, StyleDeclarations, StyleDeduplicator, StyleValue,
    XlhtmlError,
};

fn decls(pairs: &[(&str, &str)]) -> StyleDeclarations {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[test]
fn test_key_ignores_insertion_order() {
    let a = decls(&[("color", "red"), ("height", "15.00pt"), ("border-top", "none")]);
    let b = decls(&[("border-top", "none"), ("color", "red"), ("height", "15.00pt")]);

    let key = CanonicalKey::of(&a).unwrap();
    assert_eq!(key, CanonicalKey::of(&b).unwrap());
    assert_eq!(key.as_str(), "border-top:none;color:red;height:15.00pt;");
}

#[test]
fn test_key_formats_numbers_and_lengths() {
    let set = StyleDeclarations::builder()
        .set("height", Measurement::pt(12.346).unwrap())
        .set("opacity", 0.5)
        .set("z-index", 3.0)
        .build();
    assert_eq!(
        CanonicalKey::of(&set).unwrap().as_str(),
        "height:12.35pt;opacity:0.50;z-index:3;"
    );
}

#[test]
fn test_values_that_differ_give_different_keys() {
    let a = decls(&[("color", "red")]);
    let b = decls(&[("color", "blue")]);
    assert_ne!(CanonicalKey::of(&a).unwrap(), CanonicalKey::of(&b).unwrap());
}

#[test]
fn test_empty_set_has_empty_key() {
    assert_eq!(CanonicalKey::of(&StyleDeclarations::new()).unwrap().as_str(), "");
}

#[test]
fn test_groups_numbered_in_first_seen_order() {
    let red = decls(&[("color", "red")]);
    let blue = decls(&[("color", "blue")]);
    let mut dedup = StyleDeduplicator::new("xc").unwrap();

    assert_eq!(dedup.insert("r0c0", &blue).unwrap().as_str(), "xc-0");
    assert_eq!(dedup.insert("r0c1", &red).unwrap().as_str(), "xc-1");
    assert_eq!(dedup.insert("r0c2", &blue).unwrap().as_str(), "xc-0");
    assert_eq!(dedup.group_count(), 2);

    let compact = dedup.finish();
    assert_eq!(compact.rule_count, 2);
    assert_eq!(
        compact.stylesheet,
        ".xc-0 { color: blue; }\n.xc-1 { color: red; }"
    );
    assert_eq!(compact.groups.len(), 3);
    assert_eq!(compact.assignments.classes_for("r0c2")[0].as_str(), "xc-0");
    assert!(compact.assignments.classes_for("missing").is_empty());
}

#[test]
fn test_rule_lists_declarations_in_key_order() {
    let set = decls(&[("width", "64.00px"), ("border-left", "none"), ("height", "15.00pt")]);
    let compact = deduplicate("xc", [("e", &set)]).unwrap();
    assert_eq!(
        compact.stylesheet,
        ".xc-0 { border-left: none; height: 15.00pt; width: 64.00px; }"
    );
}

#[test]
fn test_many_elements_few_rules() {
    let sets: Vec<(String, StyleDeclarations)> = (0..1000)
        .map(|i| {
            let color = ["red", "green", "blue"][i % 3];
            (format!("e{i}"), decls(&[("color", color)]))
        })
        .collect();

    let compact = deduplicate("xv", sets.iter().map(|(id, d)| (id.as_str(), d))).unwrap();
    assert_eq!(compact.rule_count, 3);
    assert_eq!(compact.assignments.len(), 1000);
    assert_eq!(compact.stylesheet.lines().count(), 3);
}

#[test]
fn test_empty_pass() {
    let compact = deduplicate("xk", std::iter::empty::<(&str, &StyleDeclarations)>()).unwrap();
    assert_eq!(compact.rule_count, 0);
    assert!(compact.stylesheet.is_empty());
    assert!(compact.assignments.is_empty());
}

#[test]
fn test_unstable_value_fails_the_pass() {
    let good = decls(&[("color", "red")]);
    let bad = decls(&[("color", "red; background: url(x)")]);

    let err = deduplicate("xc", [("ok", &good), ("r3c4", &bad)]).unwrap_err();
    match err {
        XlhtmlError::UnstableStyleValue { element, name, .. } => {
            assert_eq!(element, "r3c4");
            assert_eq!(name, "color");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_finite_number_is_unstable() {
    let set = StyleDeclarations::new().with("opacity", StyleValue::Number(f64::NAN));
    assert!(CanonicalKey::of(&set).is_err());
}

#[test]
fn test_invalid_prefixes() {
    for prefix in ["", "1x", "x y", "x.y", "-x"] {
        assert!(
            matches!(
                StyleDeduplicator::new(prefix),
                Err(XlhtmlError::InvalidClassPrefix(_))
            ),
            "{prefix:?} should be rejected"
        );
    }
    for prefix in ["x", "_x", "x-1", "Cell_2"] {
        assert!(StyleDeduplicator::new(prefix).is_ok(), "{prefix:?}");
    }
}

#[test]
fn test_separate_runs_are_independent() {
    let set = decls(&[("color", "red")]);
    let first = deduplicate("xc", [("a", &set)]).unwrap();
    let second = deduplicate("xk", [("a", &set)]).unwrap();

    assert_eq!(first.assignments.classes_for("a")[0].as_str(), "xc-0");
    assert_eq!(second.assignments.classes_for("a")[0].as_str(), "xk-0");
}
