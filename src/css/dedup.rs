//! Collapse per-element declaration sets into shared CSS classes.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};

use serde::Serialize;

use super::declarations::{CanonicalKey, StyleDeclarations};
use crate::error::{Result, XlhtmlError};

/// Identifier of a deduplicated style group, usable as a CSS class token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One element's membership in a style group.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleGroup {
    pub element_id: String,
    pub group_id: GroupId,
    pub declarations: StyleDeclarations,
}

#[derive(Debug)]
struct Rule {
    id: GroupId,
    declarations: StyleDeclarations,
}

/// Check that `prefix` matches `[a-zA-Z_][a-zA-Z0-9_-]*`.
pub fn validate_class_prefix(prefix: &str) -> Result<()> {
    let mut bytes = prefix.bytes();
    let valid = match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(XlhtmlError::InvalidClassPrefix(prefix.to_string()))
    }
}

/// Element id to class list, in the order passes were merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassAssignments {
    classes: BTreeMap<String, Vec<GroupId>>,
}

impl ClassAssignments {
    pub fn classes_for(&self, element: &str) -> &[GroupId] {
        self.classes.get(element).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GroupId])> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    fn push(&mut self, element: &str, id: GroupId) {
        let list = self.classes.entry(element.to_string()).or_default();
        if !list.contains(&id) {
            list.push(id);
        }
    }

    /// Append another pass's classes after this pass's classes.
    pub fn extend(&mut self, other: Self) {
        for (element, ids) in other.classes {
            for id in ids {
                self.push(&element, id);
            }
        }
    }
}

/// Result of one deduplication run.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactStyles {
    /// One rule per distinct declaration set, newline separated.
    pub stylesheet: String,
    pub assignments: ClassAssignments,
    pub groups: Vec<StyleGroup>,
    pub rule_count: usize,
}

/// Assigns group ids to declaration sets within one run.
///
/// Ids are `{prefix}-{n}` where `n` counts distinct canonical keys in the
/// order they were first seen. A deduplicator is single-owner state: use
/// one per sheet and pass, never share one across threads.
#[derive(Debug)]
pub struct StyleDeduplicator {
    prefix: String,
    by_key: HashMap<CanonicalKey, GroupId>,
    rules: Vec<Rule>,
    groups: Vec<StyleGroup>,
}

impl StyleDeduplicator {
    pub fn new(prefix: &str) -> Result<Self> {
        validate_class_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            by_key: HashMap::new(),
            rules: Vec::new(),
            groups: Vec::new(),
        })
    }

    /// Number of distinct groups minted so far.
    pub fn group_count(&self) -> usize {
        self.rules.len()
    }

    /// Record `element`'s declarations and return its group id.
    ///
    /// On error nothing is recorded; the caller should abandon the run since
    /// its stylesheet would be missing a rule.
    pub fn insert(&mut self, element: &str, declarations: &StyleDeclarations) -> Result<GroupId> {
        let key = CanonicalKey::of(declarations).map_err(|e| e.into_error(element))?;
        let id = match self.by_key.get(&key) {
            Some(id) => id.clone(),
            None => {
                let id = GroupId(format!("{}-{}", self.prefix, self.rules.len()));
                self.rules.push(Rule {
                    id: id.clone(),
                    declarations: declarations.clone(),
                });
                self.by_key.insert(key, id.clone());
                id
            }
        };
        self.groups.push(StyleGroup {
            element_id: element.to_string(),
            group_id: id.clone(),
            declarations: declarations.clone(),
        });
        Ok(id)
    }

    /// Emit the stylesheet and element table.
    pub fn finish(self) -> CompactStyles {
        let mut stylesheet = String::new();
        for rule in &self.rules {
            if !stylesheet.is_empty() {
                stylesheet.push('\n');
            }
            write_rule(&mut stylesheet, &rule.id, &rule.declarations);
        }

        let mut assignments = ClassAssignments::default();
        for group in &self.groups {
            assignments.push(&group.element_id, group.group_id.clone());
        }

        log::debug!(
            "style pass {}: {} elements, {} rules",
            self.prefix,
            self.groups.len(),
            self.rules.len()
        );

        CompactStyles {
            stylesheet,
            assignments,
            rule_count: self.rules.len(),
            groups: self.groups,
        }
    }
}

fn write_rule(out: &mut String, id: &GroupId, declarations: &StyleDeclarations) {
    let _ = write!(out, ".{id} {{");
    for (name, value) in declarations.iter() {
        // Values were validated when the key was built.
        if let Ok(rendered) = value.render() {
            let _ = write!(out, " {name}: {rendered};");
        }
    }
    out.push_str(" }");
}

/// Deduplicate a whole pass at once. Any unstable value fails the pass.
pub fn deduplicate<'a, I>(prefix: &str, elements: I) -> Result<CompactStyles>
where
    I: IntoIterator<Item = (&'a str, &'a StyleDeclarations)>,
{
    let mut dedup = StyleDeduplicator::new(prefix)?;
    for (element, declarations) in elements {
        dedup.insert(element, declarations)?;
    }
    Ok(dedup.finish())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::css::StyleValue;
    use crate::units::Measurement;
    use proptest::prelude::*;
    use test_case::test_case;

    fn decls(pairs: &[(&str, &str)]) -> StyleDeclarations {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn identical_sets_share_group() {
        let a = decls(&[("color", "red"), ("font-weight", "bold")]);
        let b = decls(&[("font-weight", "bold"), ("color", "red")]);
        let c = decls(&[("color", "blue")]);
        let out = deduplicate("xc", [("e1", &a), ("e2", &b), ("e3", &c)]).unwrap();

        assert_eq!(out.rule_count, 2);
        assert_eq!(out.assignments.classes_for("e1")[0].as_str(), "xc-0");
        assert_eq!(out.assignments.classes_for("e2")[0].as_str(), "xc-0");
        assert_eq!(out.assignments.classes_for("e3")[0].as_str(), "xc-1");
        assert_eq!(
            out.stylesheet,
            ".xc-0 { color: red; font-weight: bold; }\n.xc-1 { color: blue; }"
        );
    }

    #[test]
    fn empty_set_still_gets_group() {
        let empty = StyleDeclarations::new();
        let out = deduplicate("xv", [("e1", &empty), ("e2", &empty)]).unwrap();
        assert_eq!(out.rule_count, 1);
        assert_eq!(out.stylesheet, ".xv-0 { }");
        assert_eq!(out.assignments.classes_for("e2").len(), 1);
    }

    #[test]
    fn unstable_value_fails_whole_pass() {
        let good = decls(&[("color", "red")]);
        let bad = StyleDeclarations::new().with("width", StyleValue::Number(f64::INFINITY));
        let err = deduplicate("xc", [("e1", &good), ("e2", &bad)]).unwrap_err();
        match err {
            XlhtmlError::UnstableStyleValue { element, name, .. } => {
                assert_eq!(element, "e2");
                assert_eq!(name, "width");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn failed_insert_records_nothing() {
        let mut dedup = StyleDeduplicator::new("xc").unwrap();
        let bad = decls(&[("color", "red;")]);
        assert!(dedup.insert("e1", &bad).is_err());
        assert_eq!(dedup.group_count(), 0);
        assert!(dedup.finish().assignments.is_empty());
    }

    #[test_case("xc" => true)]
    #[test_case("_cell" => true)]
    #[test_case("a-b_9" => true)]
    #[test_case("9x" => false)]
    #[test_case("-x" => false)]
    #[test_case("" => false)]
    #[test_case("x y" => false)]
    fn prefix_validation(prefix: &str) -> bool {
        StyleDeduplicator::new(prefix).is_ok()
    }

    #[test]
    fn rule_carries_every_declaration_unchanged() {
        let set = StyleDeclarations::builder()
            .set("height", Measurement::pt(20.25).unwrap())
            .set("border-top", "1px solid rgb(0, 0, 0)")
            .set("font-weight", 700.0)
            .build();
        let out = deduplicate("xc", [("e1", &set)]).unwrap();
        assert_eq!(
            out.stylesheet,
            ".xc-0 { border-top: 1px solid rgb(0, 0, 0); font-weight: 700; height: 20.25pt; }"
        );
        assert_eq!(out.groups[0].declarations, set);
    }

    #[test]
    fn assignments_merge_across_passes() {
        let a = decls(&[("color", "red")]);
        let mut cells = deduplicate("xc", [("td1", &a)]).unwrap().assignments;
        let values = deduplicate("xv", [("td1", &a), ("td2", &a)]).unwrap().assignments;
        cells.extend(values);
        let ids: Vec<&str> = cells
            .classes_for("td1")
            .iter()
            .map(GroupId::as_str)
            .collect();
        assert_eq!(ids, ["xc-0", "xv-0"]);
        assert_eq!(cells.classes_for("td2").len(), 1);
        assert!(cells.classes_for("missing").is_empty());
    }

    const NAMES: [&str; 5] = ["color", "height", "width", "border-top", "font-size"];

    fn arb_value() -> impl Strategy<Value = StyleValue> {
        prop_oneof![
            3 => prop::sample::select(vec!["red", "blue", "1px solid black", "none"])
                .prop_map(StyleValue::from),
            1 => (0u32..8).prop_map(|n| StyleValue::from(f64::from(n) * 0.75)),
            1 => (0u32..4).prop_map(|n| StyleValue::Length(Measurement::pt(f64::from(n) * 15.0).unwrap())),
        ]
    }

    fn arb_set() -> impl Strategy<Value = StyleDeclarations> {
        prop::collection::btree_map(prop::sample::select(NAMES.to_vec()), arb_value(), 0..4)
            .prop_map(|map| map.into_iter().collect())
    }

    /// Element ids paired with their declaration sets, in insertion order.
    fn arb_elements() -> impl Strategy<Value = Vec<(String, StyleDeclarations)>> {
        prop::collection::vec(arb_set(), 0..60).prop_map(|sets| {
            sets.into_iter()
                .enumerate()
                .map(|(i, set)| (format!("e{i}"), set))
                .collect()
        })
    }

    fn run(sets: &[(String, StyleDeclarations)]) -> CompactStyles {
        deduplicate("g", sets.iter().map(|(e, d)| (e.as_str(), d))).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn groups_match_canonical_equality(sets in arb_elements()) {
            let out = run(&sets);
            for (e1, d1) in &sets {
                for (e2, d2) in &sets {
                    let same_key = CanonicalKey::of(d1).unwrap() == CanonicalKey::of(d2).unwrap();
                    let same_group =
                        out.assignments.classes_for(e1) == out.assignments.classes_for(e2);
                    prop_assert_eq!(same_key, same_group, "{} vs {}", e1, e2);
                }
            }
            let distinct: std::collections::HashSet<_> = sets
                .iter()
                .map(|(_, d)| CanonicalKey::of(d).unwrap())
                .collect();
            prop_assert_eq!(out.rule_count, distinct.len());
        }

        #[test]
        fn rerun_is_stable_and_changes_never_shrink(
            sets in arb_elements().prop_filter("needs an element", |s| !s.is_empty()),
            pick in any::<prop::sample::Index>(),
            value in "[a-z]{1,12}",
        ) {
            let first = run(&sets);
            let second = run(&sets);
            prop_assert_eq!(first.rule_count, second.rule_count);
            prop_assert_eq!(&first.stylesheet, &second.stylesheet);

            let mut changed = sets.clone();
            let target = pick.index(changed.len());
            changed[target].1 = changed[target].1.with("color", value);
            let third = run(&changed);
            prop_assert!(third.rule_count + 1 >= first.rule_count);
            if !sets.iter().any(|(_, d)| d == &changed[target].1) {
                prop_assert!(third.rule_count >= first.rule_count);
            }
        }
    }
}
