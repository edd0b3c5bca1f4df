#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use umbral::{Arrow, ConflictError, Delta, MutationLedger, Node, PropValue, Ref};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn order(id: &str) -> Ref {
    Ref::new("orders", id)
}

fn item(id: &str) -> Ref {
    Ref::new("items", id)
}

#[test]
fn one_ledger_tracks_many_groups_independently() {
    init_tracing();
    let mut ledger = MutationLedger::new();

    // o1 gets an authoritative item list; o2 is patched incrementally.
    ledger
        .assert_arrow_group(&order("o1"), &[item("i1"), item("i2")], "items")
        .expect("declare o1 items");
    ledger.mark_arrow(Arrow::new(order("o2"), item("i1"), "items"));
    ledger
        .assert_arrow(Arrow::new(order("o2"), item("i3"), "items"))
        .expect("add i3 to o2");

    let o1 = ledger.get_arrow_changes(&order("o1"));
    let expected: BTreeSet<Ref> = [item("i1"), item("i2")].into_iter().collect();
    assert_eq!(o1.get("items"), Some(&Delta::Replace(expected)));

    let o2 = ledger.get_arrow_changes(&order("o2"));
    let expected: BTreeMap<Ref, bool> =
        [(item("i1"), false), (item("i3"), true)].into_iter().collect();
    assert_eq!(o2.get("items"), Some(&Delta::Patch(expected)));
}

#[test]
fn labels_on_one_source_diff_independently() {
    init_tracing();
    let mut ledger = MutationLedger::new();

    ledger
        .assert_arrow_group(&order("o1"), &[item("i1")], "items")
        .expect("declare items");
    ledger
        .retract_arrow(Arrow::new(order("o1"), Ref::new("coupons", "c1"), "coupons"))
        .expect("retract coupon");

    let changes = ledger.get_arrow_changes(&order("o1"));
    assert_eq!(changes.len(), 2);
    assert!(matches!(changes.get("items"), Some(Delta::Replace(_))));
    assert!(matches!(changes.get("coupons"), Some(Delta::Patch(_))));
}

#[test]
fn conflict_leaves_the_caller_free_to_discard_everything() {
    init_tracing();
    let mut ledger = MutationLedger::new();
    ledger
        .assert_arrow_group(&order("o1"), &[item("i1")], "items")
        .expect("declare");

    // The whole prospective change set is abandoned on conflict; nothing was
    // ever applied anywhere, so the ledger is simply dropped.
    let err = ledger
        .assert_arrow_group(&order("o1"), &[item("i2")], "items")
        .expect_err("contradictory re-declaration");
    assert!(matches!(err, ConflictError::GroupMismatch { .. }));
    drop(ledger);
}

#[test]
fn node_set_covers_every_touched_identity() {
    init_tracing();
    let mut ledger = MutationLedger::new();

    let mut placed = Node::new(order("o1"));
    placed
        .props
        .insert("status".to_string(), PropValue::from("placed"));
    ledger.assert_node(placed).expect("assert order");
    ledger
        .assert_arrow_group(&order("o1"), &[item("i1")], "items")
        .expect("declare items");
    ledger.retract_node(&order("o9")).expect("retract order");

    let nodes = ledger.get_nodes();
    assert_eq!(nodes.len(), 3);
    let o1 = nodes.get(&order("o1")).and_then(|n| n.as_ref()).expect("o1");
    assert_eq!(o1.props.get("status"), Some(&PropValue::from("placed")));
    assert!(nodes.get(&item("i1")).is_some_and(Option::is_some));
    assert_eq!(nodes.get(&order("o9")), Some(&None));
}

#[test]
fn deltas_survive_json_transport() {
    let replace = Delta::Replace([item("i1"), item("i2")].into_iter().collect());
    let json = serde_json::to_string(&replace).expect("serialize replace");
    assert_eq!(json, r#"{"Replace":["items:i1","items:i2"]}"#);
    let back: Delta = serde_json::from_str(&json).expect("deserialize replace");
    assert_eq!(back, replace);

    let patch = Delta::Patch([(item("i1"), true), (item("i2"), false)].into_iter().collect());
    let json = serde_json::to_string(&patch).expect("serialize patch");
    assert_eq!(json, r#"{"Patch":{"items:i1":true,"items:i2":false}}"#);
    let back: Delta = serde_json::from_str(&json).expect("deserialize patch");
    assert_eq!(back, patch);
}
