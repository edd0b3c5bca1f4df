#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use umbral::{Delta, InverseMap, PropValue, Reconciler, Ref, Resource};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn schema() -> InverseMap {
    InverseMap::new()
        .relate("teams", "players", "players", "team")
        .to_one("players", "team")
}

fn team(id: &str) -> Ref {
    Ref::new("teams", id)
}

fn player(id: &str) -> Ref {
    Ref::new("players", id)
}

fn team_resource(id: &str, name: &str, players: &[Ref]) -> Resource {
    let mut resource = Resource::new(team(id));
    resource
        .props
        .insert("name".to_string(), PropValue::from(name));
    resource
        .relationships
        .insert("players".to_string(), players.to_vec());
    resource
}

#[test]
fn create_then_empty_retracts_the_inverse_end_to_end() {
    init_tracing();

    // First write operation: the team is created with one player. The
    // backend would apply this diff and store the result.
    let mut op1 = Reconciler::new(schema());
    let stored = team_resource("t1", "grizzlies", &[player("p1")]);
    op1.assert_resource(&stored, None).expect("create team");

    let changes = op1.get_relationship_changes(&team("t1"));
    let expected: BTreeSet<Ref> = [player("p1")].into_iter().collect();
    assert_eq!(changes.get("players"), Some(&Delta::Replace(expected)));
    let inverse = op1.get_relationship_changes(&player("p1"));
    let expected: BTreeMap<Ref, bool> = [(team("t1"), true)].into_iter().collect();
    assert_eq!(inverse.get("team"), Some(&Delta::Patch(expected)));

    // Second write operation, fresh reconciler: the same team is asserted
    // with an empty player list against the stored version.
    let mut op2 = Reconciler::new(schema());
    let updated = team_resource("t1", "grizzlies", &[]);
    op2.assert_resource(&updated, Some(&stored))
        .expect("empty the roster");

    let changes = op2.get_relationship_changes(&team("t1"));
    assert_eq!(changes.get("players"), Some(&Delta::Replace(BTreeSet::new())));
    let inverse = op2.get_relationship_changes(&player("p1"));
    let expected: BTreeMap<Ref, bool> = [(team("t1"), false)].into_iter().collect();
    assert_eq!(inverse.get("team"), Some(&Delta::Patch(expected)));
}

#[test]
fn resources_and_explicit_set_distinguish_touched_from_updated() {
    init_tracing();

    let mut rec = Reconciler::new(schema());
    rec.assert_resource(&team_resource("t1", "grizzlies", &[player("p1")]), None)
        .expect("create team");

    let resources = rec.get_resources();
    assert_eq!(resources.len(), 2);

    let stored_team = resources
        .get(&team("t1"))
        .and_then(|n| n.as_ref())
        .expect("team node");
    assert_eq!(stored_team.props.get("name"), Some(&PropValue::from("grizzlies")));

    // The player was learned from the relationship only: present in the
    // node set with no properties, absent from the explicit set.
    let referenced = resources
        .get(&player("p1"))
        .and_then(|n| n.as_ref())
        .expect("player node");
    assert!(referenced.props.is_empty());
    assert!(rec.explicit_resources().contains(&team("t1")));
    assert!(!rec.explicit_resources().contains(&player("p1")));
}

#[test]
fn moving_a_player_between_teams_in_one_operation() {
    init_tracing();

    let stored_t1 = team_resource("t1", "grizzlies", &[player("p1")]);

    let mut rec = Reconciler::new(schema());
    rec.assert_resource(&team_resource("t1", "grizzlies", &[]), Some(&stored_t1))
        .expect("drop from t1");
    rec.assert_resource(&team_resource("t2", "rockets", &[player("p1")]), None)
        .expect("add to t2");

    // p1's inverse group carries both edits: off t1, onto t2.
    let inverse = rec.get_relationship_changes(&player("p1"));
    let expected: BTreeMap<Ref, bool> =
        [(team("t1"), false), (team("t2"), true)].into_iter().collect();
    assert_eq!(inverse.get("team"), Some(&Delta::Patch(expected)));
}

#[test]
fn deleting_a_team_clears_its_relationships() {
    init_tracing();

    let stored = team_resource("t1", "grizzlies", &[player("p1"), player("p2")]);

    let mut rec = Reconciler::new(schema());
    rec.retract_resource(&team("t1"), Some(&stored))
        .expect("delete team");

    let resources = rec.get_resources();
    assert_eq!(resources.get(&team("t1")), Some(&None));

    let changes = rec.get_relationship_changes(&team("t1"));
    assert_eq!(changes.get("players"), Some(&Delta::Replace(BTreeSet::new())));

    for id in ["p1", "p2"] {
        let inverse = rec.get_relationship_changes(&player(id));
        let expected: BTreeMap<Ref, bool> = [(team("t1"), false)].into_iter().collect();
        assert_eq!(inverse.get("team"), Some(&Delta::Patch(expected)));
    }
}

#[test]
fn unchanged_scalar_update_still_replaces_the_roster() {
    init_tracing();

    let stored = team_resource("t1", "grizzlies", &[player("p1")]);

    let mut rec = Reconciler::new(schema());
    rec.assert_resource(&stored, Some(&stored)).expect("no-op update");

    // The relationship list is re-declared authoritative even when nothing
    // moved; applying it is idempotent for the backend.
    let changes = rec.get_relationship_changes(&team("t1"));
    let expected: BTreeSet<Ref> = [player("p1")].into_iter().collect();
    assert_eq!(changes.get("players"), Some(&Delta::Replace(expected)));
}
