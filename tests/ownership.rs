// tests/ownership.rs

use std::collections::{BTreeSet, HashSet};

use rewind::errors::RewindError;
use rewind::model::{Action, ActionInput, ActionKey, Artifact, NodeKey};
use rewind::rewind::{OwnerMap, OwnershipResolver};

fn failed_action() -> Action {
    Action::new(ActionKey::new("//app:bin", 0), "Link")
}

fn deps(artifacts: &[&Artifact]) -> HashSet<NodeKey> {
    artifacts.iter().map(|a| a.node_key()).collect()
}

#[test]
fn direct_dep_is_its_own_owner() {
    let lib = Artifact::derived("out/lib.a");
    let direct = deps(&[&lib]);
    let none = OwnerMap::new();
    let resolver = OwnershipResolver::new(&none, &none, &direct);

    let lost = [ActionInput::from(lib.clone())];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert_eq!(by_owner.len(), 1);
    assert_eq!(by_owner[&lib], BTreeSet::from([ActionInput::from(lib.clone())]));
}

#[test]
fn tree_member_maps_to_tree_dep() {
    let tree = Artifact::tree("out/gen");
    let direct = deps(&[&tree]);
    let trees = OwnerMap::new().with_owner("out/gen/a.h", tree.clone());
    let runfiles = OwnerMap::new();
    let resolver = OwnershipResolver::new(&trees, &runfiles, &direct);

    let lost = [ActionInput::virtual_input("out/gen/a.h")];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert_eq!(by_owner.keys().collect::<Vec<_>>(), vec![&tree]);
}

#[test]
fn runfiles_member_maps_to_runfiles_dep() {
    let rf = Artifact::runfiles("out/tool.runfiles");
    let direct = deps(&[&rf]);
    let trees = OwnerMap::new();
    let runfiles = OwnerMap::new().with_owner("out/tool.runfiles/data.txt", rf.clone());
    let resolver = OwnershipResolver::new(&trees, &runfiles, &direct);

    let lost = [ActionInput::virtual_input("out/tool.runfiles/data.txt")];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert!(by_owner.contains_key(&rf));
}

#[test]
fn tree_inside_runfiles_maps_to_transitive_owner() {
    let tree = Artifact::tree("out/tool.runfiles/gen");
    let rf = Artifact::runfiles("out/tool.runfiles");
    let direct = deps(&[&rf]);
    let trees = OwnerMap::new().with_owner("out/tool.runfiles/gen/x", tree.clone());
    let runfiles = OwnerMap::new().with_owner(tree.exec_path.clone(), rf.clone());
    let resolver = OwnershipResolver::new(&trees, &runfiles, &direct);

    let lost = [ActionInput::virtual_input("out/tool.runfiles/gen/x")];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert_eq!(by_owner.keys().collect::<Vec<_>>(), vec![&rf]);
}

#[test]
fn tree_owner_wins_over_runfiles_owner() {
    let tree = Artifact::tree("out/gen");
    let rf = Artifact::runfiles("out/tool.runfiles");
    let direct = deps(&[&tree, &rf]);
    let trees = OwnerMap::new().with_owner("out/gen/a", tree.clone());
    let runfiles = OwnerMap::new().with_owner("out/gen/a", rf.clone());
    let resolver = OwnershipResolver::new(&trees, &runfiles, &direct);

    let lost = [ActionInput::virtual_input("out/gen/a")];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert_eq!(by_owner.keys().collect::<Vec<_>>(), vec![&tree]);
}

#[test]
fn owner_that_is_not_a_dep_is_skipped() {
    let tree = Artifact::tree("out/other");
    let direct = deps(&[&Artifact::derived("out/lib.a")]);
    let trees = OwnerMap::new().with_owner("out/other/a", tree);
    let runfiles = OwnerMap::new();
    let resolver = OwnershipResolver::new(&trees, &runfiles, &direct);

    let lost = [ActionInput::virtual_input("out/other/a")];
    let by_owner = resolver.resolve(lost.iter(), &failed_action()).unwrap();

    assert!(by_owner.is_empty());
}

#[test]
fn virtual_input_at_dep_path_is_invariant_violation() {
    let lib = Artifact::derived("out/lib.a");
    let direct = deps(&[&lib]);
    let none = OwnerMap::new();
    let resolver = OwnershipResolver::new(&none, &none, &direct);

    let lost = [ActionInput::virtual_input("out/lib.a")];
    let result = resolver.resolve(lost.iter(), &failed_action());

    match result {
        Err(RewindError::InvariantViolation(msg)) => {
            assert!(msg.contains("out/lib.a"));
            assert!(msg.contains("//app:bin#0"));
        }
        Err(e) => panic!("Expected InvariantViolation, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}
