// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionConfig, ConfigFile, RawConfigFile};
use crate::errors::{Result, RewindError};
use crate::model::{ActionKey, ArtifactKind};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RewindError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_actions(&raw)?;
        validate_global_config(&raw)?;
        let actions = parse_action_keys(&raw)?;
        let producers = collect_producers(&raw, &actions)?;
        let expansions = collect_expansions(&raw, &actions, &producers)?;
        validate_artifacts(&raw, &producers, &expansions)?;
        validate_dag(&actions, &producers, &expansions)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.artifact,
            actions,
            producers,
            expansions,
        ))
    }
}

/// Validate a raw config without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

fn ensure_has_actions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.action.is_empty() {
        return Err(RewindError::ConfigError(
            "graph must contain at least one [action.\"<owner>#<index>\"] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_rewinds_per_action == 0 {
        return Err(RewindError::ConfigError(
            "[config].max_rewinds_per_action must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn parse_action_keys(cfg: &RawConfigFile) -> Result<BTreeMap<ActionKey, ActionConfig>> {
    let mut actions = BTreeMap::new();
    for (name, action) in cfg.action.iter() {
        let key = name.parse::<ActionKey>().map_err(RewindError::ConfigError)?;
        actions.insert(key, action.clone());
    }
    Ok(actions)
}

fn collect_producers(
    cfg: &RawConfigFile,
    actions: &BTreeMap<ActionKey, ActionConfig>,
) -> Result<BTreeMap<String, ActionKey>> {
    let mut producers: BTreeMap<String, ActionKey> = BTreeMap::new();

    for (key, action) in actions.iter() {
        for output in action.outputs.iter() {
            if let Some(declared) = cfg.artifact.get(output) {
                if declared.kind == ArtifactKind::Source {
                    return Err(RewindError::ConfigError(format!(
                        "action '{}' outputs '{}', which is declared as a source artifact",
                        key, output
                    )));
                }
            }
            if action.inputs.contains(output) {
                return Err(RewindError::ConfigError(format!(
                    "action '{}' lists '{}' as both input and output",
                    key, output
                )));
            }
            if let Some(previous) = producers.insert(output.clone(), key.clone()) {
                return Err(RewindError::ConfigError(format!(
                    "artifact '{}' is produced by both '{}' and '{}'",
                    output, previous, key
                )));
            }
        }
    }

    Ok(producers)
}

fn collect_expansions(
    cfg: &RawConfigFile,
    actions: &BTreeMap<ActionKey, ActionConfig>,
    producers: &BTreeMap<String, ActionKey>,
) -> Result<BTreeMap<String, BTreeSet<ActionKey>>> {
    let mut expansions = BTreeMap::new();

    for (path, artifact) in cfg.artifact.iter() {
        if artifact.expanded_actions.is_empty() {
            continue;
        }
        if artifact.kind != ArtifactKind::Tree {
            return Err(RewindError::ConfigError(format!(
                "artifact '{}' lists `expanded_actions` but is not a tree artifact",
                path
            )));
        }
        if let Some(producer) = producers.get(path) {
            return Err(RewindError::ConfigError(format!(
                "tree artifact '{}' is both an output of '{}' and a template expansion",
                path, producer
            )));
        }

        let mut keys = BTreeSet::new();
        for name in artifact.expanded_actions.iter() {
            let key = name.parse::<ActionKey>().map_err(RewindError::ConfigError)?;
            if !actions.contains_key(&key) {
                return Err(RewindError::ConfigError(format!(
                    "tree artifact '{}' has unknown expanded action '{}'",
                    path, key
                )));
            }
            keys.insert(key);
        }
        expansions.insert(path.clone(), keys);
    }

    Ok(expansions)
}

fn validate_artifacts(
    cfg: &RawConfigFile,
    producers: &BTreeMap<String, ActionKey>,
    expansions: &BTreeMap<String, BTreeSet<ActionKey>>,
) -> Result<()> {
    let mut tree_members: BTreeMap<&str, &str> = BTreeMap::new();
    let mut runfiles_members: BTreeMap<&str, &str> = BTreeMap::new();

    for (path, artifact) in cfg.artifact.iter() {
        let produced = producers.contains_key(path) || expansions.contains_key(path);
        if artifact.kind != ArtifactKind::Source && !produced {
            return Err(RewindError::ConfigError(format!(
                "derived artifact '{}' has no producing action",
                path
            )));
        }

        let owners = match artifact.kind {
            ArtifactKind::Tree => &mut tree_members,
            ArtifactKind::Runfiles => &mut runfiles_members,
            ArtifactKind::Source | ArtifactKind::Derived => {
                if !artifact.members.is_empty() {
                    return Err(RewindError::ConfigError(format!(
                        "artifact '{}' lists `members` but is not a tree or runfiles artifact",
                        path
                    )));
                }
                continue;
            }
        };

        for member in artifact.members.iter() {
            if member == path {
                return Err(RewindError::ConfigError(format!(
                    "artifact '{}' cannot own itself",
                    path
                )));
            }
            if let Some(previous) = owners.insert(member.as_str(), path.as_str()) {
                return Err(RewindError::ConfigError(format!(
                    "member '{}' is owned by both '{}' and '{}'",
                    member, previous, path
                )));
            }
        }
    }

    Ok(())
}

fn validate_dag(
    actions: &BTreeMap<ActionKey, ActionConfig>,
    producers: &BTreeMap<String, ActionKey>,
    expansions: &BTreeMap<String, BTreeSet<ActionKey>>,
) -> Result<()> {
    // Edge direction: producer -> consumer.
    let mut graph: DiGraphMap<&ActionKey, ()> = DiGraphMap::new();

    for key in actions.keys() {
        graph.add_node(key);
    }

    for (key, action) in actions.iter() {
        for input in action.inputs.iter() {
            if let Some(producer) = producers.get(input) {
                graph.add_edge(producer, key, ());
            }
            if let Some(expanded) = expansions.get(input) {
                for producer in expanded.iter() {
                    graph.add_edge(producer, key, ());
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(RewindError::GraphCycle(format!(
                "cycle detected in action graph involving action '{}'",
                node
            )))
        }
    }
}
