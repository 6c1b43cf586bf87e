//! Jump host inference.
//!
//! An instance named `<prefix>-jumphost-<suffix>` serves every instance whose
//! name starts with `<prefix>-`. Candidates are tried in input order and the
//! first match wins, so the result is deterministic as long as the inventory
//! order is. Instances matching no prefix go through the jump host whose
//! prefix is the lowercased project name.

use std::collections::HashMap;

use log::debug;

use crate::error::Error;
use crate::types::{Instance, Project};
use crate::Result;

const JUMPHOST_TOKEN: &str = "jumphost";

/// Instance name to the instance it connects through, possibly itself.
pub type JumphostMap<'a> = HashMap<&'a str, &'a Instance>;

#[derive(Debug, PartialEq)]
pub struct JumphostCandidate<'a> {
    pub prefix: String,
    pub instance: &'a Instance,
}

impl<'a> JumphostCandidate<'a> {
    pub fn serves(&self, instance: &Instance) -> bool {
        instance
            .name
            .strip_prefix(self.prefix.as_str())
            .map_or(false, |rest| rest.starts_with('-'))
    }
}

/// Name prefix served by `instance` if it is a jump host.
pub fn jumphost_prefix(instance: &Instance) -> Option<String> {
    let tokens = instance.tokens();
    match tokens.len() {
        n if n >= 3 && tokens[n - 2] == JUMPHOST_TOKEN => Some(tokens[..n - 2].join("-")),
        _ => None,
    }
}

/// Jump host candidates, ordered by where each prefix first appears. When two
/// share a prefix the later instance takes over the earlier one's slot.
pub fn jumphost_candidates(instances: &[Instance]) -> Vec<JumphostCandidate<'_>> {
    let mut candidates: Vec<JumphostCandidate> = Vec::new();
    for instance in instances {
        if let Some(prefix) = jumphost_prefix(instance) {
            match candidates.iter_mut().find(|c| c.prefix == prefix) {
                Some(slot) => {
                    debug!("{} replaces {} as jump host", instance.name, slot.instance.name);
                    slot.instance = instance;
                }
                None => candidates.push(JumphostCandidate { prefix, instance }),
            }
        }
    }
    candidates
}

pub fn resolve_jumphosts<'a>(project: &Project, instances: &'a [Instance]) -> Result<JumphostMap<'a>> {
    let candidates = jumphost_candidates(instances);
    let slug = project.slug();
    let fallback = candidates.iter().find(|c| c.prefix == slug);

    let mut jumphosts = JumphostMap::new();
    for instance in instances {
        let jumphost = match candidates.iter().find(|c| c.serves(instance)) {
            Some(candidate) => candidate.instance,
            None => match fallback {
                Some(candidate) => candidate.instance,
                None => {
                    return Err(Error::UnresolvableJumphost {
                        project: project.name.clone(),
                        instance: instance.name.clone(),
                    })
                }
            },
        };
        jumphosts.insert(instance.name.as_str(), jumphost);
    }

    // Only one hop is rendered, so a jump host must be its own jump host.
    for instance in instances {
        let jumphost = jumphosts[instance.name.as_str()];
        if jumphosts[jumphost.name.as_str()] != jumphost {
            return Err(Error::JumphostChain {
                project: project.name.clone(),
                instance: instance.name.clone(),
                jumphost: jumphost.name.clone(),
            });
        }
    }

    Ok(jumphosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn instances(names: &[&str]) -> Vec<Instance> {
        names
            .iter()
            .map(|name| Instance::new(*name, "us-east1-c", Ipv4Addr::new(10, 1, 0, 1), None))
            .collect()
    }

    fn resolved<'a>(map: &JumphostMap<'a>, name: &str) -> &'a str {
        map[name].name.as_str()
    }

    #[test]
    fn test_jumphost_prefix() {
        let cases = instances(&["proj-jumphost-a", "a-b-jumphost-x", "jumphost-a", "web-jumphost"]);
        let prefixes: Vec<Option<String>> = cases.iter().map(jumphost_prefix).collect();
        assert_eq!(
            prefixes,
            vec![Some("proj".to_string()), Some("a-b".to_string()), None, None]
        );
    }

    #[test]
    fn test_prefix_match() {
        let project = Project::new("api-123", "Other");
        let instances = instances(&["api-jumphost-x", "api-worker-1"]);
        let map = resolve_jumphosts(&project, &instances).unwrap();
        assert_eq!(resolved(&map, "api-worker-1"), "api-jumphost-x");
        assert_eq!(resolved(&map, "api-jumphost-x"), "api-jumphost-x");
    }

    #[test]
    fn test_project_name_fallback() {
        let project = Project::new("proj-123", "Proj");
        let instances = instances(&["proj-jumphost-a", "proj-web-1", "proj-web-2", "legacy"]);
        let map = resolve_jumphosts(&project, &instances).unwrap();
        for name in &["proj-jumphost-a", "proj-web-1", "proj-web-2", "legacy"] {
            assert_eq!(resolved(&map, name), "proj-jumphost-a");
        }
    }

    #[test]
    fn test_prefix_must_end_at_dash() {
        let project = Project::new("p", "core");
        let instances = instances(&["core-jumphost-a", "api-jumphost-b", "apigw-1"]);
        let map = resolve_jumphosts(&project, &instances).unwrap();
        assert_eq!(resolved(&map, "apigw-1"), "core-jumphost-a");
    }

    #[test]
    fn test_first_match_wins() {
        let project = Project::new("p", "p");
        let instances = instances(&["a-jumphost-1", "a-b-jumphost-2", "a-b-web"]);
        let map = resolve_jumphosts(&project, &instances).unwrap();
        assert_eq!(resolved(&map, "a-b-web"), "a-jumphost-1");
        assert_eq!(resolved(&map, "a-b-jumphost-2"), "a-jumphost-1");
    }

    #[test]
    fn test_shared_prefix_last_instance_wins() {
        let instances = instances(&["x-jumphost-1", "a-jumphost-1", "x-jumphost-2"]);
        let candidates = jumphost_candidates(&instances);
        let order: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (c.prefix.as_str(), c.instance.name.as_str()))
            .collect();
        assert_eq!(order, vec![("x", "x-jumphost-2"), ("a", "a-jumphost-1")]);
    }

    #[test]
    fn test_shared_prefix_routes_through_last() {
        let project = Project::new("x-1", "x");
        let instances = instances(&["x-jumphost-1", "x-jumphost-2", "x-web"]);
        let map = resolve_jumphosts(&project, &instances).unwrap();
        assert_eq!(resolved(&map, "x-jumphost-1"), "x-jumphost-2");
        assert_eq!(resolved(&map, "x-jumphost-2"), "x-jumphost-2");
        assert_eq!(resolved(&map, "x-web"), "x-jumphost-2");
    }

    #[test]
    fn test_missing_fallback() {
        let project = Project::new("p", "Proj");
        let instances = instances(&["api-jumphost-x", "db-1"]);
        match resolve_jumphosts(&project, &instances) {
            Err(Error::UnresolvableJumphost { project, instance }) => {
                assert_eq!(project, "Proj");
                assert_eq!(instance, "db-1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_project() {
        let project = Project::new("p", "Empty");
        let map = resolve_jumphosts(&project, &[]).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_chain_is_rejected() {
        let project = Project::new("p", "p");
        let instances = instances(&["a-b-jumphost-jumphost-z", "a-b-jumphost-s", "a-b-web"]);
        match resolve_jumphosts(&project, &instances) {
            Err(Error::JumphostChain { instance, jumphost, .. }) => {
                assert_eq!(instance, "a-b-web");
                assert_eq!(jumphost, "a-b-jumphost-s");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
