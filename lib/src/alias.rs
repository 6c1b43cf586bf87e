//! Short host aliases inferred from dash-delimited instance names.
//!
//! Every dash-truncation of a name (`a-b-c`, `a-b`, `a`) is an alias
//! candidate claimed by that instance. Resolution runs in two passes: first
//! all claims in a project are collected, then each candidate is granted to at
//! most one instance. A candidate with several claimants only resolves when
//! one of them is named exactly like the candidate; otherwise it is dropped.

use std::collections::HashMap;

use crate::types::Instance;

/// Instance name to its sorted aliases, excluding the name itself.
pub type AliasMap<'a> = HashMap<&'a str, Vec<String>>;

/// Alias candidates and the instances claiming them, in input order.
pub fn collect_claims(instances: &[Instance]) -> HashMap<String, Vec<&Instance>> {
    let mut claims: HashMap<String, Vec<&Instance>> = HashMap::new();
    for instance in instances {
        let mut tokens = instance.tokens();
        while !tokens.is_empty() {
            claims.entry(tokens.join("-")).or_default().push(instance);
            tokens.pop();
        }
    }
    claims
}

/// Picks the instance a candidate resolves to, if any.
///
/// A sole claimant always wins. Among several claimants, an exact name match
/// wins over partial ones; without one the candidate is ambiguous.
pub fn resolve_claim<'a>(candidate: &str, claimants: &[&'a Instance]) -> Option<&'a Instance> {
    match claimants {
        [only] => Some(*only),
        _ => claimants
            .iter()
            .copied()
            .find(|instance| instance.name == candidate),
    }
}

pub fn resolve_aliases(instances: &[Instance]) -> AliasMap<'_> {
    let mut aliases: AliasMap = instances
        .iter()
        .map(|instance| (instance.name.as_str(), Vec::new()))
        .collect();

    for (candidate, claimants) in collect_claims(instances) {
        let owner = match resolve_claim(&candidate, &claimants) {
            Some(owner) => owner,
            None => continue,
        };
        // A name is never its own alias.
        if owner.name == candidate {
            continue;
        }
        if let Some(names) = aliases.get_mut(owner.name.as_str()) {
            names.push(candidate);
        }
    }

    for names in aliases.values_mut() {
        names.sort();
        names.dedup();
    }
    aliases
}
