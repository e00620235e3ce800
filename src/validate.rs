use std::collections::HashMap;

use serde::Serialize;

use crate::model::SystemGraph;

/// A semantic problem found in the hydrated tree. `path` is a
/// JSON-pointer into the specification document (`/links/3/a`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub message: String,
    pub path: String,
}

impl ValidationError {
    fn new(message: &str, path: String) -> Self {
        Self {
            message: message.to_string(),
            path,
        }
    }
}

/// Referential checks over the link list. Never aborts; the caller
/// receives every problem at once.
pub fn validate(graph: &SystemGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for link in &graph.links {
        if link.a == link.b {
            errors.push(ValidationError::new(
                "self-reference",
                format!("/links/{}", link.index),
            ));
            continue;
        }
        for (endpoint, system) in [("a", link.system_a), ("b", link.system_b)] {
            match system {
                None => errors.push(ValidationError::new(
                    "missing",
                    format!("/links/{}/{}", link.index, endpoint),
                )),
                // Containers with children cannot terminate a link.
                Some(node) if !graph.node(node).is_leaf() => errors.push(ValidationError::new(
                    "inaccurate",
                    format!("/links/{}/{}", link.index, endpoint),
                )),
                Some(_) => {}
            }
        }
    }

    // Duplicates treat (a, b) and (b, a) as the same unordered edge;
    // every member of a duplicated group is reported.
    let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for link in &graph.links {
        let key = if link.a <= link.b {
            (link.a.as_str(), link.b.as_str())
        } else {
            (link.b.as_str(), link.a.as_str())
        };
        groups.entry(key).or_default().push(link.index);
    }
    let mut duplicates: Vec<usize> = groups
        .into_values()
        .filter(|members| members.len() > 1)
        .flatten()
        .collect();
    duplicates.sort_unstable();
    for index in duplicates {
        errors.push(ValidationError::new("duplicate", format!("/links/{index}")));
    }

    errors
}
