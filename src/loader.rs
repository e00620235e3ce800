use std::collections::{HashMap, VecDeque};

use anyhow::Result;
use tracing::debug;

use crate::model::{
    NodeId, Point, RuntimeFlow, RuntimeFlowStep, RuntimeLink, Size, SystemGraph, SystemNode, ROOT,
};
use crate::spec::{FlowSpec, SubsystemSpec, SystemSpec};
use crate::validate::{validate, ValidationError};

/// Horizontal gap inserted between auto-placed siblings.
const DEFAULT_POSITION_GAP: i32 = 10;

#[derive(Debug)]
pub struct LoadOutput {
    pub system: SystemGraph,
    pub errors: Vec<ValidationError>,
}

/// Hydrate a raw specification tree and validate it. Semantic problems
/// land in `errors`; the tree itself is always returned.
pub fn load(spec: SystemSpec) -> LoadOutput {
    let system = hydrate(spec);
    let errors = validate(&system);
    debug!(
        systems = system.nodes.len() - 1,
        links = system.links.len(),
        flows = system.flows.len(),
        errors = errors.len(),
        "specification hydrated"
    );
    LoadOutput { system, errors }
}

/// Parse a YAML document and load it. Malformed YAML is a structural
/// error and surfaces here; semantic errors go through `load`.
pub fn load_yaml(input: &str) -> Result<LoadOutput> {
    let spec: SystemSpec = serde_yaml::from_str(input)?;
    Ok(load(spec))
}

pub fn load_json(input: &str) -> Result<LoadOutput> {
    let spec: SystemSpec = serde_json::from_str(input)?;
    Ok(load(spec))
}

fn hydrate(spec: SystemSpec) -> SystemGraph {
    let mut graph = SystemGraph::default();
    graph.nodes.push(SystemNode {
        id: String::new(),
        canonical_id: String::new(),
        index: 0,
        parent: None,
        children: Vec::new(),
        title: spec.title.unwrap_or_default(),
        hide_systems: false,
        position: Point::default(),
        size: Size::default(),
        absolute_position: Point::default(),
        ports: Vec::new(),
    });

    // Pass 1: subsystem enhancement. Authored positions are remembered
    // separately so pass 4 knows which nodes still need placing.
    let mut authored: Vec<Option<Point>> = vec![None];
    enhance_subsystems(&mut graph, &mut authored, ROOT, &spec.systems);

    // Pass 2: link enhancement.
    for (index, link) in spec.links.into_iter().enumerate() {
        let a = SystemGraph::normalize_path(&link.a);
        let b = SystemGraph::normalize_path(&link.b);
        let system_a = graph.resolve(&a);
        let system_b = graph.resolve(&b);
        graph.links.push(RuntimeLink {
            index,
            a,
            b,
            system_a,
            system_b,
        });
    }

    // Pass 3: flow enhancement.
    let flows = spec
        .flows
        .into_iter()
        .enumerate()
        .map(|(index, flow)| enhance_flow(&graph, index, flow))
        .collect();
    graph.flows = flows;

    // Pass 4: default positioning.
    assign_default_positions(&mut graph, &authored, ROOT);

    graph
}

fn enhance_subsystems(
    graph: &mut SystemGraph,
    authored: &mut Vec<Option<Point>>,
    parent: NodeId,
    children: &[SubsystemSpec],
) {
    for (index, child) in children.iter().enumerate() {
        let canonical_id = join_path(&graph.nodes[parent].canonical_id, &child.id);
        let node_id = graph.nodes.len();
        graph.nodes.push(SystemNode {
            id: child.id.clone(),
            canonical_id: canonical_id.clone(),
            index,
            parent: Some(parent),
            children: Vec::new(),
            title: child.title.clone().unwrap_or_default(),
            hide_systems: child.hide_systems,
            position: Point::default(),
            size: Size::default(),
            absolute_position: Point::default(),
            ports: Vec::new(),
        });
        authored.push(child.position.map(|p| Point::new(p.x, p.y)));
        graph.nodes[parent].children.push(node_id);
        graph.register_path(canonical_id, node_id);
        enhance_subsystems(graph, authored, node_id, &child.systems);
    }
}

fn join_path(parent: &str, id: &str) -> String {
    parent
        .split('.')
        .chain(id.split('.'))
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn enhance_flow(graph: &SystemGraph, index: usize, flow: FlowSpec) -> RuntimeFlow {
    // Keyframe normalisation: distinct authored values, sorted, each
    // step rewritten to its rank.
    let mut keyframes: Vec<i64> = flow.steps.iter().map(|step| step.keyframe).collect();
    keyframes.sort_unstable();
    keyframes.dedup();

    let steps = flow
        .steps
        .into_iter()
        .map(|step| {
            let keyframe = keyframes
                .binary_search(&step.keyframe)
                .unwrap_or_else(|slot| slot);
            let from = SystemGraph::normalize_path(&step.from);
            let to = SystemGraph::normalize_path(&step.to);
            let system_from = graph.resolve(&from);
            let system_to = graph.resolve(&to);
            let links = match step.links {
                Some(explicit) => explicit
                    .into_iter()
                    .filter(|link| *link < graph.links.len())
                    .collect(),
                None => match (system_from, system_to) {
                    (Some(from), Some(to)) => link_path(graph, from, to),
                    _ => Vec::new(),
                },
            };
            RuntimeFlowStep {
                keyframe,
                from,
                to,
                system_from,
                system_to,
                links,
            }
        })
        .collect();

    RuntimeFlow { index, steps }
}

/// Breadth-first search over the undirected link graph, reconstructing
/// the node path via parent breadcrumbs and translating each adjacent
/// node pair back into the link that connects it. Unreachable targets
/// yield an empty list.
fn link_path(graph: &SystemGraph, from: NodeId, to: NodeId) -> Vec<usize> {
    if from == to {
        return Vec::new();
    }

    let mut adjacency: HashMap<NodeId, Vec<(NodeId, usize)>> = HashMap::new();
    for link in &graph.links {
        if let (Some(a), Some(b)) = (link.system_a, link.system_b) {
            adjacency.entry(a).or_default().push((b, link.index));
            adjacency.entry(b).or_default().push((a, link.index));
        }
    }

    let mut breadcrumbs: HashMap<NodeId, (NodeId, usize)> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    'search: while let Some(current) = queue.pop_front() {
        let Some(neighbors) = adjacency.get(&current) else {
            continue;
        };
        for &(neighbor, link) in neighbors {
            if neighbor == from || breadcrumbs.contains_key(&neighbor) {
                continue;
            }
            breadcrumbs.insert(neighbor, (current, link));
            if neighbor == to {
                break 'search;
            }
            queue.push_back(neighbor);
        }
    }

    let mut links = Vec::new();
    let mut current = to;
    while let Some(&(previous, link)) = breadcrumbs.get(&current) {
        links.push(link);
        current = previous;
    }
    if current != from {
        return Vec::new();
    }
    links.reverse();
    links
}

fn assign_default_positions(graph: &mut SystemGraph, authored: &[Option<Point>], parent: NodeId) {
    let children = graph.nodes[parent].children.clone();
    let mut far_right = 0;
    for child in children {
        let position = match authored[child] {
            Some(position) => position,
            None => Point::new(far_right + DEFAULT_POSITION_GAP, 0),
        };
        graph.nodes[child].position = position;
        far_right = far_right.max(position.x);
        assign_default_positions(graph, authored, child);
    }
}
