use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use super::astar::{PathGrid, IMPASSABLE, PATH_WEIGHT};
use super::grid::RasterGrid;
use super::objects::{LinkVariant, SimulatorObject};
use super::SystemState;
use crate::config::SimulatorConfig;
use crate::model::{NodeId, Point, SystemGraph};

/// Computed routes keyed by endpoint canonical id, both directions.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, BTreeMap<String, Vec<Point>>>,
}

impl RouteTable {
    pub fn get(&self, from: &str, to: &str) -> Option<&[Point]> {
        self.routes
            .get(from)
            .and_then(|targets| targets.get(to))
            .map(Vec::as_slice)
    }

    fn insert(&mut self, from: &str, to: &str, path: Vec<Point>) {
        self.routes
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), path);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[Point])> {
        self.routes.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(to, path)| (from.as_str(), to.as_str(), path.as_slice()))
        })
    }
}

/// Route every link in document order. Earlier links claim the cheap
/// terrain; later ones pay the painted-path weight for reuse.
pub(super) fn route_links(
    graph: &SystemGraph,
    states: &[SystemState],
    grid: &mut RasterGrid,
    path_grid: &mut PathGrid,
    config: &SimulatorConfig,
) -> RouteTable {
    let mut routes = RouteTable::default();

    for link in &graph.links {
        let (Some(a), Some(b)) = (link.system_a, link.system_b) else {
            continue;
        };
        let Some(a) = effective_endpoint(states, a) else {
            continue;
        };
        let Some(b) = effective_endpoint(states, b) else {
            continue;
        };
        if a == b {
            continue;
        }

        let mut allowance: HashSet<NodeId> = HashSet::from([a, b]);
        allowance.extend(graph.ancestors(a));
        allowance.extend(graph.ancestors(b));

        // Ports of unrelated containers become impassable for the
        // duration of this link, so the path cannot cross a boundary
        // it is not allowed to enter.
        let mut blocked: Vec<(Point, f64)> = Vec::new();
        for (id, state) in states.iter().enumerate() {
            if !state.painted || allowance.contains(&id) {
                continue;
            }
            for &port in &state.ports {
                blocked.push((port, path_grid.weight(port.x, port.y)));
                path_grid.set_weight(port.x, port.y, IMPASSABLE);
            }
        }

        let path = search_candidates(&states[a], &states[b], grid, path_grid, config);
        if path.is_empty() {
            warn!(a = %link.a, b = %link.b, "link is unroutable, no tiles painted");
        } else {
            debug!(a = %link.a, b = %link.b, cells = path.len(), "link routed");
            paint_path(&path, link.index, &states[a], &states[b], grid, path_grid);
            routes.insert(&link.a, &link.b, path.clone());
            let mut reversed = path;
            reversed.reverse();
            routes.insert(&link.b, &link.a, reversed);
        }

        for (port, weight) in blocked {
            path_grid.set_weight(port.x, port.y, weight);
        }
    }

    routes
}

/// A suppressed endpoint routes to the nearest painted ancestor; the
/// root is never painted, so a fully hidden endpoint drops the link.
fn effective_endpoint(states: &[SystemState], mut node: NodeId) -> Option<NodeId> {
    loop {
        if states[node].painted {
            return Some(node);
        }
        node = states[node].parent?;
    }
}

/// Enumerate open port pairs nearest-first and return the first path
/// the search finds. A port is open while the top of its cell stack is
/// still the port itself.
fn search_candidates(
    a: &SystemState,
    b: &SystemState,
    grid: &RasterGrid,
    path_grid: &mut PathGrid,
    config: &SimulatorConfig,
) -> Vec<Point> {
    let open = |state: &SystemState| -> Vec<Point> {
        state
            .ports
            .iter()
            .copied()
            .filter(|port| grid.top(port.x, port.y).is_some_and(SimulatorObject::is_port))
            .collect()
    };

    let ports_a = open(a);
    let ports_b = open(b);
    let mut candidates: Vec<(i64, Point, Point)> = Vec::new();
    for &port_a in &ports_a {
        for &port_b in &ports_b {
            let dx = (port_a.x - port_b.x) as i64;
            let dy = (port_a.y - port_b.y) as i64;
            candidates.push((dx * dx + dy * dy, port_a, port_b));
        }
    }
    candidates.sort_by_key(|&(distance, pa, pb)| (distance, pa.x, pa.y, pb.x, pb.y));

    for (_, port_a, port_b) in candidates {
        let path = path_grid.find_path(port_a, port_b, config);
        if !path.is_empty() {
            return path;
        }
    }
    Vec::new()
}

fn paint_path(
    path: &[Point],
    link: usize,
    a: &SystemState,
    b: &SystemState,
    grid: &mut RasterGrid,
    path_grid: &mut PathGrid,
) {
    let last = path.len() - 1;
    for (i, &cell) in path.iter().enumerate() {
        let prev = if i == 0 {
            outward_of(a, cell)
        } else {
            path[i - 1]
        };
        let next = if i == last {
            outward_of(b, cell)
        } else {
            path[i + 1]
        };
        grid.push(
            cell.x,
            cell.y,
            SimulatorObject::Link {
                link,
                variant: classify_turn(prev, cell, next),
            },
        );
        path_grid.set_weight(cell.x, cell.y, PATH_WEIGHT);
    }
}

/// Virtual neighbour used at path endpoints: one cell outward from the
/// box the port belongs to, perpendicular to the edge the port sits on.
fn outward_of(state: &SystemState, port: Point) -> Point {
    let origin = state.grid;
    if port.y == origin.y - 1 {
        Point::new(port.x, port.y - 1)
    } else if port.y == origin.y + state.size.height {
        Point::new(port.x, port.y + 1)
    } else if port.x == origin.x - 1 {
        Point::new(port.x - 1, port.y)
    } else {
        Point::new(port.x + 1, port.y)
    }
}

/// Tile orientation from the relative positions of the predecessor and
/// successor cells.
fn classify_turn(prev: Point, cell: Point, next: Point) -> LinkVariant {
    if prev.x == next.x {
        return LinkVariant::Vertical;
    }
    if prev.y == next.y {
        return LinkVariant::Horizontal;
    }
    let vertical = if prev.y != cell.y { prev } else { next };
    let horizontal = if prev.x != cell.x { prev } else { next };
    match (vertical.y < cell.y, horizontal.x > cell.x) {
        (true, true) => LinkVariant::TopToRight,
        (true, false) => LinkVariant::TopToLeft,
        (false, true) => LinkVariant::BottomToRight,
        (false, false) => LinkVariant::BottomToLeft,
    }
}
