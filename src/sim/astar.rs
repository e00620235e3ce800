use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::SimulatorConfig;
use crate::model::Point;

/// Cell weight marking an impassable cell.
pub const IMPASSABLE: f64 = f64::INFINITY;
/// Weight painted onto routed path cells; later links may reuse them
/// at this penalised cost, which is what produces shared tunnels.
pub const PATH_WEIGHT: f64 = 2.0;
/// Weight of untouched terrain and of open ports.
pub const OPEN_WEIGHT: f64 = 1.0;

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NodeStatus {
    #[default]
    NotVisited,
    WillVisit,
    Visited,
}

#[derive(Debug, Clone, Copy, Default)]
struct SearchNode {
    status: NodeStatus,
    g: f64,
    parent: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    g: f64,
    x: i32,
    y: i32,
}

impl Eq for OpenEntry {}

// BinaryHeap is a max-heap; the ordering is reversed on f so the best
// entry pops first, with coordinate tie-breaks for determinism.
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Mutable weighted grid plus reusable A* search state. One instance
/// serves every link of a simulation; `reset` clears the per-search
/// state without dropping allocations.
#[derive(Debug, Clone)]
pub struct PathGrid {
    width: i32,
    height: i32,
    weights: Vec<f64>,
    nodes: Vec<SearchNode>,
    heap: BinaryHeap<OpenEntry>,
}

impl PathGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let cells = (width * height) as usize;
        Self {
            width,
            height,
            weights: vec![OPEN_WEIGHT; cells],
            nodes: vec![SearchNode::default(); cells],
            heap: BinaryHeap::new(),
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn weight(&self, x: i32, y: i32) -> f64 {
        if self.in_bounds(x, y) {
            self.weights[self.index(x, y)]
        } else {
            IMPASSABLE
        }
    }

    pub fn set_weight(&mut self, x: i32, y: i32, weight: f64) {
        if self.in_bounds(x, y) {
            let index = self.index(x, y);
            self.weights[index] = weight;
        }
    }

    /// Restore all per-search state. Weights are untouched.
    pub fn reset(&mut self) {
        self.nodes.fill(SearchNode::default());
        self.heap.clear();
    }

    /// Weighted A* between two cells, 4-connected, Manhattan heuristic
    /// scaled by `route_weight`, `turn_penalty` charged whenever a step
    /// changes direction. Returns the inclusive cell sequence, or an
    /// empty path when the goal is unreachable.
    pub fn find_path(&mut self, from: Point, to: Point, config: &SimulatorConfig) -> Vec<Point> {
        self.reset();
        if !self.in_bounds(from.x, from.y) || !self.in_bounds(to.x, to.y) {
            return Vec::new();
        }
        if self.weight(from.x, from.y).is_infinite() || self.weight(to.x, to.y).is_infinite() {
            return Vec::new();
        }

        let heuristic = |x: i32, y: i32| -> f64 {
            ((x - to.x).abs() + (y - to.y).abs()) as f64 * config.route_weight
        };

        let start = self.index(from.x, from.y);
        self.nodes[start].status = NodeStatus::WillVisit;
        self.nodes[start].g = 0.0;
        self.heap.push(OpenEntry {
            f: heuristic(from.x, from.y),
            g: 0.0,
            x: from.x,
            y: from.y,
        });

        while let Some(entry) = self.heap.pop() {
            let current = self.index(entry.x, entry.y);
            if self.nodes[current].status == NodeStatus::Visited || entry.g != self.nodes[current].g
            {
                continue;
            }
            self.nodes[current].status = NodeStatus::Visited;

            if entry.x == to.x && entry.y == to.y {
                return self.reconstruct(to);
            }

            let arrival = self.nodes[current].parent.map(|parent| {
                (entry.x - parent.x, entry.y - parent.y)
            });

            for step in DIRECTIONS {
                let nx = entry.x + step.0;
                let ny = entry.y + step.1;
                if !self.in_bounds(nx, ny) {
                    continue;
                }
                let weight = self.weight(nx, ny);
                if weight.is_infinite() {
                    continue;
                }
                let mut tentative = entry.g + weight;
                if arrival.is_some_and(|arrival| arrival != step) {
                    tentative += config.turn_penalty;
                }
                let neighbor = self.index(nx, ny);
                match self.nodes[neighbor].status {
                    NodeStatus::Visited => continue,
                    NodeStatus::WillVisit if tentative >= self.nodes[neighbor].g => continue,
                    _ => {}
                }
                self.nodes[neighbor].status = NodeStatus::WillVisit;
                self.nodes[neighbor].g = tentative;
                self.nodes[neighbor].parent = Some(Point::new(entry.x, entry.y));
                self.heap.push(OpenEntry {
                    f: tentative + heuristic(nx, ny),
                    g: tentative,
                    x: nx,
                    y: ny,
                });
            }
        }

        Vec::new()
    }

    fn reconstruct(&self, to: Point) -> Vec<Point> {
        let mut path = vec![to];
        let mut current = to;
        while let Some(parent) = self.nodes[self.index(current.x, current.y)].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}
