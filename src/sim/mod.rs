mod astar;
mod grid;
mod objects;
mod routing;

pub use astar::{PathGrid, IMPASSABLE, OPEN_WEIGHT, PATH_WEIGHT};
pub use grid::RasterGrid;
pub use objects::{LinkVariant, SimulatorObject, SystemVariant};
pub use routing::RouteTable;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{
    SimulatorConfig, BOUNDARY_INFLATION, MAX_SYSTEM_HEIGHT, MAX_SYSTEM_WIDTH, PADDING_WHITE_BOX,
    TITLE_CHARS_PER_SQUARE,
};
use crate::model::{NodeId, Point, Size, SystemGraph, WorldRect, ROOT};

/// Title anchor within its box.
const TITLE_POSITION: Point = Point { x: 1, y: 1 };
/// Edge length of the smallest box.
const BASE_BOX_SIZE: i32 = 3;
/// Horizontal-edge port capacity covers four links; beyond that the
/// box widens by whole port-pair columns.
const BASE_PORT_CAPACITY: usize = 4;

/// World-to-grid projection: the world bounding rectangle of every
/// painted box, inflated per side, with `translate` mapping world
/// coordinates onto the non-negative raster grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Boundaries {
    pub min: Point,
    pub max: Point,
    pub translate: Point,
}

impl Boundaries {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TitleState {
    pub lines: Vec<String>,
    pub size: Size,
}

impl TitleState {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Per-system derived geometry. `world` is absolute; `grid` and
/// `ports` are projected through the boundary translation.
#[derive(Debug, Clone, Default)]
pub(crate) struct SystemState {
    pub canonical_id: String,
    pub parent: Option<NodeId>,
    pub painted: bool,
    pub blackbox: bool,
    pub world: Point,
    pub grid: Point,
    pub size: Size,
    pub port_offsets: Vec<Point>,
    pub ports: Vec<Point>,
    pub title: TitleState,
}

/// Lays out a hydrated tree on the raster grid and routes its links.
/// The whole computation happens in `compute`; the resulting value is
/// a read-only view plus the route table.
#[derive(Debug)]
pub struct SystemSimulator {
    states: Vec<SystemState>,
    grid: RasterGrid,
    boundaries: Boundaries,
    visible_world: WorldRect,
    routes: RouteTable,
}

impl SystemSimulator {
    /// Run the full pipeline. Derived geometry (absolute position,
    /// size, ports) is synchronised back onto `graph`.
    pub fn compute(graph: &mut SystemGraph, config: &SimulatorConfig) -> Self {
        let mut states = init_states(graph);
        compute_visibility(graph, &mut states);
        compute_world_positions(graph, &mut states);
        compute_sizes(graph, &mut states);
        let (boundaries, visible_world) = compute_boundaries(&states);
        if visible_world.width() > MAX_SYSTEM_WIDTH || visible_world.height() > MAX_SYSTEM_HEIGHT {
            warn!(
                width = visible_world.width(),
                height = visible_world.height(),
                "layout exceeds the root size limits"
            );
        }
        project(&mut states, boundaries.translate);

        let mut grid = RasterGrid::new(boundaries.width(), boundaries.height());
        let mut path_grid = PathGrid::new(boundaries.width(), boundaries.height());
        rasterize(graph, &states, &mut grid, &mut path_grid);
        debug!(
            width = grid.width(),
            height = grid.height(),
            "systems rasterised"
        );

        let routes = routing::route_links(graph, &states, &mut grid, &mut path_grid, config);

        sync_back(graph, &states, boundaries.translate);

        Self {
            states,
            grid,
            boundaries,
            visible_world,
            routes,
        }
    }

    /// The raster grid; `grid[x][y]` is an object stack, bottom-most
    /// drawn first.
    pub fn layout(&self) -> &RasterGrid {
        &self.grid
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    /// Un-inflated world bounding rectangle of the painted boxes.
    pub fn visible_world_boundaries(&self) -> WorldRect {
        self.visible_world
    }

    pub fn objects_at(&self, world_x: i32, world_y: i32) -> &[SimulatorObject] {
        self.grid.stack(
            world_x + self.boundaries.translate.x,
            world_y + self.boundaries.translate.y,
        )
    }

    /// Canonical id of the topmost system owning a tile at this world
    /// coordinate.
    pub fn subsystem_at(&self, world_x: i32, world_y: i32) -> Option<&str> {
        self.objects_at(world_x, world_y)
            .iter()
            .rev()
            .find_map(SimulatorObject::system)
            .map(|id| self.states[id].canonical_id.as_str())
    }

    /// Index of the topmost link crossing this world coordinate.
    pub fn link_at(&self, world_x: i32, world_y: i32) -> Option<usize> {
        self.objects_at(world_x, world_y)
            .iter()
            .rev()
            .find_map(|object| match object {
                SimulatorObject::Link { link, .. } => Some(*link),
                _ => None,
            })
    }

    pub fn route(&self, from_id: &str, to_id: &str) -> Option<&[Point]> {
        self.routes.get(from_id, to_id)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

// ── Pipeline stages ─────────────────────────────────────────────────

fn init_states(graph: &SystemGraph) -> Vec<SystemState> {
    graph
        .nodes
        .iter()
        .map(|node| {
            let lines: Vec<String> = if node.title.is_empty() {
                Vec::new()
            } else {
                node.title.split('\n').map(str::to_string).collect()
            };
            let width = lines
                .iter()
                .map(|line| title_tiles(line))
                .max()
                .unwrap_or(0);
            let title = TitleState {
                size: Size {
                    width,
                    height: lines.len() as i32,
                },
                lines,
            };
            SystemState {
                canonical_id: node.canonical_id.clone(),
                parent: node.parent,
                title,
                ..SystemState::default()
            }
        })
        .collect()
}

fn title_tiles(line: &str) -> i32 {
    line.chars().count().div_ceil(TITLE_CHARS_PER_SQUARE) as i32
}

/// A system is suppressed when any strict ancestor hides its internals;
/// a painted system is a black-box when it is a leaf or hides its own.
fn compute_visibility(graph: &SystemGraph, states: &mut [SystemState]) {
    for id in graph.subsystems() {
        let node = graph.node(id);
        let suppressed = graph
            .ancestors(id)
            .into_iter()
            .any(|ancestor| graph.node(ancestor).hide_systems);
        states[id].painted = !suppressed;
        states[id].blackbox = node.is_leaf() || node.hide_systems;
    }
}

/// Offset applied to a box's children: the white-box padding, plus the
/// room the parent's title occupies below the top border.
fn padding_offset(parent: &SystemState) -> Point {
    Point::new(
        PADDING_WHITE_BOX,
        PADDING_WHITE_BOX + TITLE_POSITION.y + parent.title.size.height - 1,
    )
}

fn compute_world_positions(graph: &SystemGraph, states: &mut [SystemState]) {
    // Arena order is depth-first, so parents are always placed first.
    for id in graph.subsystems() {
        let node = graph.node(id);
        let parent = node.parent.unwrap_or(ROOT);
        let offset = padding_offset(&states[parent]);
        let base = states[parent].world;
        states[id].world = Point::new(
            base.x + node.position.x + offset.x,
            base.y + node.position.y + offset.y,
        );
    }
}

fn link_count(graph: &SystemGraph, id: NodeId) -> usize {
    let canonical = &graph.node(id).canonical_id;
    graph
        .links
        .iter()
        .filter(|link| {
            [link.system_a, link.system_b]
                .into_iter()
                .flatten()
                .any(|endpoint| {
                    let endpoint = &graph.node(endpoint).canonical_id;
                    endpoint == canonical
                        || endpoint
                            .strip_prefix(canonical.as_str())
                            .is_some_and(|rest| rest.starts_with('.'))
                })
        })
        .count()
}

fn compute_sizes(graph: &SystemGraph, states: &mut [SystemState]) {
    // Reverse arena order is post-order here, so children are sized
    // before the white-box that has to wrap them.
    for id in graph.subsystems().rev() {
        let node = graph.node(id);
        let links = link_count(graph, id);
        let mut width = if links <= BASE_PORT_CAPACITY {
            BASE_BOX_SIZE
        } else {
            // Smallest width whose odd-column port pairs cover the
            // links beyond the four base ports.
            2 + (links as i32 - 3) / 2 * 2
        };
        let mut height = BASE_BOX_SIZE;
        let title = &states[id].title;
        if !title.is_empty() {
            width = width.max(title.size.width + 2);
            height = height.max(title.size.height + 2);
        }
        if !node.children.is_empty() && !node.hide_systems {
            let offset = padding_offset(&states[id]);
            for &child in &node.children {
                let position = graph.node(child).position;
                width = width.max(offset.x + position.x + states[child].size.width + PADDING_WHITE_BOX);
                height =
                    height.max(offset.y + position.y + states[child].size.height + PADDING_WHITE_BOX);
            }
        }
        states[id].size = Size { width, height };

        states[id].port_offsets = if links <= BASE_PORT_CAPACITY {
            vec![
                Point::new(1, -1),
                Point::new(width, 1),
                Point::new(1, height),
                Point::new(-1, 1),
            ]
        } else {
            let mut ports = vec![Point::new(-1, 1), Point::new(width, 1)];
            let mut x = 1;
            while x < width {
                ports.push(Point::new(x, -1));
                ports.push(Point::new(x, height));
                x += 2;
            }
            ports
        };
    }
}

fn compute_boundaries(states: &[SystemState]) -> (Boundaries, WorldRect) {
    let mut min = Point::new(i32::MAX, i32::MAX);
    let mut max = Point::new(i32::MIN, i32::MIN);
    for state in states.iter().filter(|state| state.painted) {
        min.x = min.x.min(state.world.x);
        min.y = min.y.min(state.world.y);
        max.x = max.x.max(state.world.x + state.size.width);
        max.y = max.y.max(state.world.y + state.size.height);
    }
    if min.x > max.x {
        return (Boundaries::default(), WorldRect::default());
    }
    let visible = WorldRect { min, max };
    let min = Point::new(min.x - BOUNDARY_INFLATION, min.y - BOUNDARY_INFLATION);
    let max = Point::new(max.x + BOUNDARY_INFLATION, max.y + BOUNDARY_INFLATION);
    (
        Boundaries {
            min,
            max,
            translate: Point::new(-min.x, -min.y),
        },
        visible,
    )
}

fn project(states: &mut [SystemState], translate: Point) {
    for state in states.iter_mut().filter(|state| state.painted) {
        state.grid = Point::new(state.world.x + translate.x, state.world.y + translate.y);
        state.ports = state
            .port_offsets
            .iter()
            .map(|offset| Point::new(state.grid.x + offset.x, state.grid.y + offset.y))
            .collect();
    }
}

fn rasterize(
    graph: &SystemGraph,
    states: &[SystemState],
    grid: &mut RasterGrid,
    path_grid: &mut PathGrid,
) {
    for id in graph.subsystems() {
        let state = &states[id];
        if !state.painted {
            continue;
        }
        let origin = state.grid;
        let Size { width, height } = state.size;

        // Margin ring, one cell outside the perimeter.
        for x in (origin.x - 1)..=(origin.x + width) {
            for y in [origin.y - 1, origin.y + height] {
                grid.push(x, y, SimulatorObject::SystemMargin { system: id });
                path_grid.set_weight(x, y, IMPASSABLE);
            }
        }
        for y in origin.y..(origin.y + height) {
            for x in [origin.x - 1, origin.x + width] {
                grid.push(x, y, SimulatorObject::SystemMargin { system: id });
                path_grid.set_weight(x, y, IMPASSABLE);
            }
        }

        // Box interior. White-box interiors stay walkable so links may
        // tunnel through them.
        for dy in 0..height {
            for dx in 0..width {
                grid.push(
                    origin.x + dx,
                    origin.y + dy,
                    SimulatorObject::System {
                        system: id,
                        variant: SystemVariant::classify(dx, dy, width, height),
                        blackbox: state.blackbox,
                    },
                );
                let weight = if state.blackbox {
                    IMPASSABLE
                } else {
                    OPEN_WEIGHT
                };
                path_grid.set_weight(origin.x + dx, origin.y + dy, weight);
            }
        }

        for &port in &state.ports {
            grid.push(port.x, port.y, SimulatorObject::Port { system: id });
            path_grid.set_weight(port.x, port.y, OPEN_WEIGHT);
        }

        if !state.title.is_empty() {
            paint_title(id, state, grid, path_grid);
        }
    }
}

fn paint_title(id: NodeId, state: &SystemState, grid: &mut RasterGrid, path_grid: &mut PathGrid) {
    let anchor = Point::new(
        state.grid.x + TITLE_POSITION.x,
        state.grid.y + TITLE_POSITION.y,
    );
    let Size { width, height } = state.title.size;

    // Padding ring around the title rectangle.
    for x in (anchor.x - 1)..=(anchor.x + width) {
        for y in [anchor.y - 1, anchor.y + height] {
            grid.push(x, y, SimulatorObject::SystemTitlePadding { system: id });
            path_grid.set_weight(x, y, IMPASSABLE);
        }
    }
    for y in anchor.y..(anchor.y + height) {
        for x in [anchor.x - 1, anchor.x + width] {
            grid.push(x, y, SimulatorObject::SystemTitlePadding { system: id });
            path_grid.set_weight(x, y, IMPASSABLE);
        }
    }

    for (row, line) in state.title.lines.iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        for (column, slice) in chars.chunks(TITLE_CHARS_PER_SQUARE).enumerate() {
            let x = anchor.x + column as i32;
            let y = anchor.y + row as i32;
            grid.push(
                x,
                y,
                SimulatorObject::SystemTitle {
                    system: id,
                    chars: slice.iter().collect(),
                },
            );
            path_grid.set_weight(x, y, IMPASSABLE);
        }
    }
}

fn sync_back(graph: &mut SystemGraph, states: &[SystemState], translate: Point) {
    for id in 0..graph.nodes.len() {
        let state = &states[id];
        let node = &mut graph.nodes[id];
        node.size = state.size;
        node.absolute_position = state.world;
        node.ports = state
            .ports
            .iter()
            .map(|port| Point::new(port.x - translate.x, port.y - translate.y))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_yaml;

    fn simulate(input: &str) -> (SystemGraph, SystemSimulator) {
        let output = load_yaml(input).expect("fixture parses");
        let mut graph = output.system;
        let simulator = SystemSimulator::compute(&mut graph, &SimulatorConfig::default());
        (graph, simulator)
    }

    #[test]
    fn five_links_widen_the_box_to_four_tiles() {
        let (graph, _) = simulate(
            r#"
systems:
  - id: foo
    position: { x: 1, y: 1 }
  - id: s1
  - id: s2
  - id: s3
  - id: s4
  - id: s5
links:
  - { a: foo, b: s1 }
  - { a: foo, b: s2 }
  - { a: foo, b: s3 }
  - { a: foo, b: s4 }
  - { a: foo, b: s5 }
"#,
        );
        let foo = graph.node(graph.resolve("foo").unwrap());
        assert_eq!(foo.size, Size { width: 4, height: 3 });

        let relative: Vec<Point> = foo
            .ports
            .iter()
            .map(|p| Point::new(p.x - foo.absolute_position.x, p.y - foo.absolute_position.y))
            .collect();
        assert_eq!(relative[..2], [Point::new(-1, 1), Point::new(4, 1)]);
        let horizontal: Vec<Point> = relative[2..].to_vec();
        assert_eq!(
            horizontal,
            vec![
                Point::new(1, -1),
                Point::new(1, 3),
                Point::new(3, -1),
                Point::new(3, 3),
            ]
        );
    }

    #[test]
    fn small_boxes_get_four_mid_edge_ports() {
        let (graph, _) = simulate("systems:\n  - id: foo\n");
        let foo = graph.node(graph.resolve("foo").unwrap());
        assert_eq!(foo.size, Size { width: 3, height: 3 });
        let relative: Vec<Point> = foo
            .ports
            .iter()
            .map(|p| Point::new(p.x - foo.absolute_position.x, p.y - foo.absolute_position.y))
            .collect();
        assert_eq!(
            relative,
            vec![
                Point::new(1, -1),
                Point::new(3, 1),
                Point::new(1, 3),
                Point::new(-1, 1),
            ]
        );
    }

    #[test]
    fn margin_ring_has_expected_cell_count() {
        let (graph, simulator) = simulate(
            "systems:\n  - id: foo\n  - id: bar\nlinks:\n  - { a: foo, b: bar }\n",
        );
        let grid = simulator.layout();
        for id in graph.subsystems() {
            let node = graph.node(id);
            let mut margins = 0;
            for x in 0..grid.width() {
                for y in 0..grid.height() {
                    margins += grid
                        .stack(x, y)
                        .iter()
                        .filter(|object| {
                            matches!(object, SimulatorObject::SystemMargin { system } if *system == id)
                        })
                        .count();
                }
            }
            let expected = 2 * (node.size.width + node.size.height + 2) as usize;
            assert_eq!(margins, expected, "{}", node.canonical_id);
        }
    }

    #[test]
    fn translation_maps_world_onto_the_grid_origin() {
        let (_, simulator) = simulate("systems:\n  - id: a\n  - id: b\n");
        let bounds = simulator.boundaries();
        assert_eq!(bounds.min.x + bounds.translate.x, 0);
        assert_eq!(bounds.min.y + bounds.translate.y, 0);
        let visible = simulator.visible_world_boundaries();
        assert!(visible.min.x + bounds.translate.x >= 0);
        assert!(visible.min.y + bounds.translate.y >= 0);
    }

    #[test]
    fn sibling_link_routes_straight() {
        let (_, simulator) = simulate(
            "systems:\n  - id: foo\n  - id: bar\nlinks:\n  - { a: foo, b: bar }\n",
        );
        let route = simulator.route("foo", "bar").expect("route exists");
        // Ports face each other across open terrain; the path is the
        // straight run between them.
        let manhattan = (route[route.len() - 1].x - route[0].x).abs()
            + (route[route.len() - 1].y - route[0].y).abs();
        assert_eq!(route.len() as i32, manhattan + 1);
        assert!(route.windows(2).all(|w| w[0].y == w[1].y));
    }

    #[test]
    fn routes_are_recorded_in_both_directions() {
        let (_, simulator) = simulate(
            "systems:\n  - id: foo\n  - id: bar\nlinks:\n  - { a: foo, b: bar }\n",
        );
        let forward = simulator.route("foo", "bar").unwrap();
        let mut backward = simulator.route("bar", "foo").unwrap().to_vec();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn hidden_children_are_suppressed_and_parent_is_a_blackbox() {
        let (graph, simulator) = simulate(
            r#"
systems:
  - id: outer
    hideSystems: true
    systems:
      - id: inner
"#,
        );
        let outer = graph.node(graph.resolve("outer").unwrap());
        let inside = outer.absolute_position;
        assert_eq!(simulator.subsystem_at(inside.x + 1, inside.y + 1), Some("outer"));
        let stack = simulator.objects_at(inside.x + 1, inside.y + 1);
        assert!(stack.iter().any(|object| matches!(
            object,
            SimulatorObject::System { blackbox: true, .. }
        )));
        // No tile anywhere belongs to the suppressed child.
        let inner = graph.resolve("outer.inner").unwrap();
        let grid = simulator.layout();
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                assert!(grid
                    .stack(x, y)
                    .iter()
                    .all(|object| object.system() != Some(inner)));
            }
        }
    }

    #[test]
    fn titles_slice_into_glyph_tiles() {
        let (graph, simulator) = simulate(
            r#"
systems:
  - id: gw
    title: Gateway
"#,
        );
        let gw = graph.node(graph.resolve("gw").unwrap());
        // "Gateway" is 7 chars: four tiles of up to two chars, so the
        // box widens to fit the title plus its border.
        assert_eq!(gw.size, Size { width: 6, height: 3 });
        let anchor = Point::new(gw.absolute_position.x + 1, gw.absolute_position.y + 1);
        let slices: Vec<String> = (0..4)
            .filter_map(|i| {
                simulator
                    .objects_at(anchor.x + i, anchor.y)
                    .iter()
                    .find_map(|object| match object {
                        SimulatorObject::SystemTitle { chars, .. } => Some(chars.clone()),
                        _ => None,
                    })
            })
            .collect();
        assert_eq!(slices, vec!["Ga", "te", "wa", "y"]);
    }

    #[test]
    fn link_tiles_are_addressable_through_link_at() {
        let (_, simulator) = simulate(
            "systems:\n  - id: foo\n  - id: bar\nlinks:\n  - { a: foo, b: bar }\n",
        );
        let route = simulator.route("foo", "bar").unwrap().to_vec();
        let bounds = simulator.boundaries();
        let middle = route[route.len() / 2];
        assert_eq!(
            simulator.link_at(middle.x - bounds.translate.x, middle.y - bounds.translate.y),
            Some(0)
        );
    }
}
