use std::path::{Path, PathBuf};

use flowgrid::config::SimulatorConfig;
use flowgrid::load_yaml;
use flowgrid::model::SystemGraph;
use flowgrid::sim::{SimulatorObject, SystemSimulator};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn simulate_fixture(name: &str) -> (SystemGraph, SystemSimulator) {
    let input = std::fs::read_to_string(fixture_path(name)).expect("fixture read failed");
    let output = load_yaml(&input).expect("fixture parse failed");
    assert!(output.errors.is_empty(), "{name}: {:?}", output.errors);
    let mut graph = output.system;
    let simulator = SystemSimulator::compute(&mut graph, &SimulatorConfig::default());
    (graph, simulator)
}

fn margin_cells(simulator: &SystemSimulator, system: usize) -> usize {
    let grid = simulator.layout();
    let mut count = 0;
    for x in 0..grid.width() {
        for y in 0..grid.height() {
            count += grid
                .stack(x, y)
                .iter()
                .filter(|object| {
                    matches!(object, SimulatorObject::SystemMargin { system: owner } if *owner == system)
                })
                .count();
        }
    }
    count
}

#[test]
fn lay_out_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        "basic.yaml",
        "nested.yaml",
        "hub.yaml",
        "hidden.yaml",
        "flows.yaml",
        "titles.yaml",
    ];

    for name in candidates {
        assert!(fixture_path(name).exists(), "fixture missing: {name}");
        let (graph, simulator) = simulate_fixture(name);

        // Painted boxes carry a full margin ring; suppressed systems
        // leave no tiles at all.
        for id in graph.subsystems() {
            let node = graph.node(id);
            let count = margin_cells(&simulator, id);
            if count > 0 {
                let expected = 2 * (node.size.width + node.size.height + 2) as usize;
                assert_eq!(count, expected, "{name}: {}", node.canonical_id);
            }
        }

        // Every recorded route is mirrored and at least as long as the
        // Manhattan distance between its endpoints.
        for (from, to, path) in simulator.routes().iter() {
            let mut mirrored = simulator
                .route(to, from)
                .unwrap_or_else(|| panic!("{name}: missing reverse route {to} -> {from}"))
                .to_vec();
            mirrored.reverse();
            assert_eq!(path, mirrored.as_slice(), "{name}: {from} -> {to}");

            let first = path[0];
            let last = path[path.len() - 1];
            let manhattan = (last.x - first.x).abs() + (last.y - first.y).abs();
            assert!(
                path.len() as i32 >= manhattan + 1,
                "{name}: {from} -> {to} shorter than Manhattan distance"
            );
            assert!(
                path.windows(2)
                    .all(|w| (w[1].x - w[0].x).abs() + (w[1].y - w[0].y).abs() == 1),
                "{name}: {from} -> {to} is not 4-connected"
            );
        }

        let bounds = simulator.boundaries();
        assert!(bounds.width() >= 0 && bounds.height() >= 0, "{name}");
        assert_eq!(bounds.min.x + bounds.translate.x, 0, "{name}");
        assert_eq!(bounds.min.y + bounds.translate.y, 0, "{name}");
    }
}

#[test]
fn every_resolvable_link_gets_a_route() {
    for name in ["basic.yaml", "nested.yaml", "hub.yaml", "flows.yaml", "titles.yaml"] {
        let (graph, simulator) = simulate_fixture(name);
        for link in &graph.links {
            assert!(
                simulator.route(&link.a, &link.b).is_some(),
                "{name}: link {} -> {} has no route",
                link.a,
                link.b
            );
        }
    }
}

#[test]
fn hub_consumes_one_port_per_link() {
    let (graph, simulator) = simulate_fixture("hub.yaml");
    let hub = graph.node(graph.resolve("hub").unwrap());
    assert_eq!(hub.size.width, 4);
    assert_eq!(hub.ports.len(), 6);

    // All six ports end up covered by link tiles.
    let bounds = simulator.boundaries();
    for port in &hub.ports {
        let stack = simulator.objects_at(port.x, port.y);
        assert!(
            stack
                .iter()
                .any(|object| matches!(object, SimulatorObject::Link { .. })),
            "port at {},{} unused",
            port.x + bounds.translate.x,
            port.y + bounds.translate.y
        );
    }
}

#[test]
fn hidden_subtree_routes_to_the_opaque_ancestor() {
    let (graph, simulator) = simulate_fixture("hidden.yaml");
    // The link targets vault.hsm, but the vault hides its internals,
    // so the route terminates at the vault's own ports.
    let route = simulator.route("client", "vault.hsm").expect("route");
    let vault = graph.node(graph.resolve("vault").unwrap());
    let bounds = simulator.boundaries();
    let end = route[route.len() - 1];
    assert!(vault.ports.iter().any(|port| {
        port.x + bounds.translate.x == end.x && port.y + bounds.translate.y == end.y
    }));
    assert!(simulator
        .layout()
        .stack(end.x, end.y)
        .iter()
        .any(SimulatorObject::is_port));
}

#[test]
fn flow_steps_normalise_and_chain_links() {
    let (graph, _) = simulate_fixture("flows.yaml");
    let flow = &graph.flows[0];
    let keyframes: Vec<usize> = flow.steps.iter().map(|step| step.keyframe).collect();
    assert_eq!(keyframes, vec![0, 1, 1]);
    assert_eq!(flow.keyframe_count(), 2);
    assert_eq!(flow.steps[0].links, vec![0]);
    assert_eq!(flow.steps[1].links, vec![1]);
    assert_eq!(flow.steps[2].links, vec![1, 0]);
    assert_eq!(flow.steps_at(1).count(), 2);
}

#[test]
fn determinism_across_runs() {
    let (graph_a, simulator_a) = simulate_fixture("nested.yaml");
    let (graph_b, simulator_b) = simulate_fixture("nested.yaml");
    assert_eq!(simulator_a.boundaries(), simulator_b.boundaries());
    for id in graph_a.subsystems() {
        assert_eq!(
            graph_a.node(id).absolute_position,
            graph_b.node(id).absolute_position
        );
        assert_eq!(graph_a.node(id).size, graph_b.node(id).size);
    }
    let routes_a: Vec<_> = simulator_a.routes().iter().collect();
    let routes_b: Vec<_> = simulator_b.routes().iter().collect();
    assert_eq!(routes_a, routes_b);
}
