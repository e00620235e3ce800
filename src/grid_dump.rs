use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::model::SystemGraph;
use crate::sim::{SimulatorObject, SystemSimulator};

#[derive(Debug, Serialize)]
pub struct GridDump {
    pub width: i32,
    pub height: i32,
    pub boundaries: BoundariesDump,
    pub systems: Vec<SystemDump>,
    pub cells: Vec<CellDump>,
    pub routes: Vec<RouteDump>,
}

#[derive(Debug, Serialize)]
pub struct BoundariesDump {
    pub min: [i32; 2],
    pub max: [i32; 2],
    pub translate: [i32; 2],
}

#[derive(Debug, Serialize)]
pub struct SystemDump {
    pub canonical_id: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub ports: Vec<[i32; 2]>,
}

/// One non-empty raster cell with its object stack, bottom-most first.
#[derive(Debug, Serialize)]
pub struct CellDump {
    pub x: i32,
    pub y: i32,
    pub stack: Vec<ObjectDump>,
}

#[derive(Debug, Serialize)]
pub struct ObjectDump {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackbox: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteDump {
    pub from: String,
    pub to: String,
    pub path: Vec<[i32; 2]>,
}

impl GridDump {
    pub fn from_simulator(simulator: &SystemSimulator, graph: &SystemGraph) -> Self {
        let grid = simulator.layout();
        let bounds = simulator.boundaries();

        let systems = graph
            .subsystems()
            .map(|id| {
                let node = graph.node(id);
                SystemDump {
                    canonical_id: node.canonical_id.clone(),
                    x: node.absolute_position.x,
                    y: node.absolute_position.y,
                    width: node.size.width,
                    height: node.size.height,
                    ports: node.ports.iter().map(|p| [p.x, p.y]).collect(),
                }
            })
            .collect();

        let mut cells = Vec::new();
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let stack = grid.stack(x, y);
                if stack.is_empty() {
                    continue;
                }
                cells.push(CellDump {
                    x,
                    y,
                    stack: stack
                        .iter()
                        .map(|object| dump_object(object, graph))
                        .collect(),
                });
            }
        }

        let routes = simulator
            .routes()
            .iter()
            .map(|(from, to, path)| RouteDump {
                from: from.to_string(),
                to: to.to_string(),
                path: path.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        GridDump {
            width: grid.width(),
            height: grid.height(),
            boundaries: BoundariesDump {
                min: [bounds.min.x, bounds.min.y],
                max: [bounds.max.x, bounds.max.y],
                translate: [bounds.translate.x, bounds.translate.y],
            },
            systems,
            cells,
            routes,
        }
    }
}

fn dump_object(object: &SimulatorObject, graph: &SystemGraph) -> ObjectDump {
    let canonical = |id: usize| graph.node(id).canonical_id.clone();
    match object {
        SimulatorObject::System {
            system,
            variant,
            blackbox,
        } => ObjectDump {
            kind: "System".to_string(),
            variant: Some(format!("{variant:?}")),
            system: Some(canonical(*system)),
            blackbox: Some(*blackbox),
            link: None,
            chars: None,
        },
        SimulatorObject::Port { system } => ObjectDump {
            kind: "Port".to_string(),
            variant: None,
            system: Some(canonical(*system)),
            blackbox: None,
            link: None,
            chars: None,
        },
        SimulatorObject::Link { link, variant } => ObjectDump {
            kind: "Link".to_string(),
            variant: Some(format!("{variant:?}")),
            system: None,
            blackbox: None,
            link: Some(*link),
            chars: None,
        },
        SimulatorObject::SystemMargin { system } => ObjectDump {
            kind: "SystemMargin".to_string(),
            variant: None,
            system: Some(canonical(*system)),
            blackbox: None,
            link: None,
            chars: None,
        },
        SimulatorObject::SystemTitle { system, chars } => ObjectDump {
            kind: "SystemTitle".to_string(),
            variant: None,
            system: Some(canonical(*system)),
            blackbox: None,
            link: None,
            chars: Some(chars.clone()),
        },
        SimulatorObject::SystemTitlePadding { system } => ObjectDump {
            kind: "SystemTitlePadding".to_string(),
            variant: None,
            system: Some(canonical(*system)),
            blackbox: None,
            link: None,
            chars: None,
        },
    }
}

pub fn write_grid_dump(
    path: &Path,
    simulator: &SystemSimulator,
    graph: &SystemGraph,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GridDump::from_simulator(simulator, graph);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
