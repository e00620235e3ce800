use serde::{Deserialize, Serialize};

/// Raw specification tree as authored in YAML or JSON, prior to
/// hydration. Field names follow the published document format
/// (`specificationVersion`, `hideSystems`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSpec {
    pub specification_version: Option<String>,
    pub title: Option<String>,
    pub systems: Vec<SubsystemSpec>,
    pub links: Vec<LinkSpec>,
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemSpec {
    pub id: String,
    #[serde(default)]
    pub position: Option<PositionSpec>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub hide_systems: bool,
    #[serde(default)]
    pub systems: Vec<SubsystemSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSpec {
    pub x: i32,
    pub y: i32,
}

/// A link between two sub-systems, each named by a dotted path from the
/// root (`parent.child.leaf`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSpec {
    #[serde(default)]
    pub steps: Vec<FlowStepSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStepSpec {
    pub keyframe: i64,
    pub from: String,
    pub to: String,
    /// Explicit list of global link indices; when present it
    /// short-circuits link-path discovery.
    #[serde(default)]
    pub links: Option<Vec<usize>>,
}
