use crate::model::NodeId;

/// Which cell of a box an interior tile occupies. Corner and edge
/// variants let a renderer pick border sprites without re-deriving
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemVariant {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterCenter,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl SystemVariant {
    pub fn classify(x: i32, y: i32, width: i32, height: i32) -> Self {
        let left = x == 0;
        let right = x == width - 1;
        let top = y == 0;
        let bottom = y == height - 1;
        match (top, bottom, left, right) {
            (true, _, true, _) => Self::TopLeft,
            (true, _, _, true) => Self::TopRight,
            (_, true, true, _) => Self::BottomLeft,
            (_, true, _, true) => Self::BottomRight,
            (true, _, _, _) => Self::TopCenter,
            (_, true, _, _) => Self::BottomCenter,
            (_, _, true, _) => Self::CenterLeft,
            (_, _, _, true) => Self::CenterRight,
            _ => Self::CenterCenter,
        }
    }
}

/// Orientation of a link tile: straight runs and the four elbows,
/// named by the pair of cell edges the line connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkVariant {
    Horizontal,
    Vertical,
    BottomToRight,
    BottomToLeft,
    TopToRight,
    TopToLeft,
}

/// One entry of a raster cell's object stack, bottom-most drawn first.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorObject {
    System {
        system: NodeId,
        variant: SystemVariant,
        blackbox: bool,
    },
    Port {
        system: NodeId,
    },
    Link {
        link: usize,
        variant: LinkVariant,
    },
    SystemMargin {
        system: NodeId,
    },
    SystemTitle {
        system: NodeId,
        chars: String,
    },
    SystemTitlePadding {
        system: NodeId,
    },
}

impl SimulatorObject {
    /// The system this tile belongs to, if any.
    pub fn system(&self) -> Option<NodeId> {
        match self {
            Self::System { system, .. }
            | Self::Port { system }
            | Self::SystemMargin { system }
            | Self::SystemTitle { system, .. }
            | Self::SystemTitlePadding { system } => Some(*system),
            Self::Link { .. } => None,
        }
    }

    pub fn is_port(&self) -> bool {
        matches!(self, Self::Port { .. })
    }
}
