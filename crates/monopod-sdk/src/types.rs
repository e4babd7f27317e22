use core::fmt;
use serde::{Deserialize, Serialize};

use crate::limits::Limit;

/// Joints of the rig. The discriminant doubles as the slot index on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    Hip = 0,
    Knee = 1,
    BoomConnector = 2,
    PlanarizerYaw = 3,
    PlanarizerPitch = 4,
}

impl JointId {
    pub const COUNT: usize = 5;

    pub const ALL: [JointId; Self::COUNT] = [
        JointId::Hip,
        JointId::Knee,
        JointId::BoomConnector,
        JointId::PlanarizerYaw,
        JointId::PlanarizerPitch,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            JointId::Hip => "hip_joint",
            JointId::Knee => "knee_joint",
            JointId::BoomConnector => "boom_connector_joint",
            JointId::PlanarizerYaw => "planarizer_yaw_joint",
            JointId::PlanarizerPitch => "planarizer_pitch_joint",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name to id table. This is the only way joint names are resolved.
pub const JOINT_NAMES: &[(&str, JointId)] = &[
    ("hip_joint", JointId::Hip),
    ("knee_joint", JointId::Knee),
    ("boom_connector_joint", JointId::BoomConnector),
    ("planarizer_yaw_joint", JointId::PlanarizerYaw),
    ("planarizer_pitch_joint", JointId::PlanarizerPitch),
];

pub fn joint_id(name: &str) -> Option<JointId> {
    JOINT_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, id)| *id)
}

/// Kinds of samples a board records per joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Position = 0,
    Velocity = 1,
    Acceleration = 2,
    Torque = 3,
    EncoderIndex = 4,
}

impl MeasurementKind {
    pub const COUNT: usize = 5;

    pub const ALL: [MeasurementKind; Self::COUNT] = [
        MeasurementKind::Position,
        MeasurementKind::Velocity,
        MeasurementKind::Acceleration,
        MeasurementKind::Torque,
        MeasurementKind::EncoderIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(default)]
    pub p: f64,
    #[serde(default)]
    pub i: f64,
    #[serde(default)]
    pub d: f64,
}

impl PidGains {
    pub fn new(p: f64, i: f64, d: f64) -> Self {
        Self { p, i, d }
    }
}

/// Configuration snapshot of one joint, separate from its live measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JointSettingState {
    pub max_torque_target: f64,
    pub position_limit: Limit,
    pub velocity_limit: Limit,
    pub acceleration_limit: Limit,
}

/// Selects which joints are read and which are commanded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Leg motors plus every planarizer encoder.
    FullRig,
    /// Hip and knee only.
    LegOnly,
    /// Planarizer encoders only, nothing is commanded.
    PlanarizerOnly,
    Custom {
        read: Vec<JointId>,
        write: Vec<JointId>,
    },
}

/// Read and write sets a mode resolves to, in joint id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JointIndexing {
    pub read: Vec<JointId>,
    pub write: Vec<JointId>,
}

impl Mode {
    pub fn resolve(&self) -> Result<JointIndexing, String> {
        let (mut read, mut write) = match self {
            Mode::FullRig => (JointId::ALL.to_vec(), vec![JointId::Hip, JointId::Knee]),
            Mode::LegOnly => (
                vec![JointId::Hip, JointId::Knee],
                vec![JointId::Hip, JointId::Knee],
            ),
            Mode::PlanarizerOnly => (
                vec![
                    JointId::BoomConnector,
                    JointId::PlanarizerYaw,
                    JointId::PlanarizerPitch,
                ],
                Vec::new(),
            ),
            Mode::Custom { read, write } => (read.clone(), write.clone()),
        };
        read.sort();
        read.dedup();
        write.sort();
        write.dedup();
        if read.is_empty() {
            return Err("mode selects no joints".to_string());
        }
        if let Some(id) = write.iter().find(|id| !read.contains(id)) {
            return Err(format!("writable joint {id} is missing from the read set"));
        }
        Ok(JointIndexing { read, write })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_table_covers_every_joint() {
        assert_eq!(JOINT_NAMES.len(), JointId::COUNT);
        for id in JointId::ALL {
            assert_eq!(joint_id(id.name()), Some(id));
            assert_eq!(JointId::from_index(id.index()), Some(id));
        }
        assert_eq!(joint_id("hip"), None);
        assert_eq!(JointId::from_index(5), None);
    }

    #[test]
    fn predefined_modes_resolve() {
        let full = Mode::FullRig.resolve().unwrap();
        assert_eq!(full.read.len(), 5);
        assert_eq!(full.write, vec![JointId::Hip, JointId::Knee]);

        let planarizer = Mode::PlanarizerOnly.resolve().unwrap();
        assert!(planarizer.write.is_empty());
        assert!(!planarizer.read.contains(&JointId::Hip));
    }

    #[test]
    fn custom_mode_rejects_write_outside_read() {
        let mode = Mode::Custom {
            read: vec![JointId::Hip],
            write: vec![JointId::Hip, JointId::Knee],
        };
        assert!(mode.resolve().is_err());

        let mode = Mode::Custom {
            read: vec![JointId::Knee, JointId::Hip, JointId::Knee],
            write: vec![JointId::Knee],
        };
        let indexing = mode.resolve().unwrap();
        assert_eq!(indexing.read, vec![JointId::Hip, JointId::Knee]);
    }
}
