use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct MonopodMetrics {
    pub registry: Registry,
    pub torque_dispatches: IntCounter,
    pub limit_violations: IntCounter,
    pub rejected_accesses: IntCounter,
    pub active_joints: IntGauge,
}

impl MonopodMetrics {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let torque_dispatches =
            IntCounter::new("monopod_torque_dispatches", "Batched torque dispatches sent")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let limit_violations = IntCounter::new(
            "monopod_limit_violations",
            "Limit checks that found a joint outside its envelope",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let rejected_accesses = IntCounter::new(
            "monopod_rejected_accesses",
            "Accesses refused for an uninitialized registry or inactive joint",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let active_joints = IntGauge::new("monopod_active_joints", "Joints in the read set")
            .map_err(|e| format!("metrics init error: {e}"))?;

        let _ = registry.register(Box::new(torque_dispatches.clone()));
        let _ = registry.register(Box::new(limit_violations.clone()));
        let _ = registry.register(Box::new(rejected_accesses.clone()));
        let _ = registry.register(Box::new(active_joints.clone()));
        Ok(Self {
            registry,
            torque_dispatches,
            limit_violations,
            rejected_accesses,
            active_joints,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
