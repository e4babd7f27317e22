use crate::{BoardError, ControlBoard, JointId, MeasurementHistory, MeasurementKind};

/// Read side of one board slot.
#[derive(Clone, Copy)]
pub struct Encoder<'b> {
    board: &'b dyn ControlBoard,
    slot: JointId,
}

impl<'b> Encoder<'b> {
    pub fn new(board: &'b dyn ControlBoard, slot: JointId) -> Self {
        Self { board, slot }
    }

    pub fn slot(&self) -> JointId {
        self.slot
    }

    pub fn get_measurement(&self, kind: MeasurementKind) -> Option<&'b dyn MeasurementHistory> {
        self.board.measurement(self.slot, kind)
    }

    pub fn search_index(&self) -> Result<(), BoardError> {
        self.board.search_index(self.slot)
    }
}

/// Read and command side of one board slot.
#[derive(Clone, Copy)]
pub struct Motor<'b> {
    encoder: Encoder<'b>,
}

impl<'b> Motor<'b> {
    pub fn new(board: &'b dyn ControlBoard, slot: JointId) -> Self {
        Self {
            encoder: Encoder::new(board, slot),
        }
    }

    pub fn encoder(&self) -> Encoder<'b> {
        self.encoder
    }

    pub fn send_torque(&self, torque: f64) -> Result<(), BoardError> {
        self.encoder.board.send_torque(self.encoder.slot, torque)
    }
}
