use crate::{BoardError, ControlBoard, JointId, MeasurementHistory, MeasurementKind};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const DEFAULT_CAPACITY: usize = 1000;

/// Bounded in-memory sample history. Oldest samples are dropped once the
/// capacity is reached; time indices keep counting up.
pub struct SampleHistory {
    inner: RwLock<Ring>,
}

struct Ring {
    samples: VecDeque<f64>,
    oldest_timeindex: i64,
    capacity: usize,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(Ring {
                samples: VecDeque::with_capacity(capacity),
                oldest_timeindex: 0,
                capacity,
            }),
        }
    }

    /// Append a sample and return its time index.
    pub fn append(&self, value: f64) -> i64 {
        let mut ring = self.inner.write();
        if ring.samples.len() == ring.capacity {
            ring.samples.pop_front();
            ring.oldest_timeindex += 1;
        }
        ring.samples.push_back(value);
        ring.oldest_timeindex + ring.samples.len() as i64 - 1
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementHistory for SampleHistory {
    fn length(&self) -> usize {
        self.inner.read().samples.len()
    }

    fn newest_element(&self) -> Option<f64> {
        self.inner.read().samples.back().copied()
    }

    fn newest_timeindex(&self) -> Option<i64> {
        let ring = self.inner.read();
        if ring.samples.is_empty() {
            None
        } else {
            Some(ring.oldest_timeindex + ring.samples.len() as i64 - 1)
        }
    }

    fn element_at(&self, timeindex: &mut i64) -> Option<f64> {
        let ring = self.inner.read();
        if ring.samples.is_empty() {
            return None;
        }
        if *timeindex < ring.oldest_timeindex {
            *timeindex = ring.oldest_timeindex;
        }
        let offset = usize::try_from(*timeindex - ring.oldest_timeindex).ok()?;
        ring.samples.get(offset).copied()
    }
}

/// In-process board with one history per joint and measurement kind.
/// Records every command it receives so tests can inspect bus traffic.
pub struct MockBoard {
    live: AtomicBool,
    slots: [bool; JointId::COUNT],
    histories: [[SampleHistory; MeasurementKind::COUNT]; JointId::COUNT],
    index_positions: Mutex<[Option<f64>; JointId::COUNT]>,
    sent: Mutex<Vec<(JointId, f64)>>,
    batches: AtomicUsize,
    reads: AtomicUsize,
    searches: AtomicUsize,
}

impl MockBoard {
    /// A live board with every joint slot populated.
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            slots: [true; JointId::COUNT],
            histories: std::array::from_fn(|_| std::array::from_fn(|_| SampleHistory::new())),
            index_positions: Mutex::new([None; JointId::COUNT]),
            sent: Mutex::new(Vec::new()),
            batches: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn without_slot(mut self, joint: JointId) -> Self {
        self.slots[joint.index()] = false;
        self
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// Append a raw (actuator side) sample.
    pub fn push(&self, joint: JointId, kind: MeasurementKind, raw: f64) -> i64 {
        self.histories[joint.index()][kind.index()].append(raw)
    }

    /// Raw position the index search will report for `joint`.
    pub fn set_index_position(&self, joint: JointId, raw: f64) {
        self.index_positions.lock()[joint.index()] = Some(raw);
    }

    pub fn sent_torques(&self) -> Vec<(JointId, f64)> {
        self.sent.lock().clone()
    }

    pub fn last_torque(&self, joint: JointId) -> Option<f64> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(j, _)| *j == joint)
            .map(|(_, t)| *t)
    }

    /// Number of batched dispatches received.
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Total calls that touched the board: history lookups, commands and
    /// index searches.
    pub fn call_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.searches.load(Ordering::SeqCst)
            + self.sent.lock().len()
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBoard for MockBoard {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn has_slot(&self, joint: JointId) -> bool {
        self.slots[joint.index()]
    }

    fn measurement(&self, joint: JointId, kind: MeasurementKind) -> Option<&dyn MeasurementHistory> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if !self.slots[joint.index()] {
            return None;
        }
        Some(&self.histories[joint.index()][kind.index()])
    }

    fn send_torque(&self, joint: JointId, torque: f64) -> Result<(), BoardError> {
        if !self.is_live() {
            return Err(BoardError::Offline);
        }
        if !self.has_slot(joint) {
            return Err(BoardError::MissingSlot(joint));
        }
        self.sent.lock().push((joint, torque));
        Ok(())
    }

    fn send_torques(&self, commands: &[(JointId, f64)]) -> Result<(), BoardError> {
        if !self.is_live() {
            return Err(BoardError::Offline);
        }
        if let Some((joint, _)) = commands.iter().find(|(j, _)| !self.has_slot(*j)) {
            return Err(BoardError::MissingSlot(*joint));
        }
        self.sent.lock().extend_from_slice(commands);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn search_index(&self, joint: JointId) -> Result<(), BoardError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if !self.is_live() {
            return Err(BoardError::Offline);
        }
        let raw = self.index_positions.lock()[joint.index()];
        match raw {
            Some(raw) => {
                self.push(joint, MeasurementKind::EncoderIndex, raw);
                Ok(())
            }
            None => Err(BoardError::IndexNotFound(joint)),
        }
    }
}
