/// CAN arbitration identifier type
pub type CanId = u32;

/// Generic frame payload type
pub type FrameData = Vec<u8>;

/// Maximum payload length of a classic CAN frame
pub const MAX_FRAME_LEN: usize = 8;

/// A single bus frame, immutable once built or received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: CanId,
    pub data: FrameData,
    pub is_extended: bool,
}

impl Frame {
    /// Creates a standard-addressed frame.
    pub fn new(id: CanId, data: impl Into<FrameData>) -> Self {
        let data = data.into();
        debug_assert!(data.len() <= MAX_FRAME_LEN);
        Self {
            id,
            data,
            is_extended: false,
        }
    }

    /// Builds the fixed 8-byte OBD-II single-frame request layout
    /// `[length, mode, pid_or_zero, 0, 0, 0, 0, 0]`. The length byte is 2
    /// when a PID is present and 1 otherwise.
    pub fn obd_request(id: CanId, mode: u8, pid: Option<u8>) -> Self {
        let mut data = vec![0u8; MAX_FRAME_LEN];
        data[0] = if pid.is_some() { 2 } else { 1 };
        data[1] = mode;
        if let Some(pid) = pid {
            data[2] = pid;
        }
        Self {
            id,
            data,
            is_extended: false,
        }
    }

    /// Payload length code
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Configuration trait implemented by all tunable configurations
pub trait Config: Send + Sync {
    fn validate(&self) -> crate::error::Result<()>;
}
