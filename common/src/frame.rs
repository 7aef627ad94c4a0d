/// Receive buffer size; a buffer this full is flushed without waiting for silence.
pub const MAX_FRAME_LEN: usize = 128;

/// Two CRC bytes plus at least one payload byte.
pub const MIN_FRAME_LEN: usize = 3;

/// Groups raw link bytes into candidate frames.
///
/// The unit does not length-prefix its replies, so a frame ends when the line
/// has been silent for `silence_ms` or the buffer fills up.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    last_byte_ms: Option<u64>,
    silence_ms: u64,
}

impl FrameAssembler {
    pub fn new(silence_ms: u64) -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_LEN),
            last_byte_ms: None,
            silence_ms,
        }
    }

    /// Appends one byte. Returns the whole buffer when it just reached
    /// [`MAX_FRAME_LEN`].
    pub fn push(&mut self, byte: u8, now_ms: u64) -> Option<Vec<u8>> {
        self.buffer.push(byte);
        self.last_byte_ms = Some(now_ms);

        if self.buffer.len() >= MAX_FRAME_LEN {
            return Some(self.take());
        }
        None
    }

    /// Returns the pending bytes once the line has been silent long enough.
    pub fn poll(&mut self, now_ms: u64) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let last = self.last_byte_ms?;
        if now_ms.saturating_sub(last) >= self.silence_ms {
            Some(self.take())
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Arrival time of the newest byte still waiting in the buffer.
    pub fn pending_since(&self) -> Option<u64> {
        self.last_byte_ms.filter(|_| self.is_pending())
    }

    fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_FRAME_LEN))
    }
}
