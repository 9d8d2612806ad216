//! Event paths: the per-object event streams a query iterates.
//!
//! Wire format, little-endian:
//!
//! ```text
//! header: u32 object_id, u32 length (bytes of event data that follow)
//! event:  u8 flags, i64 timestamp,
//!         [u16 action_id]        if flags & 0x01
//!         [u32 n, n bytes data]  if flags & 0x02
//! ```

use std::sync::Arc;

use thiserror::Error;

const HEADER_LEN: usize = 8;
const FLAG_ACTION: u8 = 0x01;
const FLAG_DATA: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("event path header truncated: {0} bytes, need {HEADER_LEN}")]
    TruncatedHeader(usize),
    #[error("event path declares {declared} bytes of events but {available} are present")]
    LengthMismatch { declared: usize, available: usize },
}

/// One decoded event, laid out like the `Event` class.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Event {
    pub timestamp: i64,
    pub action_id: i64,
}

/// Forward-only reader over the events of a path, with one event of lookahead.
#[derive(Debug, Clone)]
pub struct EventCursor {
    data: Arc<[u8]>,
    pos: usize,
    lookahead: Option<Event>,
}

impl EventCursor {
    fn new(data: Arc<[u8]>) -> Self {
        Self { data, pos: 0, lookahead: None }
    }

    /// Whether every event has been consumed. Decodes the next event if needed.
    pub fn eof(&mut self) -> bool {
        self.peek().is_none()
    }

    pub fn peek(&mut self) -> Option<&Event> {
        if self.lookahead.is_none() {
            self.lookahead = self.decode();
        }
        self.lookahead.as_ref()
    }

    /// Consume the next event. Returns the zero event past the end.
    pub fn next_event(&mut self) -> Event {
        self.peek();
        self.lookahead.take().unwrap_or_default()
    }

    fn decode(&mut self) -> Option<Event> {
        if self.pos >= self.data.len() {
            return None;
        }
        let mut reader = Reader { data: &self.data[..], pos: self.pos };
        let event = match reader.event() {
            Some(event) => event,
            None => {
                tracing::warn!(offset = self.pos, len = self.data.len(), "truncated event, ending stream");
                self.pos = self.data.len();
                return None;
            }
        };
        self.pos = reader.pos;
        Some(event)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn event(&mut self) -> Option<Event> {
        let [flags] = self.take::<1>()?;
        let timestamp = i64::from_le_bytes(self.take()?);
        let action_id = if flags & FLAG_ACTION != 0 { i64::from(u16::from_le_bytes(self.take()?)) } else { 0 };
        if flags & FLAG_DATA != 0 {
            let len = u32::from_le_bytes(self.take()?) as usize;
            if self.data.len() - self.pos < len {
                return None;
            }
            self.pos += len;
        }
        Some(Event { timestamp, action_id })
    }
}

/// The event stream of one tracked object.
///
/// Every `events()` call opens a new cursor. The path owns its cursors, so
/// each one stays valid until the path is dropped.
#[derive(Debug, Clone)]
pub struct EventPath {
    pub object_id: i64,
    data: Arc<[u8]>,
    cursors: Vec<Box<EventCursor>>,
}

impl EventPath {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PathError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(PathError::TruncatedHeader(bytes.len()))?;
        let object_id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let declared = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let available = bytes.len() - HEADER_LEN;
        if declared > available {
            return Err(PathError::LengthMismatch { declared, available });
        }
        let data = Arc::from(&bytes[HEADER_LEN..HEADER_LEN + declared]);
        Ok(Self { object_id: i64::from(object_id), data, cursors: Vec::new() })
    }

    /// A new cursor positioned at the first event.
    pub fn events(&mut self) -> &mut EventCursor {
        self.cursors.push(Box::new(EventCursor::new(Arc::clone(&self.data))));
        let last = self.cursors.len() - 1;
        &mut self.cursors[last]
    }

    /// Number of cursors opened so far.
    pub fn open_cursors(&self) -> usize {
        self.cursors.len()
    }
}
