use packed_struct::{types::SizedInteger, PackedStruct, PackingError};

use super::js_event::{JsEventReport, JS_EVENT_AXIS, JS_EVENT_BUTTON, JS_EVENT_INIT, JS_EVENT_SIZE};

/// Largest magnitude an axis reports. Positions are normalized against this
/// exact value, so -32767..=32767 maps onto -1.0..=1.0.
pub const AXIS_MAX: f64 = 32767.0;

/// Classification of a joystick record based on its type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Button,
    Axis,
    /// Initial button state replayed by the kernel when the device is opened
    InitButton,
    /// Initial axis state replayed by the kernel when the device is opened
    InitAxis,
    Unknown,
}

impl EventKind {
    /// Returns true for the initial state replay events
    pub fn is_init(&self) -> bool {
        matches!(self, EventKind::InitButton | EventKind::InitAxis)
    }
}

impl From<u8> for EventKind {
    fn from(value: u8) -> Self {
        let init = value & JS_EVENT_INIT != 0;
        match (value & !JS_EVENT_INIT, init) {
            (JS_EVENT_BUTTON, false) => Self::Button,
            (JS_EVENT_AXIS, false) => Self::Axis,
            (JS_EVENT_BUTTON, true) => Self::InitButton,
            (JS_EVENT_AXIS, true) => Self::InitAxis,
            _ => Self::Unknown,
        }
    }
}

/// A single decoded joystick record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Timestamp in milliseconds
    pub timestamp: u32,
    pub value: i16,
    /// The raw type byte; see [Event::kind]
    pub kind_byte: u8,
    /// Button or axis number, depending on the kind
    pub index: u8,
}

impl Event {
    /// Decode a raw record read from the device. No validation is done
    /// besides the length; unexpected type bytes decode as [EventKind::Unknown].
    pub fn decode(buf: &[u8; JS_EVENT_SIZE]) -> Result<Self, PackingError> {
        let report = JsEventReport::unpack(buf)?;
        Ok(report.into())
    }

    /// Encode the event back into its wire representation
    pub fn encode(&self) -> Result<[u8; JS_EVENT_SIZE], PackingError> {
        let report = JsEventReport::new(self.timestamp, self.value, self.kind_byte, self.index);
        report.pack()
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from(self.kind_byte)
    }

    /// Button state carried by this event. Any nonzero value is a press.
    pub fn pressed(&self) -> bool {
        self.value != 0
    }

    /// Axis position normalized to -1.0..=1.0
    pub fn position(&self) -> f64 {
        self.value as f64 / AXIS_MAX
    }
}

impl From<JsEventReport> for Event {
    fn from(report: JsEventReport) -> Self {
        Self {
            timestamp: report.time.to_primitive(),
            value: report.value.to_primitive(),
            kind_byte: report.kind,
            index: report.number,
        }
    }
}
