//! Reference: https://www.kernel.org/doc/html/latest/input/joydev/joystick-api.html
use packed_struct::prelude::*;

/// Size of a single joystick record in bytes
pub const JS_EVENT_SIZE: usize = 8;

/// Event type bits
pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;
pub const JS_EVENT_INIT: u8 = 0x80;

// JsEventReport
//
// struct js_event {
//     __u32 time;     /* event timestamp in milliseconds */
//     __s16 value;    /* value */
//     __u8 type;      /* event type */
//     __u8 number;    /* axis/button number */
// };
//
// The kernel writes the struct in host byte order, so the multi-byte fields
// follow the target's endianness.
//
// # Button 0 initially released
// E: 64 00 00 00 00 00 81 00
// # Axis 1 initially at 16383
// E: 00 00 00 00 ff 3f 82 01
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct JsEventReport {
    // BYTE 0-3
    #[cfg_attr(
        target_endian = "little",
        packed_field(bytes = "0..=3", endian = "lsb")
    )]
    #[cfg_attr(target_endian = "big", packed_field(bytes = "0..=3", endian = "msb"))]
    pub time: Integer<u32, packed_bits::Bits<32>>,
    // BYTE 4-5
    #[cfg_attr(
        target_endian = "little",
        packed_field(bytes = "4..=5", endian = "lsb")
    )]
    #[cfg_attr(target_endian = "big", packed_field(bytes = "4..=5", endian = "msb"))]
    pub value: Integer<i16, packed_bits::Bits<16>>,
    // BYTE 6
    #[packed_field(bytes = "6")]
    pub kind: u8,
    // BYTE 7
    #[packed_field(bytes = "7")]
    pub number: u8,
}

impl JsEventReport {
    pub fn new(time: u32, value: i16, kind: u8, number: u8) -> Self {
        Self {
            time: Integer::from_primitive(time),
            value: Integer::from_primitive(value),
            kind,
            number,
        }
    }
}
