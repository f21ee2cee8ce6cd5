use std::error::Error;

use packed_struct::{types::SizedInteger, PackedStruct};

use crate::drivers::joystick::js_event::{JsEventReport, JS_EVENT_BUTTON, JS_EVENT_INIT};

#[test]
fn test_unpack_host_order() -> Result<(), Box<dyn Error>> {
    let mut buf = [0u8; 8];
    buf[0..4].copy_from_slice(&123_456u32.to_ne_bytes());
    buf[4..6].copy_from_slice(&(-32767i16).to_ne_bytes());
    buf[6] = JS_EVENT_INIT | JS_EVENT_BUTTON;
    buf[7] = 12;

    let report = JsEventReport::unpack(&buf)?;
    assert_eq!(report.time.to_primitive(), 123_456);
    assert_eq!(report.value.to_primitive(), -32767);
    assert_eq!(report.kind, 0x81);
    assert_eq!(report.number, 12);

    Ok(())
}

#[test]
fn test_pack_layout() -> Result<(), Box<dyn Error>> {
    let report = JsEventReport::new(0x0102_0304, 0x0506, 0x02, 0x07);
    let buf = report.pack()?;
    assert_eq!(&buf[0..4], &0x0102_0304u32.to_ne_bytes());
    assert_eq!(&buf[4..6], &0x0506i16.to_ne_bytes());
    assert_eq!(buf[6], 0x02, "type byte should be at offset 6");
    assert_eq!(buf[7], 0x07, "number should be at offset 7");

    Ok(())
}
