use std::{error::Error, io::Cursor, time::Duration};

use crate::drivers::joystick::{
    driver::{js_path, Driver},
    event::{Event, EventKind},
};

fn encode(events: &[Event]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut bytes = Vec::new();
    for event in events {
        bytes.extend_from_slice(&event.encode()?);
    }
    Ok(bytes)
}

#[test]
fn test_js_path() {
    assert_eq!(js_path(0), "/dev/input/js0");
    assert_eq!(js_path(12), "/dev/input/js12");
}

#[test]
fn test_read_events_in_order() -> Result<(), Box<dyn Error>> {
    let events = [
        Event {
            timestamp: 10,
            value: 1,
            kind_byte: 0x81,
            index: 0,
        },
        Event {
            timestamp: 20,
            value: -300,
            kind_byte: 0x02,
            index: 4,
        },
    ];
    let mut driver = Driver::from_source("test", Cursor::new(encode(&events)?));
    assert_eq!(driver.device(), "test");

    assert_eq!(driver.read_event()?, events[0]);
    let event = driver.read_event()?;
    assert_eq!(event, events[1]);
    assert_eq!(event.kind(), EventKind::Axis);

    assert!(driver.read_event().is_err(), "end of stream should be an error");

    Ok(())
}

#[test]
fn test_short_record_is_an_error() -> Result<(), Box<dyn Error>> {
    let mut bytes = encode(&[Event {
        timestamp: 1,
        value: 1,
        kind_byte: 0x01,
        index: 1,
    }])?;
    bytes.truncate(5);
    let mut driver = Driver::from_source("test", Cursor::new(bytes));
    assert!(driver.read_event().is_err());

    Ok(())
}

#[test]
fn test_open_missing_device_fails_after_retries() {
    let result = Driver::open(u32::MAX, 3, Duration::from_millis(1));
    assert!(result.is_err(), "should not open a missing joystick");
}
