use std::{
    collections::BTreeMap,
    error::Error,
    io::{self, Cursor, Read},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    drivers::joystick::{driver::Driver, event::Event},
    input::{
        dispatch::{Entity, InputEvent},
        error::GamepadError,
        gamepad::{Gamepad, SessionOptions},
        names::NameTable,
    },
};

const INIT_BUTTON: u8 = 0x81;
const INIT_AXIS: u8 = 0x82;
const BUTTON: u8 = 0x01;
const AXIS: u8 = 0x02;

fn record(timestamp: u32, value: i16, kind_byte: u8, index: u8) -> Vec<u8> {
    let event = Event {
        timestamp,
        value,
        kind_byte,
        index,
    };
    event.encode().unwrap().to_vec()
}

fn options() -> SessionOptions {
    SessionOptions {
        open_attempts: 1,
        open_backoff: Duration::from_millis(1),
        ready_poll_rate: Duration::from_millis(1),
    }
}

fn names() -> NameTable {
    NameTable::new(
        "Test Pad",
        BTreeMap::from([(0, "A".to_string()), (1, "B".to_string())]),
        BTreeMap::from([(0, "LEFT-X".to_string())]),
    )
    .unwrap()
}

/// Initial state of a pad with two buttons and one axis
fn init_records() -> Vec<Vec<u8>> {
    vec![
        record(0, 0, INIT_BUTTON, 0),
        record(0, 0, INIT_BUTTON, 1),
        record(0, 0, INIT_AXIS, 0),
    ]
}

fn gamepad_from_records(records: Vec<Vec<u8>>) -> Gamepad {
    let bytes = records.concat();
    let driver = Driver::from_source("test", Cursor::new(bytes));
    Gamepad::new(driver, names(), options())
}

/// Byte stream fed from a channel. Reads block until data is sent; dropping
/// the sender ends the stream.
struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
}

impl Read for ChannelSource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buf.is_empty() {
            match self.rx.recv() {
                Ok(bytes) => self.buf = bytes,
                Err(_) => return Ok(0),
            }
        }
        let len = out.len().min(self.buf.len());
        out[..len].copy_from_slice(&self.buf[..len]);
        self.buf.drain(..len);
        Ok(len)
    }
}

fn channel_gamepad() -> (Sender<Vec<u8>>, Gamepad) {
    let (tx, rx) = mpsc::channel();
    let source = ChannelSource { rx, buf: vec![] };
    let driver = Driver::from_source("channel", source);
    (tx, Gamepad::new(driver, names(), options()))
}

/// Start the updater and wait until the whole initial state was applied
fn start_with_initial_state(
    tx: &Sender<Vec<u8>>,
    gamepad: &Gamepad,
) -> Result<(), Box<dyn Error>> {
    for record in init_records() {
        tx.send(record)?;
    }
    tx.send(record(5, 0, BUTTON, 0))?;
    gamepad.start_background_updates(true)?;
    assert!(wait_until(|| gamepad.consume_was_released("A").unwrap_or(false)));
    Ok(())
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_next_event_skips_initial_state() -> Result<(), Box<dyn Error>> {
    let mut records = init_records();
    records.push(record(120, 1, BUTTON, 1));
    let gamepad = gamepad_from_records(records);

    let event = gamepad.next_event(true)?;
    assert_eq!(
        event,
        InputEvent::Button {
            timestamp: 120,
            button: Entity::Name("B".to_string()),
            pressed: true,
            init: false,
        }
    );
    // The skipped events were still applied
    assert!(gamepad.is_ready());
    assert_eq!(gamepad.axis("LEFT-X")?, 0.0);
    assert!(gamepad.is_pressed("B")?);
    assert_eq!(gamepad.last_timestamp(), 120);

    Ok(())
}

#[test]
fn test_next_event_returns_initial_state() -> Result<(), Box<dyn Error>> {
    let gamepad = gamepad_from_records(init_records());

    let event = gamepad.next_event(false)?;
    assert!(event.is_init());
    assert_eq!(event.entity(), Some(&Entity::Name("A".to_string())));
    let event = gamepad.next_event(false)?;
    assert_eq!(event.entity(), Some(&Entity::Name("B".to_string())));
    let event = gamepad.next_event(false)?;
    assert_eq!(event.entity(), Some(&Entity::Name("LEFT-X".to_string())));

    Ok(())
}

#[test]
fn test_skip_after_unknown_event() -> Result<(), Box<dyn Error>> {
    let records = vec![
        record(0, 5, 0x04, 0),
        record(0, 1, INIT_BUTTON, 0),
        record(10, 0, BUTTON, 0),
    ];
    let gamepad = gamepad_from_records(records);

    // Once something was skipped, initial events are skipped too
    let event = gamepad.next_event(false)?;
    assert_eq!(event.timestamp(), 10);
    assert!(!event.is_init());

    Ok(())
}

#[test]
fn test_axis_position() -> Result<(), Box<dyn Error>> {
    let mut records = init_records();
    records.push(record(50, -16384, AXIS, 0));
    let gamepad = gamepad_from_records(records);

    let event = gamepad.next_event(true)?;
    let InputEvent::Axis { axis, position, .. } = event else {
        panic!("expected an axis event, got {event:?}");
    };
    assert_eq!(axis, Entity::Name("LEFT-X".to_string()));
    assert_eq!(position, -16384.0 / 32767.0);
    assert_eq!(gamepad.axis("0")?, position);

    Ok(())
}

#[test]
fn test_unknown_controls() -> Result<(), Box<dyn Error>> {
    let gamepad = gamepad_from_records(init_records());
    gamepad.wait_ready()?;

    let err = gamepad.is_pressed("START").unwrap_err();
    assert!(matches!(err, GamepadError::UnknownControl { .. }));
    let err = gamepad.axis("A").unwrap_err();
    assert!(matches!(err, GamepadError::UnknownControl { .. }));
    let err = gamepad.add_button_pressed_handler("X", || {}).unwrap_err();
    assert!(matches!(err, GamepadError::UnknownControl { .. }));

    Ok(())
}

#[test]
fn test_edge_flags() -> Result<(), Box<dyn Error>> {
    let mut records = init_records();
    records.push(record(10, 1, BUTTON, 0));
    records.push(record(20, 0, BUTTON, 0));
    let gamepad = gamepad_from_records(records);

    gamepad.next_event(true)?;
    gamepad.next_event(true)?;
    assert!(!gamepad.is_pressed("A")?);
    assert!(gamepad.consume_was_pressed("A")?);
    assert!(!gamepad.consume_was_pressed("A")?);
    assert!(gamepad.consume_was_released("A")?);
    assert!(!gamepad.consume_was_released("A")?);

    Ok(())
}

#[test]
fn test_pull_mode_callbacks() -> Result<(), Box<dyn Error>> {
    let mut records = init_records();
    records.push(record(10, 1, BUTTON, 0));
    records.push(record(20, 0, BUTTON, 0));
    records.push(record(30, 1, BUTTON, 0));
    let gamepad = gamepad_from_records(records);
    gamepad.wait_ready()?;
    gamepad.update_state()?;
    gamepad.update_state()?;
    gamepad.update_state()?;

    let presses = Arc::new(AtomicUsize::new(0));
    let counter = presses.clone();
    let id = gamepad.add_button_pressed_handler("A", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;
    gamepad.next_event(true)?;
    assert_eq!(presses.load(Ordering::SeqCst), 1);

    assert!(gamepad.remove_button_pressed_handler("A", id)?);
    assert!(!gamepad.remove_button_pressed_handler("A", id)?);

    Ok(())
}

#[test]
fn test_end_of_stream_disconnects() -> Result<(), Box<dyn Error>> {
    let gamepad = gamepad_from_records(init_records());
    gamepad.wait_ready()?;
    gamepad.update_state()?;
    assert!(gamepad.is_connected());

    let err = gamepad.next_event(true).unwrap_err();
    assert!(err.is_disconnected());
    assert!(!gamepad.is_connected());

    let err = gamepad.update_state().unwrap_err();
    assert!(err.is_disconnected());
    let err = gamepad.start_background_updates(false).unwrap_err();
    assert!(err.is_disconnected());

    Ok(())
}

#[test]
fn test_disconnect() -> Result<(), Box<dyn Error>> {
    let mut records = init_records();
    records.push(record(10, 1, BUTTON, 0));
    let gamepad = gamepad_from_records(records);
    gamepad.wait_ready()?;
    gamepad.add_button_pressed_handler("A", || panic!("handler must be removed"))?;

    gamepad.disconnect();
    assert!(!gamepad.is_connected());
    let err = gamepad.next_event(true).unwrap_err();
    assert!(err.is_disconnected());

    // State queries keep working on the last observed values
    assert!(!gamepad.is_pressed("A")?);

    gamepad.disconnect();
    assert!(!gamepad.is_connected());

    Ok(())
}

#[test]
fn test_wait_ready_on_short_stream() {
    let gamepad = gamepad_from_records(vec![record(0, 0, INIT_BUTTON, 0)]);

    let err = gamepad.wait_ready().unwrap_err();
    assert!(err.is_disconnected());
    assert!(!gamepad.is_ready());
}

#[test]
fn test_background_updates() -> Result<(), Box<dyn Error>> {
    let (tx, gamepad) = channel_gamepad();
    start_with_initial_state(&tx, &gamepad)?;
    assert!(gamepad.is_ready());
    assert!(gamepad.is_background_running());
    assert_eq!(
        gamepad.known_buttons(),
        vec![Entity::Name("A".to_string()), Entity::Name("B".to_string())]
    );

    let positions = Arc::new(std::sync::Mutex::new(vec![]));
    let moved = positions.clone();
    gamepad.add_axis_moved_handler("LEFT-X", move |position| {
        moved.lock().unwrap().push(position);
    })?;
    tx.send(record(10, 32767, AXIS, 0))?;
    assert!(wait_until(|| !positions.lock().unwrap().is_empty()));
    assert_eq!(*positions.lock().unwrap(), vec![1.0]);

    // Pull mode is unavailable while the updater runs
    let err = gamepad.next_event(false).unwrap_err();
    assert!(matches!(err, GamepadError::AlreadyRunning));
    let err = gamepad.update_state().unwrap_err();
    assert!(matches!(err, GamepadError::AlreadyRunning));

    drop(tx);
    assert!(wait_until(|| !gamepad.is_connected()));
    assert!(wait_until(|| !gamepad.is_background_running()));

    Ok(())
}

#[test]
fn test_start_twice() -> Result<(), Box<dyn Error>> {
    let (tx, gamepad) = channel_gamepad();
    start_with_initial_state(&tx, &gamepad)?;

    let err = gamepad.start_background_updates(false).unwrap_err();
    assert!(matches!(err, GamepadError::AlreadyRunning));
    assert!(gamepad.is_background_running());

    // The first updater keeps working
    tx.send(record(10, 1, BUTTON, 1))?;
    assert!(wait_until(|| gamepad.is_pressed("B").unwrap_or(false)));

    Ok(())
}

#[test]
fn test_stop_processes_one_more_event() -> Result<(), Box<dyn Error>> {
    let (tx, gamepad) = channel_gamepad();
    start_with_initial_state(&tx, &gamepad)?;

    let presses = Arc::new(AtomicUsize::new(0));
    let counter = presses.clone();
    gamepad.add_button_pressed_handler("A", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;

    gamepad.stop_background_updates();
    assert!(!gamepad.is_background_running());

    // The updater is blocked on a read and handles the next event before
    // noticing the stop request
    tx.send(record(10, 1, BUTTON, 0))?;
    assert!(wait_until(|| presses.load(Ordering::SeqCst) == 1));

    tx.send(record(20, 0, BUTTON, 0))?;
    let event = gamepad.next_event(true)?;
    assert_eq!(event.timestamp(), 20);
    assert_eq!(presses.load(Ordering::SeqCst), 1);

    // Pull mode can hand over to a new updater
    gamepad.start_background_updates(false)?;
    assert!(gamepad.is_background_running());

    Ok(())
}

#[test]
fn test_disconnect_stops_background_updates() -> Result<(), Box<dyn Error>> {
    let (tx, gamepad) = channel_gamepad();
    start_with_initial_state(&tx, &gamepad)?;
    gamepad.add_button_changed_handler("A", |_| panic!("handler must be removed"))?;

    gamepad.disconnect();
    assert!(!gamepad.is_connected());

    // Wake the blocked updater so it can release the device
    tx.send(record(10, 1, BUTTON, 0))?;
    assert!(wait_until(|| !gamepad.is_background_running()));
    assert!(!gamepad.is_pressed("A")?);

    Ok(())
}

#[test]
fn test_controls_without_initial_state_stay_unknown() -> Result<(), Box<dyn Error>> {
    let records = vec![record(10, 1, BUTTON, 7), record(20, 100, AXIS, 3)];
    let gamepad = gamepad_from_records(records);

    let event = gamepad.next_event(true)?;
    assert_eq!(event.entity(), Some(&Entity::Index(7)));
    gamepad.next_event(true)?;

    let err = gamepad.is_pressed("7").unwrap_err();
    assert!(matches!(err, GamepadError::UnknownControl { .. }));
    let err = gamepad.axis("3").unwrap_err();
    assert!(matches!(err, GamepadError::UnknownControl { .. }));
    assert!(!gamepad.is_ready());
    assert!(gamepad.known_buttons().is_empty());

    Ok(())
}

#[test]
fn test_reader_after_stop_keeps_event_order() -> Result<(), Box<dyn Error>> {
    let (tx, gamepad) = channel_gamepad();
    start_with_initial_state(&tx, &gamepad)?;

    let changes = Arc::new(std::sync::Mutex::new(vec![]));
    let changed = changes.clone();
    gamepad.add_button_changed_handler("A", move |pressed| {
        // Widen the window in which a second reader could overtake
        thread::sleep(Duration::from_millis(20));
        changed.lock().unwrap().push(pressed);
    })?;

    // The stopped updater is still blocked on its read
    gamepad.stop_background_updates();
    let gamepad = Arc::new(gamepad);
    let reader = {
        let gamepad = gamepad.clone();
        thread::spawn(move || gamepad.next_event(true))
    };

    tx.send(record(10, 1, BUTTON, 0))?;
    tx.send(record(20, 0, BUTTON, 0))?;
    let event = reader.join().unwrap()?;
    if event.timestamp() == 10 {
        // The updater had already exited, so both records are ours
        gamepad.next_event(true)?;
    }
    assert!(wait_until(|| changes.lock().unwrap().len() == 2));
    assert_eq!(*changes.lock().unwrap(), vec![true, false]);

    Ok(())
}
