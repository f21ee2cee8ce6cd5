//! A joystick session: owns the raw event source, the state store and the
//! callback registry, and drives dispatch either from the caller (pull mode)
//! or from a background updater thread (push mode).
use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, TryLockError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::drivers::joystick::{
    driver::{js_path, Driver},
    event::Event,
};

use super::{
    callbacks::{CallbackRegistry, HandlerId},
    dispatch::{self, Entity, InputEvent},
    error::GamepadError,
    lock,
    names::NameTable,
    state::InputState,
};

/// Number of attempts made to open a device
pub const OPEN_ATTEMPTS: u32 = 5;
/// Delay between attempts to open a device
pub const OPEN_BACKOFF: Duration = Duration::from_millis(500);
/// How often readiness is polled while waiting for the device
pub const READY_POLL_RATE: Duration = Duration::from_secs(1);

/// Timing options for a [Gamepad] session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub open_attempts: u32,
    pub open_backoff: Duration,
    pub ready_poll_rate: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            open_attempts: OPEN_ATTEMPTS,
            open_backoff: OPEN_BACKOFF,
            ready_poll_rate: READY_POLL_RATE,
        }
    }
}

/// Session state shared with the updater thread
struct Shared {
    device: String,
    source: Mutex<Option<Driver>>,
    /// Held across read and dispatch so that events are applied in the
    /// order they were read, even while a stopped updater finishes its
    /// last read.
    reading: Mutex<()>,
    state: Mutex<InputState>,
    callbacks: Mutex<CallbackRegistry>,
    connected: AtomicBool,
}

impl Shared {
    fn disconnected(&self, reason: impl Into<String>) -> GamepadError {
        GamepadError::Disconnected {
            device: self.device.clone(),
            reason: reason.into(),
        }
    }

    /// Block until the next record arrives. The first failure marks the
    /// session disconnected; after that no I/O is attempted.
    fn read_event(&self) -> Result<Event, GamepadError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(self.disconnected("gamepad has been disconnected"));
        }

        let mut source = lock(&self.source);
        let Some(driver) = source.as_mut() else {
            self.connected.store(false, Ordering::SeqCst);
            return Err(self.disconnected("device is closed"));
        };

        let result = driver.read_event();

        // The session may have been disconnected while the read was blocked.
        // Release the handle here since disconnect could not take it.
        if !self.connected.load(Ordering::SeqCst) {
            source.take();
            return Err(self.disconnected("gamepad has been disconnected"));
        }

        match result {
            Ok(event) => Ok(event),
            Err(e) => {
                log::warn!("Gamepad {} disconnected: {e}", self.device);
                self.connected.store(false, Ordering::SeqCst);
                source.take();
                Err(self.disconnected(e.to_string()))
            }
        }
    }

    /// Read and apply one record
    fn next_applied(&self) -> Result<InputEvent, GamepadError> {
        let _reading = lock(&self.reading);
        let event = self.read_event()?;
        Ok(dispatch::apply(&event, &self.state, &self.callbacks))
    }

    /// Read and apply one record, discarding the result
    fn update_state(&self) -> Result<(), GamepadError> {
        self.next_applied().map(|_| ())
    }

    fn is_ready(&self) -> bool {
        lock(&self.state).is_ready()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Handle to a running updater thread. Stopping is cooperative: the flag is
/// only checked after the in-flight blocking read returns, so one more event
/// may be processed after [UpdateThread::stop].
struct UpdateThread {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl UpdateThread {
    fn spawn(shared: Arc<Shared>) -> Result<Self, GamepadError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let name = format!("jsplumber-{}", shared.device);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                log::debug!("Started background updates for {}", shared.device);
                while flag.load(Ordering::SeqCst) {
                    if let Err(e) = shared.update_state() {
                        // Read failures end the loop; the session reports
                        // them through its connected flag.
                        log::debug!("Stopping background updates: {e}");
                        break;
                    }
                }
                flag.store(false, Ordering::SeqCst);
                log::debug!("Background updates stopped for {}", shared.device);
            })
            .map_err(GamepadError::Spawn)?;

        Ok(Self { running, handle })
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Named access to the buttons and axes of a single joystick.
///
/// Events are consumed either by calling [Gamepad::next_event] (pull mode) or
/// by [Gamepad::start_background_updates] (push mode), never both at once.
/// All methods take `&self`, so a session can be shared behind an [Arc] with
/// callbacks that use it. Callbacks must not read events themselves
/// ([Gamepad::next_event], [Gamepad::update_state], [Gamepad::wait_ready]).
pub struct Gamepad {
    shared: Arc<Shared>,
    options: SessionOptions,
    update_thread: Mutex<Option<UpdateThread>>,
}

impl Gamepad {
    /// Open the joystick with the given number using the default options
    pub fn open(number: u32, names: NameTable) -> Result<Self, GamepadError> {
        Self::open_with_options(number, names, SessionOptions::default())
    }

    /// Open the joystick with the given number, retrying as configured
    pub fn open_with_options(
        number: u32,
        names: NameTable,
        options: SessionOptions,
    ) -> Result<Self, GamepadError> {
        let driver = Driver::open(number, options.open_attempts, options.open_backoff)
            .map_err(|source| GamepadError::Open {
                device: js_path(number),
                source,
            })?;
        Ok(Self::new(driver, names, options))
    }

    /// Create a session around an already opened driver
    pub fn new(driver: Driver, names: NameTable, options: SessionOptions) -> Self {
        log::debug!(
            "Creating {} session for {}",
            names.full_name(),
            driver.device()
        );
        let shared = Shared {
            device: driver.device().to_string(),
            source: Mutex::new(Some(driver)),
            reading: Mutex::new(()),
            state: Mutex::new(InputState::new(names)),
            callbacks: Mutex::new(CallbackRegistry::new()),
            connected: AtomicBool::new(true),
        };

        Self {
            shared: Arc::new(shared),
            options,
            update_thread: Mutex::new(None),
        }
    }

    /// Identifier of the underlying device (usually its path)
    pub fn device(&self) -> &str {
        self.shared.device.as_str()
    }

    /// Human readable name of the controller model
    pub fn full_name(&self) -> String {
        lock(&self.shared.state).names().full_name().to_string()
    }

    /// Returns the next event from the device, blocking until one arrives.
    ///
    /// Unknown events are always skipped. When `skip_initial` is true the
    /// initial state replayed on open is applied but not returned. Once an
    /// event has been skipped, initial events are skipped for the rest of the
    /// call.
    pub fn next_event(&self, skip_initial: bool) -> Result<InputEvent, GamepadError> {
        if self.is_background_running() {
            return Err(GamepadError::AlreadyRunning);
        }

        let mut skip_initial = skip_initial;
        loop {
            let event = self.shared.next_applied()?;
            let skip = match event {
                InputEvent::Unknown { .. } => true,
                _ => skip_initial && event.is_init(),
            };
            if !skip {
                return Ok(event);
            }
            skip_initial = true;
        }
    }

    /// Read and apply the next event without returning it. Blocks until an
    /// event arrives.
    pub fn update_state(&self) -> Result<(), GamepadError> {
        if self.is_background_running() {
            return Err(GamepadError::AlreadyRunning);
        }
        self.shared.update_state()
    }

    /// Start a background thread that keeps the state updated and fires
    /// callbacks. When `wait_for_ready` is true, blocks until the device
    /// [is ready](Gamepad::is_ready) or disconnects.
    ///
    /// Fails with [GamepadError::AlreadyRunning] if an updater is already
    /// running; the running updater is left untouched.
    pub fn start_background_updates(&self, wait_for_ready: bool) -> Result<(), GamepadError> {
        if !self.shared.is_connected() {
            return Err(self.shared.disconnected("gamepad has been disconnected"));
        }

        {
            let mut update_thread = lock(&self.update_thread);
            if update_thread.as_ref().is_some_and(UpdateThread::is_running) {
                return Err(GamepadError::AlreadyRunning);
            }
            *update_thread = Some(UpdateThread::spawn(self.shared.clone())?);
        }

        if wait_for_ready {
            while !self.shared.is_ready() && self.shared.is_connected() {
                thread::sleep(self.options.ready_poll_rate);
            }
        }

        Ok(())
    }

    /// Ask the background updater to stop. It stops after the next event
    /// arrives. Safe to call when no updater is running.
    pub fn stop_background_updates(&self) {
        if let Some(update_thread) = lock(&self.update_thread).as_ref() {
            log::debug!("Stopping background updates for {}", self.device());
            update_thread.stop();
        }
    }

    /// Returns true while a background updater is running
    pub fn is_background_running(&self) -> bool {
        lock(&self.update_thread)
            .as_ref()
            .is_some_and(UpdateThread::is_running)
    }

    /// Returns true once the device has reported more than one control
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    /// Block until [Gamepad::is_ready] holds. Without a background updater
    /// this drives the updates itself.
    pub fn wait_ready(&self) -> Result<(), GamepadError> {
        if self.is_background_running() {
            while !self.shared.is_ready() && self.shared.is_connected() {
                thread::sleep(self.options.ready_poll_rate);
            }
            if !self.shared.is_connected() {
                return Err(self.shared.disconnected("gamepad has been disconnected"));
            }
            return Ok(());
        }

        self.shared.update_state()?;
        while !self.shared.is_ready() {
            thread::sleep(self.options.ready_poll_rate);
            self.shared.update_state()?;
        }
        Ok(())
    }

    /// Last observed state of a button by name or index
    pub fn is_pressed(&self, name: &str) -> Result<bool, GamepadError> {
        lock(&self.shared.state).is_pressed(name)
    }

    /// Last observed position of an axis by name or index
    pub fn axis(&self, name: &str) -> Result<f64, GamepadError> {
        lock(&self.shared.state).axis(name)
    }

    /// Returns true if the button was pressed since the last call
    pub fn consume_was_pressed(&self, name: &str) -> Result<bool, GamepadError> {
        lock(&self.shared.state).consume_was_pressed(name)
    }

    /// Returns true if the button was released since the last call
    pub fn consume_was_released(&self, name: &str) -> Result<bool, GamepadError> {
        lock(&self.shared.state).consume_was_released(name)
    }

    /// Button names provided by the name table. Empty if there is no mapping.
    pub fn available_button_names(&self) -> Vec<String> {
        lock(&self.shared.state).names().button_names()
    }

    /// Axis names provided by the name table. Empty if there is no mapping.
    pub fn available_axis_names(&self) -> Vec<String> {
        lock(&self.shared.state).names().axis_names()
    }

    /// Every button the device has reported so far
    pub fn known_buttons(&self) -> Vec<Entity> {
        let state = lock(&self.shared.state);
        state
            .known_buttons()
            .into_iter()
            .map(|index| state.button_entity(index))
            .collect()
    }

    /// Every axis the device has reported so far
    pub fn known_axes(&self) -> Vec<Entity> {
        let state = lock(&self.shared.state);
        state
            .known_axes()
            .into_iter()
            .map(|index| state.axis_entity(index))
            .collect()
    }

    /// Timestamp in milliseconds of the last record read
    pub fn last_timestamp(&self) -> u32 {
        lock(&self.shared.state).last_timestamp()
    }

    /// Returns true until reading from the device fails or the session is
    /// disconnected.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Call `handler` whenever the given button is pressed
    pub fn add_button_pressed_handler<F>(
        &self,
        name: &str,
        handler: F,
    ) -> Result<HandlerId, GamepadError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).add_pressed(index, Arc::new(handler)))
    }

    /// Remove a pressed handler. Returns false if it was not subscribed.
    pub fn remove_button_pressed_handler(
        &self,
        name: &str,
        id: HandlerId,
    ) -> Result<bool, GamepadError> {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).remove_pressed(index, id))
    }

    /// Call `handler` whenever the given button is released
    pub fn add_button_released_handler<F>(
        &self,
        name: &str,
        handler: F,
    ) -> Result<HandlerId, GamepadError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).add_released(index, Arc::new(handler)))
    }

    /// Remove a released handler. Returns false if it was not subscribed.
    pub fn remove_button_released_handler(
        &self,
        name: &str,
        id: HandlerId,
    ) -> Result<bool, GamepadError> {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).remove_released(index, id))
    }

    /// Call `handler` with the new state whenever the given button changes
    pub fn add_button_changed_handler<F>(
        &self,
        name: &str,
        handler: F,
    ) -> Result<HandlerId, GamepadError>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).add_changed(index, Arc::new(handler)))
    }

    /// Remove a changed handler. Returns false if it was not subscribed.
    pub fn remove_button_changed_handler(
        &self,
        name: &str,
        id: HandlerId,
    ) -> Result<bool, GamepadError> {
        let index = lock(&self.shared.state).button_index(name)?;
        Ok(lock(&self.shared.callbacks).remove_changed(index, id))
    }

    /// Call `handler` with the new position whenever the given axis moves
    pub fn add_axis_moved_handler<F>(&self, name: &str, handler: F) -> Result<HandlerId, GamepadError>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let index = lock(&self.shared.state).axis_index(name)?;
        Ok(lock(&self.shared.callbacks).add_moved(index, Arc::new(handler)))
    }

    /// Remove a moved handler. Returns false if it was not subscribed.
    pub fn remove_axis_moved_handler(
        &self,
        name: &str,
        id: HandlerId,
    ) -> Result<bool, GamepadError> {
        let index = lock(&self.shared.state).axis_index(name)?;
        Ok(lock(&self.shared.callbacks).remove_moved(index, id))
    }

    /// Remove every handler from every button and axis
    pub fn remove_all_event_handlers(&self) {
        lock(&self.shared.callbacks).clear();
    }

    /// Disconnect the session: clear every handler, stop the background
    /// updater and release the device. Calling this more than once is a
    /// no-op.
    pub fn disconnect(&self) {
        let was_connected = self.shared.connected.swap(false, Ordering::SeqCst);
        self.remove_all_event_handlers();
        self.stop_background_updates();

        // A reader blocked on the device holds the source; it releases the
        // handle itself once the read returns.
        match self.shared.source.try_lock() {
            Ok(mut source) => {
                source.take();
            }
            Err(TryLockError::Poisoned(e)) => {
                e.into_inner().take();
            }
            Err(TryLockError::WouldBlock) => {
                log::debug!("Device {} is busy; release deferred to reader", self.device());
            }
        }

        if was_connected {
            log::debug!("Disconnected gamepad {}", self.device());
        }
    }
}

impl Drop for Gamepad {
    fn drop(&mut self) {
        self.stop_background_updates();
    }
}

impl Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device", &self.shared.device)
            .field("connected", &self.is_connected())
            .field("options", &self.options)
            .finish()
    }
}
