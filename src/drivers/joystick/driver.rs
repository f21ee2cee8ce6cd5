use std::{
    fmt::Debug,
    fs::{self, File},
    io::{self, Read},
    os::fd::AsRawFd,
    path::Path,
    thread,
    time::Duration,
};

use super::{event::Event, js_event::JS_EVENT_SIZE};

/// Directory containing the joystick device nodes
pub const JS_DIR: &str = "/dev/input";
/// Prefix of every joystick device node (e.g. "js0")
pub const JS_PREFIX: &str = "js";

/// Size of the buffer used to query the device name
const NAME_LEN: usize = 64;

// JSIOCGNAME(len)
nix::ioctl_read_buf!(jsiocgname, b'j', 0x13, u8);

/// Returns the device path for the given joystick number (e.g. "/dev/input/js0")
pub fn js_path(number: u32) -> String {
    format!("{JS_DIR}/{JS_PREFIX}{number}")
}

/// Returns true if a joystick device node exists for the given number
pub fn available(number: u32) -> bool {
    Path::new(&js_path(number)).exists()
}

/// Returns the numbers of every joystick device node on the system, sorted
pub fn all_js_nums() -> Vec<u32> {
    let entries = match fs::read_dir(JS_DIR) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Unable to read {JS_DIR}: {e}");
            return vec![];
        }
    };

    let mut numbers: Vec<u32> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name();
            let name = name.to_str()?;
            name.strip_prefix(JS_PREFIX)?.parse().ok()
        })
        .collect();
    numbers.sort_unstable();
    numbers
}

/// Query the name the kernel reports for the given joystick using the
/// JSIOCGNAME ioctl.
pub fn device_name(number: u32) -> io::Result<String> {
    let file = File::open(js_path(number))?;
    let mut buf = [0u8; NAME_LEN];
    // SAFETY: the buffer outlives the call and its length is encoded in the
    // request, so the kernel never writes past it.
    unsafe { jsiocgname(file.as_raw_fd(), &mut buf) }.map_err(io::Error::from)?;

    let len = buf.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    String::from_utf8(buf[..len].to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Raw event source for a single joystick. Reads are blocking: a call to
/// [Driver::read_event] suspends until the kernel delivers a record or the
/// device goes away.
pub struct Driver {
    /// Human readable identifier of the source (usually the device path)
    device: String,
    source: Box<dyn Read + Send>,
}

impl Driver {
    /// Open the joystick with the given number, making up to `attempts`
    /// attempts separated by `backoff`. The error from the last attempt is
    /// returned if none succeed.
    pub fn open(number: u32, attempts: u32, backoff: Duration) -> io::Result<Self> {
        let path = js_path(number);
        let mut remaining = attempts.max(1);
        loop {
            match File::open(&path) {
                Ok(file) => {
                    log::debug!("Opened joystick device {path}");
                    return Ok(Self::from_source(path, file));
                }
                Err(e) => {
                    remaining -= 1;
                    if remaining == 0 {
                        return Err(e);
                    }
                    log::warn!("Unable to open {path}: {e}. Retrying in {backoff:?}");
                    thread::sleep(backoff);
                }
            }
        }
    }

    /// Create a driver reading records from an arbitrary byte stream
    pub fn from_source<S>(device: impl Into<String>, source: S) -> Self
    where
        S: Read + Send + 'static,
    {
        Self {
            device: device.into(),
            source: Box::new(source),
        }
    }

    /// Identifier of the underlying source
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Block until the next record is available and decode it. A short read
    /// or end of stream is reported as an error.
    pub fn read_event(&mut self) -> io::Result<Event> {
        let mut buf = [0u8; JS_EVENT_SIZE];
        self.source.read_exact(&mut buf)?;
        let event =
            Event::decode(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        log::trace!("{}: got event {event:?}", self.device);
        Ok(event)
    }
}

impl Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("device", &self.device)
            .finish()
    }
}
