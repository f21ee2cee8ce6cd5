pub mod driver;
#[cfg(test)]
pub mod driver_test;
pub mod event;
pub mod js_event;
#[cfg(test)]
pub mod js_event_test;
