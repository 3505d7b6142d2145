//! Background work driven by policy timers.

pub(crate) mod collector;
