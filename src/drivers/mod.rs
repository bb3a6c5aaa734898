//! Platform threading helpers.

pub mod task_pin;
