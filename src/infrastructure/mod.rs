pub mod bluetooth;
#[cfg(windows)]
pub mod input_simulator;
pub mod logging;
