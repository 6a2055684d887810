// Actuator side of the runtime
//
// Provides:
// - The serial protocol for the servo controller board
// - The ActuatorDriver trait with serial and simulated backends
// - The task that drains the command handoff into a driver

mod driver;
pub mod protocol;

pub use driver::{ActuatorDriver, SerialServoDriver, SimulatedDriver, initialize, run_driver};
pub use protocol::{Easing, ServoBus, ServoError};
