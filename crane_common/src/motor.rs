//! # Motor Controller Trait
//!
//! Defines the actuator contract consumed by the interlock. Each crane unit
//! has its own controller; the interlock only ever hands commands over.
//!
//! # Contract
//!
//! - Delivery is fire-and-forget. Acknowledgement and retry belong to the
//!   implementation, never to the caller.
//! - Implementations must be safe to call concurrently from several threads
//!   and must tolerate receiving the same halt more than once.
//! - `send_command` must not block for longer than a hand-off; the halt path
//!   is timed from threshold crossing to return of this call.

use crate::command::Command;

/// Actuator endpoint for one crane unit.
///
/// # Example
///
/// ```rust
/// use crane_common::command::Command;
/// use crane_common::motor::MotorController;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct CountingMotor(AtomicUsize);
///
/// impl MotorController for CountingMotor {
///     fn send_command(&self, _command: &Command) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let motor = CountingMotor(AtomicUsize::new(0));
/// motor.send_command(&Command::halt_all());
/// assert_eq!(motor.0.load(Ordering::Relaxed), 1);
/// ```
pub trait MotorController: Send + Sync {
    /// Hand a command to the controller.
    fn send_command(&self, command: &Command);
}

impl<T: MotorController + ?Sized> MotorController for std::sync::Arc<T> {
    fn send_command(&self, command: &Command) {
        (**self).send_command(command)
    }
}
