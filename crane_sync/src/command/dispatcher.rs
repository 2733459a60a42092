//! Command routing to the motor controllers.
//!
//! Routing rule: `HaltAll` or an untargeted command goes to both
//! controllers, A first; a targeted command goes only to its crane.
//! Every dispatched command is appended to the audit history and then
//! forwarded to the command listener. Controllers always receive the
//! command before any listener runs.

use crane_common::command::Command;
use crane_common::motor::MotorController;
use crane_common::telemetry::CraneId;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use crate::clock::monotonic_ns;
use crate::listener::ListenerSlot;

/// Routes commands to the A and B controllers and keeps the audit trail.
pub struct CommandDispatcher {
    controllers: [Arc<dyn MotorController>; 2],
    history: Mutex<Vec<Command>>,
    listener: ListenerSlot<Command>,
}

impl CommandDispatcher {
    pub fn new(controller_a: Arc<dyn MotorController>, controller_b: Arc<dyn MotorController>) -> Self {
        Self {
            controllers: [controller_a, controller_b],
            history: Mutex::new(Vec::new()),
            listener: ListenerSlot::new(),
        }
    }

    /// Route, record and announce `command`.
    pub fn dispatch(&self, command: Command) {
        self.send(&command);
        self.finish(command);
    }

    /// Like [`dispatch`](Self::dispatch), returning the monotonic time at
    /// which both controllers had accepted the command.
    pub fn dispatch_timed(&self, command: Command) -> i64 {
        self.send(&command);
        let handed_over = monotonic_ns();
        self.finish(command);
        handed_over
    }

    /// Controllers `command` is routed to.
    pub fn route(command: &Command) -> impl Iterator<Item = CraneId> + '_ {
        CraneId::ALL.into_iter().filter(move |crane| command.targets(*crane))
    }

    /// Ordered copy of every command dispatched since the last clear.
    pub fn history(&self) -> Vec<Command> {
        self.history.lock().clone()
    }

    /// Forget the audit history.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Command listener slot.
    pub fn listener(&self) -> &ListenerSlot<Command> {
        &self.listener
    }

    fn send(&self, command: &Command) {
        for crane in Self::route(command) {
            trace!(%crane, %command, "sending command");
            self.controllers[crane.index()].send_command(command);
        }
    }

    fn finish(&self, command: Command) {
        self.history.lock().push(command);
        self.listener.notify(&command);
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("history_len", &self.history.lock().len())
            .field("listener", &self.listener)
            .finish()
    }
}
