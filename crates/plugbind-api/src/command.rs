//! Named actions driven by host phase events.
//!
//! A [`Command`] attaches a handler to a named host action for as long as
//! the `Command` value lives. The host drives it with `Begin`, any number of
//! `Continue`, then `End`; each event reaches the handler through a small
//! state machine:
//!
//! ```text
//!   Idle --Begin--> InPhase --Continue--> InPhase --End--> Idle
//! ```
//!
//! Events that arrive out of order are tolerated and recorded as protocol
//! violations, since the host's dispatch order is outside our control.

use crate::context::{ClaimKind, PluginContext, Registration};
use crate::diagnostics::Diagnostics;
use crate::host::{HostHandle, Outcome, Phase, PhaseCallback};
use plugbind_runtime::{BindingError, BindingResult};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use tracing::{debug, info};

/// Where an action is in its phase lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    InPhase,
}

/// Plugin logic run for each phase of an action.
pub trait CommandHandler: Send {
    fn handle(&mut self, phase: Phase) -> Outcome;
}

impl<F> CommandHandler for F
where
    F: FnMut(Phase) -> Outcome + Send,
{
    fn handle(&mut self, phase: Phase) -> Outcome {
        self(phase)
    }
}

struct Dispatcher {
    name: String,
    state: ActionState,
    handler: Box<dyn CommandHandler>,
}

impl Dispatcher {
    fn dispatch(&mut self, phase: Phase, diagnostics: &Diagnostics) -> Outcome {
        match (self.state, phase) {
            (ActionState::Idle, Phase::Begin) => {
                self.state = ActionState::InPhase;
                self.handler.handle(phase)
            }
            (ActionState::InPhase, Phase::Continue) => self.handler.handle(phase),
            (ActionState::InPhase, Phase::End) => {
                self.state = ActionState::Idle;
                self.handler.handle(phase)
            }
            (ActionState::InPhase, Phase::Begin) => {
                self.violation(diagnostics, "begin while already in phase, restarting");
                self.handler.handle(phase)
            }
            (ActionState::Idle, Phase::Continue | Phase::End) => {
                self.violation(diagnostics, &format!("{:?} while idle, ignored", phase));
                Outcome::Pass
            }
        }
    }

    fn violation(&self, diagnostics: &Diagnostics, detail: &str) {
        diagnostics.report(&BindingError::ProtocolViolation {
            action: self.name.clone(),
            detail: detail.to_string(),
        });
    }
}

/// A handler attached to a named host action.
///
/// Registration lives exactly as long as this value.
pub struct Command {
    // Drops first: the host stops calling before the dispatcher is freed.
    registration: Registration,
    name: String,
    description: String,
    call_before: bool,
    dispatcher: Arc<Mutex<Dispatcher>>,
}

impl Command {
    /// Attach `handler` to the action `name`.
    ///
    /// With `call_before`, the handler sees each phase before the host's
    /// default handling and may consume it; otherwise it runs after.
    /// Fails if this plugin already has a live command under `name`.
    pub fn new(
        ctx: &PluginContext,
        name: &str,
        description: &str,
        call_before: bool,
        handler: impl CommandHandler + 'static,
    ) -> BindingResult<Self> {
        let claim = ctx.claim(ClaimKind::Action, name)?;
        let dispatcher = Arc::new(Mutex::new(Dispatcher {
            name: name.to_string(),
            state: ActionState::Idle,
            handler: Box::new(handler),
        }));

        let callback = phase_callback(ctx.clone(), name.to_string(), Arc::downgrade(&dispatcher));
        let handle = ctx
            .host()
            .register_action(name, description, call_before, callback)?;
        info!(action = name, %handle, call_before, "Command registered");

        Ok(Self {
            registration: Registration::new(ctx.host_arc(), handle, claim),
            name: name.to_string(),
            description: description.to_string(),
            call_before,
            dispatcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn call_before(&self) -> bool {
        self.call_before
    }

    /// Handle the host issued for this registration.
    pub fn handle(&self) -> HostHandle {
        self.registration.handle()
    }

    /// Current phase state.
    pub fn state(&self) -> ActionState {
        lock(&self.dispatcher).state
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("call_before", &self.call_before)
            .field("handle", &self.registration.handle())
            .finish()
    }
}

fn lock(dispatcher: &Mutex<Dispatcher>) -> MutexGuard<'_, Dispatcher> {
    dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
}

fn phase_callback(
    ctx: PluginContext,
    name: String,
    dispatcher: Weak<Mutex<Dispatcher>>,
) -> PhaseCallback {
    Arc::new(move |handle: HostHandle, phase: Phase, call_before: bool| {
        let Some(dispatcher) = dispatcher.upgrade() else {
            return Outcome::Pass;
        };
        debug!(action = %name, %handle, ?phase, call_before, "Phase event");

        let mut guard = match dispatcher.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                // Handler is running and the host re-entered the same action.
                ctx.diagnostics().report(&BindingError::ProtocolViolation {
                    action: name.clone(),
                    detail: format!("re-entrant {:?} while handler is running", phase),
                });
                return Outcome::Pass;
            }
        };
        guard.dispatch(phase, ctx.diagnostics())
    })
}
