//! Button action state machine.
//!
//! Per button id: `Idle -> Loading -> Success -> Idle`. Only a click moves a
//! button into `Loading`; a click while `Loading` is ignored, so at most one
//! handler per id is ever in flight. `Success` reverts to `Idle` on its own
//! after the configured dwell. A failing handler reverts to `Idle` at once and
//! its error is handed back to the caller.
//!
//! The auto-revert is a per-button tokio task. It is aborted whenever the
//! button transitions again and additionally checks a generation counter, so
//! a stale timer can never knock a newer `Loading` back to `Idle`.
//!
//! State changes can be observed through an unbounded channel of
//! [`ButtonEvent`]s, the same way background tasks report their lifecycle to
//! the UI loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::field::ButtonAction;
use crate::values::{FormErrors, FormValues};

/// Stable identifier of a button within one form instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(String);

impl ButtonId {
    pub fn new(id: impl Into<String>) -> Self {
        ButtonId(id.into())
    }

    /// Id for a button declared without one: `<section>:<field>:<ACTION>`.
    pub fn derived(section: usize, field: usize, action: ButtonAction) -> Self {
        ButtonId(format!("{section}:{field}:{action}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    #[default]
    Idle,
    Loading,
    Success,
}

/// Published on every state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    pub id: ButtonId,
    pub state: ButtonState,
}

/// Which fields a validation pass should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    Form,
    Section(usize),
}

/// Outcome of a validation pass: optionally transformed values on success,
/// per-field messages on failure.
pub type Validation = Result<Option<FormValues>, FormErrors>;

/// Caller-supplied async hooks. Only `validate` is required.
pub trait FormHandlers: Send + Sync {
    fn validate<'a>(
        &'a self,
        values: &'a FormValues,
        scope: ValidationScope,
    ) -> BoxFuture<'a, Validation>;

    fn on_next<'a>(&'a self, _values: &'a FormValues) -> BoxFuture<'a, anyhow::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn on_previous(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn on_submit<'a>(&'a self, _values: &'a FormValues) -> BoxFuture<'a, anyhow::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn on_custom<'a>(
        &'a self,
        _id: &'a ButtonId,
        _values: &'a FormValues,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        async { Ok(()) }.boxed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The button was already loading.
    Ignored,
    /// Validation failed; the handler was not called.
    Invalid(FormErrors),
    Completed,
}

#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub success_dwell: Duration,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            success_dwell: Duration::from_secs(3),
        }
    }
}

#[derive(Default)]
struct Slot {
    state: ButtonState,
    generation: u64,
    revert: Option<JoinHandle<()>>,
}

struct Inner {
    slots: Mutex<HashMap<ButtonId, Slot>>,
    config: ActionConfig,
    events: Option<mpsc::UnboundedSender<ButtonEvent>>,
}

impl Inner {
    fn slots(&self) -> MutexGuard<'_, HashMap<ButtonId, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, id: &ButtonId, state: ButtonState) {
        debug!(button = %id, ?state, "button state");
        if let Some(tx) = &self.events {
            let _ = tx.send(ButtonEvent {
                id: id.clone(),
                state,
            });
        }
    }

    fn expire(&self, id: &ButtonId, generation: u64) {
        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(id) {
            if slot.generation == generation && slot.state == ButtonState::Success {
                slot.state = ButtonState::Idle;
                slot.revert = None;
                self.emit(id, ButtonState::Idle);
            }
        }
    }
}

/// Per-button runtime state of one form instance. Cheap to clone; clones
/// share state.
#[derive(Clone)]
pub struct ActionMachine {
    inner: Arc<Inner>,
}

impl Default for ActionMachine {
    fn default() -> Self {
        Self::new(ActionConfig::default())
    }
}

impl ActionMachine {
    pub fn new(config: ActionConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_events(config: ActionConfig, events: mpsc::UnboundedSender<ButtonEvent>) -> Self {
        Self::build(config, Some(events))
    }

    fn build(config: ActionConfig, events: Option<mpsc::UnboundedSender<ButtonEvent>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                config,
                events,
            }),
        }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.inner.config
    }

    /// Current state; buttons never clicked are idle.
    pub fn state(&self, id: &ButtonId) -> ButtonState {
        self.inner
            .slots()
            .get(id)
            .map(|slot| slot.state)
            .unwrap_or_default()
    }

    /// True while any button has a handler in flight.
    pub fn any_pending(&self) -> bool {
        self.inner
            .slots()
            .values()
            .any(|slot| slot.state == ButtonState::Loading)
    }

    /// Run the action behind `id`.
    ///
    /// `Next` and `Submit` validate first and only call their handler when
    /// validation passes (with the transformed values, if any).
    pub async fn click<H>(
        &self,
        id: &ButtonId,
        action: ButtonAction,
        scope: ValidationScope,
        values: &FormValues,
        handlers: &H,
    ) -> Result<ClickOutcome, ActionError>
    where
        H: FormHandlers + ?Sized,
    {
        let Some(mut guard) = self.begin(id) else {
            debug!(button = %id, "click ignored while loading");
            return Ok(ClickOutcome::Ignored);
        };

        let result = match action {
            ButtonAction::Next | ButtonAction::Submit => {
                match handlers.validate(values, scope).await {
                    Err(errors) => {
                        guard.finish(ButtonState::Idle);
                        return Ok(ClickOutcome::Invalid(errors));
                    }
                    Ok(transformed) => {
                        let values = transformed.as_ref().unwrap_or(values);
                        if action == ButtonAction::Next {
                            handlers.on_next(values).await
                        } else {
                            handlers.on_submit(values).await
                        }
                    }
                }
            }
            ButtonAction::Previous => handlers.on_previous().await,
            ButtonAction::Custom => handlers.on_custom(id, values).await,
        };

        match result {
            Ok(()) => {
                guard.finish(ButtonState::Success);
                Ok(ClickOutcome::Completed)
            }
            Err(error) => {
                guard.finish(ButtonState::Idle);
                warn!(button = %id, %action, "action handler failed: {error:#}");
                Err(ActionError::Handler {
                    button: id.clone(),
                    error,
                })
            }
        }
    }

    fn begin(&self, id: &ButtonId) -> Option<LoadingGuard<'_>> {
        let mut slots = self.inner.slots();
        let slot = slots.entry(id.clone()).or_default();
        if slot.state == ButtonState::Loading {
            return None;
        }
        if let Some(timer) = slot.revert.take() {
            timer.abort();
        }
        slot.generation += 1;
        slot.state = ButtonState::Loading;
        let generation = slot.generation;
        self.inner.emit(id, ButtonState::Loading);
        Some(LoadingGuard {
            machine: self,
            id: id.clone(),
            generation,
            done: false,
        })
    }

    fn settle(&self, id: &ButtonId, generation: u64, state: ButtonState) {
        let mut slots = self.inner.slots();
        let Some(slot) = slots.get_mut(id) else {
            return;
        };
        if slot.generation != generation {
            return;
        }
        slot.state = state;
        self.inner.emit(id, state);

        if state == ButtonState::Success {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let weak: Weak<Inner> = Arc::downgrade(&self.inner);
                    let dwell = self.inner.config.success_dwell;
                    let id = id.clone();
                    slot.revert = Some(handle.spawn(async move {
                        tokio::time::sleep(dwell).await;
                        if let Some(inner) = weak.upgrade() {
                            inner.expire(&id, generation);
                        }
                    }));
                }
                Err(_) => {
                    warn!(button = %id, "no tokio runtime for success dwell; reverting now");
                    slot.state = ButtonState::Idle;
                    self.inner.emit(id, ButtonState::Idle);
                }
            }
        }
    }
}

/// Holds a button in `Loading`. Dropping it unfinished (the click future was
/// dropped mid-flight) reverts the button to `Idle`.
struct LoadingGuard<'a> {
    machine: &'a ActionMachine,
    id: ButtonId,
    generation: u64,
    done: bool,
}

impl LoadingGuard<'_> {
    fn finish(&mut self, state: ButtonState) {
        self.done = true;
        self.machine.settle(&self.id, self.generation, state);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.machine
                .settle(&self.id, self.generation, ButtonState::Idle);
        }
    }
}
