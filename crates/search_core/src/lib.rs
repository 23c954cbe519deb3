use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Local, Utc};
use futures::future::{AbortHandle, Abortable};
use shared::{
    domain::{LocationId, Slot},
    error::FetchError,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

pub mod fetcher;
pub mod notifications;

pub use fetcher::{FetcherConfigError, HttpSlotFetcher, SlotFetcher};
pub use notifications::{
    MessageCatalog, Notification, NotificationSink, Notifier, Permission, PermissionSource,
    PluralForms, SystemNotifier, NOTIFICATION_TAG,
};

/// Fixed pause between the end of one attempt and the next automatic one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Identifies one attempt. Only the attempt holding the current token may write state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded(Vec<Slot>),
    Failed(FetchError),
    /// Superseded by a newer attempt or by teardown; left no trace in state.
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum SearchEvent {
    AttemptStarted {
        token: AttemptToken,
        location_id: LocationId,
    },
    SlotsUpdated {
        token: AttemptToken,
        slots: Vec<Slot>,
    },
    FetchFailed {
        token: AttemptToken,
        message: String,
    },
    RetryScheduled {
        delay: Duration,
    },
    RetryCancelled,
}

/// Read-only copy of the controller state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSnapshot {
    pub appointments: Vec<Slot>,
    pub should_auto_retry: bool,
    pub last_searched: Option<DateTime<Utc>>,
    pub has_pending_retry: bool,
    pub did_first_search: bool,
    pub active_search: bool,
    pub location_id: LocationId,
    pub notifications_enabled: bool,
    pub fetch_error: Option<String>,
    pub has_in_flight_request: bool,
}

impl SearchSnapshot {
    pub fn has_available_appointments(&self) -> bool {
        !self.appointments.is_empty()
    }

    pub fn last_search_label(&self) -> String {
        self.last_searched
            .map(|at| {
                at.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "--".to_string())
    }

    pub fn search_button_label(&self) -> &'static str {
        if self.active_search {
            "Searching..."
        } else {
            "Search"
        }
    }

    pub fn search_button_class(&self) -> &'static str {
        if self.active_search {
            "secondary"
        } else {
            ""
        }
    }
}

struct InFlightAttempt {
    token: AttemptToken,
    abort: AbortHandle,
}

struct PendingRetry {
    id: u64,
    task: JoinHandle<()>,
}

struct SearchState {
    appointments: Vec<Slot>,
    should_auto_retry: bool,
    last_searched: Option<DateTime<Utc>>,
    pending_retry: Option<PendingRetry>,
    did_first_search: bool,
    active_search: bool,
    location_id: LocationId,
    notifications_enabled: bool,
    fetch_error: Option<String>,
    in_flight: Option<InFlightAttempt>,
    last_token: u64,
    last_retry_id: u64,
    torn_down: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            appointments: Vec::new(),
            should_auto_retry: true,
            last_searched: None,
            pending_retry: None,
            did_first_search: false,
            active_search: false,
            location_id: LocationId::DEFAULT,
            notifications_enabled: false,
            fetch_error: None,
            in_flight: None,
            last_token: 0,
            last_retry_id: 0,
            torn_down: false,
        }
    }
}

impl SearchState {
    fn is_current(&self, token: AttemptToken) -> bool {
        !self.torn_down && self.in_flight.as_ref().map(|a| a.token) == Some(token)
    }

    fn clear_pending_retry(&mut self) -> bool {
        match self.pending_retry.take() {
            Some(pending) => {
                pending.task.abort();
                true
            }
            None => false,
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            debug!(token = previous.token.0, "search: aborting in-flight request");
            previous.abort.abort();
        }
    }
}

/// Owns the polling cycle: at most one request in flight and at most one retry pending.
pub struct SearchController {
    fetcher: Arc<dyn SlotFetcher>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    retry_delay: Duration,
    state: Mutex<SearchState>,
    events: broadcast::Sender<SearchEvent>,
}

impl SearchController {
    pub fn new(fetcher: Arc<dyn SlotFetcher>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Self::new_with_dependencies(
            fetcher,
            notifier,
            Arc::new(SystemClock),
            DEFAULT_RETRY_DELAY,
        )
    }

    pub fn new_with_dependencies(
        fetcher: Arc<dyn SlotFetcher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        retry_delay: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            fetcher,
            notifier,
            clock,
            retry_delay,
            state: Mutex::new(SearchState::default()),
            events,
        })
    }

    // Critical sections never await, so a poisoned lock still guards whole updates.
    fn state(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SearchEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SearchEvent> {
        self.events.subscribe()
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let state = self.state();
        SearchSnapshot {
            appointments: state.appointments.clone(),
            should_auto_retry: state.should_auto_retry,
            last_searched: state.last_searched,
            has_pending_retry: state.pending_retry.is_some(),
            did_first_search: state.did_first_search,
            active_search: state.active_search,
            location_id: state.location_id,
            notifications_enabled: state.notifications_enabled,
            fetch_error: state.fetch_error.clone(),
            has_in_flight_request: state.in_flight.is_some(),
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.state().torn_down
    }

    /// Takes effect on the next attempt; a request already in flight keeps its location.
    pub fn set_location_id(&self, location_id: LocationId) {
        let mut state = self.state();
        if !state.torn_down {
            state.location_id = location_id;
        }
    }

    /// Pair with [`SearchController::change_auto_retry`] to apply the new value.
    pub fn set_should_auto_retry(&self, enabled: bool) {
        let mut state = self.state();
        if !state.torn_down {
            state.should_auto_retry = enabled;
        }
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        let mut state = self.state();
        if !state.torn_down {
            state.notifications_enabled = enabled;
        }
    }

    /// Runs one attempt now, superseding any scheduled retry. Does not block.
    pub fn start_search(self: &Arc<Self>) -> JoinHandle<AttemptOutcome> {
        self.cancel_pending_retry();
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.fetch_attempt().await })
    }

    /// One fetch-and-update cycle. Errors are folded into state, never returned to callers.
    pub async fn fetch_attempt(self: &Arc<Self>) -> AttemptOutcome {
        let (token, location_id, registration) = {
            let mut state = self.state();
            if state.torn_down {
                return AttemptOutcome::Cancelled;
            }
            state.active_search = true;
            state.fetch_error = None;
            state.clear_pending_retry();
            state.abort_in_flight();

            state.last_token += 1;
            let token = AttemptToken(state.last_token);
            let (abort, registration) = AbortHandle::new_pair();
            state.in_flight = Some(InFlightAttempt { token, abort });
            (token, state.location_id, registration)
        };

        info!(
            token = token.0,
            location_id = location_id.0,
            "search: attempt started"
        );
        self.emit(SearchEvent::AttemptStarted { token, location_id });

        let fetched = Abortable::new(self.fetcher.fetch_slots(location_id), registration).await;
        let Ok(result) = fetched else {
            debug!(token = token.0, "search: attempt cancelled");
            return AttemptOutcome::Cancelled;
        };

        let (outcome, should_notify, scheduled) = {
            let mut state = self.state();
            if !state.is_current(token) {
                debug!(token = token.0, "search: discarding stale result");
                return AttemptOutcome::Cancelled;
            }
            state.in_flight = None;

            let outcome = match result {
                Ok(slots) => {
                    state.appointments = slots.clone();
                    state.last_searched = Some(self.clock.now());
                    AttemptOutcome::Succeeded(slots)
                }
                Err(err) => {
                    state.fetch_error = Some(err.to_string());
                    state.appointments.clear();
                    AttemptOutcome::Failed(err)
                }
            };
            state.active_search = false;
            state.did_first_search = true;

            let should_notify = state.notifications_enabled
                && matches!(&outcome, AttemptOutcome::Succeeded(slots) if !slots.is_empty());
            let scheduled = state.should_auto_retry;
            if scheduled {
                self.schedule_retry(&mut state);
            }
            (outcome, should_notify, scheduled)
        };

        match &outcome {
            AttemptOutcome::Succeeded(slots) => {
                info!(
                    token = token.0,
                    location_id = location_id.0,
                    slots = slots.len(),
                    "search: attempt succeeded"
                );
                if should_notify {
                    self.notifier.notify(slots);
                }
                self.emit(SearchEvent::SlotsUpdated {
                    token,
                    slots: slots.clone(),
                });
            }
            AttemptOutcome::Failed(err) => {
                warn!(
                    token = token.0,
                    location_id = location_id.0,
                    error = %err,
                    "search: attempt failed"
                );
                self.emit(SearchEvent::FetchFailed {
                    token,
                    message: err.to_string(),
                });
            }
            AttemptOutcome::Cancelled => {}
        }
        if scheduled {
            self.emit(SearchEvent::RetryScheduled {
                delay: self.retry_delay,
            });
        }

        outcome
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut SearchState) {
        state.clear_pending_retry();
        state.last_retry_id += 1;
        let id = state.last_retry_id;
        let delay = self.retry_delay;
        let controller = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            if controller.claim_retry(id) {
                debug!(retry_id = id, "search: retry timer fired");
                controller.fetch_attempt().await;
            }
        });
        state.pending_retry = Some(PendingRetry { id, task });
        debug!(retry_id = id, delay_secs = delay.as_secs(), "search: retry scheduled");
    }

    /// Detaches the firing timer from state so the attempt it starts cannot abort it.
    fn claim_retry(&self, id: u64) -> bool {
        let mut state = self.state();
        if state.torn_down || state.pending_retry.as_ref().map(|p| p.id) != Some(id) {
            return false;
        }
        state.pending_retry = None;
        true
    }

    pub fn change_auto_retry(&self) {
        let cancelled = {
            let mut state = self.state();
            !state.should_auto_retry && state.clear_pending_retry()
        };
        if cancelled {
            info!("search: auto-retry disabled, pending retry cancelled");
            self.emit(SearchEvent::RetryCancelled);
        }
    }

    pub fn cancel_pending_retry(&self) {
        let cancelled = self.state().clear_pending_retry();
        if cancelled {
            debug!("search: pending retry cancelled");
            self.emit(SearchEvent::RetryCancelled);
        }
    }

    /// Stops the loop for good. Any request still in flight resolves into nothing.
    pub fn teardown(&self) {
        let mut state = self.state();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        state.clear_pending_retry();
        state.abort_in_flight();
        info!("search: controller torn down");
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.clear_pending_retry();
        state.abort_in_flight();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
