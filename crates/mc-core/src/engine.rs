//! The session owner.
//!
//! [`Engine`] wires the components together around one [`Session`]. Hosts
//! call the mutators from user input, call [`Engine::tick`] when
//! [`Engine::next_tick_in`] elapses, and pull state back out. Each tick runs
//! in a fixed order: clock, cost, milestones, then the debounced write.

use serde::Serialize;

use crate::clock::Clock;
use crate::codec::share::{ShareParams, decode_from_share, encode_for_share};
use crate::codec::storage::{
    RestoreSource, STORAGE_KEY, decode_from_storage, encode_for_storage,
};
use crate::ledger::LedgerChange;
use crate::milestone::{Milestone, MilestoneNotifier};
use crate::schedule::{PendingWrite, TickSchedule};
use crate::session::{ResumePolicy, Session, SessionDefaults};
use crate::store::{KeyValueStore, StoreError};
use crate::timer::{TickOutcome, TimerStatus};
use crate::types::{Currency, Language};

/// Default refresh period.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Default delay between a change and its write to storage.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;

/// A session loaded from a link is not saved until it has run this long.
pub const SHARE_SAVE_MIN_ELAPSED_SECS: u32 = 10;

/// Engine construction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub defaults: SessionDefaults,
    pub resume_policy: ResumePolicy,
    pub tick_interval_ms: u64,
    pub save_debounce_ms: u64,
    pub notifier: MilestoneNotifier,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            defaults: SessionDefaults::default(),
            resume_policy: ResumePolicy::default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            notifier: MilestoneNotifier::default(),
        }
    }
}

/// Something the user should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A time or cost threshold was crossed.
    Milestone(Milestone),
    /// A stored session that was running has been brought back.
    SessionRestored {
        elapsed_secs: u32,
        gap_secs: u32,
        resumed: bool,
    },
    /// A session from a share link replaced the local one.
    SharedSessionLoaded { running: bool, clock_drift: bool },
    ParticipantsJoined { count: u32 },
    ParticipantsLeft { count: u32 },
    /// The 24 hour cap paused the timer.
    DurationCapReached,
    /// Storage failed; the session now lives in memory only.
    StorageUnavailable,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub elapsed_secs: u32,
    pub total_cost: f64,
    pub milestones: Vec<Milestone>,
    pub capped: bool,
}

type Subscriber = Box<dyn FnMut(&TickReport)>;

/// Owns the session, its schedules and its storage backend.
pub struct Engine<C: Clock, S: KeyValueStore> {
    clock: C,
    store: Option<S>,
    session: Session,
    defaults: SessionDefaults,
    notifier: MilestoneNotifier,
    resume_policy: ResumePolicy,
    ticks: TickSchedule,
    pending_write: PendingWrite,
    save_debounce_ms: u64,
    notifications: Vec<Notification>,
    subscribers: Vec<Subscriber>,
    loaded_from_share: bool,
}

impl<C: Clock, S: KeyValueStore> Engine<C, S> {
    /// Creates an engine with a fresh session. `store` of `None` runs
    /// memory-only.
    pub fn new(clock: C, store: Option<S>, options: EngineOptions) -> Self {
        Self {
            clock,
            store,
            session: Session::new(&options.defaults),
            defaults: options.defaults,
            notifier: options.notifier,
            resume_policy: options.resume_policy,
            ticks: TickSchedule::new(options.tick_interval_ms),
            pending_write: PendingWrite::new(),
            save_debounce_ms: options.save_debounce_ms,
            notifications: Vec::new(),
            subscribers: Vec::new(),
            loaded_from_share: false,
        }
    }

    /// Replaces the session with whatever the store holds.
    pub fn restore(&mut self) -> RestoreSource {
        let raw = match self.store.as_ref().map(|store| store.get(STORAGE_KEY)) {
            None | Some(Ok(None)) => None,
            Some(Ok(Some(raw))) => Some(raw),
            Some(Err(e)) => {
                self.handle_store_error(&e);
                None
            }
        };
        let Some(raw) = raw else {
            tracing::debug!("no stored session");
            return RestoreSource::Fresh;
        };

        let now = self.clock.now_ms();
        let restored = decode_from_storage(&raw, now, &self.defaults, self.resume_policy);
        self.ticks.cancel();
        self.pending_write.cancel();
        self.loaded_from_share = false;
        self.session = restored.session;

        if let RestoreSource::Stored {
            reconciled: Some(reconciled),
            resumed,
        } = restored.source
        {
            tracing::info!(
                elapsed = reconciled.elapsed_secs,
                gap = reconciled.gap_secs,
                resumed,
                "restored running session"
            );
            self.notifications.push(Notification::SessionRestored {
                elapsed_secs: reconciled.elapsed_secs,
                gap_secs: reconciled.gap_secs,
                resumed,
            });
        }
        if self.session.is_running() {
            self.ticks.schedule(now);
        }
        restored.source
    }

    /// Applies a share link. Returns `false` and leaves the session alone if
    /// the link carries no session data.
    pub fn load_share(&mut self, params: &ShareParams) -> bool {
        let now = self.clock.now_ms();
        let receiver_tz = self.clock.timezone_offset_minutes();
        let Some(shared) = decode_from_share(params, now, receiver_tz, &self.defaults) else {
            return false;
        };

        self.ticks.cancel();
        self.pending_write.cancel();
        self.session = shared.session;
        self.loaded_from_share = true;
        let running = self.session.is_running();
        if running {
            self.ticks.schedule(now);
        }
        tracing::info!(
            elapsed = self.session.elapsed_secs(),
            running,
            "loaded shared session"
        );
        self.notifications.push(Notification::SharedSessionLoaded {
            running,
            clock_drift: shared.clock_drift,
        });
        self.request_save(now);
        true
    }

    /// Starts the clock. Returns `false` if it was already running or capped.
    pub fn start(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.session.timer.start(now) {
            return false;
        }
        tracing::debug!(elapsed = self.session.elapsed_secs(), "timer started");
        self.ticks.schedule(now);
        self.persist(now);
        true
    }

    /// Pauses the clock and saves immediately. Returns `false` if it was not
    /// running.
    pub fn pause(&mut self) -> bool {
        self.ticks.cancel();
        let now = self.clock.now_ms();
        if !self.session.timer.pause(now) {
            return false;
        }
        tracing::debug!(elapsed = self.session.elapsed_secs(), "timer paused");
        self.persist(now);
        true
    }

    /// Starts or pauses. Returns whether the clock is now running.
    pub fn toggle(&mut self) -> bool {
        if self.session.is_running() {
            self.pause();
        } else {
            self.start();
        }
        self.session.is_running()
    }

    /// Zeroes the session, keeping participants, rate and language, and
    /// removes the stored record.
    pub fn reset(&mut self) {
        self.ticks.cancel();
        self.pending_write.cancel();
        self.session.reset();
        self.loaded_from_share = false;
        self.notifications.clear();
        tracing::debug!("session reset");

        if let Some(Err(e)) = self.store.as_mut().map(|store| store.remove(STORAGE_KEY)) {
            self.handle_store_error(&e);
        }
    }

    /// Sets the participant count at the current elapsed time.
    pub fn add_or_update(&mut self, quantity: i64) -> LedgerChange {
        let now = self.clock.now_ms();
        self.advance_clock(now);
        let running = self.session.is_running();
        let change = self
            .session
            .ledger
            .add_or_update(quantity, self.session.elapsed_secs(), running);

        if change == LedgerChange::Unchanged {
            return change;
        }
        tracing::debug!(?change, "participants changed");

        if running {
            let delta = change.delta();
            let count = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
            if delta > 0 {
                self.notifications
                    .push(Notification::ParticipantsJoined { count });
            } else if delta < 0 {
                self.notifications.push(Notification::ParticipantsLeft { count });
            }
        }
        self.request_save(now);
        change
    }

    /// Moves the participant count by `delta`.
    pub fn adjust_quantity(&mut self, delta: i64) -> LedgerChange {
        let current = i64::from(self.session.ledger.current_quantity().value());
        self.add_or_update(current.saturating_add(delta))
    }

    /// Sets the hourly rate per participant (clamped).
    pub fn set_rate(&mut self, amount: f64) {
        self.session.rate.set_amount(amount);
        self.request_save(self.clock.now_ms());
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.session.rate.set_currency(currency);
        self.request_save(self.clock.now_ms());
    }

    pub fn set_language(&mut self, language: Language) {
        self.session.language = language;
        self.request_save(self.clock.now_ms());
    }

    /// Refreshes the session. Returns `None` if no tick is scheduled, so a
    /// tick that arrives after a pause or reset does nothing.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.ticks.is_scheduled() {
            return None;
        }
        let now = self.clock.now_ms();

        let outcome = self.advance_clock(now);
        if !outcome.capped {
            self.ticks.schedule(now);
        }

        let total_cost = self.session.total_cost();
        let milestones =
            self.notifier
                .check(outcome.elapsed_secs, total_cost, &mut self.session.milestones);
        for milestone in &milestones {
            tracing::debug!(axis = %milestone.axis, value = milestone.value, "milestone reached");
            self.notifications.push(Notification::Milestone(*milestone));
        }

        if outcome.capped {
            self.persist(now);
        } else {
            self.flush_if_due();
            self.request_save(now);
        }

        let report = TickReport {
            elapsed_secs: outcome.elapsed_secs,
            total_cost,
            milestones,
            capped: outcome.capped,
        };
        for subscriber in &mut self.subscribers {
            subscriber(&report);
        }
        Some(report)
    }

    /// Performs the pending write if its debounce delay has passed.
    pub fn flush_if_due(&mut self) {
        let now = self.clock.now_ms();
        if self.pending_write.is_due(now) {
            self.persist(now);
        }
    }

    /// Performs the pending write now, if there is one.
    pub fn flush(&mut self) {
        if self.pending_write.is_pending() {
            self.persist(self.clock.now_ms());
        }
    }

    /// Registers a callback invoked with every tick report.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&TickReport) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub const fn elapsed_time(&self) -> u32 {
        self.session.elapsed_secs()
    }

    pub fn total_cost(&self) -> f64 {
        self.session.total_cost()
    }

    pub const fn status(&self) -> TimerStatus {
        self.session.timer.status()
    }

    pub fn pending_notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drains queued notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Link parameters for the session as of now.
    pub fn share_params(&self) -> ShareParams {
        encode_for_share(
            &self.session,
            self.clock.now_ms(),
            self.clock.timezone_offset_minutes(),
        )
    }

    /// Milliseconds until the next tick is due, `None` while not running.
    pub fn next_tick_in(&self) -> Option<u64> {
        self.ticks.due_in(self.clock.now_ms())
    }

    pub const fn tick_interval_ms(&self) -> u64 {
        self.ticks.interval_ms()
    }

    pub const fn has_pending_write(&self) -> bool {
        self.pending_write.is_pending()
    }

    /// False once storage has failed and the engine runs memory-only.
    pub const fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub const fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Brings the timer up to `now`, handling the cap.
    fn advance_clock(&mut self, now_ms: i64) -> TickOutcome {
        let outcome = self.session.timer.tick(now_ms);
        if outcome.capped {
            tracing::info!("duration cap reached, timer paused");
            self.ticks.cancel();
            self.notifications.push(Notification::DurationCapReached);
        }
        outcome
    }

    fn request_save(&mut self, now_ms: i64) {
        self.pending_write.request(now_ms, self.save_debounce_ms);
    }

    /// Writes the session to the store, clearing any pending write.
    fn persist(&mut self, now_ms: i64) {
        self.pending_write.cancel();

        if self.loaded_from_share && self.session.elapsed_secs() < SHARE_SAVE_MIN_ELAPSED_SECS {
            tracing::debug!("shared session too young to save");
            return;
        }
        let Some(store) = self.store.as_mut() else {
            return;
        };

        let json = match encode_for_storage(&self.session, now_ms).to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session");
                return;
            }
        };
        if let Err(e) = store.set(STORAGE_KEY, &json) {
            self.handle_store_error(&e);
        } else {
            tracing::debug!(bytes = json.len(), "session saved");
        }
    }

    fn handle_store_error(&mut self, error: &StoreError) {
        match error {
            StoreError::Unavailable(_) => {
                tracing::warn!(%error, "continuing without persistence");
                self.store = None;
                self.notifications.push(Notification::StorageUnavailable);
            }
            StoreError::QuotaExceeded => {
                tracing::warn!(%error, "clearing stored session");
                if let Some(Err(e)) = self.store.as_mut().map(|store| store.remove(STORAGE_KEY)) {
                    tracing::warn!(error = %e, "failed to clear stored session");
                }
            }
            StoreError::Backend(_) => {
                tracing::warn!(%error, "failed to access stored session");
            }
        }
    }
}
