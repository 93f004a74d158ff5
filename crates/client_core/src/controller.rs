use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use shared::{
    domain::{AttendanceAction, Coordinates},
    protocol::AttendanceAck,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    client::{AttendanceClient, AttendanceStatus},
    error::{ActionError, StatusFetchError},
    hours::format_worked_hours,
    location::LocationProvider,
    notify::{Notification, Notifier},
    ticker::{ClockTicker, LocalTimeSource, TimeSource, TICK_PERIOD},
};

/// Everything a view needs to render the attendance panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub employee_name: String,
    pub is_checked_in: bool,
    pub check_in_time: String,
    pub worked_hours: f64,
    pub loading: bool,
    pub current_time: String,
}

impl UiState {
    pub fn worked_hours_display(&self) -> String {
        format_worked_hours(self.worked_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed,
    /// Another check-in/out was still in flight; nothing was sent.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub live_clock: bool,
    pub worked_hours: bool,
    pub tick_period: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            live_clock: true,
            worked_hours: true,
            tick_period: TICK_PERIOD,
        }
    }
}

/// Owns the observable attendance state and runs check-in/out round trips.
pub struct AttendanceController {
    location: Arc<dyn LocationProvider>,
    client: Arc<dyn AttendanceClient>,
    notifier: Arc<dyn Notifier>,
    time_source: Arc<dyn TimeSource>,
    options: ControllerOptions,
    state: Arc<watch::Sender<UiState>>,
    action_in_flight: AtomicBool,
    activating: AtomicBool,
    ticker: Mutex<Option<ClockTicker>>,
}

impl AttendanceController {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        client: Arc<dyn AttendanceClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new_with_dependencies(
            location,
            client,
            notifier,
            Arc::new(LocalTimeSource),
            ControllerOptions::default(),
        )
    }

    pub fn new_with_dependencies(
        location: Arc<dyn LocationProvider>,
        client: Arc<dyn AttendanceClient>,
        notifier: Arc<dyn Notifier>,
        time_source: Arc<dyn TimeSource>,
        options: ControllerOptions,
    ) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            location,
            client,
            notifier,
            time_source,
            options,
            state: Arc::new(state),
            action_in_flight: AtomicBool::new(false),
            activating: AtomicBool::new(false),
            ticker: Mutex::new(None),
        }
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// `Loading` during the activation fetch and while a check-in/out is in flight.
    pub fn phase(&self) -> Phase {
        if self.activating.load(Ordering::Acquire) || self.action_in_flight.load(Ordering::Acquire)
        {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    /// `None` when worked hours are not tracked.
    pub fn worked_hours_display(&self) -> Option<String> {
        self.options
            .worked_hours
            .then(|| self.state.borrow().worked_hours_display())
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker_slot()
            .as_ref()
            .is_some_and(ClockTicker::is_running)
    }

    /// Starts the clock (when enabled) and loads the initial status.
    pub async fn activate(&self) {
        if self.options.live_clock {
            let state = Arc::clone(&self.state);
            let ticker = ClockTicker::start(
                Arc::clone(&self.time_source),
                self.options.tick_period,
                move |now| state.send_modify(|ui| ui.current_time = now),
            );
            let previous = self.ticker_slot().replace(ticker);
            if let Some(previous) = previous {
                debug!("attendance: replacing clock ticker from a previous activation");
                previous.stop();
            }
        }

        self.activating.store(true, Ordering::Release);
        let _activation = ActivationGuard { controller: self };
        self.refresh().await;
    }

    pub fn deactivate(&self) {
        if let Some(ticker) = self.ticker_slot().take() {
            ticker.stop();
            debug!("attendance: clock ticker stopped");
        }
    }

    /// Re-reads status from the service. Failures are reported as notifications.
    pub async fn refresh(&self) {
        if let Err(err) = self.load_status().await {
            error!(error = %err, "attendance: failed to load status");
            self.notifier
                .notify(Notification::danger(err.notification_message()));
        }
    }

    pub async fn check_in(&self) -> ActionOutcome {
        self.run_action(AttendanceAction::CheckIn).await
    }

    pub async fn check_out(&self) -> ActionOutcome {
        self.run_action(AttendanceAction::CheckOut).await
    }

    async fn load_status(&self) -> Result<(), StatusFetchError> {
        match self.client.fetch_status().await? {
            AttendanceStatus {
                error: Some(reported),
                ..
            } => Err(StatusFetchError::Reported(reported)),
            status => {
                self.apply_status(&status);
                Ok(())
            }
        }
    }

    fn apply_status(&self, status: &AttendanceStatus) {
        let track_hours = self.options.worked_hours;
        self.state.send_modify(|ui| {
            ui.employee_name = status.employee_name.clone();
            ui.is_checked_in = status.is_checked_in;
            ui.check_in_time = status.check_in_time.clone();
            if track_hours {
                ui.worked_hours = status.worked_hours;
            }
        });
    }

    async fn run_action(&self, action: AttendanceAction) -> ActionOutcome {
        let Some(_guard) = self.begin_action() else {
            warn!(
                action = action.label(),
                "attendance: action rejected while another is in flight"
            );
            return ActionOutcome::Rejected;
        };

        match self.submit_with_location(action).await {
            Ok(ack) => {
                info!(
                    action = action.label(),
                    attendance_id = ack.as_ref().map(|ack| ack.attendance_id().0),
                    "attendance: action accepted"
                );
                self.notifier
                    .notify(Notification::success(success_message(action)));
                self.refresh().await;
                ActionOutcome::Completed
            }
            Err(err) => {
                error!(action = action.label(), error = %err, "attendance: action failed");
                self.notifier.notify(Notification::sticky_danger(
                    err.user_message(failure_fallback(action)),
                ));
                ActionOutcome::Failed
            }
        }
    }

    async fn submit_with_location(
        &self,
        action: AttendanceAction,
    ) -> Result<Option<AttendanceAck>, ActionError> {
        let coords = self.location.get_location().await?;
        self.submit(action, coords).await
    }

    async fn submit(
        &self,
        action: AttendanceAction,
        coords: Coordinates,
    ) -> Result<Option<AttendanceAck>, ActionError> {
        let ack = match action {
            AttendanceAction::CheckIn => self
                .client
                .submit_check_in(coords)
                .await?
                .map(AttendanceAck::CheckIn),
            AttendanceAction::CheckOut => self
                .client
                .submit_check_out(coords)
                .await?
                .map(AttendanceAck::CheckOut),
        };
        debug!(action = action.label(), ?ack, "attendance: acknowledgement");
        Ok(ack)
    }

    fn begin_action(&self) -> Option<ActionGuard<'_>> {
        self.action_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.state.send_modify(|ui| ui.loading = true);
        Some(ActionGuard { controller: self })
    }

    fn ticker_slot(&self) -> std::sync::MutexGuard<'_, Option<ClockTicker>> {
        self.ticker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears `loading` and reopens the action gate on every exit path, including a dropped future.
struct ActionGuard<'a> {
    controller: &'a AttendanceController,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.controller.state.send_modify(|ui| ui.loading = false);
        self.controller
            .action_in_flight
            .store(false, Ordering::Release);
    }
}

/// Ends the implicit `Loading` phase of an activation fetch.
struct ActivationGuard<'a> {
    controller: &'a AttendanceController,
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        self.controller.activating.store(false, Ordering::Release);
    }
}

fn success_message(action: AttendanceAction) -> &'static str {
    match action {
        AttendanceAction::CheckIn => "Checked in successfully!",
        AttendanceAction::CheckOut => "Checked out successfully!",
    }
}

fn failure_fallback(action: AttendanceAction) -> &'static str {
    match action {
        AttendanceAction::CheckIn => "Check-in failed",
        AttendanceAction::CheckOut => "Check-out failed",
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
