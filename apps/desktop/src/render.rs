//! Plain-text views of the controller state and notifications.

use client_core::{Notification, Severity, UiState};

pub fn render_state(state: &UiState, show_worked_hours: bool) -> String {
    let name = if state.employee_name.is_empty() {
        "(unknown employee)"
    } else {
        state.employee_name.as_str()
    };

    let mut line = if state.is_checked_in {
        format!("{name}: checked in since {}", state.check_in_time)
    } else {
        format!("{name}: not checked in")
    };

    if show_worked_hours && state.is_checked_in {
        line.push_str(&format!(" | worked {}", state.worked_hours_display()));
    }
    if !state.current_time.is_empty() {
        line.push_str(&format!(" | {}", state.current_time));
    }
    if state.loading {
        line.push_str(" | working...");
    }
    line
}

pub fn render_notification(notification: &Notification) -> String {
    let tag = match notification.severity {
        Severity::Success => "ok",
        Severity::Danger => "!!",
    };
    if notification.sticky {
        format!("[{tag}] {} (press enter to dismiss)", notification.message)
    } else {
        format!("[{tag}] {}", notification.message)
    }
}
