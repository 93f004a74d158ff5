/// Renders decimal hours as `"{H}h {M}m"`. Minutes that round up to 60 carry into the hour.
pub fn format_worked_hours(hours: f64) -> String {
    let (whole_hours, minutes) = split_worked_hours(hours);
    format!("{whole_hours}h {minutes}m")
}

pub fn split_worked_hours(hours: f64) -> (u64, u32) {
    if !hours.is_finite() || hours <= 0.0 {
        return (0, 0);
    }

    let floor = hours.floor();
    let mut whole_hours = floor as u64;
    let mut minutes = ((hours - floor) * 60.0).round() as u32;
    if minutes >= 60 {
        whole_hours += 1;
        minutes -= 60;
    }
    (whole_hours, minutes)
}
