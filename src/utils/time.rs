use std::time::Duration;

/// This is the standard way of converting a session title to a storage key in lapwatch.
/// Loading reverses it with [key_to_title] to get a displayable title back when the
/// record itself can't be read.
pub fn title_to_key(title: &str) -> String {
    title.trim().replace(' ', "_")
}

pub fn key_to_title(key: &str) -> String {
    key.replace('_', " ")
}

/// Fixed-width `HH:MM:SS.mmm` form. Used in session records and for the live elapsed
/// display. Hours grow past two digits instead of wrapping.
pub fn format_clock(value: Duration) -> String {
    let ms = value.as_millis();
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1_000 % 60;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Compact form for terminal listings. Leading units are dropped, so short durations
/// stay short.
pub fn format_compact(v: Duration) -> String {
    let total = v.as_secs();
    let hours = total / 3600;
    let minutes = total / 60 % 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m{seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Parses the `HH:MM:SS.mmm` form back into a duration. Minutes and seconds must stay
/// below 60; anything else is rejected so corrupt records get reported instead of
/// silently producing a wrong total.
pub fn parse_clock(value: &str) -> Option<Duration> {
    let (clock, millis) = value.split_once('.')?;
    let mut parts = clock.split(':');
    let hours = parts.next()?.parse::<u64>().ok()?;
    let minutes = parts.next()?.parse::<u64>().ok()?;
    let seconds = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 || millis.len() != 3 {
        return None;
    }
    let millis = millis.parse::<u64>().ok()?;
    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1_000 + millis,
    ))
}
