//! Display-time formatting for message timestamps.

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Human label for a message timestamp: "just now" within a minute, clock
/// time for today, "yesterday", else a calendar date. Day boundaries
/// follow the viewer's timezone.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    time_ago_in(then, now, *Local::now().offset())
}

/// [`time_ago`] with an explicit display offset.
pub fn time_ago_in(then: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    // Covers clock skew too: anything under a minute, either way, is now.
    if (now - then).num_seconds() < 60 {
        return "just now".into();
    }

    let then = then.with_timezone(&offset);
    let now = now.with_timezone(&offset);

    if then.date_naive() == now.date_naive() {
        return then.format("%H:%M").to_string();
    }
    if now.date_naive().pred_opt() == Some(then.date_naive()) {
        return "yesterday".into();
    }
    then.format("%d/%m/%Y").to_string()
}
