//! Countdown formatting for menus and notifications.

/// `MM:SS`, minutes unbounded.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Menu-bar form: whole minutes while at least one is left, then seconds.
pub fn format_compact(secs: u64) -> String {
    let mins = secs / 60;
    if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{secs}s")
    }
}

/// Text for the heads-up notification.
pub fn heads_up_title(remaining_secs: u64) -> String {
    format!("Almost time – {}", format_clock(remaining_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(1200), "20:00");
        assert_eq!(format_clock(6001), "100:01");
    }

    #[test]
    fn compact_format() {
        assert_eq!(format_compact(45), "45s");
        assert_eq!(format_compact(60), "1m");
        assert_eq!(format_compact(119), "1m");
    }

    #[test]
    fn heads_up_text() {
        assert_eq!(heads_up_title(30), "Almost time – 00:30");
    }
}
