use time::{macros::format_description, OffsetDateTime, UtcOffset};

/// `Today at 3:04 PM`, `Yesterday at 3:04 PM`, `Mar 5 at 3:04 PM`, or
/// `Mar 5, 2024 at 3:04 PM` for another year, in the display offset.
pub fn format_date_time(at: OffsetDateTime, now: OffsetDateTime, offset: UtcOffset) -> String {
    let at = at.to_offset(offset);
    let now = now.to_offset(offset);

    let Ok(time) = at.format(format_description!(
        "[hour repr:12 padding:none]:[minute] [period]"
    )) else {
        return String::new();
    };

    let today = now.date();

    if at.date() == today {
        return format!("Today at {time}");
    }

    if today.previous_day() == Some(at.date()) {
        return format!("Yesterday at {time}");
    }

    let date = if at.year() == now.year() {
        at.format(format_description!("[month repr:short] [day padding:none]"))
    } else {
        at.format(format_description!(
            "[month repr:short] [day padding:none], [year]"
        ))
    };

    match date {
        Ok(date) => format!("{date} at {time}"),
        Err(_) => String::new(),
    }
}

pub fn count_label(count: usize) -> String {
    if count == 1 {
        String::from("1 Quote")
    } else {
        format!("{count} Quotes")
    }
}
