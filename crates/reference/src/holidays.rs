//! US federal holidays, including observed dates

use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Saturday holidays are observed on Friday, Sunday holidays on Monday.
fn observed(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => Some(date - Duration::days(1)),
        Weekday::Sun => Some(date + Duration::days(1)),
        _ => None,
    }
}

/// Federal holidays falling in `year`, sorted by date.
pub fn us_federal_holidays(year: i32) -> Vec<Holiday> {
    let mut fixed: Vec<(Option<NaiveDate>, &str)> = vec![
        (NaiveDate::from_ymd_opt(year, 1, 1), "New Year's Day"),
        (NaiveDate::from_ymd_opt(year, 7, 4), "Independence Day"),
        (NaiveDate::from_ymd_opt(year, 11, 11), "Veterans Day"),
        (NaiveDate::from_ymd_opt(year, 12, 25), "Christmas Day"),
    ];
    if year >= 2021 {
        fixed.push((
            NaiveDate::from_ymd_opt(year, 6, 19),
            "Juneteenth National Independence Day",
        ));
    }

    let mut floating: Vec<(Option<NaiveDate>, &str)> = vec![
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving"),
    ];
    if year >= 1986 {
        floating.push((
            nth_weekday(year, 1, Weekday::Mon, 3),
            "Martin Luther King Jr. Day",
        ));
    }

    let mut holidays = Vec::new();
    for (date, name) in fixed {
        let Some(date) = date else { continue };
        holidays.push(Holiday {
            date,
            name: name.to_string(),
        });
        if let Some(obs) = observed(date).filter(|d| d.year() == year) {
            holidays.push(Holiday {
                date: obs,
                name: format!("{name} (observed)"),
            });
        }
    }
    for (date, name) in floating {
        if let Some(date) = date {
            holidays.push(Holiday {
                date,
                name: name.to_string(),
            });
        }
    }

    // New Year's Day on a Saturday is observed on 31 December of the year before.
    if let Some(next) = NaiveDate::from_ymd_opt(year + 1, 1, 1) {
        if next.weekday() == Weekday::Sat {
            holidays.push(Holiday {
                date: next - Duration::days(1),
                name: "New Year's Day (observed)".to_string(),
            });
        }
    }

    holidays.sort_by_key(|h| h.date);
    holidays
}

pub fn is_us_holiday(date: NaiveDate) -> bool {
    us_federal_holidays(date.year())
        .iter()
        .any(|h| h.date == date)
}
