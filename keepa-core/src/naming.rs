//! Date detection in file names and object keys, and date stamping of names.
//!
//! [`extract_date`] is the only place that decides whether a string "has a date".
//! It recognises, anywhere in the string:
//!
//! | form                         | example              |
//! |------------------------------|----------------------|
//! | `YYYY-MM-DD`                 | `dump-2023-01-15.sql`|
//! | `DD-MM-YYYY` (or `MM-DD-YYYY` when day-first is invalid) | `report-15-01-2023.zip` |
//! | `DD-Mon-YYYY`, `Mon-DD-YYYY` | `notes 15 Jan 2023`  |
//! | `Mon-YYYY` (first of month)  | `invoices-march-2023`|
//! | `YYYYMMDD`                   | `db_20230115.tar`    |
//!
//! Separators may be `-`, `_`, `.`, `/` or a space. Numeric groups never start or end
//! inside a longer digit run. When several forms match, the one starting earliest wins.

use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Suffix format written by [`ensure_dated`]: `-DD-MM-YYYY`.
pub const DATE_STAMP_FORMAT: &str = "%d-%m-%Y";

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

#[derive(Debug, Clone, Copy)]
enum Form {
    YearMonthDay,
    DayMonthYear,
    DayNameYear,
    NameDayYear,
    NameYear,
    Compact,
}

struct Pattern {
    form: Form,
    regex: Regex,
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let sep = r"[-_./ ]";
        let sources = [
            (
                Form::YearMonthDay,
                format!(r"(?:^|[^0-9])(\d{{4}}){sep}(\d{{1,2}}){sep}(\d{{1,2}})(?:$|[^0-9])"),
            ),
            (
                Form::DayMonthYear,
                format!(r"(?:^|[^0-9])(\d{{1,2}}){sep}(\d{{1,2}}){sep}(\d{{4}})(?:$|[^0-9])"),
            ),
            (
                Form::DayNameYear,
                format!(r"(?i)(?:^|[^0-9])(\d{{1,2}}){sep}?{MONTH}{sep}?(\d{{4}})(?:$|[^0-9])"),
            ),
            (
                Form::NameDayYear,
                format!(
                    r"(?i)(?:^|[^a-z]){MONTH}{sep}?(\d{{1,2}})(?:st|nd|rd|th)?,?{sep}?(\d{{4}})(?:$|[^0-9])"
                ),
            ),
            (
                Form::NameYear,
                format!(r"(?i)(?:^|[^a-z]){MONTH}{sep}?(\d{{4}})(?:$|[^0-9])"),
            ),
            (
                Form::Compact,
                r"(?:^|[^0-9])(\d{4})(\d{2})(\d{2})(?:$|[^0-9])".to_string(),
            ),
        ];
        sources
            .into_iter()
            .map(|(form, source)| Pattern {
                form,
                // The sources above are constant; a failure here is a programming error.
                regex: Regex::new(&source).expect("invalid date pattern"),
            })
            .collect()
    })
}

/// Find the first date embedded in `text`, or `None` when it carries no date.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let mut best: Option<(usize, NaiveDate)> = None;
    for pattern in patterns() {
        if let Some((start, date)) = first_valid(pattern, text) {
            // Ties keep the earlier pattern.
            if best.map_or(true, |(best_start, _)| start < best_start) {
                best = Some((start, date));
            }
        }
    }
    best.map(|(_, date)| date)
}

/// Whether `text` carries a date per [`extract_date`].
pub fn has_date(text: &str) -> bool {
    extract_date(text).is_some()
}

fn first_valid(pattern: &Pattern, text: &str) -> Option<(usize, NaiveDate)> {
    let mut from = 0;
    while from <= text.len() {
        let caps = pattern.regex.captures_at(text, from)?;
        let first = caps.get(1)?;
        if let Some(date) = to_date(pattern.form, &caps) {
            return Some((first.start(), date));
        }
        // Retry from just past the start of this candidate so a rejected match cannot
        // swallow the boundary of the next one.
        from = next_char_boundary(text, first.start());
    }
    None
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    let mut next = index + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next
}

fn to_date(form: Form, caps: &Captures<'_>) -> Option<NaiveDate> {
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
    let name = |i: usize| caps.get(i).and_then(|m| month_from_name(m.as_str()));

    match form {
        Form::YearMonthDay | Form::Compact => NaiveDate::from_ymd_opt(year(1)?, num(2)?, num(3)?),
        Form::DayMonthYear => {
            let (a, b, y) = (num(1)?, num(2)?, year(3)?);
            NaiveDate::from_ymd_opt(y, b, a).or_else(|| NaiveDate::from_ymd_opt(y, a, b))
        }
        Form::DayNameYear => NaiveDate::from_ymd_opt(year(3)?, name(2)?, num(1)?),
        Form::NameDayYear => NaiveDate::from_ymd_opt(year(3)?, name(1)?, num(2)?),
        Form::NameYear => NaiveDate::from_ymd_opt(year(2)?, name(1)?, 1),
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Return `name` unchanged when its base name already carries a date; otherwise insert
/// today's `-DD-MM-YYYY` before the extension.
///
/// `name` is a `/`-separated path or object key. Only the part after the last `/` is
/// inspected and stamped.
pub fn ensure_dated(name: &str) -> String {
    ensure_dated_on(name, Local::now().date_naive())
}

/// [`ensure_dated`] with an explicit current date.
pub fn ensure_dated_on(name: &str, today: NaiveDate) -> String {
    let (dir, base) = match name.rfind('/') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    };
    if has_date(base) {
        return name.to_string();
    }
    let stamp = today.format(DATE_STAMP_FORMAT);
    match base.rfind('.') {
        // A leading dot marks a hidden file, not an extension.
        Some(i) if i > 0 => format!("{dir}{}-{stamp}{}", &base[..i], &base[i..]),
        _ => format!("{dir}{base}-{stamp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_names_resolve_by_prefix() {
        assert_eq!(month_from_name("September"), Some(9));
        assert_eq!(month_from_name("sept"), Some(9));
        assert_eq!(month_from_name("DEC"), Some(12));
        assert_eq!(month_from_name("xyz"), None);
    }

    #[test]
    fn rejected_candidate_does_not_hide_the_next_one() {
        assert_eq!(extract_date("31-31-2023,01-02-2023"), Some(ymd(2023, 2, 1)));
    }

    #[test]
    fn day_first_falls_back_to_month_first() {
        assert_eq!(extract_date("01-15-2023"), Some(ymd(2023, 1, 15)));
        assert_eq!(extract_date("31-02-2023"), None);
    }

    #[test]
    fn earliest_match_wins_across_forms() {
        assert_eq!(
            extract_date("2022-12-31_backup_01-01-2023"),
            Some(ymd(2022, 12, 31))
        );
    }

    #[test]
    fn non_ascii_text_is_scanned_safely() {
        assert_eq!(extract_date("отчёт-15-01-2023.zip"), Some(ymd(2023, 1, 15)));
        assert_eq!(extract_date("отчёт.zip"), None);
    }
}
