use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Applied in order, each over the output of the previous one.
static DATE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // YYYY-MM-DD
        Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date regex"),
        // DD-MM-YYYY or MM-DD-YYYY
        Regex::new(r"\d{2}-\d{2}-\d{4}").expect("valid date regex"),
        // DD/MM/YYYY or MM/DD/YYYY
        Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid date regex"),
        // YYYY/MM/DD
        Regex::new(r"\d{4}/\d{2}/\d{2}").expect("valid date regex"),
    ]
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid dash regex"));

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Removes every recognised date shape without touching the surrounding separators.
pub fn remove_dates(name: &str) -> String {
    let mut out = name.to_string();
    for pattern in DATE_PATTERNS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out
}

/// Removes dates and collapses the separators left behind, repeating until nothing changes.
///
/// Collapsing can join digits into a new date (`2024-01--05`), so a single pass is not
/// a fixed point.
pub fn strip_known_dates(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let removed = remove_dates(&current);
        let spaced = WHITESPACE_RUN.replace_all(&removed, " ");
        let dashed = DASH_RUN.replace_all(&spaced, "-");
        let next = dashed.trim_matches([' ', '-']).to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

pub fn stamp_current_date(name: &str, today: NaiveDate) -> String {
    format!("{} {}", name, format_date(today)).trim().to_string()
}

pub fn process_date(name: &str, today: NaiveDate) -> String {
    stamp_current_date(&strip_known_dates(name), today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 2).expect("valid date")
    }

    #[test]
    fn strips_every_supported_shape() {
        assert_eq!(strip_known_dates("Cut 2024-01-31"), "Cut");
        assert_eq!(strip_known_dates("Cut 31-01-2024"), "Cut");
        assert_eq!(strip_known_dates("Cut 01/31/2024"), "Cut");
        assert_eq!(strip_known_dates("Cut 2024/01/31"), "Cut");
    }

    #[test]
    fn strip_collapses_leftover_separators() {
        assert_eq!(strip_known_dates("- Promo  -2024-01-31- mix -"), "Promo - mix");
        assert_eq!(strip_known_dates("A--2024-01-31--B"), "A-B");
    }

    #[test]
    fn strip_removes_dates_formed_by_collapsing() {
        assert_eq!(strip_known_dates("2024-01--05"), "");
        assert_eq!(strip_known_dates("Cut 31--01---2024 mix"), "Cut mix");
    }

    #[test]
    fn strip_leaves_names_without_dates_alone() {
        assert_eq!(strip_known_dates("Show_Reel_v3"), "Show_Reel_v3");
    }

    #[test]
    fn process_date_replaces_embedded_date() {
        assert_eq!(process_date("Master 2024-12-24", day()), "Master 2025-03-02");
        assert_eq!(process_date("Master", day()), "Master 2025-03-02");
    }

    #[test]
    fn process_date_is_idempotent_within_a_day() {
        for name in [
            "Master",
            "Edit_v3 01/02/2023",
            "",
            "  2020-01-01  ",
            "2024-01--05",
            "Cut 2024--01-05 final",
        ] {
            let once = process_date(name, day());
            assert_eq!(process_date(&once, day()), once, "input: {name:?}");
        }
    }

    #[test]
    fn stamp_on_empty_name_is_just_the_date() {
        assert_eq!(stamp_current_date("", day()), "2025-03-02");
    }
}
