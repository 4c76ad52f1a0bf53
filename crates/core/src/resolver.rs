use crate::date::{format_date, process_date, remove_dates};
use crate::sanitize::cleanup_name;
use crate::template::{Pattern, PatternPart, Placeholder};
use crate::version::{shift_version, VersionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Replace any date left in the resolved name with today's date.
    pub stamp_date: bool,
}

/// Inputs that vary per item.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub original: &'a str,
    pub index: usize,
    pub today: NaiveDate,
}

/// A cleaned name: no doubled `_` or spaces, no separator at either end, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedName(String);

impl ResolvedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: ResolvedName,
    /// Set only by `{version+1}`: the item is copied instead of renamed.
    pub duplicate: bool,
    /// Version number produced by the arithmetic placeholder, if any.
    pub version: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("バージョン番号がないためスキップします: {0}")]
    NoVersion(String),
    #[error("バージョン番号が範囲外です: {0}")]
    VersionOutOfRange(String),
    #[error("プレースホルダーを解決できません: {0}")]
    UnresolvedPlaceholder(Placeholder),
    #[error("解決後の名前が空になりました")]
    EmptyName,
}

/// Name used for version arithmetic: dates removed, separators collapsed.
pub fn version_base(original: &str) -> String {
    cleanup_name(&remove_dates(original))
}

/// Computes the new name for one item.
///
/// The leftmost `{version+1}`/`{version-1}` is computed first from the date-stripped
/// original. Every occurrence of that same placeholder gets the same value. Any other
/// version placeholder left over is unresolved.
pub fn resolve(
    pattern: &Pattern,
    ctx: &ResolveContext<'_>,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let arithmetic = pattern.first_version_arithmetic();
    let bumped = match arithmetic.and_then(Placeholder::version_delta) {
        Some(delta) => Some(bump_version(ctx.original, delta)?),
        None => None,
    };

    if pattern.is_version_bump() {
        tracing::debug!("バージョンアップ複製: {}", ctx.original);
    }

    let mut rendered = String::new();
    for part in pattern.parts() {
        match part {
            PatternPart::Literal(text) => rendered.push_str(text),
            PatternPart::Placeholder(placeholder) => match placeholder {
                Placeholder::Index => rendered.push_str(&ctx.index.to_string()),
                Placeholder::Original => rendered.push_str(ctx.original),
                Placeholder::CurrentDate => rendered.push_str(&format_date(ctx.today)),
                p if Some(*p) == arithmetic => {
                    if let Some((name, _)) = &bumped {
                        rendered.push_str(name);
                    }
                }
                other => return Err(ResolveError::UnresolvedPlaceholder(*other)),
            },
        }
    }

    let mut name = cleanup_name(&rendered);
    if options.stamp_date {
        name = cleanup_name(&process_date(&name, ctx.today));
    }
    if name.is_empty() {
        return Err(ResolveError::EmptyName);
    }

    Ok(Resolution {
        name: ResolvedName(name),
        duplicate: arithmetic == Some(Placeholder::VersionUp),
        version: bumped.map(|(_, value)| value),
    })
}

fn bump_version(original: &str, delta: i64) -> Result<(String, i64), ResolveError> {
    let base = version_base(original);
    shift_version(&base, delta).map_err(|err| match err {
        VersionError::NoVersionFound(_) => ResolveError::NoVersion(original.to_string()),
        VersionError::VersionOutOfRange(_) => {
            ResolveError::VersionOutOfRange(original.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 2).expect("valid date")
    }

    fn run(pattern: &str, original: &str, index: usize) -> Result<Resolution, ResolveError> {
        let pattern = Pattern::parse(pattern).expect("pattern must parse");
        let ctx = ResolveContext {
            original,
            index,
            today: day(),
        };
        resolve(&pattern, &ctx, &ResolveOptions::default())
    }

    #[test]
    fn bump_strips_date_and_duplicates() {
        let resolution = run("{version+1}", "Edit_v003_2024-01-01", 1).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Edit_v4");
        assert!(resolution.duplicate);
        assert_eq!(resolution.version, Some(4));
    }

    #[test]
    fn bump_without_version_is_skipped() {
        let err = run("{version+1}", "Show_Reel", 1).expect_err("must skip");
        assert_eq!(err, ResolveError::NoVersion("Show_Reel".to_string()));
    }

    #[test]
    fn bump_past_largest_version_is_out_of_range() {
        let err = run("{version+1}", "Edit_v9223372036854775807", 1).expect_err("must fail");
        assert_eq!(
            err,
            ResolveError::VersionOutOfRange("Edit_v9223372036854775807".to_string())
        );

        let err = run("{version+1}", "Edit_v18446744073709551615", 1).expect_err("must skip");
        assert_eq!(
            err,
            ResolveError::NoVersion("Edit_v18446744073709551615".to_string())
        );
    }

    #[test]
    fn original_and_date() {
        let resolution = run("{original}_{current_date}", "Master", 1).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Master_2025-03-02");
        assert!(!resolution.duplicate);
        assert_eq!(resolution.version, None);
    }

    #[test]
    fn index_is_substituted() {
        let resolution = run("Reel_{n}_{original}", "Cut", 3).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Reel_3_Cut");
    }

    #[test]
    fn embedded_decrement_does_not_duplicate() {
        let resolution = run("{version-1}_fix", "Promo_V10 2024/05/06", 1).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Promo_v9_fix");
        assert!(!resolution.duplicate);
        assert_eq!(resolution.version, Some(9));
    }

    #[test]
    fn embedded_increment_duplicates() {
        let resolution = run("{n}_{version+1}", "Edit_version2", 5).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "5_Edit_v3");
        assert!(resolution.duplicate);
    }

    #[test]
    fn repeated_placeholder_is_not_chained() {
        let resolution = run("{version+1}_{version+1}", "A_v1", 1).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "A_v2_A_v2");
    }

    #[test]
    fn second_kind_of_arithmetic_is_unresolved() {
        let err = run("{version+1}_{version-1}", "A_v1", 1).expect_err("must fail");
        assert_eq!(
            err,
            ResolveError::UnresolvedPlaceholder(Placeholder::VersionDown)
        );
    }

    #[test]
    fn bare_version_placeholder_is_unresolved() {
        let err = run("{original}_{version}", "A_v1", 1).expect_err("must fail");
        assert_eq!(err, ResolveError::UnresolvedPlaceholder(Placeholder::Version));
    }

    #[test]
    fn braces_in_source_name_are_literal() {
        let resolution = run("{original}_{n}", "Odd{n}Name", 2).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Odd{n}Name_2");
    }

    #[test]
    fn cleanup_runs_on_the_result() {
        let resolution = run("__{original}  _{n}__", " Cut__A ", 1).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Cut_A _1");
    }

    #[test]
    fn empty_result_is_rejected() {
        let err = run("{original}", "__", 1).expect_err("must fail");
        assert_eq!(err, ResolveError::EmptyName);
    }

    #[test]
    fn stamp_date_replaces_old_date() {
        let pattern = Pattern::parse("{original}_{n}").expect("must parse");
        let ctx = ResolveContext {
            original: "Master_2024-01-01",
            index: 1,
            today: day(),
        };
        let options = ResolveOptions { stamp_date: true };
        let resolution = resolve(&pattern, &ctx, &options).expect("must resolve");
        assert_eq!(resolution.name.as_str(), "Master_1 2025-03-02");
    }
}
