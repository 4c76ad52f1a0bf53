use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use thiserror::Error;

/// `v12`, `V3`, `version7`, `VERSION7`. The prefix is case-insensitive, the ASCII digit run
/// is captured.
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:v(?:ersion)?)([0-9]+)").expect("valid version regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStyle {
    Lower,
    Upper,
    LongLower,
    LongUpper,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    pub value: u64,
    pub span: Range<usize>,
    pub style: VersionStyle,
}

impl VersionToken {
    pub fn matched<'a>(&self, name: &'a str) -> &'a str {
        &name[self.span.clone()]
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("バージョン番号が見つかりません: {0}")]
    NoVersionFound(String),
    #[error("バージョン番号が範囲外です: {0}")]
    VersionOutOfRange(String),
}

/// First left-to-right version marker in `name`.
///
/// A digit run above `i64::MAX` is treated as no marker at all, so every accepted value
/// can take part in signed version arithmetic.
pub fn find_version_token(name: &str) -> Option<VersionToken> {
    let caps = VERSION_RE.captures(name)?;
    let whole = caps.get(0)?;
    let digits = caps.get(1)?;
    let value = match digits.as_str().parse::<i64>() {
        Ok(value) => value.unsigned_abs(),
        Err(err) => {
            tracing::debug!("バージョン番号が大きすぎます: {name} ({err})");
            return None;
        }
    };

    let prefix = &name[whole.start()..digits.start()];
    let style = match (prefix.len() > 1, prefix.starts_with('V')) {
        (false, false) => VersionStyle::Lower,
        (false, true) => VersionStyle::Upper,
        (true, false) => VersionStyle::LongLower,
        (true, true) => VersionStyle::LongUpper,
    };

    Some(VersionToken {
        value,
        span: whole.range(),
        style,
    })
}

pub fn extract_version(name: &str) -> Option<u64> {
    match find_version_token(name) {
        Some(token) => {
            tracing::debug!("バージョン {} を検出: {name}", token.value);
            Some(token.value)
        }
        None => {
            tracing::debug!("バージョン番号なし: {name}");
            None
        }
    }
}

/// Canonical spelling of a version value. Negative values come from decrementing `v0`
/// and are kept as-is.
pub fn format_version(value: i64) -> String {
    format!("v{value}")
}

/// Replaces the first version marker with `v<value + delta>`. Later markers stay untouched.
pub fn apply_version_delta(name: &str, delta: i64) -> Result<String, VersionError> {
    shift_version(name, delta).map(|(out, _)| out)
}

/// Like [`apply_version_delta`], also returning the new version value.
///
/// A result outside `i64` is reported as [`VersionError::VersionOutOfRange`].
pub fn shift_version(name: &str, delta: i64) -> Result<(String, i64), VersionError> {
    let token =
        find_version_token(name).ok_or_else(|| VersionError::NoVersionFound(name.to_string()))?;
    let next = i64::try_from(token.value)
        .ok()
        .and_then(|value| value.checked_add(delta))
        .ok_or_else(|| VersionError::VersionOutOfRange(name.to_string()))?;

    let mut out = String::with_capacity(name.len());
    out.push_str(&name[..token.span.start]);
    out.push_str(&format_version(next));
    out.push_str(&name[token.span.end..]);

    tracing::debug!("バージョン {delta:+}: {name} -> {out}");
    Ok((out, next))
}
