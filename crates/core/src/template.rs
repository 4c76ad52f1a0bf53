use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static BRACED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// 1-based position of the item in the batch.
    Index,
    Original,
    CurrentDate,
    Version,
    VersionUp,
    VersionDown,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::Index,
        Placeholder::Original,
        Placeholder::CurrentDate,
        Placeholder::Version,
        Placeholder::VersionUp,
        Placeholder::VersionDown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Index => "n",
            Placeholder::Original => "original",
            Placeholder::CurrentDate => "current_date",
            Placeholder::Version => "version",
            Placeholder::VersionUp => "version+1",
            Placeholder::VersionDown => "version-1",
        }
    }

    pub fn from_name(name: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn version_delta(self) -> Option<i64> {
        match self {
            Placeholder::VersionUp => Some(1),
            Placeholder::VersionDown => Some(-1),
            _ => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("パターンには次のいずれかが必要です: {}", placeholder_list())]
    MissingPlaceholder,
    #[error("中括弧の対応が不正です")]
    UnbalancedBraces,
    #[error("未対応のプレースホルダーです: {}", .0.join(", "))]
    UnknownPlaceholders(Vec<String>),
}

/// A validated naming pattern split into literal text and placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    parts: Vec<PatternPart>,
}

impl Pattern {
    pub fn parse(input: &str) -> Result<Pattern, PatternError> {
        validate_pattern(input)?;
        let parts = split_parts(input)?;
        Ok(Pattern {
            source: input.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[PatternPart] {
        &self.parts
    }

    /// The pattern is nothing but `{version+1}`.
    pub fn is_version_bump(&self) -> bool {
        matches!(
            self.parts.as_slice(),
            [PatternPart::Placeholder(Placeholder::VersionUp)]
        )
    }

    /// Leftmost `{version+1}` / `{version-1}` in the pattern.
    pub fn first_version_arithmetic(&self) -> Option<Placeholder> {
        self.parts.iter().find_map(|part| match part {
            PatternPart::Placeholder(p) if p.version_delta().is_some() => Some(*p),
            _ => None,
        })
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Syntactic checks only. Whether a version placeholder resolves is decided per item.
pub fn validate_pattern(input: &str) -> Result<(), PatternError> {
    let has_known = Placeholder::ALL
        .iter()
        .any(|p| input.contains(&p.to_string()));
    if !has_known {
        return Err(PatternError::MissingPlaceholder);
    }

    if input.matches('{').count() != input.matches('}').count() {
        return Err(PatternError::UnbalancedBraces);
    }

    let unknown: Vec<String> = BRACED_SPAN
        .captures_iter(input)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| Placeholder::from_name(name).is_none())
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        return Err(PatternError::UnknownPlaceholders(unknown));
    }

    Ok(())
}

fn split_parts(input: &str) -> Result<Vec<PatternPart>, PatternError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(PatternPart::Literal(std::mem::take(&mut literal)));
                }
                let mut name = String::new();
                let mut found_close = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        found_close = true;
                        break;
                    }
                    if next == '{' {
                        return Err(PatternError::UnbalancedBraces);
                    }
                    name.push(next);
                }
                if !found_close {
                    return Err(PatternError::UnbalancedBraces);
                }
                let placeholder = Placeholder::from_name(&name)
                    .ok_or_else(|| PatternError::UnknownPlaceholders(vec![name]))?;
                parts.push(PatternPart::Placeholder(placeholder));
            }
            '}' => return Err(PatternError::UnbalancedBraces),
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        parts.push(PatternPart::Literal(literal));
    }

    Ok(parts)
}

fn placeholder_list() -> String {
    Placeholder::ALL
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_original_with_increment() {
        let pattern = Pattern::parse("{original}_{version+1}").expect("must parse");
        assert_eq!(
            pattern.parts(),
            &[
                PatternPart::Placeholder(Placeholder::Original),
                PatternPart::Literal("_".to_string()),
                PatternPart::Placeholder(Placeholder::VersionUp),
            ]
        );
        assert_eq!(
            pattern.first_version_arithmetic(),
            Some(Placeholder::VersionUp)
        );
        assert!(!pattern.is_version_bump());
    }

    #[test]
    fn rejects_unknown_placeholder() {
        let err = validate_pattern("{foo}").expect_err("must fail");
        assert_eq!(err, PatternError::MissingPlaceholder);

        let err = validate_pattern("{n}_{foo}_{bar}").expect_err("must fail");
        assert_eq!(
            err,
            PatternError::UnknownPlaceholders(vec!["foo".to_string(), "bar".to_string()])
        );
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert_eq!(
            validate_pattern("{n"),
            Err(PatternError::MissingPlaceholder)
        );
        assert_eq!(
            validate_pattern("{n}_{original"),
            Err(PatternError::UnbalancedBraces)
        );
    }

    #[test]
    fn rejects_static_text() {
        assert_eq!(
            validate_pattern("static text"),
            Err(PatternError::MissingPlaceholder)
        );
    }

    #[test]
    fn rejects_empty_braces() {
        assert_eq!(
            validate_pattern("{n}_{}"),
            Err(PatternError::UnknownPlaceholders(vec![String::new()]))
        );
    }

    #[test]
    fn parse_rejects_misordered_braces_with_balanced_counts() {
        let err = Pattern::parse("}{n}{").expect_err("must fail");
        assert_eq!(err, PatternError::UnbalancedBraces);
    }

    #[test]
    fn bare_increment_is_a_version_bump() {
        let pattern: Pattern = "{version+1}".parse().expect("must parse");
        assert!(pattern.is_version_bump());

        let pattern: Pattern = "{version+1}_".parse().expect("must parse");
        assert!(!pattern.is_version_bump());
    }

    #[test]
    fn first_arithmetic_is_leftmost() {
        let pattern = Pattern::parse("{n}_{version-1}_{version+1}").expect("must parse");
        assert_eq!(
            pattern.first_version_arithmetic(),
            Some(Placeholder::VersionDown)
        );
    }

    #[test]
    fn error_lists_placeholder_vocabulary() {
        let message = PatternError::MissingPlaceholder.to_string();
        assert!(message.contains("{current_date}"));
        assert!(message.contains("{version-1}"));
    }
}
