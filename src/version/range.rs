//! npm version ranges
//!
//! Supports npm semver range specifications:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1`, `*`, `x` - wildcards and partial versions
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - `>=1.0.0 <2.0.0` - space-separated comparators, all must hold
//! - `^1.0.0 || ^2.0.0` - alternatives, any may hold
//!
//! A prerelease version only satisfies a comparator set when one of the set's
//! comparators names a prerelease of the same `major.minor.patch`.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::version::semver::{parse_published, parse_version};

/// `>= 1.0.0` -> `>=1.0.0`
static OPERATOR_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|>|<|=|\^|~>?)\s+").expect("valid operator pattern"));

/// Parsed range: alternatives (`||`) of comparator sets (space-separated)
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    sets: Vec<Vec<Comparator>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Comparator {
    /// Exact version match
    Exact(Version),
    /// Caret range; `parts` is how many components were written (`^0` vs `^0.0.1`)
    Caret { base: Version, parts: usize },
    /// Tilde range; `~1` allows minor bumps, `~1.2` and `~1.2.3` only patch bumps
    Tilde { base: Version, parts: usize },
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    /// `*`, `x` or an empty range
    Any,
    /// 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
}

impl RangeSpec {
    /// Parse a range, returning None if any part of it is malformed
    pub fn parse(spec: &str) -> Option<Self> {
        let normalized = OPERATOR_SPACE.replace_all(spec.trim(), "$1");

        let sets = normalized
            .split("||")
            .map(|set| Self::parse_set(set.trim()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self { sets })
    }

    fn parse_set(set: &str) -> Option<Vec<Comparator>> {
        if set.is_empty() {
            return Some(vec![Comparator::Any]);
        }

        if let Some((from, to)) = set.split_once(" - ") {
            return Comparator::parse_hyphen(from.trim(), to.trim());
        }

        set.split_whitespace().map(Comparator::parse).collect()
    }

    /// Check if a version satisfies this range
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_satisfies(set, version))
    }

    /// Check a version string as published; non-semver strings never satisfy
    pub fn satisfies_str(&self, version: &str) -> bool {
        parse_published(version).is_some_and(|v| self.satisfies(&v))
    }
}

fn set_satisfies(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|c| c.satisfies(version)) {
        return false;
    }

    if version.pre.is_empty() {
        return true;
    }

    set.iter().any(|c| {
        c.base().is_some_and(|base| {
            !base.pre.is_empty()
                && base.major == version.major
                && base.minor == version.minor
                && base.patch == version.patch
        })
    })
}

impl Comparator {
    fn parse(token: &str) -> Option<Self> {
        if let Some(rest) = token.strip_prefix(">=") {
            let (base, parts) = parse_partial(rest)?;
            Some(if parts == 0 {
                Comparator::Any
            } else {
                Comparator::Gte(base)
            })
        } else if let Some(rest) = token.strip_prefix("<=") {
            let (base, parts) = parse_partial(rest)?;
            Some(match parts {
                0 => Comparator::Any,
                3 => Comparator::Lte(base),
                _ => Comparator::Lt(bump(&base, parts)),
            })
        } else if let Some(rest) = token.strip_prefix('>') {
            let (base, parts) = parse_partial(rest)?;
            match parts {
                0 => None,
                3 => Some(Comparator::Gt(base)),
                _ => Some(Comparator::Gte(bump(&base, parts))),
            }
        } else if let Some(rest) = token.strip_prefix('<') {
            let (base, parts) = parse_partial(rest)?;
            (parts > 0).then_some(Comparator::Lt(base))
        } else if let Some(rest) = token.strip_prefix('^') {
            let (base, parts) = parse_partial(rest)?;
            Some(if parts == 0 {
                Comparator::Any
            } else {
                Comparator::Caret { base, parts }
            })
        } else if let Some(rest) = token.strip_prefix('~') {
            let rest = rest.strip_prefix('>').unwrap_or(rest);
            let (base, parts) = parse_partial(rest)?;
            Some(if parts == 0 {
                Comparator::Any
            } else {
                Comparator::Tilde { base, parts }
            })
        } else {
            let (base, parts) = parse_partial(token)?;
            Some(match parts {
                0 => Comparator::Any,
                1 => Comparator::WildcardMajor(base.major),
                2 => Comparator::WildcardMinor(base.major, base.minor),
                _ => Comparator::Exact(base),
            })
        }
    }

    /// `1.0.0 - 2.0.0` means >=1.0.0 <=2.0.0; a partial upper bound is exclusive of the next bump
    fn parse_hyphen(from: &str, to: &str) -> Option<Vec<Self>> {
        let (from, from_parts) = parse_partial(from)?;
        let (to, to_parts) = parse_partial(to)?;

        let mut set = Vec::new();
        if from_parts > 0 {
            set.push(Comparator::Gte(from));
        }
        match to_parts {
            0 => {}
            3 => set.push(Comparator::Lte(to)),
            _ => set.push(Comparator::Lt(bump(&to, to_parts))),
        }
        if set.is_empty() {
            set.push(Comparator::Any);
        }
        Some(set)
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version.cmp_precedence(v).is_eq(),
            Comparator::Caret { base, parts } => {
                if version.cmp_precedence(base).is_lt() {
                    return false;
                }
                // ^1.2.3 -> >=1.2.3 <2.0.0
                // ^0.2.3 -> >=0.2.3 <0.3.0
                // ^0.0.3 -> >=0.0.3 <0.0.4
                // ^0 -> <1.0.0, ^0.0 -> <0.1.0
                if base.major > 0 || *parts == 1 {
                    version.major == base.major
                } else if base.minor > 0 || *parts == 2 {
                    version.major == 0 && version.minor == base.minor
                } else {
                    version.major == 0 && version.minor == 0 && version.patch == base.patch
                }
            }
            Comparator::Tilde { base, parts } => {
                if version.cmp_precedence(base).is_lt() || version.major != base.major {
                    return false;
                }
                *parts == 1 || version.minor == base.minor
            }
            // build metadata never takes part in ordering
            Comparator::Gte(v) => version.cmp_precedence(v).is_ge(),
            Comparator::Gt(v) => version.cmp_precedence(v).is_gt(),
            Comparator::Lte(v) => version.cmp_precedence(v).is_le(),
            Comparator::Lt(v) => version.cmp_precedence(v).is_lt(),
            Comparator::Any => true,
            Comparator::WildcardMajor(major) => version.major == *major,
            Comparator::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
        }
    }

    fn base(&self) -> Option<&Version> {
        match self {
            Comparator::Exact(v)
            | Comparator::Gte(v)
            | Comparator::Gt(v)
            | Comparator::Lte(v)
            | Comparator::Lt(v) => Some(v),
            Comparator::Caret { base, .. } | Comparator::Tilde { base, .. } => Some(base),
            Comparator::Any | Comparator::WildcardMajor(_) | Comparator::WildcardMinor(..) => None,
        }
    }
}

fn is_wildcard(component: &str) -> bool {
    matches!(component, "x" | "X" | "*")
}

/// Parse a possibly partial version, returning how many components were given.
/// Wildcard components end the version: `1.x.x` is `(1.0.0, 1)`, `*` is `(0.0.0, 0)`.
fn parse_partial(input: &str) -> Option<(Version, usize)> {
    let input = input.trim();
    let input = input.strip_prefix('=').unwrap_or(input);
    let input = input.strip_prefix('v').unwrap_or(input);
    if input.is_empty() {
        return None;
    }

    let (core, suffix) = match input.find(['-', '+']) {
        Some(idx) => input.split_at(idx),
        None => (input, ""),
    };

    let parts: Vec<&str> = core.split('.').take_while(|c| !is_wildcard(c)).collect();
    // `1-beta` names no complete version to attach the prerelease to
    if parts.len() < 3 && !suffix.is_empty() {
        return None;
    }

    match parts.len() {
        0 => Some((Version::new(0, 0, 0), 0)),
        1 | 2 => parse_version(&parts.join(".")).map(|v| (v, parts.len())),
        _ => parse_version(&format!("{core}{suffix}")).map(|v| (v, 3)),
    }
}

fn bump(base: &Version, parts: usize) -> Version {
    if parts == 1 {
        Version::new(base.major + 1, 0, 0)
    } else {
        Version::new(base.major, base.minor + 1, 0)
    }
}
