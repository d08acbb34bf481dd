//! One-shot NPC and boss announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use super::patterns::{RE_EDEN, RE_JESTER, RE_MERCHANT};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum TransientKind {
    Merchant,
    Jester,
    Eden,
}

/// How strongly a line matched its event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum MatchTier {
    Exact,
    Relaxed,
    Pattern,
}

/// Extra text captured from an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    pub name: String,
    pub location: String,
}

/// A transient event found in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientHit {
    pub kind: TransientKind,
    pub tier: MatchTier,
    /// Timestamp of the announcing log line
    pub logged_at: DateTime<Utc>,
    pub detail: Option<EventDetail>,
}

struct Family {
    exact: &'static str,
    relaxed: &'static [&'static str],
}

const MERCHANT: Family = Family {
    exact: "[merchant]: mari has arrived on the island",
    relaxed: &["[merchant]:", "mari", "has arrived"],
};

const JESTER: Family = Family {
    exact: "[merchant]: jester has arrived on the island",
    relaxed: &["[merchant]:", "jester", "has arrived"],
};

const EDEN: Family = Family {
    exact: "the devourer of the void, <b>eden</b> has appeared somewhere in <i>the limbo</i>",
    relaxed: &["eden", "has appeared"],
};

impl TransientKind {
    /// Test one line against this event family: exact text, then relaxed
    /// substrings, then regex fallbacks.
    pub fn match_line(self, line: &str) -> Option<(MatchTier, Option<EventDetail>)> {
        match self {
            TransientKind::Merchant => match_family(&MERCHANT, &RE_MERCHANT, line),
            TransientKind::Jester => match_family(&JESTER, &RE_JESTER, line),
            TransientKind::Eden => {
                let (tier, _) = match_family(&EDEN, std::slice::from_ref(&*RE_EDEN), line)?;
                let detail = RE_EDEN.captures(line).map(|caps| EventDetail {
                    name: caps[1].trim().to_string(),
                    location: caps[2].trim().to_string(),
                });
                Some((tier, detail))
            }
        }
    }
}

fn match_family(
    family: &Family,
    patterns: &[regex::Regex],
    line: &str,
) -> Option<(MatchTier, Option<EventDetail>)> {
    let lower = line.to_lowercase();

    if lower.contains(family.exact) {
        return Some((MatchTier::Exact, None));
    }
    if family.relaxed.iter().all(|part| lower.contains(part)) {
        return Some((MatchTier::Relaxed, None));
    }
    if patterns.iter().any(|re| re.is_match(line)) {
        return Some((MatchTier::Pattern, None));
    }
    None
}
