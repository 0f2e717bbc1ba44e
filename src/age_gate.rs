//! Age-gate filter.
//!
//! Audiovisual items use MPAA-style tokens and audio items use
//! `General`/`Explicit`; both map onto one ordinal scale:
//!
//! ```text
//! G, General   -> 1
//! PG           -> 2
//! PG-13        -> 3
//! R, Explicit  -> 4
//! ```
//!
//! An item is visible iff its rank is at most the viewer's ceiling rank.
//! Tokens outside the table are handled by [`UnknownRatingPolicy`].

use crate::content::{CatalogItem, Viewer};
use crate::error::CatalogError;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeRating {
    General = 1,
    ParentalGuidance = 2,
    ParentsStronglyCautioned = 3,
    Restricted = 4,
}

impl AgeRating {
    /// Parse a rating token from either vocabulary. Case and surrounding
    /// whitespace are ignored.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "G" | "GENERAL" => Some(Self::General),
            "PG" => Some(Self::ParentalGuidance),
            "PG-13" => Some(Self::ParentsStronglyCautioned),
            "R" | "EXPLICIT" => Some(Self::Restricted),
            _ => None,
        }
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Ceiling for a profile category: kids see G, teens up to PG-13,
    /// adults everything.
    #[must_use]
    pub fn for_profile_type(profile_type: &str) -> Option<Self> {
        match profile_type.trim().to_lowercase().as_str() {
            "kids" | "niño" | "nino" => Some(Self::General),
            "teen" | "adolescente" => Some(Self::ParentsStronglyCautioned),
            "adult" | "adulto" => Some(Self::Restricted),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "G",
            Self::ParentalGuidance => "PG",
            Self::ParentsStronglyCautioned => "PG-13",
            Self::Restricted => "R",
        }
    }
}

impl fmt::Display for AgeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a rating token that is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRatingPolicy {
    /// Unknown tokens block access, on either side of the comparison.
    #[default]
    Deny,
    /// Unknown tokens rank 0: unknown content is visible to everyone and an
    /// unknown ceiling only sees unknown content.
    Allow,
}

impl FromStr for UnknownRatingPolicy {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "allow" => Ok(Self::Allow),
            other => Err(CatalogError::InvalidInput(format!(
                "unknown rating policy '{other}', expected 'deny' or 'allow'"
            ))),
        }
    }
}

/// Pure access check between an item's rating and a viewer's ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeGate {
    policy: UnknownRatingPolicy,
}

impl AgeGate {
    #[must_use]
    pub const fn new(policy: UnknownRatingPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> UnknownRatingPolicy {
        self.policy
    }

    fn rank(&self, token: &str) -> Option<u8> {
        match (AgeRating::parse(token), self.policy) {
            (Some(rating), _) => Some(rating.rank()),
            (None, UnknownRatingPolicy::Allow) => Some(0),
            (None, UnknownRatingPolicy::Deny) => None,
        }
    }

    /// True iff `rank(content_rating) <= rank(viewer_ceiling)`.
    #[must_use]
    pub fn is_allowed(&self, content_rating: &str, viewer_ceiling: &str) -> bool {
        match (self.rank(content_rating), self.rank(viewer_ceiling)) {
            (Some(content), Some(ceiling)) => content <= ceiling,
            _ => {
                trace!("Unranked rating pair ({content_rating:?}, {viewer_ceiling:?}) denied");
                false
            }
        }
    }

    #[must_use]
    pub fn allows(&self, item: &CatalogItem, viewer: &Viewer) -> bool {
        self.is_allowed(&item.age_rating, &viewer.ceiling)
    }

    /// Keep only the items `viewer` may see, preserving order.
    pub fn filter<'v, I>(&'v self, items: I, viewer: &'v Viewer) -> impl Iterator<Item = CatalogItem> + 'v
    where
        I: IntoIterator<Item = CatalogItem>,
        I::IntoIter: 'v,
    {
        items.into_iter().filter(move |item| self.allows(item, viewer))
    }
}

/// Check with the default (deny-unknown) policy.
#[must_use]
pub fn is_allowed(content_rating: &str, viewer_ceiling: &str) -> bool {
    AgeGate::default().is_allowed(content_rating, viewer_ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENS: [&str; 8] = ["G", "General", "PG", "PG-13", "R", "Explicit", "NC-17", ""];

    #[test]
    fn test_rank_table() {
        assert_eq!(AgeRating::parse("G").map(AgeRating::rank), Some(1));
        assert_eq!(AgeRating::parse("General").map(AgeRating::rank), Some(1));
        assert_eq!(AgeRating::parse("PG").map(AgeRating::rank), Some(2));
        assert_eq!(AgeRating::parse("pg-13").map(AgeRating::rank), Some(3));
        assert_eq!(AgeRating::parse("R").map(AgeRating::rank), Some(4));
        assert_eq!(AgeRating::parse(" Explicit ").map(AgeRating::rank), Some(4));
        assert_eq!(AgeRating::parse("NC-17"), None);
    }

    #[test]
    fn test_vocabularies_share_one_scale() {
        assert!(is_allowed("General", "G"));
        assert!(is_allowed("G", "General"));
        assert!(is_allowed("Explicit", "R"));
        assert!(!is_allowed("Explicit", "PG-13"));
        assert!(is_allowed("PG-13", "Explicit"));
    }

    #[test]
    fn test_deny_policy_blocks_unknown_tokens() {
        let gate = AgeGate::new(UnknownRatingPolicy::Deny);
        assert!(!gate.is_allowed("NC-17", "R"));
        assert!(!gate.is_allowed("G", "Adulto"));
    }

    #[test]
    fn test_allow_policy_ranks_unknown_as_zero() {
        let gate = AgeGate::new(UnknownRatingPolicy::Allow);
        assert!(gate.is_allowed("NC-17", "G"));
        assert!(gate.is_allowed("NC-17", "unknown"));
        assert!(!gate.is_allowed("G", "unknown"));
    }

    #[test]
    fn test_monotonic_in_ceiling() {
        for policy in [UnknownRatingPolicy::Deny, UnknownRatingPolicy::Allow] {
            let gate = AgeGate::new(policy);
            for content in TOKENS {
                for low in TOKENS {
                    for high in TOKENS {
                        let (Some(lo), Some(hi)) = (gate.rank(low), gate.rank(high)) else {
                            continue;
                        };
                        if hi >= lo && gate.is_allowed(content, low) {
                            assert!(
                                gate.is_allowed(content, high),
                                "{policy:?}: {content} allowed at {low} but not at {high}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_profile_type_ceilings() {
        assert_eq!(AgeRating::for_profile_type("kids"), Some(AgeRating::General));
        assert_eq!(AgeRating::for_profile_type("Niño"), Some(AgeRating::General));
        assert_eq!(
            AgeRating::for_profile_type("Adolescente"),
            Some(AgeRating::ParentsStronglyCautioned)
        );
        assert_eq!(AgeRating::for_profile_type("adult"), Some(AgeRating::Restricted));
        assert_eq!(AgeRating::for_profile_type("pet"), None);
    }

    #[test]
    fn test_policy_tokens() {
        assert_eq!("ALLOW".parse::<UnknownRatingPolicy>().unwrap(), UnknownRatingPolicy::Allow);
        assert_eq!(UnknownRatingPolicy::default(), UnknownRatingPolicy::Deny);
        assert!("maybe".parse::<UnknownRatingPolicy>().is_err());
    }
}
