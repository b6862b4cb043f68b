//! `gather_subset` resolution.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{FactsError, Result};

/// A fact category, each backed by one command battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FactSubset {
    /// Identity, running config, interfaces, LLDP and VLAN tagging.
    Default,
    /// IPv4 and IPv6 routes across all VRFs.
    Routing,
}

impl FactSubset {
    /// Every known category.
    pub const ALL: [FactSubset; 2] = [FactSubset::Default, FactSubset::Routing];

    /// The category name used in `gather_subset` tokens.
    pub fn name(&self) -> &'static str {
        match self {
            FactSubset::Default => "default",
            FactSubset::Routing => "routing",
        }
    }
}

impl fmt::Display for FactSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FactSubset {
    type Err = FactsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FactSubset::ALL
            .into_iter()
            .find(|subset| subset.name() == s)
            .ok_or_else(|| FactsError::InvalidSubset {
                subset: s.to_string(),
            })
    }
}

/// Resolve `gather_subset` tokens into the categories to gather.
///
/// `all` and bare names are included, `!all` and `!name` excluded. An empty
/// include set means every category. `default` is always gathered.
pub fn resolve_subsets<S: AsRef<str>>(tokens: &[S]) -> Result<BTreeSet<FactSubset>> {
    let mut include = BTreeSet::new();
    let mut exclude = BTreeSet::new();

    for token in tokens {
        let token = token.as_ref().trim();
        let (target, name) = match token.strip_prefix('!') {
            Some(name) => (&mut exclude, name),
            None => (&mut include, token),
        };
        if name == "all" {
            target.extend(FactSubset::ALL);
        } else {
            target.insert(name.parse::<FactSubset>()?);
        }
    }

    if include.is_empty() {
        include.extend(FactSubset::ALL);
    }
    let mut resolved: BTreeSet<FactSubset> = include.difference(&exclude).copied().collect();
    resolved.insert(FactSubset::Default);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn resolve(tokens: &[&str]) -> Vec<FactSubset> {
        resolve_subsets(tokens).unwrap().into_iter().collect()
    }

    #[test]
    fn test_all_minus_routing() {
        assert_eq!(resolve(&["all", "!routing"]), vec![FactSubset::Default]);
    }

    #[test]
    fn test_empty_means_everything() {
        assert_eq!(
            resolve(&[]),
            vec![FactSubset::Default, FactSubset::Routing]
        );
    }

    #[test]
    fn test_exclude_all_keeps_default() {
        assert_eq!(resolve(&["!all"]), vec![FactSubset::Default]);
        // default cannot be excluded
        assert_eq!(
            resolve(&["!default"]),
            vec![FactSubset::Default, FactSubset::Routing]
        );
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(
            resolve(&["routing"]),
            vec![FactSubset::Default, FactSubset::Routing]
        );
        assert_eq!(resolve(&["default"]), vec![FactSubset::Default]);
    }

    #[test]
    fn test_unknown_subset_rejected() {
        let err = resolve_subsets(&["bogus"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Facts(FactsError::InvalidSubset { ref subset }) if subset == "bogus"
        ));
        assert!(resolve_subsets(&["!bogus"]).is_err());
        assert_eq!(
            FactsError::InvalidSubset { subset: "x".into() }.to_string(),
            "Bad subset 'x'"
        );
    }
}
