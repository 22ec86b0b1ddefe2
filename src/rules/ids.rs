//! Rule Identifiers

use std::{
    collections::{BTreeSet, btree_set},
    convert::Infallible,
    fmt, iter,
    num::ParseIntError,
    str::FromStr,
};

/// Sales rule identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(u32);

impl RuleId {
    /// Create a rule identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for RuleId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RuleId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

/// An ordered, de-duplicated set of rule identifiers.
///
/// Hosts that store applied rules as a comma-separated string convert at the
/// boundary with [`FromStr`] and [`fmt::Display`]. Parsing is lenient: empty and
/// unparsable segments are dropped rather than failing the whole list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleIdSet {
    ids: BTreeSet<RuleId>,
}

impl RuleIdSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the set contains `id`.
    pub fn contains(&self, id: RuleId) -> bool {
        self.ids.contains(&id)
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> iter::Copied<btree_set::Iter<'_, RuleId>> {
        self.ids.iter().copied()
    }

    /// Identifiers present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.ids.difference(&other.ids).copied().collect()
    }

    /// Remove every identifier that is also present in `other`.
    pub fn remove_all(&mut self, other: &Self) {
        self.ids.retain(|id| !other.ids.contains(id));
    }
}

impl FromIterator<RuleId> for RuleIdSet {
    fn from_iter<I: IntoIterator<Item = RuleId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[u32; N]> for RuleIdSet {
    fn from(ids: [u32; N]) -> Self {
        ids.into_iter().map(RuleId::from).collect()
    }
}

impl Extend<RuleId> for RuleIdSet {
    fn extend<I: IntoIterator<Item = RuleId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

impl IntoIterator for RuleIdSet {
    type Item = RuleId;
    type IntoIter = btree_set::IntoIter<RuleId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'s> IntoIterator for &'s RuleIdSet {
    type Item = RuleId;
    type IntoIter = iter::Copied<btree_set::Iter<'s, RuleId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromStr for RuleIdSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s
            .split(',')
            .filter_map(|segment| segment.parse::<RuleId>().ok())
            .collect())
    }
}

impl fmt::Display for RuleIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.ids.iter();

        if let Some(first) = ids.next() {
            write!(f, "{first}")?;
        }

        for id in ids {
            write!(f, ",{id}")?;
        }

        Ok(())
    }
}
