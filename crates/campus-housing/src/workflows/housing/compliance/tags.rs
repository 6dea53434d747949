use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Closed tag vocabulary with a distinguished "no violation" member.
pub trait ViolationTag: Copy + Ord + std::fmt::Debug {
    const NONE: Self;
}

/// Violation tags declared against a person holding rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonViolation {
    None,
    OverStandardOccupancy,
    NoBasisOccupancy,
    UnauthorizedUseChange,
    IdleWaste,
    SubletToOthers,
}

impl ViolationTag for PersonViolation {
    const NONE: Self = PersonViolation::None;
}

/// Violation tags declared against a shared room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomViolation {
    None,
    OverCapacityOccupancy,
    PartiallyUnauthorizedOccupants,
    UnauthorizedSharedUse,
}

impl ViolationTag for RoomViolation {
    const NONE: Self = RoomViolation::None;
}

/// Normalized tag set: `NONE` is present exactly when nothing else is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<T>",
    into = "Vec<T>",
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct ViolationSet<T: ViolationTag>(BTreeSet<T>);

impl<T: ViolationTag> ViolationSet<T> {
    pub fn normalized(tags: impl IntoIterator<Item = T>) -> Self {
        Self(normalize(tags.into_iter().collect()))
    }

    pub fn clear() -> Self {
        Self::normalized(std::iter::empty())
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::normalized(self.0.iter().chain(other.0.iter()).copied())
    }

    pub fn insert(&mut self, tag: T) {
        self.0.insert(tag);
        self.0 = normalize(std::mem::take(&mut self.0));
    }

    pub fn contains(&self, tag: T) -> bool {
        self.0.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.0.iter().copied()
    }

    /// Declared violations, excluding the "no violation" marker.
    pub fn violations(&self) -> impl Iterator<Item = T> + '_ {
        self.iter().filter(|tag| *tag != T::NONE)
    }

    pub fn violation_count(&self) -> usize {
        self.violations().count()
    }

    pub fn is_clear(&self) -> bool {
        self.violation_count() == 0
    }
}

impl<T: ViolationTag> Default for ViolationSet<T> {
    fn default() -> Self {
        Self::clear()
    }
}

impl<T: ViolationTag> From<Vec<T>> for ViolationSet<T> {
    fn from(value: Vec<T>) -> Self {
        Self::normalized(value)
    }
}

impl<T: ViolationTag> From<ViolationSet<T>> for Vec<T> {
    fn from(value: ViolationSet<T>) -> Self {
        value.0.into_iter().collect()
    }
}

/// Drops `NONE` alongside real violations and inserts it into an empty set.
pub fn normalize<T: ViolationTag>(mut tags: BTreeSet<T>) -> BTreeSet<T> {
    if tags.len() > 1 {
        tags.remove(&T::NONE);
    }
    if tags.is_empty() {
        tags.insert(T::NONE);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_violation_overrides_none_marker() {
        let set = ViolationSet::normalized([
            PersonViolation::None,
            PersonViolation::IdleWaste,
        ]);
        assert!(!set.contains(PersonViolation::None));
        assert_eq!(set.violation_count(), 1);
    }

    #[test]
    fn empty_input_becomes_none_marker() {
        let set = ViolationSet::<RoomViolation>::normalized(Vec::new());
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![RoomViolation::None]);
        assert!(set.is_clear());
    }

    #[test]
    fn union_renormalizes() {
        let clear = ViolationSet::<RoomViolation>::clear();
        let flagged = ViolationSet::normalized([RoomViolation::UnauthorizedSharedUse]);
        let merged = clear.union(&flagged);
        assert_eq!(
            merged.iter().collect::<Vec<_>>(),
            vec![RoomViolation::UnauthorizedSharedUse]
        );
    }

    #[test]
    fn deserialization_applies_normalization() {
        let set: ViolationSet<PersonViolation> =
            serde_json::from_str(r#"["none", "sublet_to_others", "sublet_to_others"]"#)
                .expect("parses");
        assert_eq!(
            Vec::from(set),
            vec![PersonViolation::SubletToOthers]
        );
    }
}
