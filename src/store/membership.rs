use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

use crate::model::{ElementId, ElementRef, Member};

/// Reverse index from a member element to the relations whose *current*
/// version lists it directly. Duplicate member rows collapse to one entry.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    by_member: HashMap<ElementRef, BTreeSet<ElementId>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the entries of `relation_id` from its previous member list to
    /// its new one
    pub fn replace(&mut self, relation_id: ElementId, previous: &[Member], current: &[Member]) {
        for element in previous.iter().map(Member::element).unique() {
            if let Some(relations) = self.by_member.get_mut(&element) {
                relations.remove(&relation_id);
                if relations.is_empty() {
                    self.by_member.remove(&element);
                }
            }
        }
        for element in current.iter().map(Member::element).unique() {
            self.by_member
                .entry(element)
                .or_default()
                .insert(relation_id);
        }
    }

    /// Ids of relations directly containing `element`, ascending
    pub fn relations_for(&self, element: &ElementRef) -> impl Iterator<Item = ElementId> + '_ {
        self.by_member
            .get(element)
            .into_iter()
            .flat_map(|relations| relations.iter().copied())
    }
}
