//! Bounded best-score register.
//!
//! Members are kept sorted by descending score; among equal scores the
//! earlier admission ranks first. Once `k` members are held, a newcomer
//! only displaces the weakest member when it scores strictly higher, so the
//! admission floor never decreases.

use crate::slice::SliceId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Member {
    pub id: SliceId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Inserted,
    Replaced(SliceId),
    Rejected,
}

impl Offer {
    pub fn admitted(self) -> bool {
        !matches!(self, Offer::Rejected)
    }
}

#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    members: Vec<Member>,
    floor_history: Vec<f64>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            members: Vec::with_capacity(k),
            floor_history: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.k
    }

    /// Score of the weakest member, once the register is full.
    pub fn min_score(&self) -> Option<f64> {
        if self.is_full() {
            self.members.last().map(|m| m.score)
        } else {
            None
        }
    }

    /// Admission floor used for pruning: 0 until `k` members are held.
    pub fn floor(&self) -> f64 {
        self.min_score().unwrap_or(0.0)
    }

    /// `floor()` recorded after every offer.
    pub fn floor_history(&self) -> &[f64] {
        &self.floor_history
    }

    pub fn offer(&mut self, id: SliceId, score: f64) -> Offer {
        let outcome = if !self.is_full() {
            self.insert_sorted(Member { id, score });
            Offer::Inserted
        } else {
            match self.members.last() {
                Some(weakest) if score > weakest.score => {
                    let evicted = weakest.id;
                    self.members.pop();
                    self.insert_sorted(Member { id, score });
                    Offer::Replaced(evicted)
                }
                _ => Offer::Rejected,
            }
        };
        self.floor_history.push(self.floor());
        outcome
    }

    fn insert_sorted(&mut self, member: Member) {
        // After every member scoring >= the newcomer: ties keep admission order.
        let pos = self.members.partition_point(|m| m.score >= member.score);
        self.members.insert(pos, member);
    }

    /// Members from best to worst.
    pub fn members(&self) -> &[Member] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> SliceId {
        SliceId::new(raw)
    }

    #[test]
    fn not_full_is_non_restrictive() {
        let mut top = TopK::new(3);
        assert_eq!(top.min_score(), None);
        assert_eq!(top.floor(), 0.0);
        assert_eq!(top.offer(id(0), 0.1), Offer::Inserted);
        assert_eq!(top.offer(id(1), 5.0), Offer::Inserted);
        assert_eq!(top.floor(), 0.0);
        assert_eq!(top.offer(id(2), 2.0), Offer::Inserted);
        assert_eq!(top.min_score(), Some(0.1));
    }

    #[test]
    fn replaces_weakest_only_when_strictly_better() {
        let mut top = TopK::new(2);
        top.offer(id(0), 1.0);
        top.offer(id(1), 2.0);

        assert_eq!(top.offer(id(2), 1.0), Offer::Rejected);
        assert_eq!(top.offer(id(3), 0.5), Offer::Rejected);
        assert_eq!(top.offer(id(4), 1.5), Offer::Replaced(id(0)));

        let scores: Vec<f64> = top.members().iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![2.0, 1.5]);
        assert_eq!(top.min_score(), Some(1.5));
    }

    #[test]
    fn single_slot_keeps_first_until_beaten() {
        let mut top = TopK::new(1);
        top.offer(id(0), 1.0);
        assert_eq!(top.offer(id(1), 1.0), Offer::Rejected);
        assert_eq!(top.members()[0].id, id(0));
        assert_eq!(top.offer(id(2), 1.01), Offer::Replaced(id(0)));
        assert_eq!(top.members()[0].id, id(2));
    }

    #[test]
    fn ties_rank_in_admission_order() {
        let mut top = TopK::new(3);
        top.offer(id(0), 1.0);
        top.offer(id(1), 1.0);
        top.offer(id(2), 3.0);
        let ids: Vec<SliceId> = top.members().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![id(2), id(0), id(1)]);
    }

    #[test]
    fn floor_history_is_monotone() {
        let mut top = TopK::new(2);
        for (i, score) in [0.3, 0.9, 0.1, 0.5, 0.4, 2.0, 0.2].into_iter().enumerate() {
            top.offer(id(i as u32), score);
        }
        let history = top.floor_history();
        assert_eq!(history.len(), 7);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(top.min_score(), Some(0.9));
    }
}
