//! Candidate search points and the set of points already queried

use crate::geo::{Delta, GeoPoint};
use rand::Rng;
use std::collections::HashSet;

/// A frontier entry and its per-point state
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStep {
    pub point: GeoPoint,
    /// Neighbour offset used the next time this point is expanded
    pub delta: Delta,
    /// New venues found by this point's most recent iteration
    pub last_new_venues: u64,
}

/// Points waiting to be expanded, plus every point ever queried
///
/// A point is never admitted to the frontier once it has been queried, and appears in
/// it at most once.
#[derive(Debug, Default)]
pub struct Frontier {
    steps: Vec<SearchStep>,
    members: HashSet<GeoPoint>,
    visited: HashSet<GeoPoint>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `point` unless it was already queried or is already waiting
    ///
    /// # Returns
    ///
    /// `true` if the point was added
    pub fn push(&mut self, point: GeoPoint, delta: Delta) -> bool {
        if self.visited.contains(&point) || !self.members.insert(point) {
            return false;
        }
        self.steps.push(SearchStep {
            point,
            delta,
            last_new_venues: 0,
        });
        true
    }

    /// Index of an entry chosen uniformly at random
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.steps.is_empty() {
            None
        } else {
            Some(rng.gen_range(0..self.steps.len()))
        }
    }

    pub fn get(&self, index: usize) -> Option<&SearchStep> {
        self.steps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SearchStep> {
        self.steps.get_mut(index)
    }

    /// Drops an entry for good
    pub fn remove(&mut self, index: usize) -> SearchStep {
        let step = self.steps.swap_remove(index);
        self.members.remove(&step.point);
        step
    }

    /// Records that `point` has been queried
    ///
    /// # Returns
    ///
    /// `true` if the point had not been queried before
    pub fn mark_visited(&mut self, point: GeoPoint) -> bool {
        self.visited.insert(point)
    }

    pub fn is_visited(&self, point: &GeoPoint) -> bool {
        self.visited.contains(point)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.members.contains(point)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
