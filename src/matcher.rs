//! Observation-to-feature matching.
//!
//! Every observation is assigned at most one feature. When several features
//! contain the position, the one with the smallest `begin` wins, then the
//! smallest identifier, then the earliest loaded row. The losing candidates
//! are discarded. Strand is carried along but never consulted.

use crate::feature::{GeneFeature, Observation};
use crate::index::ScaffoldIndex;
use std::sync::Arc;

/// The feature selected for one observation.
#[derive(Debug, Clone)]
pub struct FeatureMatch {
    /// Slot of the feature in its scaffold index.
    pub slot: usize,
    pub feature: Arc<GeneFeature>,
}

/// An observation and the feature it was assigned to, if any.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub observation: Observation,
    pub matched: Option<FeatureMatch>,
}

impl Assignment {
    #[inline]
    pub fn is_intergenic(&self) -> bool {
        self.matched.is_none()
    }
}

/// Matcher output for one scaffold.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldMatches {
    /// One entry per input observation, in input order.
    pub assignments: Vec<Assignment>,
    /// Observations that had more than one candidate feature.
    pub ambiguous: usize,
}

/// Pick the winning slot among candidates.
pub fn select_slot(index: &ScaffoldIndex, candidates: &[usize]) -> Option<usize> {
    let features = index.features();
    candidates
        .iter()
        .copied()
        .min_by(|&a, &b| features[a].selection_cmp(&features[b]))
}

/// Matches observations against a scaffold index.
#[derive(Debug, Clone, Copy)]
pub struct OverlapMatcher<'a> {
    index: Option<&'a ScaffoldIndex>,
}

impl<'a> OverlapMatcher<'a> {
    /// A matcher for one scaffold. `None` means the scaffold has no features,
    /// so every observation on it is intergenic.
    pub fn new(index: Option<&'a ScaffoldIndex>) -> Self {
        Self { index }
    }

    /// Candidate slots and the selected one for a position.
    pub fn candidates(&self, position: u64) -> (Vec<usize>, Option<usize>) {
        match self.index {
            Some(index) => {
                let slots = index.containing_slots(position);
                let selected = select_slot(index, &slots);
                (slots, selected)
            }
            None => (Vec::new(), None),
        }
    }

    /// Assign every observation; output order follows input order.
    pub fn match_observations(&self, observations: Vec<Observation>) -> ScaffoldMatches {
        let Some(index) = self.index else {
            return ScaffoldMatches {
                assignments: observations
                    .into_iter()
                    .map(|observation| Assignment {
                        observation,
                        matched: None,
                    })
                    .collect(),
                ambiguous: 0,
            };
        };

        let mut ambiguous = 0;
        let assignments = observations
            .into_iter()
            .map(|observation| {
                let (slots, selected) = self.candidates(observation.position);
                if slots.len() > 1 {
                    ambiguous += 1;
                }
                Assignment {
                    matched: selected.map(|slot| FeatureMatch {
                        slot,
                        feature: Arc::clone(&index.features()[slot]),
                    }),
                    observation,
                }
            })
            .collect();

        ScaffoldMatches {
            assignments,
            ambiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Strand;

    fn gene(begin: u64, end: u64, tag: &str) -> GeneFeature {
        GeneFeature::new("chr", begin, end, Strand::Plus).with_tag(tag)
    }

    fn obs(barcode: &str, position: u64) -> Observation {
        Observation::new(barcode, "chr", position)
    }

    fn assigned_tag(assignment: &Assignment) -> Option<&str> {
        assignment.matched.as_ref().map(|m| m.feature.id())
    }

    #[test]
    fn test_containment() {
        let index = ScaffoldIndex::new(vec![gene(100, 200, "A")]);
        let matcher = OverlapMatcher::new(Some(&index));

        let observations = [99, 100, 150, 200, 201]
            .iter()
            .enumerate()
            .map(|(i, &p)| obs(&format!("bc{}", i), p))
            .collect();
        let result = matcher.match_observations(observations);

        let tags: Vec<Option<&str>> = result.assignments.iter().map(assigned_tag).collect();
        assert_eq!(tags, vec![None, Some("A"), Some("A"), Some("A"), None]);
        assert_eq!(result.ambiguous, 0);
    }

    #[test]
    fn test_smaller_begin_wins() {
        let index = ScaffoldIndex::new(vec![gene(200, 400, "B"), gene(100, 300, "A")]);
        let matcher = OverlapMatcher::new(Some(&index));

        let result = matcher.match_observations(vec![obs("x", 250)]);

        assert_eq!(assigned_tag(&result.assignments[0]), Some("A"));
        assert_eq!(result.ambiguous, 1);
    }

    #[test]
    fn test_identifier_breaks_begin_tie() {
        // "B" is shorter and loaded first; identifier order still decides
        let index = ScaffoldIndex::new(vec![
            gene(100, 260, "B").with_row(0),
            gene(100, 300, "A").with_row(1),
        ]);
        let matcher = OverlapMatcher::new(Some(&index));

        let result = matcher.match_observations(vec![obs("x", 250)]);
        assert_eq!(assigned_tag(&result.assignments[0]), Some("A"));
    }

    #[test]
    fn test_select_slot_explicit() {
        let index = ScaffoldIndex::new(vec![
            gene(100, 300, "Z"),
            gene(100, 300, "M"),
            gene(50, 60, "early"),
        ]);
        let slots = index.containing_slots(200);

        let selected = select_slot(&index, &slots).unwrap();
        assert_eq!(index.features()[selected].id(), "M");
        assert_eq!(select_slot(&index, &[]), None);
    }

    #[test]
    fn test_strand_ignored() {
        let index = ScaffoldIndex::new(vec![
            GeneFeature::new("chr", 100, 200, Strand::Minus).with_tag("A")
        ]);
        let matcher = OverlapMatcher::new(Some(&index));

        let result =
            matcher.match_observations(vec![obs("x", 150).with_strand(Strand::Plus)]);

        assert_eq!(assigned_tag(&result.assignments[0]), Some("A"));
        assert_eq!(result.assignments[0].observation.strand, Strand::Plus);
    }

    #[test]
    fn test_unindexed_scaffold() {
        let matcher = OverlapMatcher::new(None);

        let result = matcher.match_observations(vec![obs("x", 150), obs("y", 10)]);

        assert_eq!(result.assignments.len(), 2);
        assert!(result.assignments.iter().all(|a| a.is_intergenic()));
    }

    #[test]
    fn test_deterministic() {
        let features = vec![
            gene(100, 300, "B"),
            gene(100, 300, "A"),
            gene(150, 500, "C"),
            gene(90, 120, "D"),
        ];
        let observations: Vec<Observation> =
            (80..520).step_by(7).map(|p| obs(&format!("bc{}", p), p)).collect();

        let forward = ScaffoldIndex::new(features.clone());
        let first = OverlapMatcher::new(Some(&forward))
            .match_observations(observations.clone())
            .assignments;
        let mut reversed = features;
        reversed.reverse();
        let backward = ScaffoldIndex::new(reversed);
        let second = OverlapMatcher::new(Some(&backward))
            .match_observations(observations)
            .assignments;

        let tags = |a: &[Assignment]| -> Vec<Option<String>> {
            a.iter()
                .map(|x| assigned_tag(x).map(|s| s.to_string()))
                .collect()
        };
        assert_eq!(tags(&first), tags(&second));
    }
}
