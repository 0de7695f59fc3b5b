//! Insertion geometry within a matched gene.

use crate::config::CentralRegion;
use crate::feature::GeneFeature;

/// Derived position of an insertion inside its gene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// `end - begin`.
    pub gene_length: u64,
    /// `(position - begin) / gene_length`; `None` for a single-point gene.
    pub relative_position: Option<f64>,
    pub is_central: bool,
}

impl Geometry {
    /// True when the gene has zero length and no relative position exists.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.relative_position.is_none()
    }
}

/// Classifies matched insertions against a central region.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionClassifier {
    region: CentralRegion,
}

impl PositionClassifier {
    pub fn new(region: CentralRegion) -> Self {
        Self { region }
    }

    pub fn region(&self) -> CentralRegion {
        self.region
    }

    /// Geometry of `position` inside `feature`.
    ///
    /// `position` must lie within the feature. A zero-length feature yields
    /// no relative position and is never central.
    pub fn classify(&self, feature: &GeneFeature, position: u64) -> Geometry {
        let gene_length = feature.len();
        if gene_length == 0 {
            return Geometry {
                gene_length,
                relative_position: None,
                is_central: false,
            };
        }

        let offset = position.saturating_sub(feature.begin);
        let relative = offset as f64 / gene_length as f64;
        Geometry {
            gene_length,
            relative_position: Some(relative),
            is_central: self.region.contains(relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Strand;

    fn gene(begin: u64, end: u64) -> GeneFeature {
        GeneFeature::new("chr", begin, end, Strand::Plus)
    }

    #[test]
    fn test_lower_boundary() {
        let classifier = PositionClassifier::default();
        let feature = gene(100, 200);

        let at = classifier.classify(&feature, 110);
        assert_eq!(at.gene_length, 100);
        assert_eq!(at.relative_position, Some(0.1));
        assert!(at.is_central);

        let before = classifier.classify(&feature, 109);
        assert_eq!(before.relative_position, Some(0.09));
        assert!(!before.is_central);
    }

    #[test]
    fn test_upper_boundary() {
        let classifier = PositionClassifier::default();
        let feature = gene(100, 200);

        assert!(classifier.classify(&feature, 190).is_central);
        assert!(!classifier.classify(&feature, 191).is_central);
    }

    #[test]
    fn test_gene_ends() {
        let classifier = PositionClassifier::default();
        let feature = gene(100, 200);

        assert_eq!(classifier.classify(&feature, 100).relative_position, Some(0.0));
        assert_eq!(classifier.classify(&feature, 200).relative_position, Some(1.0));
        assert!(!classifier.classify(&feature, 200).is_central);
    }

    #[test]
    fn test_degenerate_feature() {
        let classifier = PositionClassifier::default();
        let geometry = classifier.classify(&gene(150, 150), 150);

        assert_eq!(geometry.gene_length, 0);
        assert_eq!(geometry.relative_position, None);
        assert!(!geometry.is_central);
        assert!(geometry.is_degenerate());
    }

    #[test]
    fn test_custom_region() {
        let classifier = PositionClassifier::new(CentralRegion::new(0.0, 0.5).unwrap());
        let feature = gene(0, 10);

        assert!(classifier.classify(&feature, 0).is_central);
        assert!(classifier.classify(&feature, 5).is_central);
        assert!(!classifier.classify(&feature, 6).is_central);
    }
}
