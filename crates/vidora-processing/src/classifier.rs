use rand::Rng;
use uuid::Uuid;
use vidora_core::models::Classification;

/// Decides the content-safety verdict recorded when processing completes.
pub trait ClassificationPolicy: Send + Sync {
    fn classify(&self, resource_id: Uuid) -> Classification;
}

/// Unweighted coin flip. Stands in for a real content-safety check.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomClassifier;

impl ClassificationPolicy for RandomClassifier {
    fn classify(&self, _resource_id: Uuid) -> Classification {
        if rand::rng().random_bool(0.5) {
            Classification::Flagged
        } else {
            Classification::Safe
        }
    }
}

/// Always returns the same verdict.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(pub Classification);

impl ClassificationPolicy for FixedClassifier {
    fn classify(&self, _resource_id: Uuid) -> Classification {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_classifier_yields_both_verdicts() {
        let classifier = RandomClassifier;
        let verdicts: Vec<Classification> =
            (0..200).map(|_| classifier.classify(Uuid::new_v4())).collect();
        assert!(verdicts.contains(&Classification::Safe));
        assert!(verdicts.contains(&Classification::Flagged));
    }

    #[test]
    fn test_fixed_classifier() {
        let classifier = FixedClassifier(Classification::Safe);
        assert_eq!(classifier.classify(Uuid::new_v4()), Classification::Safe);
    }
}
