use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::issues::models::{Department, IssueCategory};
use crate::features::issues::services::classifier::{
    Classification, ImagePayload, IssueClassifier, ReferenceIssue,
};
use crate::features::issues::services::geo_index::GeoIndex;

/// Outcome of duplicate resolution for one submission.
#[derive(Debug, Clone)]
pub enum MatchDecision {
    /// Fresh issue; create a report from the oracle's classification.
    Create(Classification),
    /// Restatement of an open report; fold the submission in. Category and
    /// department are the existing report's, never the oracle's re-guess.
    Merge {
        report_id: Uuid,
        description: String,
        category: IssueCategory,
        department: Department,
    },
}

/// Decides whether a submission is a fresh issue or a restatement of an open
/// one. Collaborators are injected so the decision path is testable without
/// a database or a live oracle.
pub struct DuplicateMatcher {
    geo_index: Arc<dyn GeoIndex>,
    classifier: Arc<dyn IssueClassifier>,
    radius_meters: f64,
    oracle_timeout: Duration,
}

impl DuplicateMatcher {
    pub fn new(
        geo_index: Arc<dyn GeoIndex>,
        classifier: Arc<dyn IssueClassifier>,
        radius_meters: f64,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            geo_index,
            classifier,
            radius_meters,
            oracle_timeout,
        }
    }

    pub async fn resolve(
        &self,
        lat: f64,
        lon: f64,
        image: &ImagePayload,
    ) -> Result<MatchDecision> {
        let candidates = self
            .geo_index
            .find_open_within(lat, lon, self.radius_meters)
            .await?;

        // Index 0 is the nearest candidate; the index contract guarantees
        // distance-ascending order with id tie-break.
        match candidates.into_iter().next() {
            None => {
                tracing::debug!(lat, lon, "No nearby open reports");
                let mut classification = self.classify(image, None).await?;
                // Nothing to compare against, whatever the oracle guessed.
                classification.duplicate = false;
                Ok(MatchDecision::Create(classification))
            }
            Some(candidate) => {
                tracing::debug!(
                    lat,
                    lon,
                    candidate_id = %candidate.id,
                    distance_meters = candidate.distance_meters,
                    "Comparing against nearest open report"
                );
                let reference = ReferenceIssue {
                    description: candidate.description.clone(),
                    category: candidate.category,
                };
                let judged = self.classify(image, Some(&reference)).await?;

                if judged.duplicate {
                    Ok(MatchDecision::Merge {
                        report_id: candidate.id,
                        description: candidate.description,
                        category: candidate.category,
                        department: candidate.department,
                    })
                } else {
                    Ok(MatchDecision::Create(judged))
                }
            }
        }
    }

    /// Oracle latency is unbounded; a timeout here means no report mutation
    /// has happened yet, so the submitter can simply retry.
    async fn classify(
        &self,
        image: &ImagePayload,
        reference: Option<&ReferenceIssue>,
    ) -> Result<Classification> {
        tokio::time::timeout(self.oracle_timeout, self.classifier.classify(image, reference))
            .await
            .map_err(|_| {
                AppError::ClassificationFailed(format!(
                    "oracle did not answer within {:?}",
                    self.oracle_timeout
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::issues::models::CandidateReport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeGeoIndex {
        result: Result<Vec<CandidateReport>>,
    }

    #[async_trait]
    impl GeoIndex for FakeGeoIndex {
        async fn find_open_within(
            &self,
            _lat: f64,
            _lon: f64,
            _radius_meters: f64,
        ) -> Result<Vec<CandidateReport>> {
            match &self.result {
                Ok(candidates) => Ok(candidates.clone()),
                Err(_) => Err(AppError::StoreUnavailable(sqlx::Error::PoolTimedOut)),
            }
        }
    }

    struct FakeClassifier {
        response: Classification,
        delay: Option<Duration>,
        seen_references: Mutex<Vec<Option<String>>>,
    }

    impl FakeClassifier {
        fn answering(response: Classification) -> Self {
            Self {
                response,
                delay: None,
                seen_references: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IssueClassifier for FakeClassifier {
        async fn classify(
            &self,
            _image: &ImagePayload,
            reference: Option<&ReferenceIssue>,
        ) -> Result<Classification> {
            self.seen_references
                .lock()
                .unwrap()
                .push(reference.map(|r| r.description.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.response.clone())
        }
    }

    fn image() -> ImagePayload {
        ImagePayload {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn classification(duplicate: bool) -> Classification {
        Classification {
            description: "Overflowing garbage bin".to_string(),
            category: IssueCategory::Garbage,
            department: Department::DrinkingWaterAndSanitation,
            duplicate,
        }
    }

    fn candidate(id: u128, distance_meters: f64) -> CandidateReport {
        CandidateReport {
            id: Uuid::from_u128(id),
            description: "Garbage pile at the corner".to_string(),
            category: IssueCategory::Garbage,
            department: Department::DrinkingWaterAndSanitation,
            distance_meters,
        }
    }

    fn matcher(
        candidates: Vec<CandidateReport>,
        classifier: FakeClassifier,
    ) -> (DuplicateMatcher, Arc<FakeClassifier>) {
        let classifier = Arc::new(classifier);
        let matcher = DuplicateMatcher::new(
            Arc::new(FakeGeoIndex {
                result: Ok(candidates),
            }),
            Arc::clone(&classifier) as Arc<dyn IssueClassifier>,
            20.0,
            Duration::from_secs(5),
        );
        (matcher, classifier)
    }

    #[tokio::test]
    async fn test_no_candidates_creates_with_duplicate_forced_false() {
        // Oracle claims duplicate=true, but there is nothing to compare
        // against, so the decision must still be a non-duplicate create.
        let (matcher, classifier) = matcher(vec![], FakeClassifier::answering(classification(true)));

        let decision = matcher.resolve(12.9, 77.6, &image()).await.unwrap();

        match decision {
            MatchDecision::Create(c) => assert!(!c.duplicate),
            other => panic!("expected Create, got {:?}", other),
        }
        assert_eq!(
            classifier.seen_references.lock().unwrap().as_slice(),
            &[None]
        );
    }

    #[tokio::test]
    async fn test_duplicate_verdict_merges_onto_candidate() {
        let (matcher, _) = matcher(
            vec![candidate(1, 8.0)],
            FakeClassifier::answering(classification(true)),
        );

        let decision = matcher.resolve(12.9001, 77.6001, &image()).await.unwrap();

        match decision {
            MatchDecision::Merge {
                report_id,
                category,
                department,
                ..
            } => {
                assert_eq!(report_id, Uuid::from_u128(1));
                // Existing classification is carried, not the oracle's re-guess
                assert_eq!(category, IssueCategory::Garbage);
                assert_eq!(department, Department::DrinkingWaterAndSanitation);
            }
            other => panic!("expected Merge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_duplicate_verdict_creates_from_oracle_output() {
        let (matcher, _) = matcher(
            vec![candidate(1, 8.0)],
            FakeClassifier::answering(Classification {
                description: "Broken streetlight".to_string(),
                category: IssueCategory::Streetlight,
                department: Department::Energy,
                duplicate: false,
            }),
        );

        let decision = matcher.resolve(12.9, 77.6, &image()).await.unwrap();

        match decision {
            MatchDecision::Create(c) => {
                assert_eq!(c.category, IssueCategory::Streetlight);
                assert_eq!(c.department, Department::Energy);
            }
            other => panic!("expected Create, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nearest_candidate_is_the_comparison_reference() {
        let mut far = candidate(7, 18.0);
        far.description = "Far report".to_string();
        let mut near = candidate(9, 3.0);
        near.description = "Near report".to_string();

        // Index contract: sorted nearest-first
        let (matcher, classifier) = matcher(
            vec![near, far],
            FakeClassifier::answering(classification(true)),
        );

        let decision = matcher.resolve(12.9, 77.6, &image()).await.unwrap();

        match decision {
            MatchDecision::Merge { report_id, .. } => assert_eq!(report_id, Uuid::from_u128(9)),
            other => panic!("expected Merge, got {:?}", other),
        }
        assert_eq!(
            classifier.seen_references.lock().unwrap().as_slice(),
            &[Some("Near report".to_string())]
        );
    }

    #[tokio::test]
    async fn test_geo_index_failure_surfaces_store_unavailable() {
        let matcher = DuplicateMatcher::new(
            Arc::new(FakeGeoIndex {
                result: Err(AppError::StoreUnavailable(sqlx::Error::PoolTimedOut)),
            }),
            Arc::new(FakeClassifier::answering(classification(false))),
            20.0,
            Duration::from_secs(5),
        );

        let err = matcher.resolve(12.9, 77.6, &image()).await.unwrap_err();

        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_oracle_times_out_as_classification_failed() {
        let matcher = DuplicateMatcher::new(
            Arc::new(FakeGeoIndex { result: Ok(vec![]) }),
            Arc::new(FakeClassifier {
                response: classification(false),
                delay: Some(Duration::from_millis(50)),
                seen_references: Mutex::new(Vec::new()),
            }),
            20.0,
            Duration::from_millis(5),
        );

        let err = matcher.resolve(12.9, 77.6, &image()).await.unwrap_err();

        assert!(matches!(err, AppError::ClassificationFailed(_)));
    }
}
