//! Integration Tests for the prediction pipeline
//!
//! Exercises store → engine → classifier together, the way the HTTP
//! layer drives it.

#[cfg(test)]
mod integration_tests {
    use std::collections::BTreeSet;

    use ndarray::ArrayView2;

    use crate::error::PredictError;
    use crate::features::{FeatureRecord, FeatureSchema};
    use crate::model::{
        loader, ClassLabel, Classifier, ClassifierError, ClassifierHandle, LoadOptions, ModelArtifact,
        ModelStore, Scaler,
    };

    /// `1 if a + b > 0 else 0`, no probabilities
    #[derive(Debug)]
    struct SumRule;

    impl Classifier for SumRule {
        fn kind(&self) -> &'static str {
            "sum_rule"
        }

        fn n_features(&self) -> Option<usize> {
            Some(2)
        }

        fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
            Ok(x.rows()
                .into_iter()
                .map(|row| ClassLabel::Int(if row.sum() > 0.0 { 1 } else { 0 }))
                .collect())
        }
    }

    fn sum_rule_store() -> ModelStore {
        let artifact = ModelArtifact::new(
            ClassifierHandle::Plain(Box::new(SumRule)),
            Some(Scaler::Identity),
            FeatureSchema::Declared(vec!["a".to_string(), "b".to_string()]),
        )
        .unwrap();
        ModelStore::from_artifact(artifact)
    }

    fn rec(pairs: &[(&str, f64)]) -> FeatureRecord {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_sum_rule_scenario() {
        let store = sum_rule_store();

        let positive = store.predict_records(rec(&[("a", 1.0), ("b", 1.0)])).unwrap();
        assert_eq!(positive.labels, vec![ClassLabel::Int(1)]);
        assert!(positive.probabilities.is_none());

        let negative = store.predict_records(rec(&[("a", -1.0), ("b", -1.0)])).unwrap();
        assert_eq!(negative.labels, vec![ClassLabel::Int(0)]);

        let err = store.predict_records(rec(&[("a", 1.0)])).unwrap_err();
        let expected: BTreeSet<String> = ["b".to_string()].into_iter().collect();
        assert_eq!(err, PredictError::MissingFeatures { record: 0, missing: expected });
    }

    #[test]
    fn test_key_order_irrelevant_and_input_order_kept() {
        let store = sum_rule_store();
        let batch = vec![
            rec(&[("b", 5.0), ("a", 1.0)]),
            rec(&[("a", -4.0), ("b", 1.0)]),
            rec(&[("b", 0.5), ("a", 0.0)]),
        ];

        let result = store.predict_records(batch).unwrap();
        assert_eq!(
            result.labels,
            vec![ClassLabel::Int(1), ClassLabel::Int(0), ClassLabel::Int(1)]
        );
    }

    #[test]
    fn test_batch_with_one_bad_record_fails_whole() {
        let store = sum_rule_store();
        let good = rec(&[("a", 1.0), ("b", 1.0)]);
        let batch = vec![good.clone(), good, rec(&[("b", 1.0)])];

        let err = store.predict_records(batch).unwrap_err();
        assert!(matches!(err, PredictError::MissingFeatures { record: 2, .. }));
    }

    #[test]
    fn test_repeated_calls_identical() {
        let store = sum_rule_store();
        let batch = vec![rec(&[("a", 0.3), ("b", -0.1)]), rec(&[("a", -2.0), ("b", 1.0)])];

        let first = store.predict_records(batch.clone()).unwrap();
        let second = store.predict_records(batch).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extra_keys_do_not_change_prediction() {
        let store = sum_rule_store();
        let plain = rec(&[("a", -1.0), ("b", 0.5)]);
        let noisy = rec(&[("zzz", 100.0), ("a", -1.0), ("b", 0.5), ("note", 7.0)]);

        assert_eq!(
            store.predict_records(plain).unwrap(),
            store.predict_records(noisy).unwrap()
        );
    }

    #[test]
    fn test_uninitialized_store() {
        let store = ModelStore::new(LoadOptions::default());
        let err = store.predict_records(rec(&[("a", 1.0), ("b", 1.0)])).unwrap_err();
        assert_eq!(err, PredictError::NotInitialized);
        assert_eq!(err.kind(), "predictor_not_initialized");
    }

    #[test]
    fn test_random_forest_artifact_end_to_end() {
        // Two stumps over standardized features: split feature0 at 0, feature1 at 0
        let json = r#"{
            "classifier": {
                "kind": "random_forest",
                "classes": [0, 1],
                "n_features": 2,
                "estimators": [
                    {"children_left": [1, -1, -1], "children_right": [2, -1, -1],
                     "feature": [0, -2, -2], "threshold": [0.0, -2.0, -2.0],
                     "value": [[10, 10], [9, 1], [1, 9]]},
                    {"children_left": [1, -1, -1], "children_right": [2, -1, -1],
                     "feature": [1, -2, -2], "threshold": [0.0, -2.0, -2.0],
                     "value": [[10, 10], [8, 2], [2, 8]]}
                ]
            },
            "scaler": {"kind": "standard", "mean": [10.0, 5.0], "scale": [2.0, 1.0]},
            "feature_names": ["feature1", "feature2"],
            "metadata": {"training_accuracy": 1.0, "testing_accuracy": 0.97}
        }"#;
        let artifact = loader::from_json_str(json, &LoadOptions::default()).unwrap();
        let store = ModelStore::from_artifact(artifact);

        // Above both means → class 1; below both → class 0
        let batch = vec![
            rec(&[("feature1", 14.0), ("feature2", 7.0)]),
            rec(&[("feature2", 3.0), ("feature1", 6.0)]),
        ];
        let result = store.predict_records(batch).unwrap();
        assert_eq!(result.labels, vec![ClassLabel::Int(1), ClassLabel::Int(0)]);

        let proba = result.probabilities.unwrap();
        assert!((proba[0][1] - 0.85).abs() < 1e-9);
        assert!((proba[1][0] - 0.85).abs() < 1e-9);
        assert_eq!(result.classes.unwrap(), vec![ClassLabel::Int(0), ClassLabel::Int(1)]);

        let info = store.model_info().unwrap();
        assert_eq!(info.model_type, "random_forest");
        assert!(info.probabilistic);
        assert_eq!(info.scaler, "standard");
    }

    #[test]
    fn test_legacy_artifact_uses_caller_columns() {
        let bare = r#"{"kind": "linear_rule", "weights": [1.0, -1.0]}"#;
        let artifact = loader::from_json_str(bare, &LoadOptions::legacy_compatible()).unwrap();
        let store = ModelStore::from_artifact(artifact);

        // Column order comes from the first record: x then y
        let result = store
            .predict_records(vec![rec(&[("x", 3.0), ("y", 1.0)]), rec(&[("y", 3.0), ("x", 1.0)])])
            .unwrap();
        assert_eq!(result.labels, vec![ClassLabel::Int(1), ClassLabel::Int(0)]);

        let err = store
            .predict_records(vec![rec(&[("x", 1.0), ("y", 1.0)]), rec(&[("x", 1.0)])])
            .unwrap_err();
        assert!(matches!(err, PredictError::InconsistentSchema { record: 1, .. }));
    }

    #[test]
    fn test_legacy_width_mismatch_is_inference_error() {
        let bare = r#"{"kind": "linear_rule", "weights": [1.0, 1.0]}"#;
        let artifact = loader::from_json_str(bare, &LoadOptions::legacy_compatible()).unwrap();
        let store = ModelStore::from_artifact(artifact);

        let err = store
            .predict_records(rec(&[("x", 1.0), ("y", 1.0), ("z", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }
}
