//! Classifiers - capability interfaces and the model kinds we can serve
//!
//! Two capabilities:
//! - [`Classifier`]: point predictions only
//! - [`ProbabilisticClassifier`]: also per-class probabilities
//!
//! Which one a loaded model has is decided once, when the artifact is
//! turned into a [`ClassifierHandle`].

use std::fmt;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// LABELS & ERRORS
// ============================================================================

/// Class label as trained: integer classes or string classes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{}", v),
            ClassLabel::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ClassLabel {
    fn from(v: i64) -> Self {
        ClassLabel::Int(v)
    }
}

impl From<&str> for ClassLabel {
    fn from(v: &str) -> Self {
        ClassLabel::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

// ============================================================================
// CAPABILITY TRAITS
// ============================================================================

pub trait Classifier: Send + Sync + fmt::Debug {
    /// Short model kind, e.g. "random_forest"
    fn kind(&self) -> &'static str;

    /// Input width the model was trained on, if it knows
    fn n_features(&self) -> Option<usize>;

    /// One label per input row
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError>;
}

pub trait ProbabilisticClassifier: Classifier {
    /// Column order of `predict_proba`
    fn classes(&self) -> &[ClassLabel];

    /// Shape `[rows, classes]`, each row sums to 1
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ClassifierError>;
}

/// Loaded classifier with its capability fixed at load time
#[derive(Debug)]
pub enum ClassifierHandle {
    Plain(Box<dyn Classifier>),
    Probabilistic(Box<dyn ProbabilisticClassifier>),
}

impl ClassifierHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierHandle::Plain(c) => c.kind(),
            ClassifierHandle::Probabilistic(c) => c.kind(),
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        match self {
            ClassifierHandle::Plain(c) => c.n_features(),
            ClassifierHandle::Probabilistic(c) => c.n_features(),
        }
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
        match self {
            ClassifierHandle::Plain(c) => c.predict(x),
            ClassifierHandle::Probabilistic(c) => c.predict(x),
        }
    }

    pub fn probabilistic(&self) -> Option<&dyn ProbabilisticClassifier> {
        match self {
            ClassifierHandle::Plain(_) => None,
            ClassifierHandle::Probabilistic(c) => Some(c.as_ref()),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        self.probabilistic().is_some()
    }

    pub fn classes(&self) -> Option<&[ClassLabel]> {
        self.probabilistic().map(|c| c.classes())
    }
}

// ============================================================================
// SERIALIZED FORM
// ============================================================================

/// Classifier as stored in the artifact, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LinearRule(LinearRule),
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl ClassifierSpec {
    /// Validate parameters and fix the capability
    pub fn into_handle(self) -> Result<ClassifierHandle, String> {
        match self {
            ClassifierSpec::LinearRule(m) => {
                m.validate()?;
                Ok(ClassifierHandle::Plain(Box::new(m)))
            }
            ClassifierSpec::LogisticRegression(m) => {
                m.validate()?;
                Ok(ClassifierHandle::Probabilistic(Box::new(m)))
            }
            ClassifierSpec::DecisionTree(m) => {
                m.validate()?;
                Ok(ClassifierHandle::Probabilistic(Box::new(m)))
            }
            ClassifierSpec::RandomForest(m) => {
                m.validate()?;
                Ok(ClassifierHandle::Probabilistic(Box::new(m)))
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn check_input(x: &ArrayView2<'_, f64>, expected: usize) -> Result<(), ClassifierError> {
    if x.ncols() != expected {
        return Err(ClassifierError::ShapeMismatch {
            expected,
            found: x.ncols(),
        });
    }
    for ((row, column), v) in x.indexed_iter() {
        if !v.is_finite() {
            return Err(ClassifierError::NonFinite { row, column });
        }
    }
    Ok(())
}

/// Index of the largest value; ties go to the first
fn argmax(values: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn labels_from_proba(proba: &Array2<f64>, classes: &[ClassLabel]) -> Vec<ClassLabel> {
    proba
        .rows()
        .into_iter()
        .map(|row| classes[argmax(row)].clone())
        .collect()
}

fn dot(weights: &[f64], row: ArrayView1<'_, f64>) -> f64 {
    weights.iter().zip(row.iter()).map(|(w, x)| w * x).sum()
}

// ============================================================================
// LINEAR RULE
// ============================================================================

/// `positive if w·x + b > 0 else negative`, no probability output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRule {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default = "default_positive")]
    pub positive: ClassLabel,
    #[serde(default = "default_negative")]
    pub negative: ClassLabel,
}

fn default_positive() -> ClassLabel {
    ClassLabel::Int(1)
}

fn default_negative() -> ClassLabel {
    ClassLabel::Int(0)
}

impl LinearRule {
    fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("linear_rule has no weights".to_string());
        }
        Ok(())
    }
}

impl Classifier for LinearRule {
    fn kind(&self) -> &'static str {
        "linear_rule"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
        check_input(&x, self.weights.len())?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                if dot(&self.weights, row) + self.bias > 0.0 {
                    self.positive.clone()
                } else {
                    self.negative.clone()
                }
            })
            .collect())
    }
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

/// Binary (one coefficient row) or multinomial softmax (one row per class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    pub classes: Vec<ClassLabel>,
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), String> {
        let width = self.coef.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err("logistic_regression has no coefficients".to_string());
        }
        if self.coef.iter().any(|row| row.len() != width) {
            return Err("logistic_regression coefficient rows differ in length".to_string());
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "logistic_regression has {} coefficient rows but {} intercepts",
                self.coef.len(),
                self.intercept.len()
            ));
        }
        let binary = self.coef.len() == 1 && self.classes.len() == 2;
        let multinomial = self.coef.len() == self.classes.len() && self.classes.len() > 2;
        if !binary && !multinomial {
            return Err(format!(
                "logistic_regression has {} coefficient rows for {} classes",
                self.coef.len(),
                self.classes.len()
            ));
        }
        Ok(())
    }

    fn width(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.width())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
        let proba = self.predict_proba(x)?;
        Ok(labels_from_proba(&proba, &self.classes))
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ClassifierError> {
        check_input(&x, self.width())?;
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));

        for (i, row) in x.rows().into_iter().enumerate() {
            if self.coef.len() == 1 {
                let z = dot(&self.coef[0], row) + self.intercept[0];
                let p = 1.0 / (1.0 + (-z).exp());
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            } else {
                let scores: Vec<f64> = self
                    .coef
                    .iter()
                    .zip(&self.intercept)
                    .map(|(w, b)| dot(w, row) + b)
                    .collect();
                let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
                let total: f64 = exps.iter().sum();
                for (k, e) in exps.iter().enumerate() {
                    proba[[i, k]] = e / total;
                }
            }
        }

        Ok(proba)
    }
}

// ============================================================================
// DECISION TREES
// ============================================================================

/// Flat node arrays in the layout scikit-learn exports.
/// A node is a leaf when `children_left[node] < 0`; otherwise rows with
/// `x[feature] <= threshold` go left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNodes {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions)
    pub value: Vec<Vec<f64>>,
}

impl TreeNodes {
    fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("tree node arrays differ in length".to_string());
        }

        for node in 0..n {
            let left = self.children_left[node];
            if left < 0 {
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class weights, expected {}",
                        node,
                        weights.len(),
                        n_classes
                    ));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("leaf {} has a negative or non-finite class weight", node));
                }
                if weights.iter().sum::<f64>() <= 0.0 {
                    return Err(format!("leaf {} has no class weight", node));
                }
                continue;
            }

            let right = self.children_right[node];
            // Children always follow their parent, so traversal terminates
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(format!("node {} splits on unknown feature {}", node, feature));
            }
        }

        Ok(())
    }

    /// Normalized class distribution of the leaf the row lands in
    fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] >= 0 {
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub classes: Vec<ClassLabel>,
    pub n_features: usize,
    #[serde(flatten)]
    pub tree: TreeNodes,
}

impl DecisionTree {
    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("decision_tree has no classes".to_string());
        }
        self.tree.validate(self.classes.len(), self.n_features)
    }
}

impl Classifier for DecisionTree {
    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
        let proba = self.predict_proba(x)?;
        Ok(labels_from_proba(&proba, &self.classes))
    }
}

impl ProbabilisticClassifier for DecisionTree {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ClassifierError> {
        check_input(&x, self.n_features)?;
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (k, p) in self.tree.leaf_distribution(row).into_iter().enumerate() {
                proba[[i, k]] = p;
            }
        }
        Ok(proba)
    }
}

/// Mean of member tree probabilities, label is the argmax
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<ClassLabel>,
    pub n_features: usize,
    pub estimators: Vec<TreeNodes>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("random_forest has no classes".to_string());
        }
        if self.estimators.is_empty() {
            return Err("random_forest has no estimators".to_string());
        }
        for (i, tree) in self.estimators.iter().enumerate() {
            tree.validate(self.classes.len(), self.n_features)
                .map_err(|e| format!("estimator {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, ClassifierError> {
        let proba = self.predict_proba(x)?;
        Ok(labels_from_proba(&proba, &self.classes))
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ClassifierError> {
        check_input(&x, self.n_features)?;
        let n_trees = self.estimators.len() as f64;
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));

        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.estimators {
                for (k, p) in tree.leaf_distribution(row).into_iter().enumerate() {
                    proba[[i, k]] += p;
                }
            }
        }
        proba.mapv_inplace(|p| p / n_trees);

        Ok(proba)
    }
}
