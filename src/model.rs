//! The classifier artifact: a linear-kernel SVM with Platt-scaled
//! probability estimates.
//!
//! Fitting happens through `linfa-svm`. Because the kernel is linear, the
//! fitted decision function is affine; training recovers its weights and
//! bias from the model and persists those directly, so the artifact is a
//! plain serializable struct independent of the trainer's internals.

use std::path::Path;

use anyhow::Context;
use linfa::prelude::*;
use linfa::Dataset;
use ndarray::{Array1, Array2, ArrayView1, Ix1};
use serde::{Deserialize, Serialize};

use crate::preprocess::{load_json, save_json};

/// Decision value of a fitted SVM for one observation.
fn decision_value(svm: &linfa_svm::Svm<f64, bool>, row: ArrayView1<'_, f64>) -> f64 {
    svm.weighted_sum(&row) - svm.rho
}

/// Sigmoid mapping from SVM decision values to probabilities:
/// `P(y = 1 | f) = 1 / (1 + exp(a * f + b))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattCalibration {
    a: f64,
    b: f64,
}

impl PlattCalibration {
    /// Fit the sigmoid by regularized maximum likelihood (Newton descent
    /// with backtracking, per "A note on Platt's probabilistic outputs").
    pub fn fit(decision: &Array1<f64>, targets: &Array1<bool>) -> Self {
        let prior1 = targets.iter().filter(|t| **t).count() as f64;
        let prior0 = targets.len() as f64 - prior1;

        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let t: Vec<f64> = targets
            .iter()
            .map(|y| if *y { hi_target } else { lo_target })
            .collect();

        let max_iter = 100;
        let min_step = 1e-10;
        let sigma = 1e-12;

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();

        let objective = |a: f64, b: f64| -> f64 {
            decision
                .iter()
                .zip(t.iter())
                .map(|(f, ti)| {
                    let fapb = f * a + b;
                    if fapb >= 0.0 {
                        ti * fapb + (1.0 + (-fapb).exp()).ln()
                    } else {
                        (ti - 1.0) * fapb + (1.0 + fapb.exp()).ln()
                    }
                })
                .sum()
        };
        let mut fval = objective(a, b);

        for _ in 0..max_iter {
            let mut h11 = sigma;
            let mut h22 = sigma;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;
            for (f, ti) in decision.iter().zip(t.iter()) {
                let fapb = f * a + b;
                let (p, q) = if fapb >= 0.0 {
                    let e = (-fapb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = fapb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = ti - p;
                g1 += f * d1;
                g2 += d1;
            }
            if g1.abs() < 1e-5 && g2.abs() < 1e-5 {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            let mut stepped = false;
            while step >= min_step {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    stepped = true;
                    break;
                }
                step /= 2.0;
            }
            if !stepped {
                break;
            }
        }

        Self { a, b }
    }

    pub fn probability(&self, decision: f64) -> f64 {
        let fapb = decision * self.a + self.b;
        if fapb >= 0.0 {
            let e = (-fapb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + fapb.exp())
        }
    }
}

/// A prediction with its calibrated positive-class probability.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub positive: bool,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcosClassifier {
    weights: Vec<f64>,
    bias: f64,
    platt: PlattCalibration,
}

impl PcosClassifier {
    /// Fit the SVM on already-scaled training data. C-classification with
    /// unit class weights and a linear kernel, matching the reference
    /// configuration.
    pub fn train(train: &Dataset<f64, bool, Ix1>) -> anyhow::Result<Self> {
        let svm = linfa_svm::Svm::<f64, bool>::params()
            .linear_kernel()
            .pos_neg_weights(1.0, 1.0)
            .fit(train)
            .context("SVM training failed")?;

        // The linear-kernel decision function is affine, so probing it at
        // the origin and the unit vectors recovers it exactly.
        let dim = train.records().ncols();
        let origin = Array1::zeros(dim);
        let bias = decision_value(&svm, origin.view());
        let weights: Vec<f64> = (0..dim)
            .map(|j| {
                let mut unit = Array1::zeros(dim);
                unit[j] = 1.0;
                decision_value(&svm, unit.view()) - bias
            })
            .collect();

        let decision: Array1<f64> = train
            .records()
            .rows()
            .into_iter()
            .map(|row| decision_value(&svm, row))
            .collect();
        let platt = PlattCalibration::fit(&decision, train.targets());

        Ok(Self {
            weights,
            bias,
            platt,
        })
    }

    fn decision(&self, features: &Array1<f64>) -> f64 {
        self.weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }

    /// Classify a single preprocessed feature vector.
    pub fn predict_one(&self, features: &Array1<f64>) -> Scored {
        let decision = self.decision(features);
        Scored {
            positive: decision >= 0.0,
            probability: self.platt.probability(decision),
        }
    }

    /// Hard labels for a batch, used by the training diagnostics.
    pub fn predict_labels(&self, records: &Array2<f64>) -> Array1<bool> {
        records
            .rows()
            .into_iter()
            .map(|row| {
                let d: f64 = self
                    .weights
                    .iter()
                    .zip(row.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + self.bias;
                d >= 0.0
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        load_json(path)
    }
}
