//! Fitted preprocessing artifacts: mean imputer and standard scaler.
//!
//! Both are fit once by the training pipeline and applied unchanged at
//! serving time. They persist as JSON next to the classifier artifact.

use std::path::Path;

use anyhow::Context;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fills non-finite entries with the per-column mean observed at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Vec<f64>,
}

impl MeanImputer {
    /// Column means over the finite entries of `data`. Columns with no
    /// finite entries fall back to 0.
    pub fn fit(data: &Array2<f64>) -> Self {
        let means = data
            .axis_iter(Axis(1))
            .map(|col| {
                let mut sum = 0.0;
                let mut n = 0usize;
                for v in col.iter().filter(|v| v.is_finite()) {
                    sum += v;
                    n += 1;
                }
                if n == 0 {
                    0.0
                } else {
                    sum / n as f64
                }
            })
            .collect();
        Self { means }
    }

    pub fn transform_vec(&self, x: &mut [f64]) {
        for (v, mean) in x.iter_mut().zip(self.means.iter()) {
            if !v.is_finite() {
                *v = *mean;
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        load_json(path)
    }
}

/// Standardizes features with statistics from the training split:
/// `(x - mean) / std`, with zero-variance columns mapped to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Self {
        let n = data.nrows().max(1) as f64;
        let mean: Vec<f64> = data
            .axis_iter(Axis(1))
            .map(|col| col.sum() / n)
            .collect();
        let std = data
            .axis_iter(Axis(1))
            .zip(mean.iter())
            .map(|(col, m)| {
                let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();
        Self { mean, std }
    }

    fn scale(&self, i: usize, v: f64) -> f64 {
        if self.std[i] > 0.0 {
            (v - self.mean[i]) / self.std[i]
        } else {
            0.0
        }
    }

    pub fn transform_vec(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            *v = self.scale(i, *v);
        }
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            for (i, v) in row.iter_mut().enumerate() {
                *v = self.scale(i, *v);
            }
        }
        out
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        load_json(path)
    }
}

pub(crate) fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let data = serde_json::to_vec(value)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("corrupt artifact {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn imputer_fills_with_column_mean() {
        let data = array![[1.0, 10.0], [3.0, f64::NAN], [5.0, 20.0]];
        let imputer = MeanImputer::fit(&data);
        let mut row = [f64::NAN, f64::NAN];
        imputer.transform_vec(&mut row);
        assert_eq!(row, [3.0, 15.0]);
    }

    #[test]
    fn scaler_standardizes() {
        let data = array![[1.0, 4.0], [3.0, 4.0], [5.0, 4.0]];
        let scaler = StandardScaler::fit(&data);
        let scaled = scaler.transform(&data);
        // First column: mean 3, values at -std/0/+std.
        assert!((scaled[[0, 0]] + scaled[[2, 0]]).abs() < 1e-12);
        assert!(scaled[[1, 0]].abs() < 1e-12);
        let col0: Vec<f64> = scaled.column(0).to_vec();
        let var = col0.iter().map(|v| v * v).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);
        // Zero-variance column maps to 0.
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn vector_and_matrix_paths_agree() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 8.0, 6.0], [7.0, 5.0, 12.0]];
        let scaler = StandardScaler::fit(&data);
        let matrix = scaler.transform(&data);
        for (i, row) in data.axis_iter(ndarray::Axis(0)).enumerate() {
            let mut v = row.to_vec();
            scaler.transform_vec(&mut v);
            for (j, x) in v.iter().enumerate() {
                assert!((x - matrix[[i, j]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn artifacts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let data = array![[1.0, 10.0], [3.0, 30.0]];
        let imputer = MeanImputer::fit(&data);
        let scaler = StandardScaler::fit(&data);

        let imputer_path = dir.path().join("imputer.json");
        let scaler_path = dir.path().join("scaler.json");
        imputer.save(&imputer_path).unwrap();
        scaler.save(&scaler_path).unwrap();

        let imputer2 = MeanImputer::load(&imputer_path).unwrap();
        let scaler2 = StandardScaler::load(&scaler_path).unwrap();

        let mut a = [f64::NAN, f64::NAN];
        let mut b = [f64::NAN, f64::NAN];
        imputer.transform_vec(&mut a);
        imputer2.transform_vec(&mut b);
        assert_eq!(a, b);

        let mut a = [2.0, 20.0];
        let mut b = [2.0, 20.0];
        scaler.transform_vec(&mut a);
        scaler2.transform_vec(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn corrupt_artifact_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(StandardScaler::load(&path).is_err());
    }
}
