//! The offline training pipeline: load, clean, fit, report, persist.

use std::path::Path;

use anyhow::Context;
use linfa::prelude::*;
use linfa::Dataset;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::dataset::ClinicalTable;
use crate::features::FEATURES;
use crate::model::PcosClassifier;
use crate::preprocess::{MeanImputer, StandardScaler};
use crate::{CLASSIFIER_FILE, IMPUTER_FILE, SCALER_FILE};

/// Seed for the train/test shuffle; fixed so runs are reproducible.
pub const SPLIT_SEED: u64 = 42;
pub const TRAIN_RATIO: f32 = 0.8;

/// Diagnostics from the held-out test split. Logged, not persisted.
#[derive(Debug, Clone, Copy)]
pub struct TrainReport {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// The fitted artifacts, kept in memory for the interactive prompt.
pub struct TrainOutput {
    pub imputer: MeanImputer,
    pub scaler: StandardScaler,
    pub classifier: PcosClassifier,
    pub report: TrainReport,
}

/// Run the whole pipeline and persist the three artifacts under `model_dir`.
///
/// Any malformed input aborts the run; there are no partial results.
pub fn run(csv_path: &Path, model_dir: &Path) -> anyhow::Result<TrainOutput> {
    info!(path = %csv_path.display(), "loading training data");
    let mut table = ClinicalTable::from_path(csv_path)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;
    let total_rows = table.rows.len();

    table = table.drop_incomplete();
    info!(
        kept = table.rows.len(),
        dropped = total_rows - table.rows.len(),
        "dropped rows with missing values"
    );

    table.derive_bmi()?;

    let (records, targets) = table.into_features()?;

    // The imputer is fit on the cleaned matrix; at serving time it only
    // fires for non-finite inputs.
    let imputer = MeanImputer::fit(&records);

    let feature_names: Vec<&str> = FEATURES.iter().map(|f| f.name).collect();
    let dataset = Dataset::new(records, targets).with_feature_names(feature_names);

    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    let (train, test) = dataset.shuffle(&mut rng).split_with_ratio(TRAIN_RATIO);
    info!(train = train.nsamples(), test = test.nsamples(), "split dataset");

    // Scaler statistics come from the training split only.
    let scaler = StandardScaler::fit(train.records());
    let train_scaled = Dataset::new(scaler.transform(train.records()), train.targets().to_owned());
    let test_scaled = Dataset::new(scaler.transform(test.records()), test.targets().to_owned());

    let classifier = PcosClassifier::train(&train_scaled)?;

    let predicted = classifier.predict_labels(test_scaled.records());
    let cm = predicted.confusion_matrix(&test_scaled)?;
    let precision = cm.precision();
    let recall = cm.recall();
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let report = TrainReport {
        accuracy: cm.accuracy(),
        precision,
        recall,
        f1,
        train_rows: train.nsamples(),
        test_rows: test.nsamples(),
    };
    info!(
        accuracy = report.accuracy,
        precision = report.precision,
        recall = report.recall,
        f1 = report.f1,
        "test split metrics"
    );
    info!("confusion matrix (test split):\n{:?}", cm);

    std::fs::create_dir_all(model_dir)
        .with_context(|| format!("failed to create {}", model_dir.display()))?;
    imputer.save(&model_dir.join(IMPUTER_FILE))?;
    scaler.save(&model_dir.join(SCALER_FILE))?;
    classifier.save(&model_dir.join(CLASSIFIER_FILE))?;
    info!(dir = %model_dir.display(), "persisted imputer, scaler, and classifier");

    Ok(TrainOutput {
        imputer,
        scaler,
        classifier,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    /// Synthetic but strongly separable clinical data, with the header
    /// variants the real CSV carries and a couple of incomplete rows.
    pub fn synthetic_csv(rows: usize) -> String {
        let mut csv = String::from(
            " Age (yrs),Weight (Kg),Height(Cm) ,Blood Group,Cycle(R/I),Cycle length(days),\
             Marraige Status (Yrs),Pregnant(Y/N),No. of aborptions,Weight gain(Y/N),\
             hair growth(Y/N),Skin darkening (Y/N),Hair loss(Y/N),Pimples(Y/N),\
             Fast food (Y/N),Reg.Exercise(Y/N),PCOS (Y/N)\n",
        );
        for i in 0..rows {
            let pcos = i % 2;
            let age = 22 + i % 10;
            let weight = if pcos == 1 { 78 + i % 7 } else { 55 + i % 7 };
            let height = 152 + i % 12;
            let blood = 11 + i % 8;
            let cycle = if pcos == 1 { 4 } else { 2 };
            let cycle_len = if pcos == 1 { 38 + i % 4 } else { 28 + i % 3 };
            writeln!(
                csv,
                "{age},{weight},{height},{blood},{cycle},{cycle_len},{marriage},{pregnant},\
                 {abortions},{wg},{hg},{sd},{hl},{pi},{ff},{ex},{pcos}",
                marriage = i % 9,
                pregnant = 1 - pcos,
                abortions = i % 3,
                wg = pcos,
                hg = pcos,
                sd = pcos,
                hl = pcos,
                pi = pcos,
                ff = pcos,
                ex = 1 - pcos,
            )
            .unwrap();
        }
        // Incomplete rows are dropped wholesale before fitting.
        csv.push_str("30,,160,15,2,30,3,0,0,0,0,0,0,0,0,1,0\n");
        csv.push_str(",90,150,13,4,40,5,0,1,1,1,1,1,1,1,0,1\n");
        csv
    }

    #[test]
    fn trains_and_persists_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("pcod.csv");
        std::fs::write(&csv_path, synthetic_csv(60)).unwrap();
        let model_dir = dir.path().join("model");

        let out = run(&csv_path, &model_dir).unwrap();
        assert_eq!(out.report.train_rows + out.report.test_rows, 60);
        // Clusters are separable by construction.
        assert!(out.report.accuracy > 0.8, "accuracy {}", out.report.accuracy);

        for file in [IMPUTER_FILE, SCALER_FILE, CLASSIFIER_FILE] {
            assert!(model_dir.join(file).exists(), "missing artifact {file}");
        }

        // The persisted classifier agrees with the in-memory one.
        let reloaded = PcosClassifier::load(&model_dir.join(CLASSIFIER_FILE)).unwrap();
        let mut v = [
            28.0, 80.0, 158.0, 32.0, 15.0, 4.0, 40.0, 3.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            1.0, 0.0,
        ];
        out.imputer.transform_vec(&mut v);
        out.scaler.transform_vec(&mut v);
        let x = ndarray::Array1::from(v.to_vec());
        assert_eq!(
            out.classifier.predict_one(&x).positive,
            reloaded.predict_one(&x).positive
        );
    }

    #[test]
    fn malformed_csv_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("bad.csv");
        std::fs::write(&csv_path, "Age (yrs),PCOS (Y/N)\nnot-a-number,1\n").unwrap();
        assert!(run(&csv_path, &dir.path().join("model")).is_err());
    }
}
