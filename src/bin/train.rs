use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;
use tracing::info;

use pcos_api::features::{Feature, FeatureKind, CYCLE_IRREGULAR_MANUAL, CYCLE_REGULAR, FEATURES};
use pcos_api::training::{self, TrainOutput};
use pcos_api::MODEL_DIR;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let mut interactive = false;
    let mut csv_path = PathBuf::from("PCOD-10.csv");
    for arg in std::env::args().skip(1) {
        if arg == "--interactive" {
            interactive = true;
        } else {
            csv_path = PathBuf::from(arg);
        }
    }

    let output = training::run(&csv_path, Path::new(MODEL_DIR))?;
    info!(accuracy = output.report.accuracy, "training complete");

    if interactive {
        let stdin = io::stdin();
        predict_from_prompt(&output, &mut stdin.lock())?;
    }
    Ok(())
}

/// One-off manual prediction from console input, feature by feature.
///
/// The irregular-cycle code here is 5, not the 4 used by the HTTP encoding
/// path (see DESIGN.md), and the vector is scaled but not imputed.
fn predict_from_prompt<R: BufRead>(output: &TrainOutput, input: &mut R) -> anyhow::Result<()> {
    println!("\nEnter the values for the features:");
    let mut scaled = read_feature_vector(input)?;
    output.scaler.transform_vec(&mut scaled);
    let scored = output.classifier.predict_one(&Array1::from(scaled));

    println!(
        "\nPrediction for the entered data: {}",
        if scored.positive { "PCOS" } else { "No PCOS" }
    );
    println!("Chance of having PCOS: {:.2}%", scored.probability * 100.0);
    println!(
        "Chance of not having PCOS: {:.2}%",
        (1.0 - scored.probability) * 100.0
    );
    Ok(())
}

/// Collect one value per feature, in fit order, re-prompting on invalid
/// input.
fn read_feature_vector<R: BufRead>(input: &mut R) -> anyhow::Result<Vec<f64>> {
    let mut vector = Vec::with_capacity(FEATURES.len());
    for feature in &FEATURES {
        vector.push(prompt_value(feature, input)?);
    }
    Ok(vector)
}

fn prompt_value<R: BufRead>(feature: &Feature, input: &mut R) -> anyhow::Result<f64> {
    loop {
        match feature.kind {
            FeatureKind::YesNo => print!("{} (Y/N): ", feature.name),
            FeatureKind::Cycle => print!("{} (R/I): ", feature.name),
            _ => print!("{}: ", feature.name),
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("end of input while reading '{}'", feature.name);
        }
        let answer = line.trim().to_uppercase();

        match feature.kind {
            FeatureKind::YesNo => match answer.as_str() {
                "Y" => return Ok(1.0),
                "N" => return Ok(0.0),
                _ => println!("Invalid input! Please enter 'Y' or 'N'."),
            },
            FeatureKind::Cycle => match answer.as_str() {
                "R" => return Ok(CYCLE_REGULAR),
                "I" => return Ok(CYCLE_IRREGULAR_MANUAL),
                _ => println!("Invalid input! Please enter 'R' or 'I'."),
            },
            // Blood group is numeric-coded in the dataset, so the prompt
            // takes the code directly like every other numeric field.
            FeatureKind::Numeric | FeatureKind::BloodGroup => match answer.parse::<f64>() {
                Ok(v) => return Ok(v),
                Err(_) => println!("Invalid input! Please enter a numerical value."),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reprompts_until_input_is_valid() {
        // Invalid entries for BMI, cycle, and pregnant are each followed by
        // a valid line; the prompt must keep asking instead of failing.
        let lines = "28\n65\n160\noops\n25.4\n15\nx\ni\n30\n3\nmaybe\nn\n0\nn\nn\nn\nn\nn\ny\nY\n";
        let mut input = Cursor::new(lines);
        let vector = read_feature_vector(&mut input).unwrap();
        assert_eq!(
            vector,
            vec![
                28.0, 65.0, 160.0, 25.4, 15.0, CYCLE_IRREGULAR_MANUAL, 30.0, 3.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0
            ]
        );
    }

    #[test]
    fn manual_cycle_code_differs_from_the_http_one() {
        let cycle = FEATURES
            .iter()
            .find(|f| f.kind == FeatureKind::Cycle)
            .unwrap();
        let mut input = Cursor::new("i\n");
        let code = prompt_value(cycle, &mut input).unwrap();
        assert_eq!(code, CYCLE_IRREGULAR_MANUAL);
        assert_ne!(code, pcos_api::features::CYCLE_IRREGULAR);
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut input = Cursor::new("");
        assert!(read_feature_vector(&mut input).is_err());
    }
}
