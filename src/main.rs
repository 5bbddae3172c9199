use anyhow::Context;
use clap::Parser;
use dermascan::{class_info, ClassLabel, PredictionService};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the lesion image to classify
    #[arg(short, long)]
    file: PathBuf,

    /// Path to the models directory (default: $MODELS_DIR or ./models)
    #[arg(long)]
    models: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let models_dir = args
        .models
        .or_else(|| std::env::var_os("MODELS_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./models"));
    info!("Looking for models in: {:?}", models_dir);

    let service = PredictionService::new(&models_dir)
        .context("could not load any models")?;
    info!("Service ready with models: {:?}", service.health().models);

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("could not read image {:?}", args.file))?;
    let report = service.predict_bytes(&bytes)?;

    println!("\n=== PREDICTION RESULTS ===");
    println!("Classification: {}", report.prediction.display_name);
    println!("Risk Level: {}", report.prediction.risk);
    println!("Description: {}", report.prediction.description);
    println!("Recommendation: {}", report.prediction.recommendation);
    println!(
        "Confidence: {:.2}% (agreement: {:.2}%)\n",
        report.prediction.confidence * 100.0,
        report.prediction.agreement * 100.0
    );

    println!("Individual Model Predictions:");
    for (model_name, pred) in &report.model_predictions {
        let display = ClassLabel::parse(&pred.class_name)
            .map(|label| class_info(label).display)
            .unwrap_or(pred.class_name.as_str());
        println!(
            "  - {}: {} (Confidence: {:.2}%)",
            model_name,
            display,
            pred.confidence * 100.0
        );
    }

    println!("\nClass Probabilities:");
    for (class_name, prob) in &report.class_probabilities {
        let display = ClassLabel::parse(class_name)
            .map(|label| class_info(label).display)
            .unwrap_or(class_name.as_str());
        println!("  - {}: {:.2}%", display, prob * 100.0);
    }

    let stem = args
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let output = format!("{}_prediction.json", stem);
    std::fs::write(&output, serde_json::to_vec_pretty(&report)?)?;
    println!("\nResults also saved to {}", output);

    Ok(())
}
