use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dermascan::{
    normalize, preprocess, run_ensemble, LesionClassifier, ModelRegistry, PredictError,
    NUM_CLASSES,
};
use image::{DynamicImage, RgbImage};
use ndarray::{Array1, Array4};
use serde_json::json;

struct FixedMember {
    name: &'static str,
    probs: [f32; NUM_CLASSES],
}

impl LesionClassifier for FixedMember {
    fn architecture(&self) -> &str {
        self.name
    }

    fn forward(&self, _input: &Array4<f32>) -> Result<Array1<f32>, PredictError> {
        Ok(Array1::from_iter(self.probs.iter().map(|p| p.ln())))
    }
}

fn setup_registry() -> ModelRegistry {
    let members: Vec<Box<dyn LesionClassifier>> = vec![
        Box::new(FixedMember {
            name: "mobilenetv3",
            probs: [0.05, 0.05, 0.05, 0.05, 0.70, 0.05, 0.05],
        }),
        Box::new(FixedMember {
            name: "densenet121",
            probs: [0.08, 0.08, 0.08, 0.08, 0.55, 0.08, 0.05],
        }),
        Box::new(FixedMember {
            name: "resnet50",
            probs: [0.06, 0.06, 0.06, 0.06, 0.10, 0.60, 0.06],
        }),
    ];
    ModelRegistry::from_classifiers(members)
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocessing");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let small = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, image::Rgb([120, 80, 60])));
    let large = DynamicImage::ImageRgb8(RgbImage::from_pixel(1024, 768, image::Rgb([120, 80, 60])));

    group.bench_function("native_resolution", |b| {
        b.iter(|| preprocess::to_tensor(black_box(&small)))
    });
    group.bench_function("camera_resolution", |b| {
        b.iter(|| preprocess::to_tensor(black_box(&large)))
    });

    group.finish();
}

fn bench_ensemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ensemble");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let registry = setup_registry();
    let input = Array4::<f32>::zeros((1, 3, 224, 224));

    group.bench_function("three_members", |b| {
        b.iter(|| run_ensemble(black_box(&registry), black_box(&input)).unwrap())
    });

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalization");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let canonical = json!({
        "prediction": {
            "class_id": 4, "class_name": "mel", "display_name": "Melanoma",
            "risk": "High", "description": "x", "recommendation": "y",
            "confidence": 0.45, "agreement": 0.667
        },
        "model_predictions": {},
        "class_probabilities": { "mel": 0.45, "nv": 0.25 }
    });
    let foreign = json!({ "top": { "label": "bcc", "score": 0.72 }, "probs": { "bcc": 0.72 } });

    group.bench_function("canonical_payload", |b| {
        b.iter(|| normalize(black_box(canonical.clone())))
    });
    group.bench_function("foreign_payload", |b| {
        b.iter(|| normalize(black_box(foreign.clone())))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing,
    bench_ensemble,
    bench_normalization
);
criterion_main!(benches);
