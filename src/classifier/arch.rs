//! The fixed set of backbone architectures the ensemble is trained on, and
//! the artifact naming conventions each one is shipped under.

use std::fmt;

/// A supported backbone architecture.
///
/// Each architecture is an opaque feature extractor with one canonical way
/// of attaching a 7-class classification head: the head parameter names
/// below are the ones the training pipeline exports for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    MobileNetV3,
    DenseNet121,
    ResNet50,
}

impl Architecture {
    pub const ALL: [Architecture; 3] = [
        Architecture::MobileNetV3,
        Architecture::DenseNet121,
        Architecture::ResNet50,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Architecture::MobileNetV3 => "mobilenetv3",
            Architecture::DenseNet121 => "densenet121",
            Architecture::ResNet50 => "resnet50",
        }
    }

    /// Accepted checkpoint filenames, in lookup order. The first one that
    /// exists in the models directory wins.
    pub fn checkpoint_candidates(self) -> &'static [&'static str] {
        match self {
            Architecture::MobileNetV3 => &[
                "final_mobilenetv3_model.json",
                "mobilenetv3.json",
                "final_mobilenetv3.json",
            ],
            Architecture::DenseNet121 => &[
                "final_densenet121_model.json",
                "densenet121.json",
                "final_densenet121.json",
            ],
            Architecture::ResNet50 => &[
                "final_resnet50_model.json",
                "resnet50.json",
                "final_resnet50.json",
            ],
        }
    }

    /// Filename of the frozen feature-extractor graph that sits next to
    /// the checkpoint.
    pub fn backbone_file(self) -> String {
        format!("{}.onnx", self.name())
    }

    /// Parameter names of the 7-class classification head, `(weight, bias)`.
    pub fn head_keys(self) -> (&'static str, &'static str) {
        match self {
            Architecture::MobileNetV3 => ("classifier.3.weight", "classifier.3.bias"),
            Architecture::DenseNet121 => ("classifier.weight", "classifier.bias"),
            Architecture::ResNet50 => ("fc.weight", "fc.bias"),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
