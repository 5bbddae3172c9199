//! The class knowledge base: the fixed HAM10000 label set and the static
//! per-class display metadata joined into every prediction.

use std::fmt;

/// Number of diagnostic categories every classifier in the ensemble emits.
pub const NUM_CLASSES: usize = 7;

/// Labels the risk-tier rule treats as higher-stakes. `scc` is kept even
/// though the current label set does not produce it, so foreign payloads
/// that report it are still tiered as malignant.
pub const MALIGNANT: [&str; 4] = ["mel", "bcc", "akiec", "scc"];

/// One of the seven diagnostic categories, in the fixed index order shared
/// by every model's output head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    /// Actinic keratoses and intraepithelial carcinoma
    Akiec,
    /// Basal cell carcinoma
    Bcc,
    /// Benign keratosis-like lesions
    Bkl,
    /// Dermatofibroma
    Df,
    /// Melanoma
    Mel,
    /// Melanocytic nevi
    Nv,
    /// Vascular lesions
    Vasc,
}

impl ClassLabel {
    /// All labels in index order (index 0..6).
    pub const ALL: [ClassLabel; NUM_CLASSES] = [
        ClassLabel::Akiec,
        ClassLabel::Bcc,
        ClassLabel::Bkl,
        ClassLabel::Df,
        ClassLabel::Mel,
        ClassLabel::Nv,
        ClassLabel::Vasc,
    ];

    /// The lowercase wire name of the label.
    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Akiec => "akiec",
            ClassLabel::Bcc => "bcc",
            ClassLabel::Bkl => "bkl",
            ClassLabel::Df => "df",
            ClassLabel::Mel => "mel",
            ClassLabel::Nv => "nv",
            ClassLabel::Vasc => "vasc",
        }
    }

    /// The label's position in the fixed class ordering.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&l| l == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<ClassLabel> {
        Self::ALL.get(index).copied()
    }

    /// Case-insensitive lookup of a wire name against the fixed label set.
    pub fn parse(name: &str) -> Option<ClassLabel> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|l| l.as_str() == lower)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier attached to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Risk {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Risk {
    pub fn as_str(self) -> &'static str {
        match self {
            Risk::Low => "Low",
            Risk::Medium => "Medium",
            Risk::High => "High",
            Risk::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static display metadata for one class. Looked up by label, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub display: &'static str,
    pub risk: Risk,
    pub description: &'static str,
    pub recommendation: &'static str,
}

/// The canonical knowledge-base table, indexed by class index.
static CLASS_INFO: [ClassInfo; NUM_CLASSES] = [
    ClassInfo {
        display: "Actinic Keratosis / Intraepithelial Carcinoma",
        risk: Risk::High,
        description: "A pre-cancerous growth or early form of skin cancer.",
        recommendation: "Consult a dermatologist promptly for evaluation.",
    },
    ClassInfo {
        display: "Basal Cell Carcinoma",
        risk: Risk::High,
        description: "The most common type of skin cancer, usually slow-growing.",
        recommendation: "Consult a dermatologist for proper treatment options.",
    },
    ClassInfo {
        display: "Benign Keratosis",
        risk: Risk::Low,
        description: "A non-cancerous skin growth that appears as a waxy, scaly patch.",
        recommendation: "Generally no treatment needed, but monitor for changes.",
    },
    ClassInfo {
        display: "Dermatofibroma",
        risk: Risk::Low,
        description: "A common benign skin growth or nodule that is usually harmless.",
        recommendation: "No treatment needed unless causing discomfort.",
    },
    ClassInfo {
        display: "Melanoma",
        risk: Risk::High,
        description: "A serious form of skin cancer that can spread if not treated early.",
        recommendation: "Seek immediate medical attention.",
    },
    ClassInfo {
        display: "Melanocytic Nevus (Mole)",
        risk: Risk::Low,
        description: "A benign growth of melanocytes, usually harmless but should be monitored.",
        recommendation: "Monitor for changes in size, shape, or color.",
    },
    ClassInfo {
        display: "Vascular Lesion",
        risk: Risk::Low,
        description: "Abnormalities of blood vessels that appear on the skin surface.",
        recommendation: "Typically harmless but consult a doctor if concerned.",
    },
];

/// Returns the knowledge-base record for a label.
pub fn class_info(label: ClassLabel) -> &'static ClassInfo {
    &CLASS_INFO[label.index()]
}

/// Whether a (possibly foreign) label name belongs to the malignant set.
pub fn is_malignant(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    MALIGNANT.contains(&lower.as_str())
}
