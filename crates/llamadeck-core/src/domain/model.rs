//! Model file descriptions.
//!
//! Models are never persisted; a `ModelInfo` is computed on demand from a
//! directory scan. Format and quantization are inferred heuristically from the
//! header magic and the file name, never parsed from the binary header.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// GGUF magic bytes: "GGUF".
pub const GGUF_MAGIC: [u8; 4] = [0x47, 0x47, 0x55, 0x46];

/// File extension recognised as a model file (matched case-insensitively).
pub const MODEL_EXTENSION: &str = "gguf";

/// Format label for files whose header matches [`GGUF_MAGIC`].
pub const FORMAT_GGUF: &str = "GGUF";

/// Label used when format or quantization cannot be determined.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Description of one model file in the models directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// File name including extension.
    pub name: String,
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Human-formatted size (e.g. "4.07 GB").
    pub size_formatted: String,
    /// Last-modified timestamp.
    pub modified: DateTime<Utc>,
    /// True only if the leading bytes match the GGUF magic.
    pub is_valid: bool,
    /// Coarse format label ("GGUF" or "Unknown").
    pub model_type: String,
    /// Quantization label inferred from the file name.
    pub quantization: String,
}

impl ModelInfo {
    /// Build a description from file facts gathered by the caller.
    pub fn new(path: &Path, size: u64, modified: DateTime<Utc>, is_valid: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let quantization = Quantization::from_filename(&name);

        Self {
            size_formatted: format_file_size(size),
            model_type: if is_valid { FORMAT_GGUF } else { UNKNOWN_LABEL }.to_string(),
            quantization: quantization.label().to_string(),
            name,
            path: path.to_path_buf(),
            size,
            modified,
            is_valid,
        }
    }
}

/// Whether a path carries the model file extension (case-insensitive).
pub fn has_model_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
}

/// Whether a header starts with the GGUF magic.
pub fn has_gguf_magic(header: &[u8]) -> bool {
    header.len() >= GGUF_MAGIC.len() && header[..GGUF_MAGIC.len()] == GGUF_MAGIC
}

/// Format a byte count with binary units and two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Quantization type of a GGUF model file, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Quantization {
    Iq1S,
    Iq1M,
    Iq2Xxs,
    Iq2Xs,
    Iq2S,
    Iq2M,
    Q2K,
    Iq3Xxs,
    Iq3Xs,
    Iq3M,
    Q3KL,
    Q3KM,
    Q3KS,
    Iq4Xs,
    Iq4Nl,
    Q4KM,
    Q4KS,
    Q4_1,
    Q4_0,
    Q5KM,
    Q5KS,
    Q5_0,
    Q5_1,
    Q6K,
    Q8_0,
    Bf16,
    F16,
    F32,
    #[default]
    Unknown,
}

/// Pattern table for quantization extraction, ordered by specificity.
///
/// The first pattern contained in the upper-cased file name wins, so longer
/// tags must precede their prefixes (`IQ2_XXS` before `IQ2_XS`, `BF16` before `F16`).
const QUANT_PATTERNS: &[(&str, Quantization)] = &[
    ("IQ1_S", Quantization::Iq1S),
    ("IQ1_M", Quantization::Iq1M),
    ("IQ2_XXS", Quantization::Iq2Xxs),
    ("IQ2_XS", Quantization::Iq2Xs),
    ("IQ2_S", Quantization::Iq2S),
    ("IQ2_M", Quantization::Iq2M),
    ("Q2_K", Quantization::Q2K),
    ("IQ3_XXS", Quantization::Iq3Xxs),
    ("IQ3_XS", Quantization::Iq3Xs),
    ("IQ3_M", Quantization::Iq3M),
    ("Q3_K_L", Quantization::Q3KL),
    ("Q3_K_M", Quantization::Q3KM),
    ("Q3_K_S", Quantization::Q3KS),
    ("IQ4_XS", Quantization::Iq4Xs),
    ("IQ4_NL", Quantization::Iq4Nl),
    ("Q4_K_M", Quantization::Q4KM),
    ("Q4_K_S", Quantization::Q4KS),
    ("Q4_1", Quantization::Q4_1),
    ("Q4_0", Quantization::Q4_0),
    ("Q5_K_M", Quantization::Q5KM),
    ("Q5_K_S", Quantization::Q5KS),
    ("Q5_0", Quantization::Q5_0),
    ("Q5_1", Quantization::Q5_1),
    ("Q6_K", Quantization::Q6K),
    ("Q8_0", Quantization::Q8_0),
    ("BF16", Quantization::Bf16),
    ("FP16", Quantization::F16),
    ("F16", Quantization::F16),
    ("FP32", Quantization::F32),
    ("F32", Quantization::F32),
];

impl Quantization {
    /// Extract quantization type from a filename.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let upper = filename.to_uppercase();
        QUANT_PATTERNS
            .iter()
            .find(|(pattern, _)| upper.contains(pattern))
            .map_or(Self::Unknown, |(_, q)| *q)
    }

    /// Returns true if this quantization type is unknown.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Canonical label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Iq1S => "IQ1_S",
            Self::Iq1M => "IQ1_M",
            Self::Iq2Xxs => "IQ2_XXS",
            Self::Iq2Xs => "IQ2_XS",
            Self::Iq2S => "IQ2_S",
            Self::Iq2M => "IQ2_M",
            Self::Q2K => "Q2_K",
            Self::Iq3Xxs => "IQ3_XXS",
            Self::Iq3Xs => "IQ3_XS",
            Self::Iq3M => "IQ3_M",
            Self::Q3KL => "Q3_K_L",
            Self::Q3KM => "Q3_K_M",
            Self::Q3KS => "Q3_K_S",
            Self::Iq4Xs => "IQ4_XS",
            Self::Iq4Nl => "IQ4_NL",
            Self::Q4KM => "Q4_K_M",
            Self::Q4KS => "Q4_K_S",
            Self::Q4_1 => "Q4_1",
            Self::Q4_0 => "Q4_0",
            Self::Q5KM => "Q5_K_M",
            Self::Q5KS => "Q5_K_S",
            Self::Q5_0 => "Q5_0",
            Self::Q5_1 => "Q5_1",
            Self::Q6K => "Q6_K",
            Self::Q8_0 => "Q8_0",
            Self::Bf16 => "BF16",
            Self::F16 => "F16",
            Self::F32 => "F32",
            Self::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_prefers_most_specific_tag() {
        assert_eq!(
            Quantization::from_filename("llama-3-8b.IQ2_XXS.gguf"),
            Quantization::Iq2Xxs
        );
        assert_eq!(
            Quantization::from_filename("mistral-7b-instruct.Q4_K_M.gguf"),
            Quantization::Q4KM
        );
        assert_eq!(Quantization::from_filename("phi-bf16.gguf"), Quantization::Bf16);
    }

    #[test]
    fn quantization_is_case_insensitive() {
        assert_eq!(Quantization::from_filename("tiny-q8_0.gguf"), Quantization::Q8_0);
    }

    #[test]
    fn unmatched_name_is_unknown() {
        let q = Quantization::from_filename("model.gguf");
        assert!(q.is_unknown());
        assert_eq!(q.to_string(), "Unknown");
    }

    #[test]
    fn format_file_size_units() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(4_368_438_272), "4.07 GB");
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_model_extension(Path::new("/m/a.gguf")));
        assert!(has_model_extension(Path::new("/m/b.GGUF")));
        assert!(!has_model_extension(Path::new("/m/c.txt")));
        assert!(!has_model_extension(Path::new("/m/gguf")));
    }

    #[test]
    fn magic_check() {
        assert!(has_gguf_magic(b"GGUF\x03\x00\x00\x00"));
        assert!(!has_gguf_magic(b"GGML"));
        assert!(!has_gguf_magic(b"GG"));
    }

    #[test]
    fn invalid_model_reports_unknown_type() {
        let info = ModelInfo::new(Path::new("/m/broken.Q4_0.gguf"), 10, Utc::now(), false);
        assert_eq!(info.model_type, "Unknown");
        assert_eq!(info.quantization, "Q4_0");
        assert_eq!(info.name, "broken.Q4_0.gguf");
        assert!(!info.is_valid);
    }
}
