use rp_core::TransformKind;
use rp_pyr::MaskReduction;
use serde::{Deserialize, Serialize};

/// Knobs for one preparation run.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareOptions {
    pub transform: TransformKind,
    pub mask_reduction: MaskReduction,
    /// Rasterize the source display's regions; otherwise weight everything.
    pub use_source_regions: bool,
    pub use_target_regions: bool,
    /// Channel range the output of a final transform is clamped to.
    pub output_range: [f32; 2],
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            transform: TransformKind::default(),
            mask_reduction: MaskReduction::default(),
            use_source_regions: true,
            use_target_regions: true,
            output_range: [0.0, 255.0],
        }
    }
}
