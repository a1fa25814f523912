use rp_core::{Image, ImageView, SelectionRect};
use rp_pyr::Region;

/// Host view of one image window.
pub trait ImageDisplay: Sync {
    /// The plane being registered; `None` when nothing is loaded.
    fn active_plane(&self) -> Option<ImageView<'_, f32>>;

    /// Selection rectangle restricting the plane, in image coordinates.
    fn selection(&self) -> Option<SelectionRect> {
        None
    }

    /// Regions of interest in image coordinates.
    fn regions(&self) -> Vec<&dyn Region> {
        Vec::new()
    }
}

/// Display backed by an owned raster.
#[derive(Default)]
pub struct MemoryDisplay {
    plane: Option<Image<f32>>,
    selection: Option<SelectionRect>,
    regions: Vec<Box<dyn Region>>,
}

impl MemoryDisplay {
    pub fn new(plane: Image<f32>) -> Self {
        Self {
            plane: Some(plane),
            ..Self::default()
        }
    }

    /// A display with no active plane.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_selection(mut self, selection: SelectionRect) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_region(mut self, region: impl Region + 'static) -> Self {
        self.regions.push(Box::new(region));
        self
    }

    pub fn plane(&self) -> Option<&Image<f32>> {
        self.plane.as_ref()
    }
}

impl ImageDisplay for MemoryDisplay {
    fn active_plane(&self) -> Option<ImageView<'_, f32>> {
        self.plane.as_ref().map(Image::as_view)
    }

    fn selection(&self) -> Option<SelectionRect> {
        self.selection
    }

    fn regions(&self) -> Vec<&dyn Region> {
        self.regions.iter().map(|r| r.as_ref()).collect()
    }
}
