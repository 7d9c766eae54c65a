#[derive(Debug, Clone)]
pub struct NmsParams {
    /// Same-class pairs at or above this overlap suppress the lower-scored
    /// box.
    pub iou_threshold: f32,
    pub min_confidence: f32,
    pub max_keep: usize,
    /// Maps model-input-space boxes into source-frame space.
    pub scale_x: f32,
    pub scale_y: f32,
}

impl NmsParams {
    pub fn new(
        iou_threshold: f32,
        min_confidence: f32,
        max_keep: usize,
    ) -> Self {
        Self {
            iou_threshold,
            min_confidence,
            max_keep,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn with_scale(
        mut self,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }
}

impl Default for NmsParams {
    fn default() -> Self {
        Self::new(0.5, 0.25, 64)
    }
}
