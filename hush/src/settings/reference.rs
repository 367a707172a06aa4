use crate::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSettings {
    /// Clamped to [`hush_gpu::REFERENCE_MAX_HISTORY_FRAME_NUM`].
    pub max_accumulated_frame_num: u32,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            max_accumulated_frame_num: 1024,
        }
    }
}

impl ReferenceSettings {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
