/// Logical step of a denoiser's pipeline; the selector decides, per frame,
/// which stages run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Clear,
    ClassifyTiles,
    SmoothTiles,
    HitDistReconstruction,
    PrePass,
    TemporalAccumulation,
    HistoryFix,
    Blur,
    PostBlur,
    HistoryClamping,
    Copy,
    AntiFirefly,
    AtrousFirst,
    Atrous,
    AtrousLast,
    TemporalStabilization,
    SplitScreen,
    Validation,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::ClassifyTiles => "ClassifyTiles",
            Self::SmoothTiles => "SmoothTiles",
            Self::HitDistReconstruction => "HitDistReconstruction",
            Self::PrePass => "PrePass",
            Self::TemporalAccumulation => "TemporalAccumulation",
            Self::HistoryFix => "HistoryFix",
            Self::Blur => "Blur",
            Self::PostBlur => "PostBlur",
            Self::HistoryClamping => "HistoryClamping",
            Self::Copy => "Copy",
            Self::AntiFirefly => "AntiFirefly",
            Self::AtrousFirst => "AtrousFirst",
            Self::Atrous => "Atrous",
            Self::AtrousLast => "AtrousLast",
            Self::TemporalStabilization => "TemporalStabilization",
            Self::SplitScreen => "SplitScreen",
            Self::Validation => "Validation",
        }
    }

    /// Returns whether this stage is one of the A-trous iterations.
    pub fn is_atrous(self) -> bool {
        matches!(self, Self::AtrousFirst | Self::Atrous | Self::AtrousLast)
    }
}
