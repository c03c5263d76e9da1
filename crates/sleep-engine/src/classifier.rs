use sleep_core::{weighted_choice, RandomSource, RandomSourceError, SensorSnapshot, SleepStage};

pub const STAGE_WEIGHTS: [(SleepStage, f64); 4] = [
    (SleepStage::Awake, 0.1),
    (SleepStage::Light, 0.4),
    (SleepStage::Deep, 0.3),
    (SleepStage::Rem, 0.2),
];

/// Labels a sample with a sleep stage.
///
/// The label is drawn from fixed weights; the snapshot is accepted so a
/// feature-driven classifier can replace this one without touching callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageClassifier;

impl StageClassifier {
    pub fn predict_stage(
        &self,
        _snapshot: &SensorSnapshot,
        random: &mut dyn RandomSource,
    ) -> Result<SleepStage, RandomSourceError> {
        weighted_choice(random, &STAGE_WEIGHTS)
    }
}
