use std::path::PathBuf;

use crate::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartBatch(BatchOrder),
    CancelBatch,
}

/// Everything the engine needs to run one batch. Frozen when the batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOrder {
    pub raw_input: String,
    pub folder: PathBuf,
    pub settings: Settings,
}
