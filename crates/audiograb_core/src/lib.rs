//! Audiograb core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{BatchOrder, Effect};
pub use msg::{ItemPhase, Msg};
pub use state::{
    AppState, AudioFormat, BatchSummary, Icon, Quality, SessionState, Settings, Severity,
    StatusLine, MAX_RETRIES,
};
pub use update::update;
pub use view_model::{AppViewModel, FOLDER_LABEL_LIMIT};
