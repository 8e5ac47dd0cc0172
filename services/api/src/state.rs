use forge_core::evaluator::Evaluator;
use forge_core::interview::InterviewConfig;
use forge_core::question_bank::QuestionBank;
use forge_core::room::RoomProvisioner;
use forge_core::storage::SessionStorage;
use forge_core::store::Store;
use std::sync::Arc;

/// Everything the handlers share. Built once in `main`.
pub struct AppState {
    pub storage: SessionStorage<dyn Store>,
    pub evaluator: Arc<dyn Evaluator>,
    pub bank: Arc<dyn QuestionBank>,
    pub rooms: Arc<dyn RoomProvisioner>,
    pub interview: InterviewConfig,
    pub voice_enabled: bool,
}
