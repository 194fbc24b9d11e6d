pub mod ai;
pub mod chat;
pub mod health;
pub mod wallet;

use crate::config::Config;
use crate::services::{
    chain_data::BlockchainFetcher, chat_service::ChatService, supervisor::AiSupervisor,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<AiSupervisor>,
    pub fetcher: Arc<dyn BlockchainFetcher>,
    pub chat: Arc<ChatService>,
    pub config: Config,
}
