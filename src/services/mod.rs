pub mod chain_data;
pub mod chat_service;
pub mod classifier;
pub mod llm_client;
pub mod supervisor;
