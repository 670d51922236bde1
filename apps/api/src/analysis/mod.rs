// Résumé analysis: staged model pipeline, error classification, résumé rewrite, chat.
// All model calls go through llm_client via the StageRunner.

pub mod chat;
pub mod classify;
pub mod handlers;
pub mod improve;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod stages;

#[cfg(test)]
pub mod test_support;
