//! Backend for a document chatbot: indexes Google Drive folders into a local
//! vector store and answers queries through a retrieval-augmented pipeline,
//! with a per-session state container for the Drive integration panel.

pub mod chat;
pub mod core;
pub mod drive;
pub mod history;
pub mod index;
pub mod llm;
pub mod panel;
pub mod server;
pub mod state;
