// Chat Adapters

pub mod llm;
