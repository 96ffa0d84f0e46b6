pub mod llm;
pub mod rag;
pub mod storage;
