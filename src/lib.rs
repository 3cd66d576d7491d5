pub mod config;
pub mod thread_reader;
pub mod llm;
pub mod parser;
pub mod extractor;
pub mod analyzer;
pub mod reporter;

pub use config::Config;
pub use thread_reader::read_email_thread;
pub use llm::{CompletionProvider, LLMClient, LlmError, MockProvider};
pub use parser::{parse_aging_causes, AgingCause};
pub use extractor::Extractor;
pub use analyzer::{Analyzer, AnalysisSummary};
pub use reporter::Reporter;

pub type Result<T> = anyhow::Result<T>;
