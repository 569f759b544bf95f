mod mock;
mod ollama;
mod openai;

pub use mock::{MockClient, MOCK_REPLY};
pub use ollama::OllamaClient;
pub(crate) use ollama::DEFAULT_OLLAMA_URL;
pub use openai::OpenAiClient;
