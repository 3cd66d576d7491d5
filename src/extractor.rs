use crate::{
    llm::CompletionProvider,
    parser::{parse_aging_causes, AgingCause},
};
use tracing::error;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes email threads about aging research. \
Always respond with valid JSON arrays containing the required fields.";

pub const EXTRACTION_PROMPT: &str = r#"
Analyze the following email thread and extract information about causes of aging.
For each mention of a cause of aging, provide:
1. Email Subject Label
2. Author (email address)
3. Email Date/Time
4. Cause of Aging number (for each author)
5. Brief description of the cause (1-2 sentences)

Format the response STRICTLY as a JSON array of objects with these exact fields:
[
    {
        "subject": "Email Subject",
        "author": "author@email.com",
        "datetime": "YYYY-MM-DD HH:MM AM/PM",
        "cause_number": "1",
        "description": "Description of the cause"
    }
]

Email thread content:
"#;

/// Sends email threads to a completion provider and turns the replies into
/// validated records.
pub struct Extractor<P> {
    provider: P,
}

impl<P: CompletionProvider> Extractor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn user_prompt(content: &str) -> String {
        format!("{}{}", EXTRACTION_PROMPT, content)
    }

    /// Raw completion text for one thread, trimmed.
    pub async fn complete(&self, content: &str) -> crate::Result<String> {
        let completion = self.provider
            .complete(SYSTEM_PROMPT, &Self::user_prompt(content))
            .await?;
        Ok(completion.trim().to_string())
    }

    /// Extracts the aging causes mentioned in `content`. Provider failures are
    /// logged and reported as an empty list.
    pub async fn extract(&self, content: &str) -> Vec<AgingCause> {
        match self.complete(content).await {
            Ok(completion) => {
                println!("Raw completion:");
                println!("{}", completion);
                parse_aging_causes(&completion)
            }
            Err(e) => {
                error!("Error in API call or processing: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;

    const ONE_RECORD: &str = r#"[{"subject": "Aging", "author": "a@b.c", "datetime": "2024-01-01 08:00 AM", "cause_number": "1", "description": "Telomere shortening."}]"#;

    #[tokio::test]
    async fn test_prompt_shape() {
        let extractor = Extractor::new(MockProvider::default());
        extractor.extract("From: a@b.c\nSubject: Aging").await;

        let prompts = extractor.provider().prompts();
        assert_eq!(prompts.len(), 1);
        let (system, user) = &prompts[0];
        assert_eq!(system, SYSTEM_PROMPT);
        assert!(user.starts_with(EXTRACTION_PROMPT));
        assert!(user.ends_with("Email thread content:\nFrom: a@b.c\nSubject: Aging"));
    }

    #[tokio::test]
    async fn test_completion_is_trimmed() {
        let extractor = Extractor::new(MockProvider::new(format!("\n\n  {}  \n", ONE_RECORD)));
        assert_eq!(extractor.complete("thread").await.unwrap(), ONE_RECORD);
    }

    #[tokio::test]
    async fn test_extract_parses_records() {
        let extractor = Extractor::new(MockProvider::new(ONE_RECORD));
        let records = extractor.extract("thread").await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Telomere shortening.");
    }

    #[tokio::test]
    async fn test_provider_error_yields_empty_list() {
        let provider = MockProvider::new(ONE_RECORD);
        provider.push_error("401 Unauthorized");
        let extractor = Extractor::new(provider);

        assert!(extractor.extract("thread").await.is_empty());
        assert_eq!(extractor.extract("thread").await.len(), 1);
    }
}
