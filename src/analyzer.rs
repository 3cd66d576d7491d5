use crate::{
    config::Config,
    extractor::Extractor,
    llm::CompletionProvider,
    parser::AgingCause,
    reporter::Reporter,
    thread_reader::read_email_thread,
};
use std::path::PathBuf;

/// Outcome of one pass over the configured email threads.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records: Vec<AgingCause>,
    /// Set only when the Markdown table was actually written.
    pub output_file: Option<PathBuf>,
}

/// Drives read -> extract -> validate for every input file, then renders once.
pub struct Analyzer<P> {
    config: Config,
    extractor: Extractor<P>,
    reporter: Reporter,
}

impl<P: CompletionProvider> Analyzer<P> {
    pub fn new(config: Config, provider: P) -> Self {
        Self {
            config,
            extractor: Extractor::new(provider),
            reporter: Reporter::new(),
        }
    }

    /// Records from every input, in file order then completion order.
    async fn collect_records(&self) -> (Vec<AgingCause>, usize, usize) {
        let mut all_results = Vec::new();
        let mut files_read = 0;
        let mut files_skipped = 0;
        let total = self.config.input_files.len();

        for (i, path) in self.config.input_files.iter().enumerate() {
            println!("📧 Processing {} ({}/{})...", path.display(), i + 1, total);

            let content = read_email_thread(path);
            if content.is_empty() {
                println!("  ⚠️  No content in {}, skipping", path.display());
                files_skipped += 1;
                continue;
            }
            files_read += 1;

            let results = self.extractor.extract(&content).await;
            println!("  ✅ {} aging cause(s) extracted", results.len());
            all_results.extend(results);
        }

        (all_results, files_read, files_skipped)
    }

    pub async fn run(&self) -> AnalysisSummary {
        let (records, files_read, files_skipped) = self.collect_records().await;

        let output_file = if records.is_empty() {
            None
        } else {
            let path = &self.config.output_file;
            self.reporter
                .export_markdown(&records, path)
                .then(|| path.clone())
        };

        AnalysisSummary {
            files_read,
            files_skipped,
            records,
            output_file,
        }
    }
}
