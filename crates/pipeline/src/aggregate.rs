//! Bounded multi-source aggregation
//!
//! Runs the fetcher over a capped set of descriptors in sequence,
//! collecting successes and failures side by side. Aggregation itself
//! never fails; a run with zero successes yields an empty collection
//! the caller must treat as a distinct no-content condition.

use crate::source::{FetchFailure, Source, SourceDescriptor, SourceFetcher};

/// Result of one aggregation pass
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Successfully fetched sources, in traversal order
    pub sources: Vec<Source>,

    /// Per-source failures, for diagnostics
    pub failures: Vec<FetchFailure>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Aggregates content from a bounded set of sources
pub struct ContentAggregator {
    fetcher: SourceFetcher,
}

impl ContentAggregator {
    pub fn new(fetcher: SourceFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch the first `limit` fetchable-scheme descriptors, sequentially
    ///
    /// Descriptors outside the scheme whitelist are skipped without being
    /// counted as failures; excess descriptors beyond `limit` are silently
    /// ignored. Fetches run one at a time so per-source log output stays
    /// deterministic and attributable.
    pub async fn aggregate(&self, descriptors: &[SourceDescriptor], limit: usize) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for descriptor in descriptors.iter().filter(|d| d.is_fetchable()).take(limit) {
            match self.fetcher.fetch(descriptor).await {
                Ok(source) => {
                    tracing::info!(
                        source_id = %descriptor.id,
                        title = %descriptor.title,
                        content_length = source.content_length,
                        "Aggregated source"
                    );
                    aggregation.sources.push(source);
                }
                Err(failure) => {
                    tracing::warn!(
                        source_id = %failure.descriptor.id,
                        title = %failure.descriptor.title,
                        reason = %failure.reason,
                        "Source fetch failed"
                    );
                    aggregation.failures.push(failure);
                }
            }
        }

        tracing::info!(
            fetched = aggregation.sources.len(),
            failed = aggregation.failures.len(),
            "Aggregation complete"
        );

        aggregation
    }

    /// Build the combined context used to ground question answering
    ///
    /// Each source contributes a `Source: {title}` block with its content
    /// truncated to `per_source_cap`; blocks are separated by blank lines
    /// and the whole string is truncated to `total_cap`.
    pub fn build_context(sources: &[Source], per_source_cap: usize, total_cap: usize) -> String {
        let combined = sources
            .iter()
            .map(|source| {
                let content: String = source.content.chars().take(per_source_cap).collect();
                format!("Source: {}\n{}", source.title, content)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        combined.chars().take(total_cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFetcher;
    use contextflow_common::extract::MockExtractor;
    use std::sync::Arc;

    fn aggregator(extractor: MockExtractor) -> ContentAggregator {
        ContentAggregator::new(SourceFetcher::new(Arc::new(extractor), 10_000))
    }

    #[tokio::test]
    async fn test_order_preserved_when_all_fetchable() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "A", "Content of the first article here.")
            .with_page("https://b.example/", "B", "Content of the second article here.")
            .with_page("https://c.example/", "C", "Content of the third article here.");
        let aggregator = aggregator(extractor);

        let descriptors = vec![
            SourceDescriptor::new("A", "https://a.example/"),
            SourceDescriptor::new("B", "https://b.example/"),
            SourceDescriptor::new("C", "https://c.example/"),
        ];

        let aggregation = aggregator.aggregate(&descriptors, 5).await;
        let titles: Vec<_> = aggregation.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        assert!(aggregation.failures.is_empty());
    }

    #[tokio::test]
    async fn test_only_first_limit_descriptors_processed() {
        let mut extractor = MockExtractor::new();
        let mut descriptors = Vec::new();
        for i in 0..7 {
            let url = format!("https://example.com/{}", i);
            extractor = extractor.with_page(&url, &format!("S{}", i), "Long enough content.");
            descriptors.push(SourceDescriptor::new(format!("S{}", i), url));
        }
        let aggregator = aggregator(extractor);

        let aggregation = aggregator.aggregate(&descriptors, 5).await;
        assert_eq!(aggregation.sources.len(), 5);
        let titles: Vec<_> = aggregation.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["S0", "S1", "S2", "S3", "S4"]);
    }

    #[tokio::test]
    async fn test_unfetchable_scheme_skipped_without_failure() {
        let extractor = MockExtractor::new().with_page(
            "https://a.example/",
            "A",
            "Three sentences. About one topic. With detail.",
        );
        let aggregator = aggregator(extractor);

        let descriptors = vec![
            SourceDescriptor::new("A", "https://a.example/"),
            SourceDescriptor::new("B", "view-source://b.example/"),
        ];

        let aggregation = aggregator.aggregate(&descriptors, 5).await;
        assert_eq!(aggregation.sources.len(), 1);
        assert_eq!(aggregation.sources[0].title, "A");
        assert!(aggregation.failures.is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_loop() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "A", "Content of the first article here.")
            .with_failure("https://b.example/", "connection reset")
            .with_page("https://c.example/", "C", "Content of the third article here.");
        let aggregator = aggregator(extractor);

        let descriptors = vec![
            SourceDescriptor::new("A", "https://a.example/"),
            SourceDescriptor::new("B", "https://b.example/"),
            SourceDescriptor::new("C", "https://c.example/"),
        ];

        let aggregation = aggregator.aggregate(&descriptors, 5).await;
        let titles: Vec<_> = aggregation.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["A", "C"]);
        assert_eq!(aggregation.failures.len(), 1);
        assert_eq!(aggregation.failures[0].descriptor.title, "B");
    }

    #[tokio::test]
    async fn test_total_failure_yields_empty_collection() {
        let extractor = MockExtractor::new().with_failure("https://a.example/", "down");
        let aggregator = aggregator(extractor);

        let descriptors = vec![SourceDescriptor::new("A", "https://a.example/")];
        let aggregation = aggregator.aggregate(&descriptors, 5).await;
        assert!(aggregation.is_empty());
        assert_eq!(aggregation.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_build_context_respects_caps() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "A", &"a".repeat(3000))
            .with_page("https://b.example/", "B", &"b".repeat(3000))
            .with_page("https://c.example/", "C", &"c".repeat(3000));
        let aggregator = aggregator(extractor);

        let descriptors = vec![
            SourceDescriptor::new("A", "https://a.example/"),
            SourceDescriptor::new("B", "https://b.example/"),
            SourceDescriptor::new("C", "https://c.example/"),
        ];
        let aggregation = aggregator.aggregate(&descriptors, 5).await;

        let context = ContentAggregator::build_context(&aggregation.sources, 2000, 5000);
        assert!(context.chars().count() <= 5000);
        assert!(context.starts_with("Source: A\n"));

        // Per-source cap: block A holds at most 2000 content chars
        let block_a = context.split("\n\n").next().unwrap();
        assert!(block_a.chars().count() <= 2000 + "Source: A\n".chars().count());
    }

    #[tokio::test]
    async fn test_build_context_block_format() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "Alpha", "First body.")
            .with_page("https://b.example/", "Beta", "Second body.");
        let aggregator = aggregator(extractor);

        let descriptors = vec![
            SourceDescriptor::new("Alpha", "https://a.example/"),
            SourceDescriptor::new("Beta", "https://b.example/"),
        ];
        let aggregation = aggregator.aggregate(&descriptors, 5).await;

        let context = ContentAggregator::build_context(&aggregation.sources, 2000, 5000);
        assert_eq!(
            context,
            "Source: Alpha\nFirst body.\n\nSource: Beta\nSecond body."
        );
    }
}
