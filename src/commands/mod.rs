//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod ask;
pub mod build_index;
pub mod chat;
pub mod preprocess;
pub mod stats;

use crate::config::Config;
use crate::index::SearchHit;

/// Token from `--token`, else the configured/env token.
pub fn resolve_token(flag: Option<String>, config: &Config) -> Option<String> {
    flag.filter(|t| !t.trim().is_empty())
        .or_else(|| config.api_token.clone())
}

const SNIPPET_CHARS: usize = 300;

/// Render sources as `Source i (category)` blocks with a short excerpt.
pub fn format_sources(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.chunk.metadata;
        let excerpt: String = hit.chunk.text.chars().take(SNIPPET_CHARS).collect();
        let ellipsis = if hit.chunk.text.chars().count() > SNIPPET_CHARS {
            "..."
        } else {
            ""
        };

        out.push_str(&format!(
            "Source {} ({}) complaint {} | {} | {} | score {:.3}\n  {}{}\n",
            i + 1,
            meta.product_category,
            meta.complaint_id,
            meta.issue,
            meta.company,
            hit.score,
            excerpt,
            ellipsis
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ProductCategory;
    use crate::rag::{ChunkMetadata, ComplaintChunk};

    #[test]
    fn flag_token_wins_over_config() {
        let mut config = Config::defaults();
        config.api_token = Some("from_env".into());

        assert_eq!(
            resolve_token(Some("from_flag".into()), &config).as_deref(),
            Some("from_flag")
        );
        assert_eq!(
            resolve_token(Some(" ".into()), &config).as_deref(),
            Some("from_env")
        );

        config.api_token = None;
        assert_eq!(resolve_token(None, &config), None);
    }

    #[test]
    fn sources_are_numbered_with_category() {
        let hits = vec![SearchHit {
            id: 0,
            chunk: ComplaintChunk {
                text: "x".repeat(400),
                metadata: ChunkMetadata {
                    complaint_id: "77".into(),
                    product_category: ProductCategory::PersonalLoan,
                    issue: "Billing".into(),
                    company: "Lender".into(),
                    chunk_index: 0,
                },
            },
            score: 0.5,
        }];

        let text = format_sources(&hits);
        assert!(text.starts_with("Source 1 (Personal Loan) complaint 77"));
        assert!(text.trim_end().ends_with("..."));
    }
}
