//! BM25 scoring for keyword search results.

/// BM25 scorer for a single term.
///
/// Holds the per-term corpus statistics (document frequency, corpus size,
/// average document length) and combines them with a document's term
/// frequency and length at scoring time. Uses the non-negative IDF
/// variant `ln(1 + (N - df + 0.5) / (df + 0.5))` so common terms never
/// push a score below zero.
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    /// Number of documents containing the term.
    doc_freq: u64,
    /// Total number of documents in the index.
    total_docs: u64,
    /// Average document length in tokens.
    avg_doc_length: f64,
    /// BM25 k1 parameter.
    k1: f64,
    /// BM25 b parameter.
    b: f64,
}

impl Bm25Scorer {
    /// Create a scorer with the standard parameters (k1 = 1.2, b = 0.75).
    pub fn new(doc_freq: u64, total_docs: u64, avg_doc_length: f64) -> Self {
        Bm25Scorer {
            doc_freq,
            total_docs,
            avg_doc_length,
            k1: 1.2,
            b: 0.75,
        }
    }

    /// Create a scorer with custom k1/b parameters.
    pub fn with_params(
        doc_freq: u64,
        total_docs: u64,
        avg_doc_length: f64,
        k1: f64,
        b: f64,
    ) -> Self {
        Bm25Scorer {
            doc_freq,
            total_docs,
            avg_doc_length,
            k1,
            b,
        }
    }

    /// The IDF (inverse document frequency) component.
    fn idf(&self) -> f64 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let n = self.total_docs as f64;
        let df = self.doc_freq as f64;

        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// The TF (term frequency) component for one document.
    fn tf(&self, term_freq: f64, doc_length: f64) -> f64 {
        if term_freq == 0.0 {
            return 0.0;
        }

        let avg = if self.avg_doc_length > 0.0 {
            self.avg_doc_length
        } else {
            1.0
        };
        let norm = 1.0 - self.b + self.b * (doc_length / avg);

        (term_freq * (self.k1 + 1.0)) / (term_freq + self.k1 * norm)
    }

    /// Score one document given its term frequency and token length.
    pub fn score(&self, term_freq: f64, doc_length: f64) -> f64 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }
        self.idf() * self.tf(term_freq, doc_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_defaults() {
        let scorer = Bm25Scorer::new(10, 1000, 12.0);
        assert_eq!(scorer.k1, 1.2);
        assert_eq!(scorer.b, 0.75);
    }

    #[test]
    fn test_idf_positive_and_zero_on_empty_corpus() {
        let scorer = Bm25Scorer::new(10, 1000, 12.0);
        assert!(scorer.idf() > 0.0);

        let empty = Bm25Scorer::new(0, 0, 0.0);
        assert_eq!(empty.idf(), 0.0);
    }

    #[test]
    fn test_higher_term_freq_scores_higher() {
        let scorer = Bm25Scorer::new(10, 1000, 12.0);
        let low = scorer.score(1.0, 12.0);
        let high = scorer.score(3.0, 12.0);
        assert!(high > low);
        assert_eq!(scorer.score(0.0, 12.0), 0.0);
    }

    #[test]
    fn test_rarer_terms_score_higher() {
        let rare = Bm25Scorer::new(2, 1000, 12.0);
        let common = Bm25Scorer::new(900, 1000, 12.0);
        assert!(rare.score(1.0, 12.0) > common.score(1.0, 12.0));
    }

    #[test]
    fn test_common_terms_never_negative() {
        // df close to N would go negative under the classic IDF formula.
        let scorer = Bm25Scorer::new(999, 1000, 12.0);
        assert!(scorer.score(1.0, 12.0) >= 0.0);
    }

    #[test]
    fn test_longer_documents_penalized() {
        let scorer = Bm25Scorer::new(10, 1000, 12.0);
        let short = scorer.score(2.0, 6.0);
        let long = scorer.score(2.0, 48.0);
        assert!(short > long);
    }
}
