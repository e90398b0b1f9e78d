use std::collections::HashMap;

use crate::text::tokenize;

/// Okapi BM25 tuning parameters. Defaults per the reference implementation: `k1 = 1.5`,
/// `b = 0.75`.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Match {
    pub doc_id_index: usize,
    pub score: f32,
}

/// In-memory sparse inverted index over a fixed document set, immutable after build.
///
/// Built once from the corpus and held read-only for the lifetime of the process;
/// scoring never mutates the index and never suspends (CPU-bound).
pub struct Bm25Index {
    doc_ids: Vec<String>,
    /// term -> document frequency
    df: HashMap<String, u32>,
    /// (doc_index, term) -> term frequency, flattened as doc_index -> term -> count
    tf: Vec<HashMap<String, u32>>,
    /// doc_index -> document length in tokens
    dl: Vec<u32>,
    avgdl: f32,
    params: Bm25Params,
}

impl Bm25Index {
    /// Builds the index from `(doc_id, raw_text)` pairs, tokenizing each via the text
    /// normalizer's tokenizer.
    pub fn build<I, S>(documents: I, params: Bm25Params) -> Self
    where
        I: IntoIterator<Item = (String, S)>,
        S: AsRef<str>,
    {
        let mut doc_ids = Vec::new();
        let mut tf = Vec::new();
        let mut dl = Vec::new();
        let mut df: HashMap<String, u32> = HashMap::new();

        for (doc_id, text) in documents {
            let tokens = tokenize(text.as_ref());
            dl.push(tokens.len() as u32);

            let mut counts: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *counts.entry(t).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }

            doc_ids.push(doc_id);
            tf.push(counts);
        }

        let n = dl.len() as f32;
        let avgdl = if n > 0.0 {
            dl.iter().sum::<u32>() as f32 / n
        } else {
            0.0
        };

        Bm25Index {
            doc_ids,
            df,
            tf,
            dl,
            avgdl,
            params,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn doc_id(&self, index: usize) -> &str {
        &self.doc_ids[index]
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.doc_ids.len() as f32;
        let df = *self.df.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Scores and ranks the corpus against `query`, returning at most `top_k` matches
    /// with strictly positive score, ordered by descending score, ties broken by
    /// ascending `doc_id` for determinism.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Bm25Match> {
        let terms = tokenize(query);
        if terms.is_empty() || self.doc_ids.is_empty() {
            return Vec::new();
        }

        let mut scores: Vec<f32> = vec![0.0; self.doc_ids.len()];
        for term in &terms {
            let idf = self.idf(term);
            if idf <= 0.0 {
                continue;
            }
            for (doc_index, counts) in self.tf.iter().enumerate() {
                let Some(&tf) = counts.get(term) else {
                    continue;
                };
                let tf = tf as f32;
                let dl = self.dl[doc_index] as f32;
                let denom = tf + self.params.k1 * (1.0 - self.params.b + self.params.b * dl / self.avgdl.max(1.0));
                scores[doc_index] += idf * tf * (self.params.k1 + 1.0) / denom;
            }
        }

        let mut matches: Vec<Bm25Match> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc_id_index, score)| Bm25Match { doc_id_index, score })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.doc_ids[a.doc_id_index].cmp(&self.doc_ids[b.doc_id_index]))
        });

        matches.truncate(top_k);
        matches
    }
}
