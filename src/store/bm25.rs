use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy};

/// Score added by a fuzzy (typo-tolerant) term match.
const FUZZY_BOOST: f32 = 0.5;

/// BM25 keyword index over product descriptions, built on tantivy.
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    f_product_id: Field,
    f_description: Field,
}

#[derive(Debug, Clone)]
pub struct Bm25Hit {
    pub product_id: String,
    pub score: f32,
}

impl Bm25Index {
    /// Create an empty in-RAM index.
    pub fn new() -> tantivy::Result<Self> {
        let mut schema_builder = Schema::builder();
        let f_product_id = schema_builder.add_text_field("product_id", STRING | STORED);
        let f_description = schema_builder.add_text_field("description", TEXT);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            f_product_id,
            f_description,
        })
    }

    /// Index or replace one product's description.
    pub fn upsert(&self, product_id: &str, description: &str) -> tantivy::Result<()> {
        self.upsert_many([(product_id, description)])
    }

    /// Index or replace several products in a single commit.
    pub fn upsert_many<'a, I>(&self, docs: I) -> tantivy::Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut writer = self.writer.lock();
        for (product_id, description) in docs {
            writer.delete_term(Term::from_field_text(self.f_product_id, product_id));
            writer.add_document(doc!(
                self.f_product_id => product_id,
                self.f_description => description,
            ))?;
        }
        writer.commit()?;
        drop(writer);
        self.reader.reload()
    }

    /// Search descriptions, best match first.
    ///
    /// Every query token contributes its BM25 score on exact matches plus a
    /// flat boost for matches within an edit distance scaled to token length.
    pub fn search(&self, text: &str, limit: usize) -> tantivy::Result<Vec<Bm25Hit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut analyzer = self.index.tokenizer_for_field(self.f_description)?;
        let mut stream = analyzer.token_stream(text);
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        while stream.advance() {
            let token = &stream.token().text;
            let term = Term::from_field_text(self.f_description, token);
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs)),
            ));

            let distance = fuzzy_distance(token);
            if distance > 0 {
                clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(
                        Box::new(FuzzyTermQuery::new(term, distance, true)),
                        FUZZY_BOOST,
                    )),
                ));
            }
        }

        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        let query = BooleanQuery::new(clauses);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let Some(product_id) = doc.get_first(self.f_product_id).and_then(|v| v.as_str()) else {
                continue;
            };
            hits.push(Bm25Hit {
                product_id: product_id.to_string(),
                score,
            });
        }

        Ok(hits)
    }

    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Edit distance allowed for a token, mirroring Elasticsearch's `AUTO` fuzziness.
fn fuzzy_distance(token: &str) -> u8 {
    match token.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Bm25Index {
        let index = Bm25Index::new().unwrap();
        index
            .upsert_many([
                ("p-1", "Wireless noise cancelling headphones with long battery life"),
                ("p-2", "Stainless steel water bottle, keeps drinks cold"),
                ("p-3", "Bluetooth speaker, waterproof, wireless"),
                ("p-4", "Ergonomic office chair with lumbar support"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let index = sample_index();
        let hits = index.search("office chair", 10).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].product_id, "p-4");
    }

    #[test]
    fn test_multiple_matches_are_returned() {
        let index = sample_index();
        let ids: Vec<String> = index
            .search("wireless", 10)
            .unwrap()
            .into_iter()
            .map(|h| h.product_id)
            .collect();
        assert!(ids.contains(&"p-1".to_string()));
        assert!(ids.contains(&"p-3".to_string()));
        assert!(!ids.contains(&"p-2".to_string()));
    }

    #[test]
    fn test_typo_still_matches() {
        let index = sample_index();
        let hits = index.search("headphnes", 10).unwrap();
        assert_eq!(hits.first().map(|h| h.product_id.as_str()), Some("p-1"));
    }

    #[test]
    fn test_upsert_replaces_previous_text() {
        let index = sample_index();
        index.upsert("p-2", "Insulated coffee mug").unwrap();
        assert_eq!(index.len(), 4);
        assert!(index
            .search("bottle", 10)
            .unwrap()
            .iter()
            .all(|h| h.product_id != "p-2"));
        assert_eq!(index.search("coffee mug", 10).unwrap()[0].product_id, "p-2");
    }

    #[test]
    fn test_limit_and_empty_queries() {
        let index = sample_index();
        assert_eq!(index.search("wireless", 1).unwrap().len(), 1);
        assert!(index.search("wireless", 0).unwrap().is_empty());
        assert!(index.search("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_fuzzy_distance_follows_token_length() {
        assert_eq!(fuzzy_distance("tv"), 0);
        assert_eq!(fuzzy_distance("lamp"), 1);
        assert_eq!(fuzzy_distance("speaker"), 2);
    }
}
