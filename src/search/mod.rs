//! Tantivy-based search index module.
//!
//! Full-text search over link names, URLs, descriptions, tag names and the
//! extracted readable text, with per-field boosts.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Link;

const BOOST_NAME: f32 = 10.0;
const BOOST_TAG_NAMES: f32 = 7.0;
const BOOST_URL: f32 = 5.5;
const BOOST_DESCRIPTION: f32 = 4.0;
const BOOST_TEXT_CONTENT: f32 = 1.5;

/// A matching link id and its relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub link_id: i64,
    pub score: f32,
}

struct SearchFields {
    link_id: Field,
    name: Field,
    url: Field,
    description: Field,
    tag_names: Field,
    text_content: Field,
}

/// Tantivy search index for links.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // Indexed as a raw token so updates can delete by term.
        let link_id = schema_builder.add_text_field("link_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT | STORED);
        let url = schema_builder.add_text_field("url", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let tag_names = schema_builder.add_text_field("tag_names", TEXT);
        let text_content = schema_builder.add_text_field("text_content", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            link_id,
            name,
            url,
            description,
            tag_names,
            text_content,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the whole index with `links` and their extracted text.
    pub async fn rebuild(&self, links: &[(Link, Option<String>)]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        writer.delete_all_documents()?;
        for (link, text) in links {
            writer.add_document(self.create_document(link, text.as_deref()))?;
        }
        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} links", links.len());
        Ok(())
    }

    /// Index or re-index a single link.
    pub async fn index_link(&self, link: &Link, text_content: Option<&str>) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        writer.delete_term(self.id_term(link.id));
        writer.add_document(self.create_document(link, text_content))?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub async fn remove_links(&self, link_ids: &[i64]) -> Result<(), AppError> {
        if link_ids.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.write().await;
        for id in link_ids {
            writer.delete_term(self.id_term(*id));
        }
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Ranked link ids for `query_str`. Callers filter by access.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.name, BOOST_NAME),
            (self.fields.tag_names, BOOST_TAG_NAMES),
            (self.fields.url, BOOST_URL),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.text_content, BOOST_TEXT_CONTENT),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let mut parser = QueryParser::for_index(&self.index, vec![field]);
            parser.set_conjunction_by_default();
            if let Ok(field_query) = parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        if subqueries.is_empty() {
            return Err(AppError::Search(format!("Invalid search query: {}", query_str)));
        }
        let query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        Ok(top_docs
            .into_iter()
            .filter_map(|(score, address)| {
                let doc: TantivyDocument = searcher.doc(address).ok()?;
                let link_id = doc.get_first(self.fields.link_id)?.as_str()?.parse().ok()?;
                Some(SearchResult { link_id, score })
            })
            .collect())
    }

    fn id_term(&self, link_id: i64) -> Term {
        Term::from_field_text(self.fields.link_id, &link_id.to_string())
    }

    fn create_document(&self, link: &Link, text_content: Option<&str>) -> TantivyDocument {
        let tag_names: Vec<&str> = link.tags.iter().map(|t| t.name.as_str()).collect();
        doc!(
            self.fields.link_id => link.id.to_string(),
            self.fields.name => link.name.clone(),
            self.fields.url => link.url.clone().unwrap_or_default(),
            self.fields.description => link.description.clone(),
            self.fields.tag_names => tag_names.join(" "),
            self.fields.text_content => text_content.unwrap_or_default().to_string()
        )
    }
}
