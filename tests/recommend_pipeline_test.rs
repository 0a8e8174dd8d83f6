use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use marquee::embedding::executor::SharedEmbedder;
use marquee::embedding::hashing::HashingEmbedder;
use marquee::embedding::text_embedder::TextEmbedder;
use marquee::error::{MarqueeError, Result};
use marquee::movie::{DocumentTemplate, GenreTable, Movie, parse_movies, select};
use marquee::recommend::Recommender;
use marquee::vector::{CollectionManager, Embedding, VectorStoreConfig};

/// Hashing embedder that counts how often it is called.
struct CountingEmbedder {
    inner: HashingEmbedder,
    batch_calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new(dimension: usize) -> Result<Self> {
        Ok(Self {
            inner: HashingEmbedder::new(dimension)?,
            batch_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextEmbedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

struct FailingEmbedder;

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(MarqueeError::embedding("model unavailable"))
    }

    fn dimension(&self) -> usize {
        8
    }
}

const MOVIES: &str = r#"[
    {"id": 11, "title": "Star Wars", "release_date": "1977-05-25",
     "overview": "Luke Skywalker joins the rebellion to rescue Princess Leia from the Empire.",
     "genre_ids": [12, 28, 878]},
    {"id": 1891, "title": "The Empire Strikes Back", "release_date": "1980-05-20",
     "overview": "The rebellion is pursued by the Empire while Luke trains as a Jedi.",
     "genre_ids": [12, 28, 878]},
    {"id": 348, "title": "Alien", "release_date": "1979-05-25",
     "overview": "The crew of the Nostromo is hunted by a deadly alien creature.",
     "genre_ids": [27, 878]},
    {"id": 949, "title": "Heat", "release_date": "1995-12-15",
     "overview": "A detective hunts a crew of professional bank robbers in Los Angeles.",
     "genre_ids": [28, 80]}
]"#;

fn genres() -> GenreTable {
    GenreTable::from_pairs([
        (12, "Adventure"),
        (27, "Horror"),
        (28, "Action"),
        (80, "Crime"),
        (878, "Science Fiction"),
    ])
}

fn movies() -> Result<Vec<Movie>> {
    parse_movies(MOVIES, Some(&genres()))
}

#[test]
fn test_population_is_idempotent_and_batched() -> Result<()> {
    let embedder = Arc::new(CountingEmbedder::new(256)?);
    let shared = SharedEmbedder::new(embedder.clone())?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());
    let movies = movies()?;

    let store = manager.get_or_create("movies")?;
    let (ids, texts) = DocumentTemplate::Full.render_all(&movies);
    assert!(manager.populate_if_empty(&store, ids.clone(), texts.clone(), None)?);
    assert_eq!(store.count(), movies.len());
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

    // Re-running the population step is a no-op and does not embed again.
    let again = manager.get_or_create("movies")?;
    assert!(!manager.populate_if_empty(&again, ids, texts, None)?);
    assert_eq!(again.count(), movies.len());
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_collections_share_one_embedder() -> Result<()> {
    let embedder = Arc::new(CountingEmbedder::new(64)?);
    let shared = SharedEmbedder::new(embedder.clone())?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());

    let titles = manager.get_or_create("movie_titles")?;
    let descriptions = manager.get_or_create("movies")?;
    let titles_embedder = titles.embedder().map(|e| Arc::as_ptr(e.embedder()) as *const ());
    let descriptions_embedder = descriptions
        .embedder()
        .map(|e| Arc::as_ptr(e.embedder()) as *const ());
    assert_eq!(titles_embedder, descriptions_embedder);
    assert_eq!(titles_embedder, Some(Arc::as_ptr(&embedder) as *const ()));
    Ok(())
}

#[test]
fn test_title_query_finds_exact_title() -> Result<()> {
    let shared = SharedEmbedder::new(Arc::new(HashingEmbedder::new(256)?))?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());
    let movies = movies()?;

    let titles = manager.get_or_create("movie_titles")?;
    let (ids, texts) = DocumentTemplate::TitleOnly.render_all(&movies);
    manager.populate_if_empty(&titles, ids, texts, None)?;

    let recommender = Recommender::new(titles);
    let recommendations = recommender.recommend("Star Wars", 2)?;
    assert_eq!(recommendations[0].id.as_str(), "11");
    assert_eq!(recommendations[0].document.as_deref(), Some("Star Wars"));
    assert!(recommendations[0].distance.abs() < 1e-6);
    assert!(recommendations[1].distance > recommendations[0].distance);
    Ok(())
}

#[test]
fn test_item_to_item_recommendation() -> Result<()> {
    let shared = SharedEmbedder::new(Arc::new(HashingEmbedder::new(512)?))?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());
    let movies = movies()?;

    let store = manager.get_or_create("movies")?;
    let (ids, texts) = DocumentTemplate::Full.render_all(&movies);
    manager.populate_if_empty(&store, ids, texts, None)?;

    // The user picks "Star Wars" out of a candidate list.
    let chosen = select(&movies, 0)?;
    let recommender = Recommender::new(store);
    let similar = recommender.recommend_similar(chosen.item_id().as_str(), 3)?;
    assert_eq!(similar.len(), 3);
    assert!(similar.iter().all(|r| r.id != chosen.item_id()));
    assert!(similar.windows(2).all(|w| w[0].distance <= w[1].distance));
    Ok(())
}

#[test]
fn test_embedding_failure_leaves_store_unchanged() -> Result<()> {
    let shared = SharedEmbedder::new(Arc::new(FailingEmbedder))?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());
    let store = manager.get_or_create("movies")?;

    let err = manager
        .populate_if_empty(&store, vec![1u64], vec!["Heat".to_string()], None)
        .unwrap_err();
    assert!(matches!(err, MarqueeError::Embedding(_)));
    assert_eq!(store.count(), 0);
    assert_eq!(store.dimension(), None);
    Ok(())
}

#[test]
fn test_recommend_with_zero_k_or_empty_store() -> Result<()> {
    let shared = SharedEmbedder::new(Arc::new(HashingEmbedder::new(32)?))?;
    let manager = CollectionManager::in_memory(Some(shared), VectorStoreConfig::default());
    let recommender = Recommender::new(manager.get_or_create("movies")?);

    assert!(recommender.recommend("anything", 5)?.is_empty());
    assert!(recommender.recommend("anything", 0)?.is_empty());
    Ok(())
}
