//! Command implementations for the marquee CLI.

use std::sync::Arc;
use std::time::Instant;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::MarqueeConfig;
use crate::embedding::executor::SharedEmbedder;
use crate::embedding::hashing::HashingEmbedder;
use crate::error::Result;
use crate::movie::{DocumentTemplate, GenreTable, load_movies};
use crate::recommend::Recommender;
use crate::storage::{FileStorage, StorageConfig};
use crate::vector::collection::CollectionManager;

/// Execute a CLI command.
pub fn execute_command(args: MarqueeArgs) -> Result<()> {
    let context = CommandContext::new(&args)?;
    match &args.command {
        Command::Index(index_args) => index_movies(index_args, &context, &args),
        Command::Recommend(recommend_args) => recommend(recommend_args, &context, &args),
        Command::Similar(similar_args) => similar(similar_args, &context, &args),
        Command::Stats => show_stats(&context, &args),
        Command::Compact => compact(&context, &args),
    }
}

/// Configuration plus the collections it describes.
pub struct CommandContext {
    pub config: MarqueeConfig,
    pub collections: CollectionManager,
}

impl CommandContext {
    /// Load the configuration, apply command line overrides and open the collections.
    pub fn new(args: &MarqueeArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => MarqueeConfig::load(path)?,
            None => MarqueeConfig::default(),
        };
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = Some(data_dir.clone());
        }
        Self::from_config(config)
    }

    pub fn from_config(config: MarqueeConfig) -> Result<Self> {
        config.validate()?;

        let embedder = SharedEmbedder::new(Arc::new(HashingEmbedder::new(config.dimension)?))?;
        let template = config.store_template();
        let collections = match &config.data_dir {
            Some(dir) => {
                let storage = FileStorage::new(dir, StorageConfig::default())?;
                log::debug!("using collections in {}", dir.display());
                CollectionManager::open(Arc::new(storage), Some(embedder), template)
            }
            None => {
                log::warn!("no data directory configured, collections live only for this run");
                CollectionManager::in_memory(Some(embedder), template)
            }
        };

        Ok(Self {
            config,
            collections,
        })
    }
}

/// Load movies and populate the title and description collections.
///
/// Each collection is only populated while empty, so re-running is a no-op.
pub fn index_movies(args: &IndexArgs, context: &CommandContext, cli_args: &MarqueeArgs) -> Result<()> {
    let start_time = Instant::now();

    let genres = match &args.genres {
        Some(path) => Some(GenreTable::load(path)?),
        None => None,
    };
    let movies = load_movies(&args.movies_file, genres.as_ref())?;

    let targets = [
        (&context.config.title_collection, DocumentTemplate::TitleOnly),
        (&context.config.description_collection, DocumentTemplate::Full),
    ];
    let mut collections = Vec::with_capacity(targets.len());
    for (name, template) in targets {
        let store = context.collections.get_or_create(name)?;
        let (ids, texts) = template.render_all(&movies);
        let populated = context
            .collections
            .populate_if_empty(&store, ids, texts, None)?;
        collections.push(CollectionPopulation {
            name: name.clone(),
            populated,
            count: store.count(),
        });
    }

    output_result(
        &IndexResult {
            movies: movies.len(),
            collections,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Recommend movies for a free-text query.
pub fn recommend(args: &RecommendArgs, context: &CommandContext, cli_args: &MarqueeArgs) -> Result<()> {
    let start_time = Instant::now();
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| context.config.description_collection.clone());
    let k = args.k.unwrap_or(context.config.default_k);

    let mut recommender = Recommender::new(context.collections.get(&collection)?);
    if let Some(max_distance) = args.max_distance {
        recommender = recommender.with_max_distance(max_distance);
    }
    let recommendations = recommender.recommend(&args.query, k)?;

    output_result(
        &RecommendResults {
            query: args.query.clone(),
            collection,
            recommendations,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Recommend movies similar to a stored one.
pub fn similar(args: &SimilarArgs, context: &CommandContext, cli_args: &MarqueeArgs) -> Result<()> {
    let start_time = Instant::now();
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| context.config.description_collection.clone());
    let k = args.k.unwrap_or(context.config.default_k);

    let recommender = Recommender::new(context.collections.get(&collection)?);
    let recommendations = recommender.recommend_similar(&args.id, k)?;

    output_result(
        &RecommendResults {
            query: args.id.clone(),
            collection,
            recommendations,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Show statistics for every collection.
pub fn show_stats(context: &CommandContext, cli_args: &MarqueeArgs) -> Result<()> {
    let collections = context
        .collections
        .list()?
        .iter()
        .map(|name| Ok(context.collections.get(name)?.stats()))
        .collect::<Result<Vec<_>>>()?;

    output_result(&StatsResult { collections }, cli_args)
}

/// Compact every collection's log.
pub fn compact(context: &CommandContext, cli_args: &MarqueeArgs) -> Result<()> {
    let start_time = Instant::now();
    let names = context.collections.list()?;
    for name in &names {
        context.collections.get(name)?.compact()?;
    }

    output_result(
        &CompactResult {
            collections: names,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MOVIES: &str = r#"[
        {"id": 11, "title": "Star Wars", "year": 1977,
         "overview": "A farm boy joins a rebellion against a galactic empire.",
         "genres": ["Adventure", "Science Fiction"]},
        {"id": 348, "title": "Alien", "year": 1979,
         "overview": "The crew of a space tug meets a deadly lifeform.",
         "genres": ["Horror", "Science Fiction"]},
        {"id": 949, "title": "Heat", "year": 1995,
         "overview": "A detective hunts a crew of professional thieves in Los Angeles.",
         "genres": ["Crime", "Thriller"]}
    ]"#;

    fn setup() -> (TempDir, MarqueeConfig, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let movies = dir.path().join("movies.json");
        std::fs::write(&movies, MOVIES).unwrap();
        let config = MarqueeConfig::default()
            .with_dimension(64)
            .with_data_dir(dir.path().join("data"));
        (dir, config, movies)
    }

    fn args(argv: &[&str]) -> MarqueeArgs {
        use clap::Parser;
        MarqueeArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_index_is_idempotent_across_runs() {
        let (_dir, config, movies) = setup();
        let cli_args = args(&["marquee", "-q", "stats"]);
        let index_args = IndexArgs {
            movies_file: movies,
            genres: None,
        };

        let context = CommandContext::from_config(config.clone()).unwrap();
        index_movies(&index_args, &context, &cli_args).unwrap();
        drop(context);

        let context = CommandContext::from_config(config).unwrap();
        index_movies(&index_args, &context, &cli_args).unwrap();
        let store = context.collections.get("movies").unwrap();
        assert_eq!(store.count(), 3);
        assert_eq!(context.collections.get("movie_titles").unwrap().count(), 3);
        assert_eq!(
            context.collections.list().unwrap(),
            vec!["movie_titles".to_string(), "movies".to_string()]
        );
    }

    #[test]
    fn test_recommend_and_similar_after_index() {
        let (_dir, config, movies) = setup();
        let cli_args = args(&["marquee", "-q", "stats"]);
        let context = CommandContext::from_config(config).unwrap();
        index_movies(
            &IndexArgs {
                movies_file: movies,
                genres: None,
            },
            &context,
            &cli_args,
        )
        .unwrap();

        let recommender = Recommender::new(context.collections.get("movie_titles").unwrap());
        assert_eq!(recommender.recommend("Alien", 1).unwrap()[0].id.as_str(), "348");

        similar(
            &SimilarArgs {
                id: "11".into(),
                k: Some(2),
                collection: None,
            },
            &context,
            &cli_args,
        )
        .unwrap();
        show_stats(&context, &cli_args).unwrap();
        compact(&context, &cli_args).unwrap();
    }

    #[test]
    fn test_recommend_unknown_collection() {
        let (_dir, config, _movies) = setup();
        let context = CommandContext::from_config(config).unwrap();
        let cli_args = args(&["marquee", "-q", "stats"]);
        let result = recommend(
            &RecommendArgs {
                query: "space".into(),
                k: None,
                collection: Some("nope".into()),
                max_distance: None,
            },
            &context,
            &cli_args,
        );
        assert!(result.is_err());
    }
}
