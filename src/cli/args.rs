//! Command line argument parsing using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Marquee - cold-start movie recommendations from text similarity
#[derive(Parser, Debug, Clone)]
#[command(name = "marquee")]
#[command(about = "Cold-start movie recommendations from text similarity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct MarqueeArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE", env = "MARQUEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the collections (overrides the config file)
    #[arg(short, long, value_name = "DIR", env = "MARQUEE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl MarqueeArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Embed a movie file into the title and description collections
    Index(IndexArgs),

    /// Recommend movies for a free-text query
    Recommend(RecommendArgs),

    /// Recommend movies similar to a stored movie
    Similar(SimilarArgs),

    /// Show collection statistics
    Stats,

    /// Rewrite collection logs without superseded records
    Compact,
}

/// Arguments for indexing movies
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Movie file (JSON array or JSONL)
    #[arg(value_name = "MOVIES_FILE")]
    pub movies_file: PathBuf,

    /// Genre table (`{"genres": [{"id": .., "name": ..}]}`) for records with genre ids
    #[arg(short, long, value_name = "GENRES_FILE")]
    pub genres: Option<PathBuf>,
}

/// Arguments for free-text recommendations
#[derive(Parser, Debug, Clone)]
pub struct RecommendArgs {
    /// Query text, e.g. a title or a short plot description
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of recommendations (defaults to the configured value)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Collection to query (defaults to the description collection)
    #[arg(long)]
    pub collection: Option<String>,

    /// Drop recommendations farther than this distance
    #[arg(long)]
    pub max_distance: Option<f32>,
}

/// Arguments for item-to-item recommendations
#[derive(Parser, Debug, Clone)]
pub struct SimilarArgs {
    /// Id of a stored movie
    #[arg(value_name = "ID")]
    pub id: String,

    /// Number of recommendations (defaults to the configured value)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Collection to query (defaults to the description collection)
    #[arg(long)]
    pub collection: Option<String>,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_command() {
        let args = MarqueeArgs::try_parse_from([
            "marquee",
            "recommend",
            "space opera",
            "-k",
            "5",
            "--collection",
            "movie_titles",
        ])
        .unwrap();

        if let Command::Recommend(recommend_args) = args.command {
            assert_eq!(recommend_args.query, "space opera");
            assert_eq!(recommend_args.k, Some(5));
            assert_eq!(recommend_args.collection.as_deref(), Some("movie_titles"));
            assert!(recommend_args.max_distance.is_none());
        } else {
            panic!("Expected Recommend command");
        }
    }

    #[test]
    fn test_index_command() {
        let args = MarqueeArgs::try_parse_from([
            "marquee",
            "--data-dir",
            "/tmp/marquee",
            "index",
            "movies.json",
            "--genres",
            "genres.json",
        ])
        .unwrap();

        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/marquee")));
        if let Command::Index(index_args) = args.command {
            assert_eq!(index_args.movies_file, PathBuf::from("movies.json"));
            assert_eq!(index_args.genres, Some(PathBuf::from("genres.json")));
        } else {
            panic!("Expected Index command");
        }
    }

    #[test]
    fn test_similar_command() {
        let args = MarqueeArgs::try_parse_from(["marquee", "similar", "11"]).unwrap();
        if let Command::Similar(similar_args) = args.command {
            assert_eq!(similar_args.id, "11");
            assert!(similar_args.k.is_none());
        } else {
            panic!("Expected Similar command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = MarqueeArgs::try_parse_from(["marquee", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = MarqueeArgs::try_parse_from(["marquee", "-vv", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = MarqueeArgs::try_parse_from(["marquee", "-vvv", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args = MarqueeArgs::try_parse_from(["marquee", "--quiet", "-vv", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = MarqueeArgs::try_parse_from(["marquee", "--format", "json", "compact"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Compact));
    }
}
