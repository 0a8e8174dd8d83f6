//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{MarqueeArgs, OutputFormat};
use crate::error::Result;
use crate::recommend::Recommendation;
use crate::vector::store::VectorStoreStats;

/// Population outcome of one collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionPopulation {
    pub name: String,
    pub populated: bool,
    pub count: usize,
}

/// Result structure for indexing.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResult {
    pub movies: usize,
    pub collections: Vec<CollectionPopulation>,
    pub duration_ms: u64,
}

/// Result structure for recommendations.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResults {
    /// The query text, or the id of the movie recommendations are similar to.
    pub query: String,
    pub collection: String,
    pub recommendations: Vec<Recommendation>,
    pub duration_ms: u64,
}

/// Statistics for every collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResult {
    pub collections: Vec<VectorStoreStats>,
}

/// Result structure for compaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompactResult {
    pub collections: Vec<String>,
    pub duration_ms: u64,
}

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

impl HumanOutput for IndexResult {
    fn render_human(&self) -> String {
        let mut out = format!("Loaded {} movies in {} ms\n", self.movies, self.duration_ms);
        for collection in &self.collections {
            let status = if collection.populated {
                "populated"
            } else {
                "already populated, skipped"
            };
            out.push_str(&format!(
                "  {:<20} {:>8} items  ({status})\n",
                collection.name, collection.count
            ));
        }
        out
    }
}

impl HumanOutput for RecommendResults {
    fn render_human(&self) -> String {
        if self.recommendations.is_empty() {
            return format!("No recommendations for '{}' in '{}'\n", self.query, self.collection);
        }

        let mut out = format!(
            "Recommendations for '{}' from '{}' ({} ms):\n",
            self.query, self.collection, self.duration_ms
        );
        for (rank, recommendation) in self.recommendations.iter().enumerate() {
            let title = recommendation
                .document
                .as_deref()
                .map(first_line)
                .unwrap_or_default();
            out.push_str(&format!(
                "{:>3}. [{}] {}  (distance {:.4})\n",
                rank + 1,
                recommendation.id,
                title,
                recommendation.distance
            ));
        }
        out
    }
}

impl HumanOutput for StatsResult {
    fn render_human(&self) -> String {
        if self.collections.is_empty() {
            return "No collections\n".to_string();
        }

        let mut out = String::from("Collections:\n");
        for stats in &self.collections {
            let dimension = stats
                .dimension
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  {:<20} {:>8} items  dim {:<6} metric {:<10} {}\n",
                stats.name,
                stats.count,
                dimension,
                stats.metric.name(),
                if stats.persistent { "persistent" } else { "in-memory" }
            ));
        }
        out
    }
}

impl HumanOutput for CompactResult {
    fn render_human(&self) -> String {
        format!(
            "Compacted {} collections in {} ms\n",
            self.collections.len(),
            self.duration_ms
        )
    }
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &MarqueeArgs) -> Result<()> {
    print!("{}", render_result(result, args)?);
    Ok(())
}

/// Render a result in the selected format.
pub fn render_result<T: Serialize + HumanOutput>(result: &T, args: &MarqueeArgs) -> Result<String> {
    match args.output_format {
        OutputFormat::Human => Ok(result.render_human()),
        OutputFormat::Json => {
            let mut json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            json.push('\n');
            Ok(json)
        }
    }
}

/// The title line of a rendered document.
fn first_line(document: &str) -> &str {
    let line = document.lines().next().unwrap_or_default();
    line.strip_prefix("Movie title: ").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::core::record::ItemId;
    use clap::Parser;

    fn results() -> RecommendResults {
        RecommendResults {
            query: "space".into(),
            collection: "movies".into(),
            recommendations: vec![Recommendation {
                id: ItemId::from(11u64),
                document: Some("Movie title: Star Wars\nYear: 1977".into()),
                distance: 0.25,
            }],
            duration_ms: 3,
        }
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("Movie title: Alien\nYear: 1979"), "Alien");
        assert_eq!(first_line("Alien"), "Alien");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_human_recommendations() {
        let text = results().render_human();
        assert!(text.contains("[11] Star Wars"));
        assert!(text.contains("distance 0.2500"));
    }

    #[test]
    fn test_json_recommendations() {
        let args = MarqueeArgs::try_parse_from(["marquee", "--format", "json", "stats"]).unwrap();
        let json = render_result(&results(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["recommendations"][0]["id"], "11");
        assert_eq!(value["collection"], "movies");
    }

    #[test]
    fn test_empty_stats() {
        let stats = StatsResult {
            collections: Vec::new(),
        };
        assert_eq!(stats.render_human(), "No collections\n");
    }
}
