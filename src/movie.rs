//! Movie records and the text that gets embedded for them.
//!
//! Metadata providers hand out loosely shaped records with genre ids; they are
//! mapped into [`Movie`] at the boundary with an explicitly passed
//! [`GenreTable`], and a [`DocumentTemplate`] turns each movie into the single
//! text that is embedded.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};
use crate::vector::core::record::ItemId;

/// A movie with named, typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Movie {
    /// The movie's id as a store key.
    pub fn item_id(&self) -> ItemId {
        ItemId::from(self.id)
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({year})", self.title),
            None => f.write_str(&self.title),
        }
    }
}

/// A movie as a metadata provider returns it, with genre ids instead of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMovie {
    pub id: u64,
    pub title: String,
    /// `YYYY-MM-DD`, possibly empty.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: String,
    pub genre_ids: Vec<u32>,
}

impl RawMovie {
    /// Resolve genre ids and the release year into a [`Movie`].
    pub fn into_movie(self, genres: &GenreTable) -> Result<Movie> {
        let genre_names = genres.resolve(&self.genre_ids).map_err(|err| {
            MarqueeError::invalid_argument(format!("movie {} ('{}'): {err}", self.id, self.title))
        })?;
        let year = self.release_date.as_deref().and_then(parse_year);
        Ok(Movie {
            id: self.id,
            title: self.title,
            year,
            overview: self.overview,
            genres: genre_names,
        })
    }
}

fn parse_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

/// Read-only genre id to name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreTable {
    names: HashMap<u32, String>,
}

#[derive(Deserialize)]
struct GenreList {
    genres: Vec<GenreEntry>,
}

#[derive(Deserialize)]
struct GenreEntry {
    id: u32,
    name: String,
}

impl GenreTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }

    /// Parse a `{"genres": [{"id": 28, "name": "Action"}, ...]}` document.
    pub fn from_json(json: &str) -> Result<Self> {
        let list: GenreList = serde_json::from_str(json)?;
        Ok(Self::from_pairs(list.genres.into_iter().map(|g| (g.id, g.name))))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Names for `ids`, in order. An unknown id is an error.
    pub fn resolve(&self, ids: &[u32]) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| {
                self.name(id)
                    .map(str::to_string)
                    .ok_or_else(|| MarqueeError::invalid_argument(format!("unknown genre id {id}")))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// How a movie is rendered into the text that gets embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentTemplate {
    /// Just the title.
    TitleOnly,
    /// Title, year, overview and genres on separate lines.
    #[default]
    Full,
}

impl DocumentTemplate {
    pub fn render(&self, movie: &Movie) -> String {
        match self {
            DocumentTemplate::TitleOnly => movie.title.clone(),
            DocumentTemplate::Full => {
                let year = movie.year.map(|y| y.to_string()).unwrap_or_default();
                format!(
                    "Movie title: {}\nYear: {}\nOverview: {}\nGenres: {}",
                    movie.title,
                    year,
                    movie.overview,
                    movie.genres.join(", ")
                )
            }
        }
    }

    /// Ids and rendered texts for a batch insert.
    pub fn render_all(&self, movies: &[Movie]) -> (Vec<ItemId>, Vec<String>) {
        movies
            .iter()
            .map(|movie| (movie.item_id(), self.render(movie)))
            .unzip()
    }
}

/// Pick the chosen candidate out of a list shown to a user.
pub fn select<T>(candidates: &[T], index: usize) -> Result<&T> {
    candidates.get(index).ok_or_else(|| {
        MarqueeError::invalid_argument(format!(
            "selection {index} is out of range for {} candidates",
            candidates.len()
        ))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MovieInput {
    Raw(RawMovie),
    Typed(Movie),
}

impl MovieInput {
    fn into_movie(self, genres: Option<&GenreTable>) -> Result<Movie> {
        match self {
            MovieInput::Typed(movie) => Ok(movie),
            MovieInput::Raw(raw) => match genres {
                Some(table) => raw.into_movie(table),
                None => Err(MarqueeError::invalid_argument(format!(
                    "movie {} has genre ids but no genre table was given",
                    raw.id
                ))),
            },
        }
    }
}

/// Parse movies from a JSON array or from JSON lines.
///
/// Records may be [`Movie`]s or provider-shaped [`RawMovie`]s; the latter need
/// a genre table.
pub fn parse_movies(content: &str, genres: Option<&GenreTable>) -> Result<Vec<Movie>> {
    let trimmed = content.trim_start();
    let inputs: Vec<MovieInput> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<MovieInput>)
            .collect::<std::result::Result<_, _>>()?
    };

    inputs
        .into_iter()
        .map(|input| input.into_movie(genres))
        .collect()
}

/// Load movies from a file; see [`parse_movies`].
pub fn load_movies<P: AsRef<Path>>(path: P, genres: Option<&GenreTable>) -> Result<Vec<Movie>> {
    let path = path.as_ref();
    let movies = parse_movies(&fs::read_to_string(path)?, genres)?;
    log::info!("loaded {} movies from {}", movies.len(), path.display());
    Ok(movies)
}
