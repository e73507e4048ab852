use serde::{Deserialize, Serialize};

/// Dashboard figures over the whole library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total: usize,
    /// Mean over rated books, rounded to two decimals.
    pub average_rating: Option<f64>,
    pub top_genre: Option<String>,
    pub year_range: Option<(i32, i32)>,
    pub by_genre: Vec<GenreCount>,
    pub by_year: Vec<YearCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}
