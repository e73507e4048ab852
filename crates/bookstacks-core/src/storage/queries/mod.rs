mod stats;

pub use stats::LibraryStatsQuery;
