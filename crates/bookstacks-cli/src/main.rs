use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookstacks_core::filter::{genre_options, year_options};
use bookstacks_core::{
    AppConfig, Book, BookFilter, BookId, BookstacksError, Database, ExitCode, NewBook,
};
use bookstacks_covers::{
    CoverResolver, OpenLibrarySource, get_or_fetch_cover, rebuild_all_covers,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bookstacks",
    about = "Personal reading library with automatic cover lookup",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting BOOKSTACKS_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Admin password for add/edit/delete/rebuild-covers.
    /// Falls back to BOOKSTACKS_PASSWORD.
    #[arg(long, global = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List books, optionally filtered.
    List {
        /// Case-insensitive match on title or author.
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },

    /// Show one book with its cover and catalog link.
    Show { id: BookId },

    /// Add a book. A cover is looked up when none is given.
    Add {
        title: String,
        #[command(flatten)]
        fields: BookFields,
    },

    /// Edit a book. Only the given fields change.
    Edit {
        id: BookId,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: BookFields,
        /// Drop the stored cover and look it up again.
        #[arg(long)]
        refresh_cover: bool,
    },

    /// Delete a book and its ratings.
    Delete { id: BookId },

    /// Print a book's cover URL, resolving and caching it if needed.
    Cover { id: BookId },

    /// Resolve the cover of every book again.
    RebuildCovers,

    /// Show dashboard statistics.
    Stats,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Default)]
struct BookFields {
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    rating: Option<f64>,
    #[arg(long)]
    isbn: Option<String>,
    /// Comma-separated subject tags.
    #[arg(long)]
    subjects: Option<String>,
    #[arg(long)]
    cover: Option<String>,
}

impl BookFields {
    fn apply(self, book: &mut NewBook) {
        if let Some(v) = self.author { book.author = Some(v); }
        if let Some(v) = self.genre { book.genre = Some(v); }
        if let Some(v) = self.year { book.year = Some(v); }
        if let Some(v) = self.rating { book.rating = Some(v); }
        if let Some(v) = self.isbn { book.isbn = Some(v); }
        if let Some(v) = self.subjects { book.subjects = Some(v); }
        if let Some(v) = self.cover { book.cover_url = Some(v); }
    }
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Get a specific config key.
    Get { key: String },
    /// Write the current config to the config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err
            .downcast_ref::<BookstacksError>()
            .map(ExitCode::from)
            .unwrap_or(ExitCode::GeneralError);
        eprintln!("error: {err:#}");
        std::process::exit(code as i32);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BOOKSTACKS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    let json_output = cli.json || std::env::var("BOOKSTACKS_JSON").as_deref() == Ok("1");
    let password = cli
        .password
        .or_else(|| std::env::var("BOOKSTACKS_PASSWORD").ok());

    // Load config (honors BOOKSTACKS_LIBRARY_PATH if set)
    let mut config = AppConfig::load()?;
    if let Ok(lib_path) = std::env::var("BOOKSTACKS_LIBRARY_PATH") {
        config.set_library_path(lib_path.into());
    }
    tracing::debug!(
        config = %AppConfig::config_path().display(),
        library = %config.library_path().display(),
        "config loaded"
    );

    match cli.command {
        Commands::List { query, genre, year } => {
            let db = open_db(&config)?;
            let books = db.list_books()?;
            let mut filter = BookFilter::new();
            if let Some(q) = query { filter = filter.with_query(q); }
            if let Some(g) = genre { filter = filter.with_genre(g); }
            if let Some(y) = year { filter = filter.with_year(y); }
            let shown = filter.apply(&books);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "items": shown,
                        "total": books.len(),
                        "filters": {
                            "genres": genre_options(&books),
                            "years": year_options(&books)
                        }
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if books.is_empty() {
                println!("No books in library. Use `bookstacks add` to add books.");
            } else if shown.is_empty() {
                println!("No books match the filter.");
            } else {
                for book in &shown {
                    print_row(book);
                }
                if !filter.is_empty() {
                    println!("\n{} of {} books", shown.len(), books.len());
                }
            }
        }

        Commands::Show { id } => {
            let db = open_db(&config)?;
            let book = db.get_book(id)?;
            let link = OpenLibrarySource::from_config(&config.covers)?.book_link(
                &book.title,
                Some(&book.author),
                book.isbn.as_deref(),
            );
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "book": book, "openlibrary_url": link },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{}", book.label());
                println!("  Genre:    {}", book.genre);
                if let Some(rating) = book.rating { println!("  Rating:   {rating:.2}"); }
                if let Some(isbn) = &book.isbn { println!("  ISBN:     {isbn}"); }
                if let Some(subjects) = &book.subjects { println!("  Subjects: {subjects}"); }
                println!("  Cover:    {}", book.cached_cover().unwrap_or("(not resolved)"));
                println!("  Link:     {link}");
            }
        }

        Commands::Add { title, fields } => {
            config.authorize(password.as_deref())?;
            let mut book = NewBook::new(title);
            fields.apply(&mut book);
            book.validate()?;

            let resolver = CoverResolver::from_config(&config.covers)?;
            let fetched = resolver.complete_book(&mut book).await;
            let db = open_db(&config)?;
            let id = db.add_book(&book)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id, "cover_fetched": fetched, "book": db.get_book(id)? },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Added: {} (#{id})", book.title);
                if fetched {
                    println!("Cover: {}", book.cover_url.as_deref().unwrap_or_default());
                }
            }
        }

        Commands::Edit { id, title, fields, refresh_cover } => {
            config.authorize(password.as_deref())?;
            let db = open_db(&config)?;
            let mut book = to_new_book(db.get_book(id)?);
            if let Some(t) = title { book.title = t; }
            if refresh_cover { book.cover_url = None; }
            fields.apply(&mut book);
            book.validate()?;

            let resolver = CoverResolver::from_config(&config.covers)?;
            let fetched = resolver.complete_book(&mut book).await;
            db.update_book(id, &book)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id, "cover_fetched": fetched, "book": db.get_book(id)? },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Updated: {} (#{id})", book.title);
            }
        }

        Commands::Delete { id } => {
            config.authorize(password.as_deref())?;
            let db = open_db(&config)?;
            db.delete_book(id)?;
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "deleted": id },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Deleted book: #{id}");
            }
        }

        Commands::Cover { id } => {
            let db = open_db(&config)?;
            let book = db.get_book(id)?;
            let resolver = CoverResolver::from_config(&config.covers)?;
            let url = get_or_fetch_cover(&resolver, &db, &book).await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "id": id,
                        "cover_url": url,
                        "placeholder": resolver.is_placeholder(&url)
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{url}");
            }
        }

        Commands::RebuildCovers => {
            config.authorize(password.as_deref())?;
            let db = open_db(&config)?;
            let total = db.count_books()?;
            let resolver = CoverResolver::from_config(&config.covers)?;
            let updated = rebuild_all_covers(&resolver, &db).await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "updated": updated, "total": total },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Updated covers for {updated} of {total} books.");
            }
        }

        // ── Stats ──────────────────────────────────────────────────────────

        Commands::Stats => {
            let db = open_db(&config)?;
            let stats = db.stats()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": stats,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Library statistics:");
                println!("  Total books:    {}", stats.total);
                println!(
                    "  Average rating: {}",
                    stats
                        .average_rating
                        .map(|r| format!("{r:.2}"))
                        .unwrap_or_else(|| "-".to_string())
                );
                println!("  Top genre:      {}", stats.top_genre.as_deref().unwrap_or("-"));
                if let Some((min, max)) = stats.year_range {
                    println!("  Years:          {min}-{max}");
                }
                if !stats.by_genre.is_empty() {
                    println!("\nBy genre:");
                    for g in &stats.by_genre {
                        println!("  {:<25} {}", g.genre, g.count);
                    }
                }
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            let kv = config_key_values(&config);
            match action {
                ConfigAction::List => {
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": kv,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Get { key } => match kv.get(key.as_str()) {
                    Some(val) => {
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "key": key, "value": val },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else {
                            println!("{val}");
                        }
                    }
                    None => {
                        eprintln!("Unknown config key: {key}");
                        std::process::exit(ExitCode::InvalidArgs as i32);
                    }
                },
                ConfigAction::Init { force } => {
                    let path = AppConfig::config_path();
                    if path.exists() && !force {
                        return Err(BookstacksError::ConfigError(format!(
                            "{} already exists, pass --force to overwrite",
                            path.display()
                        ))
                        .into());
                    }
                    config.save()?;
                    tracing::info!(path = %path.display(), "config written");
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "config_path": path.to_string_lossy() },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("Wrote {}", path.display());
                    }
                }
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_row(book: &Book) {
    let year = book.year.map(|y| y.to_string()).unwrap_or_default();
    let rating = book.rating.map(|r| format!("{r:.1}")).unwrap_or_default();
    println!(
        "{id:>5}  {title:<40}  {author:<25}  {genre:<20}  {year:>4}  {rating:>3}",
        id = book.id,
        title = book.title,
        author = book.author,
        genre = book.genre,
    );
}

fn open_db(config: &AppConfig) -> Result<Database> {
    Ok(Database::open(&config.database_path())?)
}

/// Editable form of a stored book.
fn to_new_book(book: Book) -> NewBook {
    NewBook {
        title: book.title,
        author: Some(book.author),
        genre: Some(book.genre),
        year: book.year,
        rating: book.rating,
        isbn: book.isbn,
        subjects: book.subjects,
        cover_url: book.cover_url,
    }
}

fn config_key_values(config: &AppConfig) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("config_path", AppConfig::config_path().to_string_lossy().to_string());
    map.insert("library_path", config.library_path().to_string_lossy().to_string());
    map.insert("database_path", config.database_path().to_string_lossy().to_string());
    map.insert("admin_password_env", config.core.admin_password_env.clone());
    map.insert("admin_password_set", config.admin_password().is_some().to_string());
    map.insert("catalog_base_url", config.covers.catalog_base_url.clone());
    map.insert("covers_base_url", config.covers.covers_base_url.clone());
    map.insert("secondary_base_url", config.covers.secondary_base_url.clone());
    map.insert("placeholder_url", config.covers.placeholder_url.clone());
    map.insert("timeout_secs", config.covers.timeout_secs.to_string());
    map.insert("user_agent", config.covers.user_agent.clone());
    map
}
