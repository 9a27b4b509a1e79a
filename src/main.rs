//! Shelfscout CLI - book recommendations from a bookshelf photo
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use shelfscout::{
    BookQuery, BookshelfImage, Config, EnrichedRecommendation, Recommender, ResolvedMetadata,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelfscout")]
#[command(author, version, about = "Book recommendations from a photo of a bookshelf", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend unread books from a bookshelf photo
    Recommend {
        /// Path to the bookshelf image
        image: PathBuf,
        /// Catalog user id whose read shelf should be excluded
        #[arg(long, default_value = "")]
        user: String,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up catalog metadata for a single book
    Lookup {
        /// Book title
        title: String,
        /// Book author
        #[arg(long)]
        author: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the titles on a user's read shelf
    ReadList {
        /// Catalog user id
        user: String,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shelfscout=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recommend { image, user, json } => {
            let config = Config::load()?;
            let credentials = config.credentials()?;
            let image = BookshelfImage::from_path(&image)?;
            let recommender = Recommender::from_config(&config)?;

            let recommendations = match recommender
                .get_recommendations(&user, &image, &credentials)
                .await
            {
                Ok(recommendations) => recommendations,
                Err(e) => {
                    eprintln!("{} {}", "✗".red(), e.user_message());
                    return Err(e.into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
            } else if recommendations.is_empty() {
                println!("No new books to recommend from this shelf.");
            } else {
                println!("📚 Recommendations ({}):\n", recommendations.len());
                for recommendation in &recommendations {
                    print_recommendation(recommendation);
                }
            }
        }
        Commands::Lookup {
            title,
            author,
            json,
        } => {
            let config = Config::load()?;
            let recommender = Recommender::from_config(&config)?;
            let metadata = recommender
                .metadata()
                .resolve(
                    &BookQuery::new(title.clone(), author),
                    &config.search_credentials(),
                )
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else if metadata.is_empty() {
                println!("No catalog page found for: {}", title);
            } else {
                print_metadata(&metadata);
            }
        }
        Commands::ReadList { user } => {
            let config = Config::load()?;
            let recommender = Recommender::from_config(&config)?;
            let titles = recommender.read_list().read_titles(&user).await;

            if titles.is_empty() {
                println!("No read books found for user {}.", user);
            } else {
                println!("Read shelf ({}):\n", titles.len());
                for title in titles {
                    println!("  • {}", title);
                }
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "shelfscout",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn print_recommendation(recommendation: &EnrichedRecommendation) {
    println!("📖 {}", recommendation.display_title().bold());
    if let Some(author) = &recommendation.candidate.author {
        println!("   by {}", author);
    }
    if let Some(summary) = &recommendation.candidate.summary {
        println!("   {}", summary.italic());
    }
    print_metadata(&recommendation.metadata);
    println!();
}

fn print_metadata(metadata: &ResolvedMetadata) {
    if let Some(title) = &metadata.title {
        println!("   Title:   {}", title);
    }
    match (&metadata.rating, &metadata.review_count) {
        (Some(rating), Some(reviews)) => {
            println!("   Rating:  {} ({} reviews)", rating.yellow(), reviews)
        }
        (Some(rating), None) => println!("   Rating:  {}", rating.yellow()),
        (None, Some(reviews)) => println!("   Reviews: {}", reviews),
        (None, None) => {}
    }
    if let Some(url) = &metadata.canonical_url {
        println!("   {}", url.blue().underline());
    }
    if let Some(cover) = &metadata.cover_image_url {
        println!("   Cover:   {}", cover.dimmed());
    }
}
