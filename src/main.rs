use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use reviewlens::aggregate;
use reviewlens::config::Config;
use reviewlens::keywords::phrases::NounPhraseChunker;
use reviewlens::keywords::tfidf;
use reviewlens::output::terminal;
use reviewlens::pipeline::{analyze, persist};
use reviewlens::reviews::{clean, table};
use reviewlens::sentiment::controller::SentimentPipeline;
use reviewlens::sentiment::download;
use reviewlens::sentiment::lexicon::VaderScorer;
use reviewlens::sentiment::onnx::OnnxModelLoader;
use reviewlens::sentiment::traits::ModelLoader;

/// Reviewlens: sentiment, keyword, and theme analytics for banking app reviews.
///
/// Scores each review with a local classifier (falling back to the VADER
/// lexicon), ranks keywords per bank, tags complaint and feature themes, and
/// summarizes sentiment by bank and star rating.
#[derive(Parser)]
#[command(name = "reviewlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw review export (drop incomplete rows, normalize dates, dedupe)
    Clean {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },

    /// Run sentiment, keyword, and theme analysis over a cleaned table
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Tagged review table to write
        #[arg(long)]
        output: PathBuf,
        /// Also write keyword and aggregate views as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Skip the model and use the lexicon scorer
        #[arg(long)]
        force_lexicon: bool,
        /// Texts per model forward pass
        #[arg(long)]
        batch_size: Option<usize>,
        /// Keywords to show per bank
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Show keyword and sentiment summaries for a tagged table
    Report {
        #[arg(long)]
        input: PathBuf,
    },

    /// Download the ONNX sentiment model (~260 MB)
    DownloadModel,

    /// Store a tagged table in the SQLite database
    Persist {
        #[arg(long)]
        input: PathBuf,
    },

    /// Show system status (model files, DB stats)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reviewlens=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { input, output } => {
            let stats = clean::clean_file(&input, &output)?;
            println!("{}", "=== Cleaning Summary ===".bold());
            println!("  Rows read:            {}", stats.initial);
            println!("  Missing data dropped: {}", stats.missing_dropped);
            println!("  Duplicates removed:   {}", stats.duplicates_removed);
            println!("  Unparsable dates:     {}", stats.missing_date);
            println!("  Rows written:         {}", stats.final_rows.to_string().green());
            println!("\nCleaned table written to {}", output.display());
        }

        Commands::Analyze {
            input,
            output,
            report,
            force_lexicon,
            batch_size,
            top_n,
        } => {
            let mut config = Config::load()?;
            if force_lexicon {
                config.force_lexicon = true;
            }
            if let Some(n) = batch_size {
                if n == 0 {
                    anyhow::bail!("--batch-size must be at least 1");
                }
                config.batch_size = n;
            }
            if let Some(n) = top_n {
                config.tfidf.top_n = n;
            }

            let reviews = table::load_reviews(&input)?;
            info!(reviews = reviews.len(), input = %input.display(), "Loaded reviews");

            let sentiment = build_sentiment_pipeline(&config);
            let themes = config.theme_lexicon()?;
            let analysis = analyze::run(
                reviews,
                &sentiment,
                &NounPhraseChunker::new(),
                &themes,
                &config.tfidf,
            )
            .await?;

            table::write_tagged(&output, &analysis.rows)?;
            if let Some(path) = &report {
                analysis.write_json_report(path)?;
            }

            terminal::display_bank_keywords(&analysis.bank_keywords);
            terminal::display_aggregate(&analysis.report);
            terminal::display_scorer(&analysis.scorer, analysis.fallback_reason.as_deref());

            println!(
                "\n{} reviews analyzed. Tagged table written to {}",
                analysis.rows.len(),
                output.display()
            );
            if let Some(path) = &report {
                println!("Report written to {}", path.display());
            }
        }

        Commands::Report { input } => {
            let config = Config::load()?;
            let rows = table::load_tagged(&input)?;
            let keywords = tfidf::bank_keywords(rows.iter().map(|r| &r.review), &config.tfidf);
            let report = aggregate::aggregate(&rows);

            terminal::display_bank_keywords(&keywords);
            terminal::display_aggregate(&report);

            let scorers: std::collections::BTreeSet<&str> =
                rows.iter().map(|r| r.sentiment.model.as_str()).collect();
            println!(
                "\n{} reviews; scored by: {}",
                rows.len(),
                scorers.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!("Downloading sentiment model to {}", config.model_dir.display());
            download::download_model(&config.model, &config.model_dir).await?;
            println!("\n{}", "Model downloaded.".green());
        }

        Commands::Persist { input } => {
            let config = Config::load()?;
            let rows = table::load_tagged(&input)?;
            let mut conn = reviewlens::db::initialize(&config.db_path)?;
            let stats = persist::run(&mut conn, &rows)?;
            println!(
                "Stored {} reviews for {} banks in {}",
                stats.reviews, stats.banks, config.db_path
            );
        }

        Commands::Status => {
            let config = Config::load()?;
            reviewlens::status::show(&config)?;
        }
    }

    Ok(())
}

/// Model-first pipeline unless the lexicon is forced.
fn build_sentiment_pipeline(config: &Config) -> SentimentPipeline {
    let model: Option<Box<dyn ModelLoader>> = if config.force_lexicon {
        None
    } else {
        Some(Box::new(OnnxModelLoader {
            model_name: config.model.clone(),
            model_dir: config.model_dir.clone(),
            device: config.device,
            max_length: config.max_length,
        }))
    };
    SentimentPipeline::new(model, Box::new(VaderScorer::new()), config.batch_size)
}
