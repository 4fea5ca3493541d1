mod overrides;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use zenmoji_client::{HtmlEditorExtractor, HttpProviderFactory, ProviderOptions};
use zenmoji_core::models::{HistoryEntry, ProviderKind, SuggestionSet};
use zenmoji_core::traits::{SuggestionStore, TextExtractor};
use zenmoji_core::{MarkdownExtractor, SuggestConfig, SuggestionService, TextConfig};
use zenmoji_store::JsonFileStore;

use crate::overrides::SettingsOverride;

#[derive(Parser)]
#[command(name = "zenmoji", version, about = "Emoji suggestions for technical blog articles")]
struct Cli {
    /// LLM provider (openai, claude, gemini); defaults to the saved setting
    #[arg(long, global = true, env = "ZENMOJI_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Model name; defaults to the saved setting or the provider's default
    #[arg(long, global = true, env = "ZENMOJI_MODEL")]
    model: Option<String>,

    /// API key for the selected provider
    #[arg(long, global = true, env = "ZENMOJI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Override the provider API root (proxies, local gateways)
    #[arg(long, global = true, env = "ZENMOJI_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "ZENMOJI_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Path of the JSON store holding settings, history, favorites and cache
    #[arg(long, global = true, env = "ZENMOJI_STORE_PATH", default_value = "./zenmoji-store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest emoji for an article
    Suggest {
        /// Markdown file (or editor HTML snapshot with --html); stdin when omitted or "-"
        input: Option<PathBuf>,

        /// Treat the input as an HTML snapshot of the editor page
        #[arg(long, default_value_t = false)]
        html: bool,

        /// Page URL of the HTML snapshot, used to report the article id
        #[arg(long, requires = "html")]
        url: Option<String>,

        /// Minimum article length in characters
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(10..=50))]
        min_length: u64,

        /// Print the raw suggestion JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Send a short test article to the selected provider
    TestConnection,

    /// Inspect or clear the suggestion cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or clear past suggestions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage favorite emoji
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Show or change saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts, size and age range
    Stats,
    /// Remove every cached entry
    Clear,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List history, newest first
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Remove all history
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Save an emoji (ignored if already saved)
    Add { emoji: String, reason: String },
    /// List favorites, newest first
    List,
    /// Remove one emoji
    Remove { emoji: String },
    /// Remove all favorites
    Clear,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the saved settings as JSON
    Show,
    /// Update saved settings
    Set {
        #[arg(long)]
        provider: Option<ProviderKind>,
        #[arg(long, conflicts_with = "clear_model")]
        model: Option<String>,
        /// Forget the saved model and use the provider's default
        #[arg(long, default_value_t = false)]
        clear_model: bool,
        #[arg(long)]
        cache: Option<bool>,
        #[arg(long)]
        history: Option<bool>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
}

type CliService = SuggestionService<HttpProviderFactory, SettingsOverride<JsonFileStore>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zenmoji=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.store);

    match cli.command {
        Commands::Suggest {
            ref input,
            html,
            ref url,
            min_length,
            json,
        } => {
            let service = build_service(&cli, store)?;
            let text = read_article(input.as_deref(), html, url.as_deref(), min_length as usize)?;
            cmd_suggest(&service, &text, json).await?;
        }
        Commands::TestConnection => {
            let service = build_service(&cli, store)?;
            cmd_test_connection(&service).await?;
        }
        Commands::Cache { ref action } => {
            let service = build_service(&cli, store)?;
            cmd_cache(&service, action).await?;
        }
        Commands::History { ref action } => cmd_history(&store, action).await?,
        Commands::Favorites { ref action } => cmd_favorites(&store, action).await?,
        Commands::Settings { ref action } => cmd_settings(&store, action).await?,
    }

    Ok(())
}

fn build_service(cli: &Cli, store: JsonFileStore) -> Result<CliService> {
    let options = ProviderOptions {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ProviderOptions::default()
    };
    let factory = HttpProviderFactory::new(cli.api_key.clone()).with_options(options);
    let config = SuggestConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let store = SettingsOverride::new(store, cli.provider, cli.model.clone());
    Ok(SuggestionService::new(factory, store, config))
}

/// Read the input and run it through the matching extractor.
fn read_article(input: Option<&Path>, html: bool, url: Option<&str>, min_length: usize) -> Result<String> {
    let raw = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read article from stdin")?;
            buf
        }
    };

    let config = TextConfig {
        min_length,
        ..TextConfig::default()
    };

    let extracted = if html {
        let mut extractor = HtmlEditorExtractor::new(raw).with_config(config);
        if let Some(url) = url {
            extractor = extractor.with_url(url);
        }
        let info = extractor.page_info();
        if !info.title.is_empty() {
            tracing::info!(title = %info.title, article_id = ?info.article_id, "Editor page");
        }
        extractor.extract_text()
    } else {
        MarkdownExtractor::with_config(raw, config).extract_text()
    };
    let text = extracted.map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Extracted {} characters of article text", text.chars().count());
    Ok(text)
}

async fn cmd_suggest(service: &CliService, text: &str, json: bool) -> Result<()> {
    service.restore_cache().await.map_err(|e| anyhow::anyhow!(e))?;

    let suggestions = service
        .generate(text)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else {
        print_suggestions(&suggestions);
    }
    Ok(())
}

fn print_suggestions(set: &SuggestionSet) {
    println!("{}  {}", set.main.emoji, set.main.reason);
    for sub in &set.sub {
        println!("  {}  {}", sub.emoji, sub.reason);
    }
    if set.is_fallback() {
        println!(
            "\n(fallback suggestions: {})",
            set.error_message.as_deref().unwrap_or("provider unavailable")
        );
    }
}

async fn cmd_test_connection(service: &CliService) -> Result<()> {
    let settings = service
        .store()
        .get_settings()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let report = service
        .test_connection(settings.api_type, settings.model())
        .await;

    if !report.success {
        bail!(report.message);
    }
    println!("{}", report.message);
    Ok(())
}

async fn cmd_cache(service: &CliService, action: &CacheAction) -> Result<()> {
    service.restore_cache().await.map_err(|e| anyhow::anyhow!(e))?;

    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&service.cache_stats())?);
        }
        CacheAction::Clear => {
            let cleared = service.clear_cache().await.map_err(|e| anyhow::anyhow!(e))?;
            println!("Cleared {cleared} cache entries");
        }
    }
    Ok(())
}

async fn cmd_history(store: &JsonFileStore, action: &HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List { format } => {
            let history = store.get_history().await.map_err(|e| anyhow::anyhow!(e))?;
            match format {
                OutputFormat::Text => print_history(&history),
                OutputFormat::Csv => write_history_csv(&history, std::io::stdout())?,
            }
        }
        HistoryAction::Clear => {
            store.clear_history().await.map_err(|e| anyhow::anyhow!(e))?;
            println!("History cleared");
        }
    }
    Ok(())
}

fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        println!("No suggestions yet");
        return;
    }

    for entry in history {
        let emojis: Vec<&str> = entry.suggestions.emojis().collect();
        println!(
            "  {}  {}  (hash: {}...)",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            emojis.join(" "),
            &entry.text_hash[..entry.text_hash.len().min(8)],
        );
    }

    println!("\nTotal: {} entries", history.len());
}

fn write_history_csv(history: &[HistoryEntry], out: impl std::io::Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["timestamp", "main", "main_reason", "sub1", "sub2", "text_hash"])?;
    for entry in history {
        let set = &entry.suggestions;
        let sub = |i: usize| set.sub.get(i).map(|s| s.emoji.as_str()).unwrap_or("");
        writer.write_record([
            entry.timestamp.to_rfc3339().as_str(),
            set.main.emoji.as_str(),
            set.main.reason.as_str(),
            sub(0),
            sub(1),
            entry.text_hash.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

async fn cmd_favorites(store: &JsonFileStore, action: &FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::Add { emoji, reason } => {
            store
                .save_favorite(emoji, reason)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Saved {emoji}");
        }
        FavoritesAction::List => {
            let favorites = store.get_favorites().await.map_err(|e| anyhow::anyhow!(e))?;
            if favorites.is_empty() {
                println!("No favorites yet");
            }
            for favorite in favorites {
                println!("  {}  {}", favorite.emoji, favorite.reason);
            }
        }
        FavoritesAction::Remove { emoji } => {
            store
                .remove_favorite(emoji)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Removed {emoji}");
        }
        FavoritesAction::Clear => {
            store.clear_favorites().await.map_err(|e| anyhow::anyhow!(e))?;
            println!("Favorites cleared");
        }
    }
    Ok(())
}

async fn cmd_settings(store: &JsonFileStore, action: &SettingsAction) -> Result<()> {
    let mut settings = store.get_settings().await.map_err(|e| anyhow::anyhow!(e))?;

    if let SettingsAction::Set {
        provider,
        model,
        clear_model,
        cache,
        history,
    } = action
    {
        if let Some(kind) = provider {
            if *kind != settings.api_type {
                settings.api_model = None;
            }
            settings.api_type = *kind;
        }
        if let Some(model) = model {
            settings.api_model = Some(model.clone());
        }
        if *clear_model {
            settings.api_model = None;
        }
        if let Some(enabled) = cache {
            settings.enable_cache = *enabled;
        }
        if let Some(enabled) = history {
            settings.enable_history = *enabled;
        }
        store
            .save_settings(&settings)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!(provider = %settings.api_type, model = settings.model(), "Settings saved");
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
