use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meridian_cli::{Command, Config, CrawlArgs, OutputFormat, QueryArgs};
use meridian_client::{DefaultCatalogClientFactory, SolrIndex};
use meridian_core::{
    load_catalogs_config, BatchPublishSummary, CatalogParser, CrawlAction, CrawlStats,
    PublishingService, Record, SearchOutput, SearchService, TracingReporter,
};

type Publisher = PublishingService<DefaultCatalogClientFactory, SolrIndex>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::parse();

    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let index = SolrIndex::new(&config.solr_url, config.http_config())
        .context("Failed to initialize index client")?;

    match &config.command {
        Command::Publish(args) => {
            let publisher = publisher(&config, index)?;
            crawl(&publisher, CrawlAction::Publish, args).await?;
        }
        Command::Unpublish(args) => {
            let publisher = publisher(&config, index)?;
            crawl(&publisher, CrawlAction::Unpublish, args).await?;
        }
        Command::Delete { ids } => {
            let publisher = publisher(&config, index)?;
            let n = publisher.unpublish_ids(ids).await?;
            println!("Removed {} record(s)", n);
        }
        Command::Search {
            query,
            facets,
            offset,
            limit,
            format,
        } => {
            let search = SearchService::new(index);
            let mut input = query.to_input();
            input.facets = facets.iter().cloned().collect();
            input.offset = *offset;
            input.limit = Some(*limit);
            let output = search.query_results(&input).await?;
            print_search_output(&output, *format)?;
        }
        Command::Facets {
            names,
            query,
            format,
        } => {
            list_facets(SearchService::new(index), names, query, *format).await?;
        }
        Command::Show { id, format } => {
            let search = SearchService::new(index);
            match search.query_result(id).await? {
                Some(record) => print_record(&record, *format)?,
                None => println!("No record found with id {}", id),
            }
        }
        Command::Batch {
            config: path,
            only,
        } => {
            let publisher = publisher(&config, index)?;
            batch(&publisher, path.as_deref(), only.as_deref()).await?;
        }
    }

    Ok(())
}

fn publisher(config: &Config, index: SolrIndex) -> anyhow::Result<Publisher> {
    let factory = DefaultCatalogClientFactory::new(config.http_config())
        .context("Failed to initialize catalog client")?;
    let parser = CatalogParser::new(config.parser, config.url_builder);
    Ok(PublishingService::new(
        factory,
        index,
        parser,
        config.crawl_config(),
    ))
}

/// Cancels the returned token on Ctrl-C so crawls stop descending.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing catalogs in progress");
            token.cancel();
        }
    });
    cancel
}

async fn crawl(publisher: &Publisher, action: CrawlAction, args: &CrawlArgs) -> anyhow::Result<()> {
    let cancel = cancel_on_interrupt();
    let recursive = !args.no_recursive;

    let stats = match action {
        CrawlAction::Publish => {
            publisher
                .publish_with_progress(
                    &args.uri,
                    recursive,
                    args.repository_type,
                    &TracingReporter,
                    &cancel,
                )
                .await?
        }
        CrawlAction::Unpublish => {
            publisher
                .unpublish_with_progress(
                    &args.uri,
                    recursive,
                    args.repository_type,
                    &TracingReporter,
                    &cancel,
                )
                .await?
        }
    };

    print_stats(action, &args.uri, &stats);
    Ok(())
}

fn print_stats(action: CrawlAction, uri: &str, stats: &CrawlStats) {
    let verb = match action {
        CrawlAction::Publish => "Published",
        CrawlAction::Unpublish => "Unpublished",
    };
    println!();
    println!("{} {}", verb, uri);
    println!("  Catalogs fetched:   {}", stats.catalogs);
    println!("  Records:            {}", stats.records);
    println!("  Skipped nodes:      {}", stats.skipped);
    if stats.revisits > 0 {
        println!("  Already visited:    {}", stats.revisits);
    }
    if stats.pending > 0 {
        println!("  Not visited:        {}", stats.pending);
    }
    println!();
}

async fn batch(
    publisher: &Publisher,
    path: Option<&Path>,
    only: Option<&str>,
) -> anyhow::Result<()> {
    let catalogs = load_catalogs_config(path)?;
    let entries = match only {
        Some(name) => vec![catalogs
            .find_by_name(name)
            .with_context(|| format!("No catalog named {name} in configuration"))?],
        None => catalogs.enabled_catalogs(),
    };

    if entries.is_empty() {
        warn!("No enabled catalogs in configuration");
        return Ok(());
    }

    let cancel = cancel_on_interrupt();
    let summary = publisher
        .batch_publish_with_progress(&entries, &TracingReporter, &cancel)
        .await;
    print_batch_summary(&summary);

    if summary.failed_count() > 0 {
        anyhow::bail!("{} catalog(s) failed to publish", summary.failed_count());
    }
    Ok(())
}

fn print_batch_summary(summary: &BatchPublishSummary) {
    println!();
    println!("Batch publish summary");
    for result in &summary.results {
        match (&result.stats, &result.error) {
            (Some(stats), _) => println!(
                "  ✓ {:<20} {} record(s) from {} catalog(s)",
                result.name, stats.records, stats.catalogs
            ),
            (None, Some(error)) => println!("  ✗ {:<20} {}", result.name, error),
            (None, None) => println!("  ? {}", result.name),
        }
    }
    println!(
        "  {} successful, {} failed, {} record(s)",
        summary.successful_count(),
        summary.failed_count(),
        summary.total_records()
    );
    if let Some(finished) = summary.finished_at {
        let elapsed = finished - summary.started_at;
        println!("  Took {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }
    println!();
}

async fn list_facets(
    search: SearchService<SolrIndex>,
    names: &[String],
    query: &QueryArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let facets: BTreeMap<String, BTreeSet<String>> =
        search.query_facets(&names, &query.to_input()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&facets)?),
        OutputFormat::Text => {
            for (name, values) in &facets {
                println!("{} ({} value(s))", name, values.len());
                for value in values {
                    println!("  {}", value);
                }
            }
        }
    }
    Ok(())
}

fn print_search_output(output: &SearchOutput, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    info!("{} match(es), starting at {}", output.counts, output.offset);
    if output.results.is_empty() {
        println!("\nNo results found.\n");
    } else {
        println!(
            "\nShowing {} of {} record(s):\n",
            output.results.len(),
            output.counts
        );
        for (i, record) in output.results.iter().enumerate() {
            println!(
                "{}. {} [{}]",
                output.offset as usize + i + 1,
                record.title().unwrap_or("(untitled)"),
                record.id()
            );
            if let Some(record_type) = record.record_type() {
                println!("   type: {}", record_type);
            }
            if let Some(url) = record.first("url") {
                println!("   url:  {}", url);
            }
        }
        println!();
    }

    for facet in output.facets.values() {
        println!("{}:", facet.name);
        for value in &facet.values {
            println!("  {} ({})", value.value, value.count);
        }
    }
    Ok(())
}

fn print_record(record: &Record, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => {
            println!("id: {}", record.id());
            for field in record.fields() {
                println!("{}: {}", field.name, field.values.join(", "));
            }
        }
    }
    Ok(())
}
