use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use campus_shelf::config::Config;
use campus_shelf::debounce::{debounce, feed_loader};
use campus_shelf::gateway::{build_client, check_health};
use campus_shelf::{
    Article, CatalogItem, CatalogLoader, CatalogStatus, Event, Exam, FilterState, HttpGateway, ItemId,
    LoadOutcome, Note, Resource, ResourceKind, SortKey, SortOrder, VisibilityTrigger,
};

#[derive(Parser)]
#[command(version, about = "Browse shared notes, exams, articles and events")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load one or more pages of a catalog and print them
    List {
        kind: ResourceKind,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print one record as JSON
    Show { kind: ResourceKind, id: String },
    /// Open the web page of one record in the default browser
    Open { kind: ResourceKind, id: String },
    /// Interactive listing: type to search, ":more" to scroll, ":retry", ":quit"
    Browse {
        kind: ResourceKind,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Check that the API is up
    Health,
}

#[derive(Args, Clone)]
struct FilterArgs {
    #[arg(long, short)]
    query: Option<String>,
    #[arg(long)]
    university: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    semester: Option<String>,
    #[arg(long, default_value = "date")]
    sort_by: SortKey,
    #[arg(long, default_value = "desc")]
    order: SortOrder,
}

impl FilterArgs {
    fn to_filter(&self) -> FilterState {
        let mut filter = FilterState::new().with_sort(self.sort_by).with_order(self.order);
        if let Some(q) = &self.query {
            filter = filter.with_query(q.as_str());
        }
        if let Some(u) = &self.university {
            filter = filter.with_university(u.as_str());
        }
        if let Some(d) = &self.department {
            filter = filter.with_department(d.as_str());
        }
        if let Some(y) = &self.year {
            filter = filter.with_year(y.as_str());
        }
        if let Some(s) = &self.semester {
            filter = filter.with_semester(s.as_str());
        }
        filter
    }
}

/// Run a generic command for the record type of `kind`.
macro_rules! for_kind {
    ($kind:expr, $f:ident($($arg:expr),*)) => {
        match $kind {
            ResourceKind::Notes => $f::<Note>($($arg),*).await,
            ResourceKind::Exams => $f::<Exam>($($arg),*).await,
            ResourceKind::Articles => $f::<Article>($($arg),*).await,
            ResourceKind::Events => $f::<Event>($($arg),*).await,
        }
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    campus_shelf::init_tracing();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.cmd {
        Cmd::List { kind, filter, pages, json } => {
            for_kind!(kind, list(&config, filter.to_filter(), pages.max(1), json))
        }
        Cmd::Show { kind, id } => for_kind!(kind, show(&config, &id)),
        Cmd::Open { kind, id } => open_detail(&config, kind, &id),
        Cmd::Browse { kind, filter } => for_kind!(kind, browse(&config, filter.to_filter())),
        Cmd::Health => {
            let client = build_client(&config.gateway())?;
            let health = check_health(&client, &config.gateway()).await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.online {
                bail!("API at {} is offline ({})", config.api_url, health.status);
            }
            Ok(())
        }
    }
}

async fn list<T: Resource>(config: &Config, filter: FilterState, pages: u32, json: bool) -> Result<()> {
    let loader = CatalogLoader::new(HttpGateway::<T>::new(config.gateway())?);

    let mut outcome = loader.set_filter(filter).await;
    let mut requested = 1;
    while outcome.is_loaded() && requested < pages {
        outcome = loader.request_next_page().await;
        requested += 1;
    }

    let items = loader.items().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            println!("{}\t{}", item.item_id(), item.title());
        }
    }
    eprintln!("{}", describe(T::KIND, &loader.status().await));

    match outcome {
        LoadOutcome::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

async fn show<T: Resource>(config: &Config, id: &str) -> Result<()> {
    let gateway = HttpGateway::<T>::new(config.gateway())?;
    let record = gateway.fetch_item(&ItemId::from(id)).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn open_detail(config: &Config, kind: ResourceKind, id: &str) -> Result<()> {
    if !is_valid_item_id(id) {
        bail!("invalid {} id '{id}'", kind.singular());
    }
    open::that_detached(config.detail_url(kind.plural(), id))?;
    Ok(())
}

async fn browse<T: Resource>(config: &Config, base: FilterState) -> Result<()> {
    let loader = CatalogLoader::new(HttpGateway::<T>::new(config.gateway())?);
    let (input, filters) = debounce(config.debounce);
    let feed = feed_loader(loader.clone(), filters);

    let mut status_rx = loader.subscribe();
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            eprintln!("{}", describe(T::KIND, &status));
        }
    });

    input.push(base.clone());
    let mut trigger = VisibilityTrigger::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":q" | ":quit" => break,
            ":retry" => {
                loader.retry().await;
            }
            ":more" => {
                // Scrolling to the bottom brings the last item into view.
                let items = loader.items().await;
                trigger.observe(items.last().map(|item| item.item_id().clone()));
                if let Some(last) = trigger.target().cloned() {
                    trigger.notify(&loader, &last, true).await;
                    let status = loader.status().await;
                    trigger.on_visibility(&last, false, &status);
                }
                print_items(&loader.items().await);
            }
            ":items" => print_items(&loader.items().await),
            query => {
                input.push(base.clone().with_query(query));
            }
        }
    }

    loader.close().await;
    drop(input);
    feed.abort();
    printer.abort();
    Ok(())
}

fn print_items<T: CatalogItem>(items: &[T]) {
    for item in items {
        println!("{}\t{}", item.item_id(), item.title());
    }
}

fn describe(kind: ResourceKind, status: &CatalogStatus) -> String {
    if let Some(error) = &status.error {
        return format!("[{kind}] error: {error} (type :retry)");
    }
    if status.is_initial_loading {
        return format!("[{kind}] loading...");
    }
    if status.is_empty_result {
        return format!("[{kind}] nothing matched");
    }
    let more = if status.is_fetching_more {
        "loading more"
    } else if status.has_more {
        "more available"
    } else {
        "end of list"
    };
    format!("[{kind}] {} items, page {}, {more}", status.item_count, status.current_page)
}

/// Ids end up in a URL path: digits, letters, dashes and underscores only.
fn is_valid_item_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
