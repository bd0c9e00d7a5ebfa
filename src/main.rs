use std::time::Duration;

use eventorias_lib::config::AppConfig;
use eventorias_lib::feed::{FeedState, FeedStatus, SortMode};
use eventorias_lib::{init_tracing, seed_sample_events, App, AppError};

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Options {
    mode: SortMode,
    descending: bool,
    query: Option<String>,
    seed: bool,
}

impl Options {
    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => {
                    let value = args.next().ok_or("--mode needs a value")?;
                    options.mode = value.parse()?;
                }
                "--query" => {
                    options.query = Some(args.next().ok_or("--query needs a value")?);
                }
                "--desc" => options.descending = true,
                "--seed" => options.seed = true,
                "--help" | "-h" => return Err(usage()),
                other => return Err(format!("unknown argument '{other}'\n{}", usage())),
            }
        }
        Ok(options)
    }
}

fn usage() -> String {
    "usage: eventorias [--mode soon|participate|finished] [--desc] [--query TEXT] [--seed]"
        .to_string()
}

#[tokio::main]
async fn main() {
    let options = match Options::from_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let config = AppConfig::from_env();
    init_tracing(&config.log_filter);

    if let Err(e) = run(&config, options).await {
        tracing::error!("eventorias failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig, options: Options) -> Result<(), AppError> {
    let app = App::start(config)?;

    if options.seed {
        let author = config.user_id.as_deref().unwrap_or("local-author");
        let today = chrono::Local::now().date_naive();
        seed_sample_events(&app.repository, today, author)?;
    }

    let mut rx = app.feed.watch();
    let first = tokio::time::timeout(SNAPSHOT_TIMEOUT, rx.wait_for(|s| !s.status.is_loading()))
        .await
        .map_err(|_| AppError::Other("timed out waiting for events".to_string()))?
        .map_err(|_| AppError::Other("feed stopped before the first snapshot".to_string()))?
        .clone();

    let state = if options.descending {
        app.feed.set_date_sorting_type(false).await?;
        app.feed
            .update_sort_option(options.mode, options.query.as_deref())
            .await?
    } else if options.mode != first.sort_mode || options.query.is_some() {
        app.feed
            .update_sort_option(options.mode, options.query.as_deref())
            .await?
    } else {
        first
    };

    print_feed(&state);
    app.shutdown().await
}

fn print_feed(state: &FeedState) {
    match &state.status {
        FeedStatus::Loading => println!("Loading..."),
        FeedStatus::Error(err) => println!("{}", err.message()),
        FeedStatus::Success(all) => {
            println!(
                "{} of {} events ({}, {})",
                state.events.len(),
                all.len(),
                state.sort_mode,
                if state.ascending { "earliest first" } else { "latest first" }
            );
            for event in &state.events {
                println!(
                    "  {} {}  {}  @ {}  [{} going]",
                    event.date_label(),
                    event.time_label(),
                    event.title,
                    event.location,
                    event.participants.len()
                );
            }
        }
    }
}
