use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use statecraft::case_studies::long_living::{
    long_living_app, LongLivingAction, LongLivingApp, LongLivingAppAction, ScreenAction,
    ScreenshotSource,
};
use statecraft::case_studies::navigation::{
    navigation_app, CounterAction, NavigationAction, NavigationTimings,
    ScreenAction as NavigationScreenAction, SheetAction,
};
use statecraft::case_studies::shared_state::{
    shared_state_app, CounterTabAction, ProfileAction, SharedAction, Tab,
};
use statecraft::config::{ConfigStore, RuntimeConfig};
use statecraft::logging::init_tracing;
use statecraft::metrics::ObservabilityHub;
use statecraft::{Action, ElementId, PresentationAction, Reducer, StackAction, State, Store};

#[derive(Parser)]
#[command(name = "statecraft-demo", version, about = "Runs the statecraft case studies")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Count screenshots, then show that a detail screen does not count them
    LongLiving {
        #[arg(long, default_value_t = 3)]
        screenshots: u32,
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
    },
    /// Stack navigation with a ticking counter and a presented sheet
    Navigation {
        #[arg(long, default_value_t = 20)]
        tick_ms: u64,
    },
    /// Two tabs sharing their stats
    SharedState,
    /// Re-read the config file and print the effective settings
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let initial = match &cli.config {
        Some(path) => RuntimeConfig::load_from(path)?,
        None => RuntimeConfig::load()?,
    };
    let path = cli.config.unwrap_or_else(RuntimeConfig::config_path);
    let configs = ConfigStore::new(initial, path);
    let config = configs.get();
    init_tracing(&config.logging.filter);

    match cli.cmd.unwrap_or(Cmd::LongLiving {
        screenshots: 3,
        interval_ms: 50,
    }) {
        Cmd::LongLiving {
            screenshots,
            interval_ms,
        } => run_long_living(&config, screenshots, Duration::from_millis(interval_ms)).await,
        Cmd::Navigation { tick_ms } => {
            run_navigation(&config, Duration::from_millis(tick_ms)).await
        }
        Cmd::SharedState => run_shared_state(&config).await,
        Cmd::Config => show_config(&configs),
    }
}

fn show_config(configs: &ConfigStore) -> anyhow::Result<()> {
    let path = configs.path();
    if path.exists() {
        configs
            .reload()
            .with_context(|| format!("failed to reload {}", path.display()))?;
        info!(path = %path.display(), "Config reloaded");
    } else {
        println!("# {} does not exist, using defaults", path.display());
    }
    print!("{}", toml::to_string_pretty(&configs.get())?);
    Ok(())
}

fn build_store<S: State, A: Action>(
    config: &RuntimeConfig,
    state: S,
    reducer: impl Reducer<State = S, Action = A>,
) -> Store<S, A> {
    Store::builder(state, reducer)
        .config(config.store.clone())
        .observability(ObservabilityHub::new(config.store.history_capacity))
        .build()
}

async fn run_long_living(
    config: &RuntimeConfig,
    screenshots: u32,
    interval: Duration,
) -> anyhow::Result<()> {
    let source = ScreenshotSource::new();
    let store = build_store(
        config,
        LongLivingApp::default(),
        long_living_app(source.clone(), config.ids.build()),
    );

    // The counter's subscription is chained from this send, so cancelling
    // the task is what "leaving the screen" looks like.
    let view_task = store.send(LongLivingAppAction::OpenCounter);
    view_task.processed().await;
    let counter_id = store
        .state()
        .path
        .last()
        .map(|(id, _)| id)
        .ok_or_else(|| anyhow!("counter screen was not pushed"))?;
    info!(counter = %counter_id, "Counter screen on stack");

    take_screenshots(&source, screenshots, interval).await;
    wait_for_count(&store, counter_id, screenshots).await?;

    view_task.cancel();
    store.send(LongLivingAppAction::OpenDetail);
    take_screenshots(&source, screenshots, interval).await;
    info!(
        count = store.state().screenshot_count(counter_id),
        "Screenshots on the detail screen were not counted"
    );

    let detail_id = store
        .state()
        .path
        .last()
        .map(|(id, _)| id)
        .ok_or_else(|| anyhow!("detail screen was not pushed"))?;
    store.send(LongLivingAppAction::Path(StackAction::PopFrom { id: detail_id }));

    let path = store.scope(|app: &LongLivingApp| &app.path, LongLivingAppAction::Path);
    let counter = path
        .scope_element(counter_id)
        .ok_or_else(|| anyhow!("counter screen disappeared"))?;
    let back = counter.send(ScreenAction::Counter(LongLivingAction::Task));
    back.processed().await;
    take_screenshots(&source, 1, interval).await;
    wait_for_count(&store, counter_id, screenshots + 1).await?;
    back.cancel();

    print_report(&store)
}

async fn take_screenshots(source: &ScreenshotSource, count: u32, interval: Duration) {
    for _ in 0..count {
        source.take_screenshot();
        tokio::time::sleep(interval).await;
    }
}

async fn wait_for_count(
    store: &Store<LongLivingApp, LongLivingAppAction>,
    counter: ElementId,
    expected: u32,
) -> anyhow::Result<()> {
    let mut watcher = store.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        watcher.wait_for(|app| app.screenshot_count(counter) >= Some(expected)),
    )
    .await
    .context("timed out waiting for screenshots to be counted")?
    .ok_or_else(|| anyhow!("store went away"))?;
    Ok(())
}

async fn run_navigation(config: &RuntimeConfig, tick: Duration) -> anyhow::Result<()> {
    let timings = NavigationTimings {
        timer_tick: tick,
        summary_latency: tick * 2,
    };
    let store = build_store(
        config,
        Default::default(),
        navigation_app(config.ids.build(), timings),
    );

    store.send(NavigationAction::PushCounter);
    let counter_id = store
        .state()
        .path
        .last()
        .map(|(id, _)| id)
        .ok_or_else(|| anyhow!("counter screen was not pushed"))?;
    store.send(NavigationAction::Path(StackAction::element(
        counter_id,
        NavigationScreenAction::Counter(CounterAction::StartTimer),
    )));

    let mut watcher = store.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        watcher.wait_for(|app| app.counter(counter_id).is_some_and(|counter| counter.count >= 3)),
    )
    .await
    .context("timer did not tick")?;
    info!(active = store.active_effects().len(), "Timer running");

    store.send(NavigationAction::PopToRoot);
    info!(active = store.active_effects().len(), "Popped to root");

    store.send(NavigationAction::ShowDetail("Release notes".to_string()));
    store
        .send(NavigationAction::Sheet(PresentationAction::Presented(
            SheetAction::LoadSummary,
        )))
        .finish()
        .await;
    store.send(NavigationAction::Sheet(PresentationAction::Presented(
        SheetAction::Close,
    )));

    print_report(&store)
}

async fn run_shared_state(config: &RuntimeConfig) -> anyhow::Result<()> {
    let store = build_store(config, Default::default(), shared_state_app(config.ids.build()));

    for action in [
        SharedAction::Counter(CounterTabAction::Increment),
        SharedAction::Counter(CounterTabAction::Increment),
        SharedAction::Counter(CounterTabAction::Decrement),
        SharedAction::Counter(CounterTabAction::IsPrimeTapped),
        SharedAction::SelectTab(Tab::Profile),
    ] {
        store.send(action).processed().await;
    }
    let profile = store.with_state(|state| state.profile().clone());
    info!(?profile, "Profile tab sees the counter's stats");

    store.send(SharedAction::Profile(ProfileAction::ResetStats));

    print_report(&store)
}

fn print_report<S: State + Serialize, A: Action>(
    store: &Store<S, A>,
) -> anyhow::Result<()> {
    let state = serde_json::to_string_pretty(&store.state())?;
    println!("{}", state);

    let metrics = store.observability().snapshot();
    let counters = &metrics.counters;
    println!(
        "actions: {} processed, {} dropped | \
         effects: {} started, {} finished, {} cancelled, {} failed",
        counters.actions_processed,
        counters.actions_dropped,
        counters.effects_started,
        counters.effects_finished,
        counters.effects_cancelled,
        counters.effects_failed,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_long_living() {
        let cli = Cli::parse_from(["statecraft-demo"]);
        assert!(cli.cmd.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_navigation_tick() {
        let cli = Cli::parse_from(["statecraft-demo", "navigation", "--tick-ms", "5"]);
        assert!(matches!(cli.cmd, Some(Cmd::Navigation { tick_ms: 5 })));
    }

    #[test]
    fn show_config_reloads_the_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nhistory_capacity = 8\n").expect("write config");
        let configs = ConfigStore::new(RuntimeConfig::default(), path.clone());

        show_config(&configs).expect("valid config");
        assert_eq!(configs.get().store.history_capacity, 8);

        std::fs::write(&path, "[store]\nhistory_capacity = 0\n").expect("write config");
        assert!(show_config(&configs).is_err());
        assert_eq!(configs.get().store.history_capacity, 8);
    }
}
