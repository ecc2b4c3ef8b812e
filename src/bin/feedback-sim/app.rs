use std::ops::ControlFlow;
use std::path::PathBuf;

use async_channel::unbounded;
use tokio::time::sleep;
use tracing::{info, warn};
use ui_feedback::Result;
use ui_feedback::config::Config;
use ui_feedback::driver::run_page_with;
use ui_feedback::page::Page;
use ui_feedback::telemetry::init_tracing;

use super::cli::Cli;
use super::scenario::{self, Scenario, Step};

const DEFAULT_CONFIG: &str = "feedback.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::from_env_and_file(&config_path)?;
    let scenario = Scenario::load(&cli.scenario)?;

    let doc = scenario.document()?;
    let mut page = Page::bootstrap(doc, &config, scenario.reachability());
    info!(
        url = %page.document().location(),
        steps = scenario.steps.len(),
        realtime = cli.realtime,
        "replaying scenario"
    );

    if cli.realtime {
        replay_realtime(&mut page, scenario.steps).await?;
    } else {
        replay_virtual(&mut page, &scenario.steps)?;
        if cli.settle {
            settle(&mut page);
        }
    }

    info!(
        elapsed_ms = page.now().as_millis(),
        toasts = page.notifications().live_count(),
        prompts = page.prompts().open_count(),
        online = page.connectivity().is_online(),
        "scenario finished"
    );
    let body = page.document().body();
    println!("{}", page.document().inner_html(body));
    Ok(())
}

fn replay_virtual(page: &mut Page, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        scenario::apply(page, index + 1, step)?;
    }
    Ok(())
}

fn settle(page: &mut Page) {
    while let Some(deadline) = page.next_deadline() {
        page.advance_to(deadline);
    }
}

/// Waits become real sleeps on a feeder task; every other step is applied
/// inside the page loop so targets resolve against the live document. The
/// first failing step ends the replay at once.
async fn replay_realtime(page: &mut Page, steps: Vec<Step>) -> Result<()> {
    let (tx, rx) = unbounded::<(usize, Step)>();
    let feeder = tokio::spawn(async move {
        for (index, step) in steps.into_iter().enumerate() {
            if let Some(duration) = step.wait() {
                sleep(duration).await;
                continue;
            }
            if tx.send((index + 1, step)).await.is_err() {
                break;
            }
        }
    });

    let mut failure = None;
    run_page_with(page, rx, |page, (index, step)| {
        match scenario::apply(page, index, &step) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                failure = Some(err);
                ControlFlow::Break(())
            }
        }
    })
    .await;

    if failure.is_some() {
        feeder.abort();
    }
    if let Err(err) = feeder.await
        && !err.is_cancelled()
    {
        warn!(error = %err, "scenario feeder stopped abnormally");
    }
    failure.map_or(Ok(()), Err)
}
