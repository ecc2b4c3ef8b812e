//! Runs a [`Page`] against tokio time.
//!
//! The page keeps its own virtual clock; this loop maps it onto
//! `tokio::time::Instant` so timers fire when real (or paused test) time
//! reaches them.

use std::future;
use std::ops::ControlFlow;

use async_channel::Receiver;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::page::{HostEvent, Page};
use crate::ui::ModalWidget;

/// Feeds host events into `page` and fires its timers on schedule until the
/// channel closes and every pending timer has run.
pub async fn run_page<W: ModalWidget>(page: &mut Page<W>, events: Receiver<HostEvent>) {
    run_page_with(page, events, |page, event| {
        page.dispatch(event);
        ControlFlow::Continue(())
    })
    .await;
}

/// Like [`run_page`], but hands each received message to `apply` so callers
/// can resolve it against the live page first. `ControlFlow::Break` from
/// `apply` ends the loop at once, leaving pending timers unfired.
pub async fn run_page_with<W, E, F>(page: &mut Page<W>, events: Receiver<E>, mut apply: F)
where
    W: ModalWidget,
    F: FnMut(&mut Page<W>, E) -> ControlFlow<()>,
{
    let origin = Instant::now()
        .checked_sub(page.now())
        .unwrap_or_else(Instant::now);
    let mut open = true;

    while open || page.pending_timers() > 0 {
        let deadline = page.next_deadline().map(|at| origin + at);
        let wake = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            event = events.recv(), if open => match event {
                Ok(event) => {
                    page.advance_to(origin.elapsed());
                    if apply(page, event).is_break() {
                        debug!(pending = page.pending_timers(), "page loop stopped by caller");
                        break;
                    }
                }
                Err(_) => {
                    debug!(pending = page.pending_timers(), "event channel closed");
                    open = false;
                }
            },
            () = wake => page.advance_to(origin.elapsed()),
        }
    }

    info!(elapsed_ms = origin.elapsed().as_millis(), "page loop finished");
}
