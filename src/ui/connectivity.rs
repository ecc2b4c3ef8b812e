//! Online/offline state machine.
//!
//! Two states, two edges. Going offline shows the banner and a warning
//! toast; coming back removes the banner and shows a success toast. An event
//! that re-affirms the current state does nothing.

use tracing::{debug, info, warn};

use crate::config::ConnectivitySettings;
use crate::dom::{Document, ElementBuilder, NodeId};
use crate::scheduler::Scheduler;
use crate::types::Connectivity;
use crate::ui::notify::{NotificationCenter, ToastTimer};

const MAIN_CONTENT_CLASS: &str = "main-content";

#[derive(Debug)]
pub struct ConnectivityMonitor {
    settings: ConnectivitySettings,
    state: Connectivity,
    banner: Option<NodeId>,
    banner_close: Option<NodeId>,
}

impl ConnectivityMonitor {
    /// Starts in `initial`. When that is offline the banner goes up right
    /// away; the toast only fires if `notify_offline_at_load` is set, since
    /// no transition was observed.
    pub fn new<T: From<ToastTimer>>(
        settings: ConnectivitySettings,
        initial: Connectivity,
        doc: &mut Document,
        notify: &mut NotificationCenter,
        timers: &mut Scheduler<T>,
    ) -> Self {
        let mut monitor = Self {
            settings,
            state: initial,
            banner: None,
            banner_close: None,
        };
        if initial == Connectivity::Offline {
            info!("page loaded offline");
            monitor.show_banner(doc);
            if monitor.settings.notify_offline_at_load {
                notify.warning(doc, timers, &monitor.settings.offline_notice, None);
            }
        }
        monitor
    }

    pub const fn state(&self) -> Connectivity {
        self.state
    }

    pub const fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub const fn banner(&self) -> Option<NodeId> {
        self.banner
    }

    pub fn went_offline<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        notify: &mut NotificationCenter,
        timers: &mut Scheduler<T>,
    ) {
        if self.state == Connectivity::Offline {
            debug!("offline event while already offline");
            return;
        }
        self.state = Connectivity::Offline;
        warn!("connection lost");
        self.show_banner(doc);
        notify.warning(doc, timers, &self.settings.offline_notice, None);
    }

    pub fn came_online<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        notify: &mut NotificationCenter,
        timers: &mut Scheduler<T>,
    ) {
        if self.state == Connectivity::Online {
            debug!("online event while already online");
            return;
        }
        self.state = Connectivity::Online;
        info!("connection restored");
        self.hide_banner(doc);
        notify.success(doc, timers, &self.settings.online_notice, None);
    }

    /// Handles a click on the banner's close button. The user may dismiss
    /// the banner while still offline; the state stays `Offline` with no
    /// banner until the next offline transition puts it back.
    pub fn handle_click(&mut self, doc: &mut Document, target: NodeId) -> bool {
        let Some(close) = self.banner_close else {
            return false;
        };
        if !doc.ancestors(target).any(|node| node == close) {
            return false;
        }
        debug!("offline banner closed by user");
        self.hide_banner(doc);
        true
    }

    fn show_banner(&mut self, doc: &mut Document) {
        if self.banner.is_some_and(|banner| doc.contains(banner)) {
            return;
        }
        let close = doc.create(
            ElementBuilder::new("button")
                .class("btn-close")
                .attr("type", "button")
                .attr("data-bs-dismiss", "alert")
                .attr("aria-label", "Close"),
        );
        let banner = doc.create(
            ElementBuilder::new("div")
                .class("alert alert-warning alert-dismissible fade show offline-banner")
                .attr("role", "alert")
                .child(ElementBuilder::new("i").class("bi bi-wifi-off me-2"))
                .text(self.settings.banner_message.as_str()),
        );
        doc.append(banner, close);

        let body = doc.body();
        let host = doc
            .descendants(body)
            .into_iter()
            .find(|node| doc.has_class(*node, MAIN_CONTENT_CLASS))
            .unwrap_or(body);
        doc.prepend(host, banner);
        self.banner = Some(banner);
        self.banner_close = Some(close);
    }

    fn hide_banner(&mut self, doc: &mut Document) {
        if let Some(banner) = self.banner.take() {
            doc.remove(banner);
        }
        self.banner_close = None;
    }
}
