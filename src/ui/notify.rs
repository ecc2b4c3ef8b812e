//! Transient severity-tagged notifications.
//!
//! Each toast owns its own timers; nothing is queued or reordered. A toast
//! goes through `Entering -> Visible -> Leaving -> Removed`:
//!
//! - `show` attaches it and schedules the reveal after the enter delay, so
//!   the element is in the document before its `show` class is added;
//! - `remove` (from its timer, its close button or a caller) drops the
//!   `show` class and schedules the detach after the exit animation.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::NotifySettings;
use crate::dom::{Document, ElementBuilder, NodeId};
use crate::scheduler::{Scheduler, TimerId};
use crate::types::Severity;

const VISIBLE_CLASS: &str = "show";

/// A shown notification. It is just the toast's element handle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NotificationHandle(NodeId);

impl NotificationHandle {
    pub const fn element(self) -> NodeId {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Entering,
    Visible,
    Leaving,
    Removed,
}

/// Deferred work owned by the notification center.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToastTimer {
    Reveal(NotificationHandle),
    AutoDismiss(NotificationHandle),
    Detach(NotificationHandle),
}

#[derive(Debug)]
struct Toast {
    severity: Severity,
    phase: Phase,
    close: NodeId,
    auto_dismiss: Option<TimerId>,
}

#[derive(Debug)]
pub struct NotificationCenter {
    settings: NotifySettings,
    region: Option<NodeId>,
    toasts: HashMap<NotificationHandle, Toast>,
    close_controls: HashMap<NodeId, NotificationHandle>,
}

impl NotificationCenter {
    pub fn new(settings: NotifySettings) -> Self {
        Self {
            settings,
            region: None,
            toasts: HashMap::new(),
            close_controls: HashMap::new(),
        }
    }

    pub const fn settings(&self) -> &NotifySettings {
        &self.settings
    }

    /// Appends a toast to the display region.
    ///
    /// `None` uses the configured default duration; `Some(Duration::ZERO)`
    /// keeps the toast until it is removed explicitly.
    pub fn show<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        message: &str,
        severity: Severity,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        let region = self.ensure_region(doc);
        let duration = duration.unwrap_or(self.settings.default_duration);

        let toast = doc.create(
            ElementBuilder::new("div")
                .class("toast")
                .class(severity.toast_class())
                .attr("role", "alert"),
        );
        let content = doc.create(
            ElementBuilder::new("div")
                .class("toast-content")
                .child(
                    ElementBuilder::new("span")
                        .class("toast-icon")
                        .child(ElementBuilder::new("i").class("bi").class(severity.icon_class())),
                )
                .child(ElementBuilder::new("span").class("toast-message").text(message)),
        );
        let close = doc.create(
            ElementBuilder::new("button")
                .class("toast-close")
                .attr("aria-label", "Close")
                .child(ElementBuilder::new("i").class("bi bi-x")),
        );
        doc.append(content, close);
        doc.append(toast, content);
        doc.append(region, toast);

        let handle = NotificationHandle(toast);
        timers.schedule(self.settings.enter_delay, ToastTimer::Reveal(handle));
        let auto_dismiss =
            (!duration.is_zero()).then(|| timers.schedule(duration, ToastTimer::AutoDismiss(handle)));

        self.toasts.insert(
            handle,
            Toast {
                severity,
                phase: Phase::Entering,
                close,
                auto_dismiss,
            },
        );
        self.close_controls.insert(close, handle);

        debug!(
            %severity,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            sticky = duration.is_zero(),
            "notification shown"
        );
        handle
    }

    pub fn success<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        message: &str,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        self.show(doc, timers, message, Severity::Success, duration)
    }

    pub fn error<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        message: &str,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        self.show(doc, timers, message, Severity::Error, duration)
    }

    pub fn warning<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        message: &str,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        self.show(doc, timers, message, Severity::Warning, duration)
    }

    pub fn info<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        message: &str,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        self.show(doc, timers, message, Severity::Info, duration)
    }

    /// Starts the exit animation. Calling it again, or on a toast that is
    /// already gone, does nothing.
    pub fn remove<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        handle: NotificationHandle,
    ) {
        let Some(toast) = self.toasts.get_mut(&handle) else {
            trace!(?handle, "remove on unknown notification ignored");
            return;
        };
        if matches!(toast.phase, Phase::Leaving | Phase::Removed) {
            return;
        }
        if let Some(timer) = toast.auto_dismiss.take() {
            timers.cancel(timer);
        }
        toast.phase = Phase::Leaving;
        doc.remove_class(handle.0, VISIBLE_CLASS);
        timers.schedule(self.settings.exit_animation, ToastTimer::Detach(handle));
        debug!(severity = %toast.severity, "notification leaving");
    }

    pub fn handle_timer<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        timer: ToastTimer,
    ) {
        match timer {
            ToastTimer::Reveal(handle) => {
                if let Some(toast) = self.toasts.get_mut(&handle)
                    && toast.phase == Phase::Entering
                {
                    toast.phase = Phase::Visible;
                    doc.add_class(handle.0, VISIBLE_CLASS);
                }
            }
            ToastTimer::AutoDismiss(handle) => {
                if let Some(toast) = self.toasts.get_mut(&handle) {
                    toast.auto_dismiss = None;
                }
                self.remove(doc, timers, handle);
            }
            ToastTimer::Detach(handle) => {
                if let Some(toast) = self.toasts.remove(&handle) {
                    self.close_controls.remove(&toast.close);
                }
                doc.remove(handle.0);
                trace!(?handle, "notification detached");
            }
        }
    }

    /// Routes a click to the close button of the toast containing `target`.
    pub fn handle_click<T: From<ToastTimer>>(
        &mut self,
        doc: &mut Document,
        timers: &mut Scheduler<T>,
        target: NodeId,
    ) -> bool {
        let hit = doc
            .ancestors(target)
            .find_map(|node| self.close_controls.get(&node).copied());
        match hit {
            Some(handle) => {
                self.remove(doc, timers, handle);
                true
            }
            None => false,
        }
    }

    pub fn phase(&self, handle: NotificationHandle) -> Phase {
        self.toasts
            .get(&handle)
            .map_or(Phase::Removed, |toast| toast.phase)
    }

    /// Looks up the live toast rendered as `element`.
    pub fn handle_for(&self, element: NodeId) -> Option<NotificationHandle> {
        let handle = NotificationHandle(element);
        self.toasts.contains_key(&handle).then_some(handle)
    }

    pub fn severity(&self, handle: NotificationHandle) -> Option<Severity> {
        self.toasts.get(&handle).map(|toast| toast.severity)
    }

    /// Toasts that have not been detached yet.
    pub fn live_count(&self) -> usize {
        self.toasts.len()
    }

    pub const fn region(&self) -> Option<NodeId> {
        self.region
    }

    fn ensure_region(&mut self, doc: &mut Document) -> NodeId {
        if let Some(region) = self.region
            && doc.is_attached(region)
        {
            return region;
        }
        let region = doc.element_by_id(&self.settings.region_id).unwrap_or_else(|| {
            let region = doc.create(
                ElementBuilder::new("div")
                    .id(self.settings.region_id.as_str())
                    .class("toast-container")
                    .attr("aria-live", "polite")
                    .attr("aria-atomic", "true"),
            );
            let body = doc.body();
            doc.append(body, region);
            region
        });
        self.region = Some(region);
        region
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationCenter, Phase, ToastTimer};
    use crate::config::NotifySettings;
    use crate::dom::{Document, ElementBuilder};
    use crate::scheduler::Scheduler;
    use crate::types::Severity;
    use std::time::Duration;
    use url::Url;

    struct Harness {
        doc: Document,
        timers: Scheduler<ToastTimer>,
        center: NotificationCenter,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                doc: Document::new(Url::parse("https://journal.test/").unwrap()),
                timers: Scheduler::new(),
                center: NotificationCenter::new(NotifySettings::default()),
            }
        }

        fn advance(&mut self, by: Duration) {
            let until = self.timers.now() + by;
            while let Some(timer) = self.timers.pop_due(until) {
                self.center.handle_timer(&mut self.doc, &mut self.timers, timer);
            }
            self.timers.advance_to(until);
        }
    }

    #[test]
    fn reveal_is_deferred_past_show() {
        let mut h = Harness::new();
        let handle = h
            .center
            .info(&mut h.doc, &mut h.timers, "hello", None);
        assert!(h.doc.is_attached(handle.element()));
        assert_eq!(h.center.phase(handle), Phase::Entering);
        assert!(!h.doc.has_class(handle.element(), "show"));

        h.advance(Duration::from_millis(10));
        assert_eq!(h.center.phase(handle), Phase::Visible);
        assert!(h.doc.has_class(handle.element(), "show"));
    }

    #[test]
    fn auto_dismiss_detaches_after_exit_window() {
        let mut h = Harness::new();
        let handle = h.center.show(
            &mut h.doc,
            &mut h.timers,
            "saved",
            Severity::Success,
            Some(Duration::from_millis(1000)),
        );

        h.advance(Duration::from_millis(1000));
        assert_eq!(h.center.phase(handle), Phase::Leaving);
        assert!(h.doc.is_attached(handle.element()));

        h.advance(Duration::from_millis(300));
        assert_eq!(h.center.phase(handle), Phase::Removed);
        assert!(!h.doc.contains(handle.element()));
        assert_eq!(h.timers.pending(), 0);
    }

    #[test]
    fn zero_duration_is_sticky() {
        let mut h = Harness::new();
        let handle = h
            .center
            .error(&mut h.doc, &mut h.timers, "boom", Some(Duration::ZERO));
        h.advance(Duration::from_secs(3600));
        assert_eq!(h.center.phase(handle), Phase::Visible);
        assert_eq!(h.timers.pending(), 0);
    }

    #[test]
    fn remove_twice_is_harmless_and_cancels_timer() {
        let mut h = Harness::new();
        let handle = h
            .center
            .warning(&mut h.doc, &mut h.timers, "careful", None);
        h.advance(Duration::from_millis(10));

        h.center.remove(&mut h.doc, &mut h.timers, handle);
        h.center.remove(&mut h.doc, &mut h.timers, handle);
        assert_eq!(h.timers.pending(), 1);

        h.advance(Duration::from_millis(300));
        assert!(!h.doc.contains(handle.element()));
        h.center.remove(&mut h.doc, &mut h.timers, handle);
        assert_eq!(h.timers.pending(), 0);
        assert_eq!(h.center.live_count(), 0);
    }

    #[test]
    fn remove_before_reveal_never_reveals() {
        let mut h = Harness::new();
        let handle = h.center.info(&mut h.doc, &mut h.timers, "quick", None);
        h.center.remove(&mut h.doc, &mut h.timers, handle);
        h.advance(Duration::from_millis(10));
        assert!(!h.doc.has_class(handle.element(), "show"));
        h.advance(Duration::from_millis(300));
        assert!(!h.doc.contains(handle.element()));
    }

    #[test]
    fn close_button_removes_only_its_toast() {
        let mut h = Harness::new();
        let first = h.center.info(&mut h.doc, &mut h.timers, "one", None);
        let second = h.center.info(&mut h.doc, &mut h.timers, "two", None);
        h.advance(Duration::from_millis(10));

        let content = h.doc.children(first.element())[0];
        let close = h.doc.children(content)[2];
        let icon = h.doc.children(close)[0];
        assert!(h.center.handle_click(&mut h.doc, &mut h.timers, icon));
        h.advance(Duration::from_millis(300));

        assert_eq!(h.center.phase(first), Phase::Removed);
        assert_eq!(h.center.phase(second), Phase::Visible);
    }

    #[test]
    fn region_is_a_polite_atomic_singleton() {
        let mut h = Harness::new();
        let a = h.center.info(&mut h.doc, &mut h.timers, "a", None);
        let b = h.center.info(&mut h.doc, &mut h.timers, "b", None);
        let region = h.center.region().unwrap();
        assert_eq!(h.doc.parent(a.element()), Some(region));
        assert_eq!(h.doc.parent(b.element()), Some(region));
        assert_eq!(h.doc.children(region), &[a.element(), b.element()]);
        assert_eq!(h.doc.attr(region, "aria-live"), Some("polite"));
        assert_eq!(h.doc.attr(region, "aria-atomic"), Some("true"));
        assert_eq!(h.doc.element_by_id("toast-container"), Some(region));
    }

    #[test]
    fn existing_region_is_adopted() {
        let mut h = Harness::new();
        let main = h.doc.create(
            ElementBuilder::new("main")
                .child(ElementBuilder::new("div").id("toast-container").class("custom")),
        );
        let body = h.doc.body();
        h.doc.append(body, main);
        let existing = h.doc.element_by_id("toast-container").unwrap();

        let toast = h.center.success(&mut h.doc, &mut h.timers, "Saved", None);
        assert_eq!(h.center.region(), Some(existing));
        assert_eq!(h.doc.parent(toast.element()), Some(existing));
        let regions = h
            .doc
            .descendants(body)
            .into_iter()
            .filter(|node| h.doc.id_attr(*node) == Some("toast-container"))
            .count();
        assert_eq!(regions, 1);
    }

    #[test]
    fn message_is_rendered_as_text() {
        let mut h = Harness::new();
        let handle = h.center.show(
            &mut h.doc,
            &mut h.timers,
            "Saved",
            Severity::Success,
            None,
        );
        h.advance(Duration::from_millis(10));
        insta::assert_snapshot!(
            h.doc.outer_html(handle.element()),
            @r#"<div class="toast toast-success show" role="alert"><div class="toast-content"><span class="toast-icon"><i class="bi bi-check-circle-fill"></i></span><span class="toast-message">Saved</span><button class="toast-close" aria-label="Close"><i class="bi bi-x"></i></button></div></div>"#
        );

        let hostile = h
            .center
            .info(&mut h.doc, &mut h.timers, "<script>x</script>", None);
        assert!(h.doc.outer_html(hostile.element()).contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_message_is_allowed() {
        let mut h = Harness::new();
        let handle = h.center.info(&mut h.doc, &mut h.timers, "", None);
        assert!(h.doc.is_attached(handle.element()));
        assert_eq!(h.doc.text_content(handle.element()), "");
    }
}
