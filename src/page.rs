//! One page's worth of feedback components.
//!
//! `Page` owns the document, the timer queue and the four components, and
//! hands each component the references it needs. Host input arrives as
//! [`HostEvent`]s; deferred work comes back as [`Task`]s.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::config::{AdapterSettings, Config};
use crate::dom::{Document, NodeId};
use crate::scheduler::Scheduler;
use crate::types::{Connectivity, Severity};
use crate::ui::confirm::{FadeModal, ModalWidget, PromptHandle, PromptTimer};
use crate::ui::notify::{NotificationHandle, ToastTimer};
use crate::ui::{BusyStateController, ConfirmationPrompt, ConnectivityMonitor, NotificationCenter};

const FLASH_CONTAINER_CLASS: &str = "messages";
const FLASH_CLASS: &str = "alert";

/// Input delivered by the host page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostEvent {
    Click(NodeId),
    Submit(NodeId),
    Escape,
    Online,
    Offline,
}

/// A timer owned by one of the components.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Task {
    Toast(ToastTimer),
    Prompt(PromptTimer),
}

impl From<ToastTimer> for Task {
    fn from(timer: ToastTimer) -> Self {
        Self::Toast(timer)
    }
}

impl From<PromptTimer> for Task {
    fn from(timer: PromptTimer) -> Self {
        Self::Prompt(timer)
    }
}

#[derive(Debug)]
pub struct Page<W = FadeModal> {
    doc: Document,
    timers: Scheduler<Task>,
    toasts: NotificationCenter,
    busy: BusyStateController,
    prompts: ConfirmationPrompt,
    connectivity: ConnectivityMonitor,
    widget: W,
    adapter: AdapterSettings,
    forms: HashSet<NodeId>,
    delete_links: HashSet<NodeId>,
}

impl Page<FadeModal> {
    /// Wires the components with the built-in fade modal and adopts the
    /// server-rendered content of `doc`.
    pub fn bootstrap(doc: Document, config: &Config, reachability: Connectivity) -> Self {
        let widget = FadeModal::new(config.confirm.fade);
        Self::with_widget(doc, config, reachability, widget)
    }
}

impl<W: ModalWidget> Page<W> {
    pub fn with_widget(
        mut doc: Document,
        config: &Config,
        reachability: Connectivity,
        widget: W,
    ) -> Self {
        let mut timers = Scheduler::new();
        let mut toasts = NotificationCenter::new(config.notify.clone());
        let connectivity = ConnectivityMonitor::new(
            config.connectivity.clone(),
            reachability,
            &mut doc,
            &mut toasts,
            &mut timers,
        );
        let mut page = Self {
            doc,
            timers,
            toasts,
            busy: BusyStateController::new(config.busy.clone()),
            prompts: ConfirmationPrompt::new(config.confirm.clone()),
            connectivity,
            widget,
            adapter: config.adapter.clone(),
            forms: HashSet::new(),
            delete_links: HashSet::new(),
        };
        page.adopt_page();
        page
    }

    pub const fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub const fn notifications(&self) -> &NotificationCenter {
        &self.toasts
    }

    pub const fn busy_state(&self) -> &BusyStateController {
        &self.busy
    }

    pub const fn prompts(&self) -> &ConfirmationPrompt {
        &self.prompts
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub const fn widget(&self) -> &W {
        &self.widget
    }

    pub fn notify(&mut self) -> Notifier<'_> {
        Notifier {
            center: &mut self.toasts,
            doc: &mut self.doc,
            timers: &mut self.timers,
        }
    }

    pub fn busy(&mut self) -> Busy<'_> {
        Busy {
            controller: &mut self.busy,
            doc: &mut self.doc,
        }
    }

    /// Asks for confirmation before running `on_confirm`.
    pub fn confirm_delete(
        &mut self,
        label: &str,
        on_confirm: impl FnOnce(&mut Document) + 'static,
    ) -> PromptHandle {
        self.prompts
            .show(&mut self.doc, &mut self.widget, label, Box::new(on_confirm))
    }

    /// Routes one host event. Returns whether any component acted on it.
    pub fn dispatch(&mut self, event: HostEvent) -> bool {
        trace!(?event, "dispatching host event");
        match event {
            HostEvent::Click(target) => self.click(target),
            HostEvent::Submit(form) => self.submit(form),
            HostEvent::Escape => {
                self.prompts
                    .dismiss_top(&mut self.doc, &mut self.widget, &mut self.timers)
            }
            HostEvent::Online => {
                self.connectivity
                    .came_online(&mut self.doc, &mut self.toasts, &mut self.timers);
                true
            }
            HostEvent::Offline => {
                self.connectivity
                    .went_offline(&mut self.doc, &mut self.toasts, &mut self.timers);
                true
            }
        }
    }

    /// Time elapsed on the page clock.
    pub const fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn advance(&mut self, by: Duration) {
        self.advance_to(self.timers.now().saturating_add(by));
    }

    /// Runs every timer due up to `at`, including timers scheduled by the
    /// ones that fire along the way.
    pub fn advance_to(&mut self, at: Duration) {
        while let Some(task) = self.timers.pop_due(at) {
            self.run(task);
        }
        self.timers.advance_to(at);
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::Toast(timer) => self
                .toasts
                .handle_timer(&mut self.doc, &mut self.timers, timer),
            Task::Prompt(timer) => self.prompts.handle_timer(&mut self.doc, timer),
        }
    }

    fn click(&mut self, target: NodeId) -> bool {
        if !self.doc.contains(target) {
            trace!(?target, "click on missing element ignored");
            return false;
        }
        if self
            .toasts
            .handle_click(&mut self.doc, &mut self.timers, target)
        {
            return true;
        }
        if self
            .prompts
            .handle_click(&mut self.doc, &mut self.widget, &mut self.timers, target)
        {
            return true;
        }
        if self.connectivity.handle_click(&mut self.doc, target) {
            return true;
        }
        let link = self
            .doc
            .ancestors(target)
            .find(|node| self.delete_links.contains(node));
        match link {
            Some(link) => {
                self.confirm_link(link);
                true
            }
            None => false,
        }
    }

    fn submit(&mut self, form: NodeId) -> bool {
        if !self.forms.contains(&form) {
            return false;
        }
        let control = self
            .doc
            .descendants(form)
            .into_iter()
            .find(|node| is_submit_control(&self.doc, *node));
        debug!(?form, has_control = control.is_some(), "form submitted");
        self.busy.show(&mut self.doc, control);
        true
    }

    fn confirm_link(&mut self, link: NodeId) {
        let label = self.doc.attr(link, "data-item-name").map_or_else(
            || self.prompts.settings().fallback_label.clone(),
            str::to_string,
        );
        let Some(href) = self.doc.attr(link, "href") else {
            return;
        };
        let destination = match self.doc.location().join(href) {
            Ok(url) => url,
            Err(err) => {
                warn!(href, error = %err, "delete link has an unusable target");
                return;
            }
        };
        self.confirm_delete(&label, move |doc| doc.navigate(destination));
    }

    /// Converts flash messages into notifications and records the forms and
    /// delete links present at load.
    fn adopt_page(&mut self) {
        let body = self.doc.body();
        let elements = self.doc.descendants(body);

        let flashes: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|node| is_flash(&self.doc, *node))
            .collect();
        let mut converted = 0usize;
        for flash in flashes {
            let text = self.doc.text_content(flash).trim().to_string();
            if text.is_empty() {
                continue;
            }
            let severity = Severity::from_alert_classes(self.doc.classes(flash));
            self.toasts
                .show(&mut self.doc, &mut self.timers, &text, severity, None);
            self.doc.set_display(flash, "none");
            converted += 1;
        }

        for node in elements {
            match self.doc.tag(node) {
                Some("form") => {
                    self.forms.insert(node);
                }
                Some("a")
                    if self
                        .doc
                        .attr(node, "href")
                        .is_some_and(|href| href.contains(self.adapter.delete_path_marker.as_str())) =>
                {
                    self.delete_links.insert(node);
                }
                _ => {}
            }
        }

        info!(
            flashes = converted,
            forms = self.forms.len(),
            delete_links = self.delete_links.len(),
            online = self.connectivity.is_online(),
            "page adopted"
        );
    }
}

fn is_flash(doc: &Document, node: NodeId) -> bool {
    doc.has_class(node, FLASH_CLASS)
        && doc
            .ancestors(node)
            .skip(1)
            .any(|ancestor| doc.has_class(ancestor, FLASH_CONTAINER_CLASS))
}

fn is_submit_control(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag(node), Some("button" | "input")) && doc.attr(node, "type") == Some("submit")
}

/// Notification surface bound to a page.
pub struct Notifier<'a> {
    center: &'a mut NotificationCenter,
    doc: &'a mut Document,
    timers: &'a mut Scheduler<Task>,
}

impl Notifier<'_> {
    pub fn show(
        &mut self,
        message: &str,
        severity: Severity,
        duration: Option<Duration>,
    ) -> NotificationHandle {
        self.center
            .show(self.doc, self.timers, message, severity, duration)
    }

    pub fn success(&mut self, message: &str, duration: Option<Duration>) -> NotificationHandle {
        self.show(message, Severity::Success, duration)
    }

    pub fn error(&mut self, message: &str, duration: Option<Duration>) -> NotificationHandle {
        self.show(message, Severity::Error, duration)
    }

    pub fn warning(&mut self, message: &str, duration: Option<Duration>) -> NotificationHandle {
        self.show(message, Severity::Warning, duration)
    }

    pub fn info(&mut self, message: &str, duration: Option<Duration>) -> NotificationHandle {
        self.show(message, Severity::Info, duration)
    }

    pub fn remove(&mut self, handle: NotificationHandle) {
        self.center.remove(self.doc, self.timers, handle);
    }
}

/// Busy-state surface bound to a page.
pub struct Busy<'a> {
    controller: &'a mut BusyStateController,
    doc: &'a mut Document,
}

impl Busy<'_> {
    pub fn show(&mut self, control: Option<NodeId>) {
        self.controller.show(self.doc, control);
    }

    pub fn show_labeled(&mut self, control: Option<NodeId>, label: &str) {
        self.controller.show_labeled(self.doc, control, label);
    }

    pub fn hide(&mut self, control: Option<NodeId>) {
        self.controller.hide(self.doc, control);
    }

    pub fn show_global(&mut self) {
        self.controller.show_global(self.doc);
    }

    pub fn hide_global(&mut self) {
        self.controller.hide_global(self.doc);
    }
}

#[cfg(test)]
mod tests {
    use super::{HostEvent, Page};
    use crate::config::Config;
    use crate::dom::{Document, ElementBuilder};
    use crate::types::Connectivity;
    use crate::ui::confirm::tests::RecordingModal;
    use std::time::Duration;
    use url::Url;

    fn page_with(builder: ElementBuilder) -> Page<RecordingModal> {
        let mut doc = Document::new(Url::parse("https://journal.test/trades/").unwrap());
        let root = doc.create(builder);
        let body = doc.body();
        doc.append(body, root);
        Page::with_widget(
            doc,
            &Config::default(),
            Connectivity::Online,
            RecordingModal::default(),
        )
    }

    #[test]
    fn escape_dismisses_programmatic_prompt() {
        let mut page = page_with(ElementBuilder::new("main"));
        let handle = page.confirm_delete("Trade #1", |_| panic!("must not run"));
        assert!(page.dispatch(HostEvent::Escape));
        page.advance(Duration::ZERO);
        assert!(!page.document().contains(handle.dialog));
        assert!(!page.dispatch(HostEvent::Escape));
    }

    #[test]
    fn submit_on_unknown_form_is_ignored() {
        let mut page = page_with(ElementBuilder::new("main"));
        let late = page
            .document_mut()
            .create(ElementBuilder::new("form").child(
                ElementBuilder::new("button").attr("type", "submit").text("Go"),
            ));
        let body = page.document().body();
        page.document_mut().append(body, late);
        assert!(!page.dispatch(HostEvent::Submit(late)));
    }

    #[test]
    fn delete_link_with_bad_target_is_left_alone() {
        let mut page = page_with(
            ElementBuilder::new("a")
                .id("bad")
                .attr("href", "http://[::1/delete/")
                .text("Delete"),
        );
        let link = page.document().element_by_id("bad").unwrap();
        assert!(page.dispatch(HostEvent::Click(link)));
        assert_eq!(page.prompts().open_count(), 0);
        assert!(page.widget().shown.is_empty());
    }
}
