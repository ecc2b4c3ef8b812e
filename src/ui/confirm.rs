//! One-shot delete confirmation.
//!
//! Every `show` builds a fresh dialog and discards it after a single
//! interaction. The continuation runs at most once and only from an explicit
//! click on Delete; any negative dismissal drops it on the spot.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::config::ConfirmSettings;
use crate::dom::{Document, ElementBuilder, NodeId};
use crate::scheduler::Scheduler;

/// Action gated by the prompt. It receives the document so it can navigate
/// or mutate the page.
pub type OnConfirm = Box<dyn FnOnce(&mut Document)>;

/// When a widget considers a hidden dialog dismissed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dismissal {
    Immediate,
    After(Duration),
}

/// The modal widget the prompt relies on for show/hide and its dismissal
/// signal. `hide` reports when the widget's "dismissed" event fires.
pub trait ModalWidget {
    fn show(&mut self, doc: &mut Document, dialog: NodeId);
    fn hide(&mut self, doc: &mut Document, dialog: NodeId) -> Dismissal;
}

/// Bootstrap-style fade modal driven by the `show` class.
#[derive(Clone, Copy, Debug)]
pub struct FadeModal {
    fade: Duration,
}

impl FadeModal {
    pub const fn new(fade: Duration) -> Self {
        Self { fade }
    }
}

impl ModalWidget for FadeModal {
    fn show(&mut self, doc: &mut Document, dialog: NodeId) {
        doc.set_display(dialog, "block");
        doc.set_attr(dialog, "aria-modal", "true");
        doc.add_class(dialog, "show");
    }

    fn hide(&mut self, doc: &mut Document, dialog: NodeId) -> Dismissal {
        doc.remove_class(dialog, "show");
        doc.set_attr(dialog, "aria-hidden", "true");
        if self.fade.is_zero() {
            Dismissal::Immediate
        } else {
            Dismissal::After(self.fade)
        }
    }
}

/// Deferred work owned by the prompt factory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PromptTimer {
    /// The widget finished hiding the dialog.
    Dismissed(NodeId),
    /// Removal window after an affirmative click elapsed.
    Discard(NodeId),
}

/// Elements of one rendered prompt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PromptHandle {
    pub dialog: NodeId,
    pub confirm: NodeId,
    pub cancel: NodeId,
}

struct Prompt {
    label: String,
    confirm: NodeId,
    cancel: NodeId,
    on_confirm: Option<OnConfirm>,
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("label", &self.label)
            .field("confirm", &self.confirm)
            .field("cancel", &self.cancel)
            .field("armed", &self.on_confirm.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct ConfirmationPrompt {
    settings: ConfirmSettings,
    prompts: HashMap<NodeId, Prompt>,
    /// Open dialogs, most recent last.
    stack: Vec<NodeId>,
}

impl ConfirmationPrompt {
    pub fn new(settings: ConfirmSettings) -> Self {
        Self {
            settings,
            prompts: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub const fn settings(&self) -> &ConfirmSettings {
        &self.settings
    }

    /// Renders a dialog naming `label` and shows it. `on_confirm` is never
    /// called from here.
    pub fn show<W: ModalWidget>(
        &mut self,
        doc: &mut Document,
        widget: &mut W,
        label: &str,
        on_confirm: OnConfirm,
    ) -> PromptHandle {
        let dialog = doc.create(
            ElementBuilder::new("div")
                .class("modal fade")
                .attr("tabindex", "-1")
                .attr("role", "dialog"),
        );
        let cancel = doc.create(
            ElementBuilder::new("button")
                .class("btn btn-secondary")
                .attr("type", "button")
                .attr("data-bs-dismiss", "modal")
                .text("Cancel"),
        );
        let confirm = doc.create(
            ElementBuilder::new("button")
                .class("btn btn-danger")
                .attr("type", "button")
                .child(ElementBuilder::new("i").class("bi bi-trash me-2"))
                .text("Delete"),
        );
        let footer = doc.create(ElementBuilder::new("div").class("modal-footer"));
        doc.append(footer, cancel);
        doc.append(footer, confirm);

        let content = doc.create(
            ElementBuilder::new("div")
                .class("modal-content")
                .child(
                    ElementBuilder::new("div")
                        .class("modal-header border-danger")
                        .child(
                            ElementBuilder::new("h5")
                                .class("modal-title text-danger")
                                .child(
                                    ElementBuilder::new("i")
                                        .class("bi bi-exclamation-triangle-fill me-2"),
                                )
                                .text("Confirm Delete"),
                        )
                        .child(
                            ElementBuilder::new("button")
                                .class("btn-close")
                                .attr("type", "button")
                                .attr("data-bs-dismiss", "modal")
                                .attr("aria-label", "Close"),
                        ),
                )
                .child(
                    ElementBuilder::new("div")
                        .class("modal-body")
                        .child(
                            ElementBuilder::new("p")
                                .text("Are you sure you want to delete ")
                                .child(ElementBuilder::new("strong").text(label))
                                .text("?"),
                        )
                        .child(
                            ElementBuilder::new("p")
                                .class("text-muted small")
                                .text("This action cannot be undone."),
                        ),
                ),
        );
        doc.append(content, footer);
        let frame = doc.create(ElementBuilder::new("div").class("modal-dialog modal-dialog-centered"));
        doc.append(frame, content);
        doc.append(dialog, frame);
        let body = doc.body();
        doc.append(body, dialog);

        widget.show(doc, dialog);
        self.prompts.insert(
            dialog,
            Prompt {
                label: label.to_string(),
                confirm,
                cancel,
                on_confirm: Some(on_confirm),
            },
        );
        self.stack.push(dialog);
        debug!(label, "confirmation shown");

        PromptHandle {
            dialog,
            confirm,
            cancel,
        }
    }

    /// Affirmative path: hide, run the continuation once, discard the
    /// markup after the removal delay.
    pub fn accept<W: ModalWidget, T: From<PromptTimer>>(
        &mut self,
        doc: &mut Document,
        widget: &mut W,
        timers: &mut Scheduler<T>,
        dialog: NodeId,
    ) {
        let Some(on_confirm) = self
            .prompts
            .get_mut(&dialog)
            .and_then(|prompt| prompt.on_confirm.take())
        else {
            trace!(?dialog, "accept on settled prompt ignored");
            return;
        };
        self.stack.retain(|open| *open != dialog);
        self.schedule_dismissal(widget.hide(doc, dialog), timers, dialog);
        if let Some(prompt) = self.prompts.get(&dialog) {
            info!(label = %prompt.label, "deletion confirmed");
        }
        on_confirm(doc);
        timers.schedule(self.settings.removal_delay, PromptTimer::Discard(dialog));
    }

    /// Negative path: the continuation is dropped now and the markup goes
    /// once the widget reports the dialog dismissed.
    pub fn dismiss<W: ModalWidget, T: From<PromptTimer>>(
        &mut self,
        doc: &mut Document,
        widget: &mut W,
        timers: &mut Scheduler<T>,
        dialog: NodeId,
    ) {
        let Some(prompt) = self.prompts.get_mut(&dialog) else {
            return;
        };
        if prompt.on_confirm.take().is_none() {
            return;
        }
        debug!(label = %prompt.label, "confirmation cancelled");
        self.stack.retain(|open| *open != dialog);
        self.schedule_dismissal(widget.hide(doc, dialog), timers, dialog);
    }

    /// Dismisses the most recently opened dialog, as the Escape key does.
    pub fn dismiss_top<W: ModalWidget, T: From<PromptTimer>>(
        &mut self,
        doc: &mut Document,
        widget: &mut W,
        timers: &mut Scheduler<T>,
    ) -> bool {
        match self.stack.last().copied() {
            Some(dialog) => {
                self.dismiss(doc, widget, timers, dialog);
                true
            }
            None => false,
        }
    }

    pub fn handle_timer(&mut self, doc: &mut Document, timer: PromptTimer) {
        let (PromptTimer::Dismissed(dialog) | PromptTimer::Discard(dialog)) = timer;
        self.discard(doc, dialog);
    }

    /// Routes a click inside an open dialog: Delete accepts; a
    /// `data-bs-dismiss="modal"` control or a click on the backdrop itself
    /// dismisses. Returns `false` for clicks outside every dialog.
    pub fn handle_click<W: ModalWidget, T: From<PromptTimer>>(
        &mut self,
        doc: &mut Document,
        widget: &mut W,
        timers: &mut Scheduler<T>,
        target: NodeId,
    ) -> bool {
        let path: Vec<NodeId> = doc.ancestors(target).collect();
        let Some(dialog) = path.iter().copied().find(|node| self.prompts.contains_key(node)) else {
            return false;
        };
        let confirm = self.prompts.get(&dialog).map(|prompt| prompt.confirm);
        for node in path.iter().copied().take_while(|node| *node != dialog) {
            if Some(node) == confirm {
                self.accept(doc, widget, timers, dialog);
                return true;
            }
            if doc.attr(node, "data-bs-dismiss") == Some("modal") {
                self.dismiss(doc, widget, timers, dialog);
                return true;
            }
        }
        if target == dialog {
            self.dismiss(doc, widget, timers, dialog);
        }
        true
    }

    /// Dialogs whose markup is still in the document.
    pub fn open_count(&self) -> usize {
        self.prompts.len()
    }

    /// The most recently opened dialog still awaiting an answer.
    pub fn top(&self) -> Option<PromptHandle> {
        let dialog = self.stack.last().copied()?;
        self.prompts.get(&dialog).map(|prompt| PromptHandle {
            dialog,
            confirm: prompt.confirm,
            cancel: prompt.cancel,
        })
    }

    fn schedule_dismissal<T: From<PromptTimer>>(
        &self,
        dismissal: Dismissal,
        timers: &mut Scheduler<T>,
        dialog: NodeId,
    ) {
        let delay = match dismissal {
            Dismissal::Immediate => Duration::ZERO,
            Dismissal::After(delay) => delay,
        };
        timers.schedule(delay, PromptTimer::Dismissed(dialog));
    }

    fn discard(&mut self, doc: &mut Document, dialog: NodeId) {
        if self.prompts.remove(&dialog).is_some() {
            trace!(?dialog, "confirmation discarded");
        }
        self.stack.retain(|open| *open != dialog);
        doc.remove(dialog);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{ConfirmationPrompt, Dismissal, ModalWidget, PromptTimer};
    use crate::config::ConfirmSettings;
    use crate::dom::{Document, NodeId};
    use crate::scheduler::Scheduler;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use url::Url;

    /// Records widget calls and reports dismissal right away.
    #[derive(Default)]
    pub(crate) struct RecordingModal {
        pub shown: Vec<NodeId>,
        pub hidden: Vec<NodeId>,
    }

    impl ModalWidget for RecordingModal {
        fn show(&mut self, _doc: &mut Document, dialog: NodeId) {
            self.shown.push(dialog);
        }

        fn hide(&mut self, _doc: &mut Document, dialog: NodeId) -> Dismissal {
            self.hidden.push(dialog);
            Dismissal::Immediate
        }
    }

    struct Harness {
        doc: Document,
        widget: RecordingModal,
        timers: Scheduler<PromptTimer>,
        prompts: ConfirmationPrompt,
        calls: Rc<Cell<u32>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                doc: Document::new(Url::parse("https://journal.test/").unwrap()),
                widget: RecordingModal::default(),
                timers: Scheduler::new(),
                prompts: ConfirmationPrompt::new(ConfirmSettings::default()),
                calls: Rc::new(Cell::new(0)),
            }
        }

        fn open(&mut self, label: &str) -> super::PromptHandle {
            let calls = Rc::clone(&self.calls);
            self.prompts.show(
                &mut self.doc,
                &mut self.widget,
                label,
                Box::new(move |_| calls.set(calls.get() + 1)),
            )
        }

        fn click(&mut self, target: NodeId) -> bool {
            self.prompts
                .handle_click(&mut self.doc, &mut self.widget, &mut self.timers, target)
        }

        fn settle(&mut self) {
            let until = self.timers.now() + Duration::from_secs(1);
            while let Some(timer) = self.timers.pop_due(until) {
                self.prompts.handle_timer(&mut self.doc, timer);
            }
        }
    }

    #[test]
    fn show_does_not_run_continuation() {
        let mut h = Harness::new();
        let handle = h.open("Trade #42");
        assert_eq!(h.calls.get(), 0);
        assert_eq!(h.widget.shown, vec![handle.dialog]);
        assert!(h.doc.text_content(handle.dialog).contains("Trade #42"));
    }

    #[test]
    fn cancel_never_runs_continuation() {
        let mut h = Harness::new();
        let handle = h.open("Trade #42");
        assert!(h.click(handle.cancel));
        assert!(h.click(handle.confirm));
        h.settle();
        assert_eq!(h.calls.get(), 0);
        assert!(!h.doc.contains(handle.dialog));
        assert_eq!(h.prompts.open_count(), 0);
    }

    #[test]
    fn delete_runs_continuation_exactly_once() {
        let mut h = Harness::new();
        let handle = h.open("Trade #42");
        let icon = h.doc.children(handle.confirm)[0];
        assert!(h.click(icon));
        assert!(h.click(handle.confirm));
        assert_eq!(h.calls.get(), 1);
        assert_eq!(h.widget.hidden, vec![handle.dialog]);

        h.settle();
        assert!(!h.doc.contains(handle.dialog));
        assert_eq!(h.calls.get(), 1);
    }

    #[test]
    fn backdrop_click_dismisses_but_content_click_does_not() {
        let mut h = Harness::new();
        let handle = h.open("Trade #7");
        let frame = h.doc.children(handle.dialog)[0];
        assert!(h.click(frame));
        assert!(h.widget.hidden.is_empty());

        assert!(h.click(handle.dialog));
        h.settle();
        assert_eq!(h.calls.get(), 0);
        assert!(!h.doc.contains(handle.dialog));
    }

    #[test]
    fn escape_dismisses_latest_dialog() {
        let mut h = Harness::new();
        let first = h.open("first");
        let second = h.open("second");
        assert!(h.prompts.dismiss_top(&mut h.doc, &mut h.widget, &mut h.timers));
        assert_eq!(h.widget.hidden, vec![second.dialog]);
        assert!(h.prompts.dismiss_top(&mut h.doc, &mut h.widget, &mut h.timers));
        assert_eq!(h.widget.hidden, vec![second.dialog, first.dialog]);
        h.settle();
        assert!(!h.prompts.dismiss_top(&mut h.doc, &mut h.widget, &mut h.timers));
        assert_eq!(h.calls.get(), 0);
    }

    #[test]
    fn top_tracks_unanswered_dialogs() {
        let mut h = Harness::new();
        assert!(h.prompts.top().is_none());
        let first = h.open("first");
        let second = h.open("second");
        assert_eq!(h.prompts.top(), Some(second));
        assert!(h.click(second.confirm));
        assert_eq!(h.prompts.top(), Some(first));
    }

    #[test]
    fn click_outside_dialogs_is_not_handled() {
        let mut h = Harness::new();
        h.open("x");
        let body = h.doc.body();
        assert!(!h.click(body));
    }
}
