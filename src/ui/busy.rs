//! Busy state for interactive controls.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::BusySettings;
use crate::dom::{Document, ElementBuilder, NodeId};

const BUSY_CLASS: &str = "loading";

/// What a control looked like before it went busy. The original children
/// stay alive, detached, until they are put back.
#[derive(Debug)]
struct BusyState {
    content: Vec<NodeId>,
    was_disabled: bool,
}

#[derive(Debug)]
pub struct BusyStateController {
    settings: BusySettings,
    snapshots: HashMap<NodeId, BusyState>,
}

impl BusyStateController {
    pub fn new(settings: BusySettings) -> Self {
        Self {
            settings,
            snapshots: HashMap::new(),
        }
    }

    /// Marks `control` busy with the default label.
    pub fn show(&mut self, doc: &mut Document, control: Option<NodeId>) {
        let label = self.settings.default_label.clone();
        self.show_labeled(doc, control, &label);
    }

    /// Disables `control` and swaps its content for a spinner and `label`.
    /// Only the first call before a `hide` snapshots the original content.
    pub fn show_labeled(&mut self, doc: &mut Document, control: Option<NodeId>, label: &str) {
        let Some(control) = control.filter(|id| doc.tag(*id).is_some()) else {
            trace!("busy show on missing control ignored");
            return;
        };

        if !self.snapshots.contains_key(&control) {
            let was_disabled = doc.is_disabled(control);
            let content = doc.take_children(control);
            self.snapshots.insert(
                control,
                BusyState {
                    content,
                    was_disabled,
                },
            );
        }

        let spinner = doc.create(
            ElementBuilder::new("span")
                .class("spinner-border spinner-border-sm me-2")
                .attr("role", "status")
                .attr("aria-hidden", "true"),
        );
        let text = doc.create_text(label);
        doc.replace_children(control, vec![spinner, text]);
        doc.set_disabled(control, true);
        doc.add_class(control, BUSY_CLASS);
        debug!(?control, label, "control busy");
    }

    /// Restores the snapshot taken by the first `show`. Controls without a
    /// snapshot are left untouched.
    pub fn hide(&mut self, doc: &mut Document, control: Option<NodeId>) {
        let Some(control) = control else {
            return;
        };
        let Some(state) = self.snapshots.remove(&control) else {
            trace!(?control, "busy hide without snapshot ignored");
            return;
        };
        if doc.tag(control).is_none() {
            // The control went away while busy; release the saved nodes.
            for node in state.content {
                doc.remove(node);
            }
            return;
        }
        doc.replace_children(control, state.content);
        doc.set_disabled(control, state.was_disabled);
        doc.remove_class(control, BUSY_CLASS);
        debug!(?control, "control restored");
    }

    pub fn is_busy(&self, control: NodeId) -> bool {
        self.snapshots.contains_key(&control)
    }

    /// Shows the page-wide blocking overlay, creating it on first use.
    pub fn show_global(&mut self, doc: &mut Document) {
        let overlay = doc
            .element_by_id(&self.settings.overlay_id)
            .unwrap_or_else(|| {
                let overlay = doc.create(
                    ElementBuilder::new("div")
                        .id(self.settings.overlay_id.as_str())
                        .class("loading-overlay")
                        .child(
                            ElementBuilder::new("div")
                                .class("loading-spinner")
                                .child(
                                    ElementBuilder::new("div")
                                        .class("spinner-border text-primary")
                                        .attr("role", "status")
                                        .child(
                                            ElementBuilder::new("span")
                                                .class("visually-hidden")
                                                .text(self.settings.default_label.as_str()),
                                        ),
                                )
                                .child(
                                    ElementBuilder::new("p")
                                        .class("mt-3 text-white")
                                        .text(self.settings.default_label.as_str()),
                                ),
                        ),
                );
                let body = doc.body();
                doc.append(body, overlay);
                overlay
            });
        doc.set_display(overlay, "flex");
        debug!("global busy overlay shown");
    }

    pub fn hide_global(&mut self, doc: &mut Document) {
        if let Some(overlay) = doc.element_by_id(&self.settings.overlay_id) {
            doc.set_display(overlay, "none");
            debug!("global busy overlay hidden");
        }
    }
}
