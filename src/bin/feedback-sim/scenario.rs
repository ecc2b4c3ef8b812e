use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use tracing::{debug, warn};
use ui_feedback::Result;
use ui_feedback::config::HumantimeDuration;
use ui_feedback::dom::{Document, ElementBuilder, NodeId};
use ui_feedback::error::ScenarioError;
use ui_feedback::page::{HostEvent, Page};
use ui_feedback::types::{Connectivity, Severity};
use ui_feedback::ui::{ModalWidget, PromptHandle};
use url::Url;

/// Button of the most recent open confirmation.
const CONFIRM_TARGET: &str = "@confirm";
const CANCEL_TARGET: &str = "@cancel";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub url: String,
    #[serde(default = "default_online")]
    pub online: bool,
    #[serde(default)]
    pub page: Vec<NodeSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

const fn default_online() -> bool {
    true
}

/// Server-rendered markup, either a text run or an element.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Click(String),
    Submit(String),
    Escape,
    Online,
    Offline,
    Wait(#[serde_as(as = "HumantimeDuration")] Duration),
    Notify {
        message: String,
        #[serde(default)]
        severity: Severity,
        #[serde_as(as = "Option<HumantimeDuration>")]
        duration: Option<Duration>,
    },
    Busy {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
    Idle {
        #[serde(default)]
        target: Option<String>,
    },
    OverlayShow,
    OverlayHide,
}

impl Step {
    pub const fn wait(&self) -> Option<Duration> {
        match self {
            Self::Wait(duration) => Some(*duration),
            _ => None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(raw).map_err(ScenarioError::from)?;
        debug!(
            nodes = scenario.page.len(),
            steps = scenario.steps.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub const fn reachability(&self) -> Connectivity {
        Connectivity::from_online_flag(self.online)
    }

    /// Builds the document the page starts from.
    pub fn document(&self) -> Result<Document> {
        let location = Url::parse(&self.url).map_err(|err| ScenarioError::InvalidUrl {
            url: self.url.clone(),
            message: err.to_string(),
        })?;
        let mut doc = Document::new(location);
        let body = doc.body();
        for node in &self.page {
            let id = match node {
                NodeSpec::Text(text) => doc.create_text(text.as_str()),
                NodeSpec::Element(element) => doc.create(element.builder()),
            };
            doc.append(body, id);
        }
        Ok(doc)
    }
}

impl ElementSpec {
    fn builder(&self) -> ElementBuilder {
        let mut builder = ElementBuilder::new(self.tag.as_str());
        if let Some(id) = &self.id {
            builder = builder.id(id.as_str());
        }
        if let Some(class) = &self.class {
            builder = builder.class(class);
        }
        for (name, value) in &self.attrs {
            builder = builder.attr(name.as_str(), value.as_str());
        }
        builder = builder.disabled(self.disabled);
        for child in &self.children {
            builder = match child {
                NodeSpec::Text(text) => builder.text(text.as_str()),
                NodeSpec::Element(element) => builder.child(element.builder()),
            };
        }
        builder
    }
}

/// Applies one non-wait step to the page. `index` is 1-based and only used
/// in error reports.
pub fn apply<W: ModalWidget>(page: &mut Page<W>, index: usize, step: &Step) -> Result<()> {
    match step {
        Step::Click(target) => {
            let node = resolve(page, index, target)?;
            if !page.dispatch(HostEvent::Click(node)) {
                debug!(step = index, target = %target, "click had no effect");
            }
        }
        Step::Submit(target) => {
            let node = resolve(page, index, target)?;
            if !page.dispatch(HostEvent::Submit(node)) {
                warn!(step = index, target = %target, "submit ignored, form was not present at load");
            }
        }
        Step::Escape => {
            page.dispatch(HostEvent::Escape);
        }
        Step::Online => {
            page.dispatch(HostEvent::Online);
        }
        Step::Offline => {
            page.dispatch(HostEvent::Offline);
        }
        Step::Wait(duration) => page.advance(*duration),
        Step::Notify {
            message,
            severity,
            duration,
        } => {
            page.notify().show(message, *severity, *duration);
        }
        Step::Busy { target, label } => {
            let control = resolve_optional(page, index, target.as_deref())?;
            let mut busy = page.busy();
            match label {
                Some(label) => busy.show_labeled(control, label),
                None => busy.show(control),
            }
        }
        Step::Idle { target } => {
            let control = resolve_optional(page, index, target.as_deref())?;
            page.busy().hide(control);
        }
        Step::OverlayShow => page.busy().show_global(),
        Step::OverlayHide => page.busy().hide_global(),
    }
    Ok(())
}

fn resolve_optional<W: ModalWidget>(
    page: &Page<W>,
    index: usize,
    target: Option<&str>,
) -> Result<Option<NodeId>> {
    target
        .map(|target| resolve(page, index, target))
        .transpose()
}

fn resolve<W: ModalWidget>(page: &Page<W>, index: usize, target: &str) -> Result<NodeId> {
    let prompt_button = |pick: fn(PromptHandle) -> NodeId| {
        page.prompts().top().map(pick).ok_or_else(|| ScenarioError::InvalidStep {
            step: index,
            message: format!("{target} used while no confirmation is open"),
        })
    };
    let node = match target {
        CONFIRM_TARGET => prompt_button(|handle| handle.confirm)?,
        CANCEL_TARGET => prompt_button(|handle| handle.cancel)?,
        id => page
            .document()
            .element_by_id(id.trim_start_matches('#'))
            .ok_or_else(|| ScenarioError::UnknownTarget {
                step: index,
                target: id.to_string(),
            })?,
    };
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::{Scenario, Step, apply};
    use std::time::Duration;
    use ui_feedback::config::Config;
    use ui_feedback::error::{Error, ScenarioError};
    use ui_feedback::page::Page;
    use ui_feedback::types::Severity;

    const SCENARIO: &str = r#"{
        "url": "https://journal.test/trades",
        "page": [
            {"tag": "div", "class": "messages", "children": [
                {"tag": "div", "class": "alert alert-success", "children": ["Trade saved"]}
            ]},
            {"tag": "a", "id": "del", "attrs": {"href": "/trades/7/delete/", "data-item-name": "Trade #7"},
             "children": ["Delete"]}
        ],
        "steps": [
            {"click": "del"},
            {"click": "@confirm"},
            {"wait": "1s"},
            {"notify": {"message": "Exported", "severity": "info", "duration": "2s"}},
            "offline"
        ]
    }"#;

    #[test]
    fn parses_page_and_steps() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert!(scenario.online);
        assert_eq!(scenario.page.len(), 2);
        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(scenario.steps[2].wait(), Some(Duration::from_secs(1)));
        assert!(matches!(
            &scenario.steps[3],
            Step::Notify { severity: Severity::Info, duration: Some(d), .. } if *d == Duration::from_secs(2)
        ));
        assert!(matches!(scenario.steps[4], Step::Offline));
    }

    #[test]
    fn delete_link_flow_navigates() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let doc = scenario.document().unwrap();
        let mut page = Page::bootstrap(doc, &Config::default(), scenario.reachability());
        for (index, step) in scenario.steps.iter().enumerate() {
            apply(&mut page, index + 1, step).unwrap();
        }
        assert_eq!(
            page.document().location().as_str(),
            "https://journal.test/trades/7/delete/"
        );
        assert!(!page.connectivity().is_online());
    }

    #[test]
    fn unknown_target_is_reported() {
        let scenario = Scenario::from_json(r#"{"url": "https://journal.test/"}"#).unwrap();
        let doc = scenario.document().unwrap();
        let mut page = Page::bootstrap(doc, &Config::default(), scenario.reachability());
        let err = apply(&mut page, 3, &Step::Click("missing".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Scenario(ScenarioError::UnknownTarget { step: 3, .. })
        ));
        let err = apply(&mut page, 4, &Step::Click("@confirm".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Scenario(ScenarioError::InvalidStep { step: 4, .. })
        ));
    }

    #[test]
    fn bad_url_is_rejected() {
        let scenario = Scenario::from_json(r#"{"url": "not a url"}"#).unwrap();
        assert!(matches!(
            scenario.document(),
            Err(Error::Scenario(ScenarioError::InvalidUrl { .. }))
        ));
    }
}
