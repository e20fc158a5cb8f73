use super::ids::IdGenerator;
use super::{
    BeforeAction, ExtractType, Pagination, PhaseConfig, Repeater, RepeaterStep, ScopeModule,
    ScrapingWorkflow, StepKind, UrlType,
};
use crate::workflow::tree::{ensure_scope_and_repeater, update_repeater_steps};

/// Page limit used when pagination is switched on in the editor
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Create an empty scope with a fresh id
pub fn create_scope_module(ids: &mut dyn IdGenerator) -> ScopeModule {
    ScopeModule {
        id: ids.next_id("scope"),
        ..Default::default()
    }
}

/// Create an empty repeater with a fresh id
pub fn create_repeater(ids: &mut dyn IdGenerator) -> Repeater {
    Repeater {
        id: ids.next_id("repeater"),
        ..Default::default()
    }
}

pub fn create_pagination(max_pages: u32) -> Pagination {
    Pagination {
        css_selector: String::new(),
        max_pages,
    }
}

/// Create a URL type with an empty processing phase
pub fn create_url_type(ids: &mut dyn IdGenerator, name: impl Into<String>) -> UrlType {
    UrlType {
        id: ids.next_id("url-type"),
        name: name.into(),
        processing: PhaseConfig::default(),
    }
}

pub fn create_source_url_step(ids: &mut dyn IdGenerator, url_type_id: Option<String>) -> RepeaterStep {
    RepeaterStep {
        id: ids.next_id("step"),
        kind: StepKind::SourceUrl {
            selector: String::new(),
            extract_type: ExtractType::Href,
            url_type_id,
        },
    }
}

pub fn create_document_url_step(ids: &mut dyn IdGenerator) -> RepeaterStep {
    RepeaterStep {
        id: ids.next_id("step"),
        kind: StepKind::DocumentUrl {
            selector: String::new(),
        },
    }
}

pub fn create_download_file_step(ids: &mut dyn IdGenerator) -> RepeaterStep {
    RepeaterStep {
        id: ids.next_id("step"),
        kind: StepKind::DownloadFile {
            url_selector: String::new(),
            filename_selector: String::new(),
        },
    }
}

pub fn create_data_extract_step(ids: &mut dyn IdGenerator, key: impl Into<String>) -> RepeaterStep {
    RepeaterStep {
        id: ids.next_id("step"),
        kind: StepKind::DataExtract {
            key: key.into(),
            selector: String::new(),
            extract_type: ExtractType::Text,
        },
    }
}

/// Generator for starter workflows
pub struct WorkflowGenerator;

impl WorkflowGenerator {
    /// Listing page whose links lead to detail pages of one URL type
    pub fn generate_basic(ids: &mut dyn IdGenerator, url_type_name: &str, max_pages: u32) -> ScrapingWorkflow {
        let url_type = create_url_type(ids, url_type_name);
        let url_type_id = url_type.id.clone();

        // Discovery: iterate list items, follow their links
        let ensured = ensure_scope_and_repeater(PhaseConfig::default(), None, None, ids);
        let mut link = create_source_url_step(ids, Some(url_type_id));
        if let StepKind::SourceUrl { selector, .. } = &mut link.kind {
            *selector = "a".to_string();
        }
        let mut discovery = update_repeater_steps(ensured.phase, &ensured.scope_id, |mut steps| {
            steps.push(link);
            steps
        });
        if let Some(scope) = discovery.chain.first_mut() {
            scope.css_selector = "main".to_string();
            scope.label = "Listing".to_string();
            let mut pagination = create_pagination(max_pages);
            pagination.css_selector = "a[rel='next']".to_string();
            scope.pagination = Some(pagination);
            if let Some(repeater) = scope.repeater.as_mut() {
                repeater.css_selector = "article, li".to_string();
                repeater.label = "Items".to_string();
            }
        }

        // Processing: read the title of every detail page
        let ensured = ensure_scope_and_repeater(url_type.processing.clone(), None, None, ids);
        let mut title = create_data_extract_step(ids, "title");
        if let StepKind::DataExtract { selector, .. } = &mut title.kind {
            *selector = "h1".to_string();
        }
        let mut processing = update_repeater_steps(ensured.phase, &ensured.scope_id, |mut steps| {
            steps.push(title);
            steps
        });
        if let Some(scope) = processing.chain.first_mut() {
            scope.css_selector = "body".to_string();
            scope.label = "Page".to_string();
            if let Some(repeater) = scope.repeater.as_mut() {
                repeater.css_selector = "main, article".to_string();
                repeater.label = "Content".to_string();
            }
        }

        ScrapingWorkflow {
            discovery,
            url_types: vec![UrlType { processing, ..url_type }],
            playwright_enabled: false,
        }
    }

    /// Listing page whose links are ingested as documents directly
    pub fn generate_document_harvest(ids: &mut dyn IdGenerator, url_type_name: &str, max_pages: u32) -> ScrapingWorkflow {
        let mut workflow = Self::generate_basic(ids, url_type_name, max_pages);

        let mut document = create_document_url_step(ids);
        if let StepKind::DocumentUrl { selector } = &mut document.kind {
            *selector = "a[href$='.pdf']".to_string();
        }
        if let Some(repeater) = workflow
            .discovery
            .chain
            .first_mut()
            .and_then(|scope| scope.repeater.as_mut())
        {
            repeater.steps = vec![document];
        }
        workflow.discovery.before.push(BeforeAction::RemoveElement {
            css_selector: "#cookie-banner".to_string(),
        });
        workflow
    }
}
