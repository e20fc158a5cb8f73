use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::utils::is_blank;
use crate::workflow::{
    BeforeAction, ExtractType, PhaseKind, RepeaterStep, ScopeModule, ScrapingWorkflow, StepKind,
};

/// Outcome of validating a workflow.
///
/// `error` blocks compilation; `warnings` are advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, keeping the warnings on success
    pub fn into_result(self) -> WorkflowResult<Vec<String>> {
        match self.error {
            Some(message) => Err(WorkflowError::validation(message)),
            None => Ok(self.warnings),
        }
    }
}

type RuleResult = std::result::Result<(), String>;

/// Structural validator run before a workflow is compiled.
///
/// Rules are checked in a fixed order and the first failing rule decides the
/// reported error: shape problems come before field contents, and the
/// scripted-browser check comes before per-action field checks.
pub struct WorkflowValidator;

impl WorkflowValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a complete workflow
    pub fn validate(&self, workflow: &ScrapingWorkflow) -> ValidationReport {
        debug!(
            "Starting workflow validation: {} URL types, playwright={}",
            workflow.url_types.len(),
            workflow.playwright_enabled
        );

        if let Err(message) = self.check_rules(workflow) {
            info!("Workflow validation failed: {}", message);
            return ValidationReport {
                error: Some(message),
                warnings: Vec::new(),
            };
        }

        let warnings = self.collect_warnings(workflow);
        for warning in &warnings {
            warn!("{}", warning);
        }

        debug!("Workflow validation completed successfully");
        ValidationReport {
            error: None,
            warnings,
        }
    }

    fn check_rules(&self, workflow: &ScrapingWorkflow) -> RuleResult {
        let phases = workflow.phases();

        self.check_url_types(workflow)?;
        self.check_discovery_links(workflow)?;

        for (kind, phase) in &phases {
            self.check_scope_selectors(kind, &phase.chain)?;
        }

        self.check_reachable_phases(workflow)?;

        for (kind, phase) in &phases {
            for step in phase.steps() {
                self.check_step(workflow, kind, step)?;
            }
        }

        if !workflow.playwright_enabled {
            for (kind, phase) in &phases {
                if let Some(action) = phase.before.iter().find(|a| a.requires_scripted_browser()) {
                    return Err(format!(
                        "{} uses the '{}' before action, which requires Playwright. Enable Playwright or remove the action.",
                        kind,
                        action.type_name()
                    ));
                }
            }
        }

        for (kind, phase) in &phases {
            for (index, action) in phase.before.iter().enumerate() {
                self.check_before_action(kind, index, action)?;
            }
        }

        Ok(())
    }

    fn check_url_types(&self, workflow: &ScrapingWorkflow) -> RuleResult {
        if workflow.url_types.is_empty() {
            return Err("At least one URL type is required".to_string());
        }
        Ok(())
    }

    fn check_discovery_links(&self, workflow: &ScrapingWorkflow) -> RuleResult {
        let has_link = workflow.discovery.steps().iter().any(|step| match &step.kind {
            StepKind::SourceUrl { selector, .. } | StepKind::DocumentUrl { selector } => !is_blank(selector),
            StepKind::DownloadFile { .. } | StepKind::DataExtract { .. } => false,
        });

        if !has_link {
            return Err(
                "Discovery must contain at least one source_url or document_url step with a selector".to_string(),
            );
        }
        Ok(())
    }

    fn check_scope_selectors(&self, kind: &PhaseKind<'_>, forest: &[ScopeModule]) -> RuleResult {
        for scope in forest {
            let name = scope_name(scope);

            if is_blank(&scope.css_selector) {
                return Err(format!("{}: scope '{}' is missing a CSS selector", kind, name));
            }

            if let Some(repeater) = &scope.repeater {
                if is_blank(&repeater.css_selector) {
                    return Err(format!(
                        "{}: the repeater in scope '{}' is missing a CSS selector",
                        kind, name
                    ));
                }
            }

            if let Some(pagination) = &scope.pagination {
                if is_blank(&pagination.css_selector) {
                    return Err(format!(
                        "{}: pagination in scope '{}' is missing a next-page selector",
                        kind, name
                    ));
                }
            }

            self.check_scope_selectors(kind, &scope.children)?;
        }
        Ok(())
    }

    fn check_reachable_phases(&self, workflow: &ScrapingWorkflow) -> RuleResult {
        let processing_reachable = workflow.discovery.has_source_url_step();

        for (kind, phase) in workflow.phases() {
            let reachable = match kind {
                PhaseKind::Discovery => true,
                PhaseKind::Processing(_) => processing_reachable,
            };

            if reachable && !phase.chain.is_empty() && !phase.has_steps() {
                return Err(format!(
                    "{} has scopes but no repeater steps. Add a step or remove the empty scopes.",
                    kind
                ));
            }
        }
        Ok(())
    }

    fn check_step(&self, workflow: &ScrapingWorkflow, kind: &PhaseKind<'_>, step: &RepeaterStep) -> RuleResult {
        match &step.kind {
            StepKind::SourceUrl {
                selector,
                extract_type,
                url_type_id,
            } => {
                if is_blank(selector) {
                    return Err(format!("{}: source_url step is missing a selector", kind));
                }
                if *extract_type != ExtractType::Href {
                    return Err(format!(
                        "{}: source_url step '{}' must extract 'href', not '{}'",
                        kind, selector, extract_type
                    ));
                }
                if let Some(id) = url_type_id {
                    if workflow.url_type(id).is_none() {
                        return Err(format!(
                            "{}: source_url step '{}' references unknown URL type '{}'",
                            kind, selector, id
                        ));
                    }
                }
            }
            StepKind::DocumentUrl { selector } => {
                if is_blank(selector) {
                    return Err(format!("{}: document_url step is missing a selector", kind));
                }
            }
            StepKind::DownloadFile { url_selector, .. } => {
                if is_blank(url_selector) {
                    return Err(format!("{}: download_file step is missing a URL selector", kind));
                }
            }
            StepKind::DataExtract { key, selector, .. } => {
                if is_blank(key) {
                    return Err(format!("{}: data_extract step is missing a key", kind));
                }
                if is_blank(selector) {
                    return Err(format!("{}: data_extract step '{}' is missing a selector", kind, key));
                }
            }
        }
        Ok(())
    }

    fn check_before_action(&self, kind: &PhaseKind<'_>, index: usize, action: &BeforeAction) -> RuleResult {
        if let Some(selector) = action.css_selector() {
            if is_blank(selector) {
                return Err(format!(
                    "{}: before action #{} ({}) is missing a CSS selector",
                    kind,
                    index + 1,
                    action.type_name()
                ));
            }
        }

        if let BeforeAction::Evaluate { script, .. } = action {
            if is_blank(script) {
                return Err(format!(
                    "{}: before action #{} (evaluate) has an empty script",
                    kind,
                    index + 1
                ));
            }
        }
        Ok(())
    }

    fn collect_warnings(&self, workflow: &ScrapingWorkflow) -> Vec<String> {
        let mut warnings = Vec::new();

        if !workflow.discovery.has_source_url_step() {
            let stranded: Vec<&str> = workflow
                .url_types
                .iter()
                .filter(|url_type| url_type.processing.has_steps())
                .map(|url_type| url_type.name.as_str())
                .collect();

            if !stranded.is_empty() {
                warnings.push(format!(
                    "Discovery has no source_url step, so Processing ({}) will never run",
                    stranded.join(", ")
                ));
            }
        }

        warnings
    }
}

impl Default for WorkflowValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn scope_name(scope: &ScopeModule) -> &str {
    if is_blank(&scope.label) {
        scope.id.as_str()
    } else {
        scope.label.as_str()
    }
}

/// Validate a workflow with the default validator
pub fn validate_workflow(workflow: &ScrapingWorkflow) -> ValidationReport {
    WorkflowValidator::new().validate(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Pagination, PhaseConfig, Repeater, UrlType};

    fn step(id: &str, kind: StepKind) -> RepeaterStep {
        RepeaterStep {
            id: id.to_string(),
            kind,
        }
    }

    fn phase_with_steps(scope_selector: &str, steps: Vec<RepeaterStep>) -> PhaseConfig {
        PhaseConfig {
            before: Vec::new(),
            chain: vec![ScopeModule {
                id: format!("scope-{}", scope_selector),
                css_selector: scope_selector.to_string(),
                repeater: Some(Repeater {
                    id: format!("repeater-{}", scope_selector),
                    css_selector: "li".to_string(),
                    label: String::new(),
                    steps,
                }),
                ..Default::default()
            }],
        }
    }

    fn source_url(selector: &str, url_type_id: Option<&str>) -> StepKind {
        StepKind::SourceUrl {
            selector: selector.to_string(),
            extract_type: ExtractType::Href,
            url_type_id: url_type_id.map(str::to_string),
        }
    }

    fn data_extract(key: &str, selector: &str) -> StepKind {
        StepKind::DataExtract {
            key: key.to_string(),
            selector: selector.to_string(),
            extract_type: ExtractType::Text,
        }
    }

    fn valid_workflow() -> ScrapingWorkflow {
        ScrapingWorkflow {
            discovery: phase_with_steps("main", vec![step("s1", source_url("a.link", None))]),
            url_types: vec![UrlType {
                id: "ut-1".to_string(),
                name: "Articles".to_string(),
                processing: phase_with_steps("body", vec![step("s2", data_extract("title", "h1"))]),
            }],
            playwright_enabled: false,
        }
    }

    #[test]
    fn test_valid_workflow() {
        let report = validate_workflow(&valid_workflow());
        assert_eq!(report.error, None);
        assert!(report.warnings.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_requires_url_type() {
        let mut workflow = valid_workflow();
        workflow.url_types.clear();

        let report = validate_workflow(&workflow);
        assert!(report.error.unwrap().contains("URL type"));
    }

    #[test]
    fn test_discovery_needs_link_step() {
        let mut workflow = valid_workflow();
        workflow.discovery = phase_with_steps("main", vec![step("s1", data_extract("title", "h1"))]);

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.contains("source_url or document_url"));

        // A link step with a blank selector does not count
        workflow.discovery = phase_with_steps("main", vec![step("s1", source_url("  ", None))]);
        assert!(validate_workflow(&workflow).error.unwrap().contains("source_url or document_url"));
    }

    #[test]
    fn test_nested_scope_selector_required() {
        let mut workflow = valid_workflow();
        workflow.url_types[0].processing.chain[0].children.push(ScopeModule {
            id: "inner".to_string(),
            label: "Sidebar".to_string(),
            ..Default::default()
        });

        let error = validate_workflow(&workflow).error.unwrap();
        assert_eq!(error, "Processing (Articles): scope 'Sidebar' is missing a CSS selector");
    }

    #[test]
    fn test_pagination_selector_required() {
        let mut workflow = valid_workflow();
        workflow.discovery.chain[0].pagination = Some(Pagination {
            css_selector: String::new(),
            max_pages: 3,
        });

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.starts_with("Discovery: pagination"));
    }

    #[test]
    fn test_selector_rule_runs_before_step_rules() {
        let mut workflow = valid_workflow();
        workflow.discovery.chain[0].repeater.as_mut().unwrap().css_selector.clear();
        workflow.url_types[0].processing = phase_with_steps("body", vec![step("s2", data_extract("", "h1"))]);

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.contains("repeater in scope"));
    }

    #[test]
    fn test_reachable_processing_must_not_be_empty_shell() {
        let mut workflow = valid_workflow();
        workflow.url_types[0].processing = phase_with_steps("body", Vec::new());

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.starts_with("Processing (Articles) has scopes but no repeater steps"));
    }

    #[test]
    fn test_unreachable_empty_processing_is_allowed() {
        let mut workflow = valid_workflow();
        workflow.discovery = phase_with_steps(
            "main",
            vec![step("s1", StepKind::DocumentUrl { selector: "a.pdf".to_string() })],
        );
        workflow.url_types[0].processing = phase_with_steps("body", Vec::new());

        let report = validate_workflow(&workflow);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_source_url_must_extract_href() {
        let mut workflow = valid_workflow();
        workflow.discovery = phase_with_steps(
            "main",
            vec![step(
                "s1",
                StepKind::SourceUrl {
                    selector: "a".to_string(),
                    extract_type: ExtractType::Text,
                    url_type_id: None,
                },
            )],
        );

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.contains("must extract 'href'"));
    }

    #[test]
    fn test_source_url_unknown_url_type() {
        let mut workflow = valid_workflow();
        workflow.discovery = phase_with_steps("main", vec![step("s1", source_url("a", Some("ut-404")))]);

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.contains("unknown URL type 'ut-404'"));
    }

    #[test]
    fn test_step_field_checks() {
        let mut workflow = valid_workflow();
        workflow.url_types[0].processing = phase_with_steps(
            "body",
            vec![step(
                "s2",
                StepKind::DownloadFile {
                    url_selector: String::new(),
                    filename_selector: "span".to_string(),
                },
            )],
        );
        assert!(validate_workflow(&workflow).error.unwrap().contains("download_file"));

        workflow.url_types[0].processing = phase_with_steps("body", vec![step("s2", data_extract("price", ""))]);
        let error = validate_workflow(&workflow).error.unwrap();
        assert_eq!(error, "Processing (Articles): data_extract step 'price' is missing a selector");
    }

    #[test]
    fn test_scripted_action_without_playwright() {
        let mut workflow = valid_workflow();
        workflow.url_types[0].processing.before.push(BeforeAction::Click {
            css_selector: "#accept".to_string(),
            wait_after_ms: 0,
        });

        let error = validate_workflow(&workflow).error.unwrap();
        assert!(error.contains("Processing (Articles)"));
        assert!(error.contains("'click'"));

        workflow.playwright_enabled = true;
        assert!(validate_workflow(&workflow).is_valid());
    }

    #[test]
    fn test_plain_actions_without_playwright() {
        let mut workflow = valid_workflow();
        workflow.discovery.before = vec![
            BeforeAction::RemoveElement { css_selector: ".ad".to_string() },
            BeforeAction::WaitTimeout { ms: 500 },
        ];
        assert!(validate_workflow(&workflow).is_valid());
    }

    #[test]
    fn test_before_action_fields() {
        let mut workflow = valid_workflow();
        workflow.playwright_enabled = true;
        workflow.discovery.before = vec![
            BeforeAction::WaitTimeout { ms: 100 },
            BeforeAction::Fill {
                css_selector: " ".to_string(),
                value: "rust".to_string(),
                wait_after_ms: 0,
            },
        ];
        let error = validate_workflow(&workflow).error.unwrap();
        assert_eq!(error, "Discovery: before action #2 (fill) is missing a CSS selector");

        workflow.discovery.before = vec![BeforeAction::Evaluate {
            script: String::new(),
            wait_after_ms: 0,
        }];
        assert!(validate_workflow(&workflow).error.unwrap().contains("empty script"));
    }

    #[test]
    fn test_stranded_processing_warning() {
        let mut workflow = valid_workflow();
        workflow.discovery = phase_with_steps(
            "main",
            vec![step("s1", StepKind::DocumentUrl { selector: "a.pdf".to_string() })],
        );

        let report = validate_workflow(&workflow);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Processing (Articles) will never run"));
    }
}
