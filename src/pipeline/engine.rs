//! Validation pipeline
//!
//! Runs the ordered checks against a candidate revision and computes the
//! canonical text that would be stored if the candidate is accepted.

use crate::config::PolicyConfig;
use crate::meta::{self, keys, parse_meta, rewrite, MetaEdits, ParsedMeta};
use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::types::{
    Candidate, Correction, IdentityField, OwnerId, PreviousRevision, ScriptKind, SubmissionOptions,
    ValidationFailure, ValidationOutcome,
};
use crate::policy::{
    generated_version, is_generated_version, is_newer, next_version, resolve_namespace,
    NamespaceResolution,
};
use tracing::{debug, warn};

/// Decides whether a candidate revision may be accepted
pub struct ValidationPipeline {
    policy: PolicyConfig,
    collaborators: Collaborators,
}

/// Failures and corrections collected while the checks run
#[derive(Default)]
struct Findings {
    failures: Vec<ValidationFailure>,
    corrections: Vec<Correction>,
}

impl Findings {
    fn fail(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    fn correct(&mut self, correction: Correction) {
        self.corrections.push(correction);
    }
}

impl ValidationPipeline {
    pub fn new(policy: PolicyConfig, collaborators: Collaborators) -> Self {
        Self {
            policy,
            collaborators,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Evaluate `candidate` against the last accepted revision, if any.
    ///
    /// Never mutates anything; the caller decides what to do with the outcome.
    pub fn evaluate(
        &self,
        candidate: &Candidate<'_>,
        previous: Option<&PreviousRevision>,
    ) -> ValidationOutcome {
        let code = candidate.code;
        if meta::locate(code).is_none() {
            debug!("Candidate has no meta block");
            return ValidationOutcome {
                failures: vec![ValidationFailure::HeaderMissing],
                corrections: Vec::new(),
                rewritten_code: code.to_string(),
                version: None,
                namespace: None,
                name: None,
                description: None,
            };
        }

        let meta = parse_meta(code);
        let body = meta::body(code);
        let options = candidate.options;
        let mut findings = Findings::default();

        self.check_dependencies(&meta, &mut findings);
        self.check_signatures(&body, candidate.authors, &mut findings);

        if let Err(issue) = self.collaborators.syntax.check(code) {
            findings.fail(ValidationFailure::SyntaxError {
                message: format!("line {}: {}", issue.line, issue.message),
            });
        }

        if !options.minified_confirmation && self.appears_minified(&body) {
            findings.fail(ValidationFailure::AppearsMinified);
        }

        let version = self.resolve_version(&meta, candidate, previous, &mut findings);
        let namespace = self.resolve_namespace(&meta, candidate, previous, &mut findings);
        let description = self.resolve_description(&meta, options, previous, &mut findings);
        let name = resolve_name(&meta, candidate, previous);

        if name.is_none() {
            findings.fail(ValidationFailure::IdentityMissing {
                field: IdentityField::Name,
            });
        }
        if description.is_none() {
            findings.fail(ValidationFailure::IdentityMissing {
                field: IdentityField::Description,
            });
        }

        let rewritten_code =
            self.canonical_code(code, &meta, version.as_deref(), namespace.as_deref(), &mut findings);

        ValidationOutcome {
            failures: findings.failures,
            corrections: findings.corrections,
            rewritten_code,
            version,
            namespace,
            name,
            description,
        }
    }

    fn check_dependencies(&self, meta: &ParsedMeta, findings: &mut Findings) {
        for directive in &self.policy.dependency_directives {
            for value in meta.get_all(directive) {
                if !self.collaborators.dependencies.is_approved(value) {
                    findings.fail(ValidationFailure::UnapprovedDependency {
                        directive: directive.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
    }

    fn check_signatures(&self, body: &str, authors: &[OwnerId], findings: &mut Findings) {
        let Some(hit) = self.collaborators.signatures.scan(body) else {
            return;
        };

        if hit.originating_authors.is_empty() {
            warn!("Disallowed signature {} matched", hit.signature_id);
            findings.fail(ValidationFailure::DisallowedSignature {
                signature_id: hit.signature_id,
            });
        } else if !hit.originating_authors.iter().any(|a| authors.contains(a)) {
            warn!(
                "Signature {} belongs to authors {:?}, not {:?}",
                hit.signature_id, hit.originating_authors, authors
            );
            findings.fail(ValidationFailure::UnauthorizedCopy);
        }
    }

    fn appears_minified(&self, body: &str) -> bool {
        let line_lengths: Vec<usize> = body.lines().map(|l| l.chars().count()).collect();
        if line_lengths
            .iter()
            .any(|&len| len > self.policy.minified_max_line_length)
        {
            return true;
        }

        let total: usize = line_lengths.iter().sum();
        if line_lengths.is_empty() || total < self.policy.minified_min_body_length {
            return false;
        }
        total / line_lengths.len() > self.policy.minified_max_average_line_length
    }

    fn resolve_version(
        &self,
        meta: &ParsedMeta,
        candidate: &Candidate<'_>,
        previous: Option<&PreviousRevision>,
        findings: &mut Findings,
    ) -> Option<String> {
        let options = candidate.options;
        let previous_version = previous.map(|p| p.version.as_str());

        let version = match meta.first_non_empty(keys::VERSION) {
            Some(declared) => declared.to_string(),
            None => {
                let continues_generated = previous_version.map_or(false, is_generated_version);
                if !options.add_missing_version && !continues_generated {
                    findings.fail(ValidationFailure::VersionMissing);
                    return None;
                }
                let generated = generated_version(candidate.submitted_at);
                findings.correct(Correction::VersionGenerated {
                    version: generated.clone(),
                });
                generated
            }
        };

        let Some(previous_version) = previous_version else {
            return Some(version);
        };
        if is_newer(&version, previous_version) || options.version_check_override {
            return Some(version);
        }
        if options.lenient {
            let advanced = next_version(previous_version);
            findings.correct(Correction::VersionAdvanced {
                from: version,
                to: advanced.clone(),
            });
            return Some(advanced);
        }

        findings.fail(ValidationFailure::VersionNotAdvanced {
            previous: previous_version.to_string(),
            candidate: version.clone(),
        });
        Some(version)
    }

    fn resolve_namespace(
        &self,
        meta: &ParsedMeta,
        candidate: &Candidate<'_>,
        previous: Option<&PreviousRevision>,
        findings: &mut Findings,
    ) -> Option<String> {
        let previous_namespace = previous.and_then(|p| p.namespace.as_deref());
        let resolution = resolve_namespace(
            meta.first_non_empty(keys::NAMESPACE),
            previous_namespace,
            candidate.options.add_missing_namespace,
            candidate.owner_id,
            &self.policy.namespace_base_url,
        );

        match &resolution {
            NamespaceResolution::Declared(declared) => {
                if let Some(previous) = previous_namespace {
                    if declared != previous && !candidate.options.namespace_check_override {
                        findings.fail(ValidationFailure::NamespaceMismatch {
                            previous: previous.to_string(),
                            candidate: declared.clone(),
                        });
                    }
                }
            }
            NamespaceResolution::Inherited(namespace) => {
                findings.correct(Correction::NamespaceInherited {
                    namespace: namespace.clone(),
                });
            }
            NamespaceResolution::Defaulted(namespace) => {
                findings.correct(Correction::NamespaceDefaulted {
                    namespace: namespace.clone(),
                });
            }
            NamespaceResolution::Missing => findings.fail(ValidationFailure::NamespaceMissing),
        }

        resolution.value().map(str::to_string)
    }

    fn resolve_description(
        &self,
        meta: &ParsedMeta,
        options: &SubmissionOptions,
        previous: Option<&PreviousRevision>,
        findings: &mut Findings,
    ) -> Option<String> {
        let description = meta
            .first_non_empty(keys::DESCRIPTION)
            .map(str::to_string)
            .or_else(|| previous.and_then(|p| p.description.clone()))?;

        let limit = self.policy.description_max_length;
        if description.chars().count() <= limit {
            return Some(description);
        }
        if options.lenient {
            findings.correct(Correction::DescriptionTruncated { limit });
            return Some(description.chars().take(limit).collect());
        }
        findings.fail(ValidationFailure::DescriptionTooLong { limit });
        Some(description)
    }

    /// Canonical stored form: resolved version and namespace written into
    /// the header, forbidden directives stripped.
    fn canonical_code(
        &self,
        code: &str,
        meta: &ParsedMeta,
        version: Option<&str>,
        namespace: Option<&str>,
        findings: &mut Findings,
    ) -> String {
        let mut edits = MetaEdits::new();
        if let Some(version) = version {
            edits = edits.replace(keys::VERSION, version);
        }
        for directive in &self.policy.forbidden_directives {
            if meta.contains_key(directive) {
                findings.correct(Correction::DirectiveRemoved {
                    directive: directive.clone(),
                });
            }
            edits = edits.remove(directive.as_str());
        }
        if let Some(version) = version {
            edits = edits.add_if_missing(keys::VERSION, version);
        }
        if let Some(namespace) = namespace {
            // a blank `@namespace` line counts as undeclared
            if meta.first_non_empty(keys::NAMESPACE).is_none() {
                edits = edits.replace(keys::NAMESPACE, namespace);
            }
            edits = edits.add_if_missing(keys::NAMESPACE, namespace);
        }
        rewrite(code, &edits)
    }
}

fn resolve_name(
    meta: &ParsedMeta,
    candidate: &Candidate<'_>,
    previous: Option<&PreviousRevision>,
) -> Option<String> {
    meta.first_non_empty(keys::NAME)
        .map(str::to_string)
        .or_else(|| match candidate.kind {
            ScriptKind::Library => candidate
                .display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ScriptKind::UserScript => None,
        })
        .or_else(|| previous.and_then(|p| p.name.clone()))
}
