/*
Copyright 2020 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::bindings::{Binding, BindingKind, ContributionType};
use crate::components::ComponentDescriptor;
use crate::error::{DiagnosticKind, Severity};
use crate::graph::{missing_because_abstract, ResolutionState, ResolvedBindings, ResolvedGraph};
use crate::keys::map_key_identity;
use crate::options::ProcessorOptions;
use crate::reporter::{ValidationReport, ValidationReportBuilder};
use crate::requests::{DependencyRequest, RequestKind};
use itertools::Itertools;
use stiletto_common::elements::ElementKind;
use stiletto_common::source_model::SourceModel;

/// Semantic checks over a resolved graph. Emits as many diagnostics as the
/// graph supports in one pass; nothing here mutates the graph.
pub struct GraphValidator<'a> {
    model: &'a SourceModel,
    options: &'a ProcessorOptions,
}

impl<'a> GraphValidator<'a> {
    pub fn new(model: &'a SourceModel, options: &'a ProcessorOptions) -> Self {
        GraphValidator { model, options }
    }

    pub fn validate(&self, graph: &ResolvedGraph) -> ValidationReport {
        let mut report = ValidationReport::about(graph.descriptor.element);
        for resolved in graph.resolved_bindings.values() {
            match resolved.state {
                ResolutionState::Missing => self.report_missing(resolved, &mut report),
                ResolutionState::DuplicateBindings => {
                    self.report_duplicates(resolved, &mut report)
                }
                ResolutionState::MultipleBindingKinds => {
                    self.report_multiple_kinds(resolved, &mut report)
                }
                ResolutionState::Cycle => self.report_cycle(resolved, &mut report),
                ResolutionState::Malformed => self.report_malformed(resolved, &mut report),
                ResolutionState::Complete | ResolutionState::Incomplete => {}
            }
            self.check_scope(graph, resolved, &mut report);
            self.check_map_keys(resolved, &mut report);
            for binding in &resolved.bindings {
                self.check_nullability(graph, binding, &mut report);
                self.check_production_edges(graph, binding, &mut report);
            }
        }
        self.check_entry_point_nullability(graph, &mut report);
        report.build()
    }

    /// Scope repetition along the component ancestry, at the configured
    /// severity. Production scopes are treated exactly like provision
    /// scopes.
    pub fn validate_scope_ancestry(&self, descriptor: &ComponentDescriptor) -> ValidationReport {
        let mut report = ValidationReport::about(descriptor.element);
        let Some(severity) = self.options.scope_validation.severity() else {
            return report.build();
        };
        let mut ancestry = Vec::new();
        self.walk_scope_ancestry(descriptor, &mut ancestry, severity, &mut report);
        report.build()
    }

    fn walk_scope_ancestry(
        &self,
        descriptor: &ComponentDescriptor,
        ancestry: &mut Vec<(stiletto_common::elements::AnnotationData, String)>,
        severity: Severity,
        report: &mut ValidationReportBuilder,
    ) {
        for scope in &descriptor.scopes {
            if let Some((_, ancestor)) = ancestry.iter().find(|(s, _)| s == scope) {
                report.item_with_sub_anchor(
                    severity,
                    DiagnosticKind::ScopeRepeatedInAncestry {
                        component: descriptor.type_data.readable(),
                        scope: scope.readable(),
                        ancestor: ancestor.clone(),
                    }
                    .to_string(),
                    descriptor.element,
                    scope.clone(),
                );
            }
        }
        let added = descriptor
            .scopes
            .iter()
            .map(|s| (s.clone(), descriptor.type_data.readable()))
            .collect::<Vec<_>>();
        ancestry.extend(added.iter().cloned());
        for child in &descriptor.subcomponents {
            self.walk_scope_ancestry(child, ancestry, severity, report);
        }
        ancestry.truncate(ancestry.len() - added.len());
    }

    fn report_missing(&self, resolved: &ResolvedBindings, report: &mut ValidationReportBuilder) {
        let key = &resolved.binding_key.key;
        let path = self.render_request_path(&resolved.request_path);
        let anchor = resolved
            .request_path
            .last()
            .map(|r| r.anchor)
            .unwrap_or(report.root());
        let kind = if missing_because_abstract(self.model, key) {
            DiagnosticKind::RequiresProvider {
                type_path: key.readable(),
                path,
            }
        } else {
            DiagnosticKind::RequiresInjectionConstructor {
                type_path: key.readable(),
                path,
            }
        };
        report.error(kind.to_string(), anchor);
    }

    fn report_duplicates(
        &self,
        resolved: &ResolvedBindings,
        report: &mut ValidationReportBuilder,
    ) {
        let declarations = resolved
            .bindings
            .iter()
            .map(|b| self.declaration_of(b))
            .join("\n\t");
        let anchor = self.anchor_of(resolved, report.root());
        report.error(
            DiagnosticKind::DuplicateBindings {
                key: resolved.binding_key.readable(),
                declarations,
            }
            .to_string(),
            anchor,
        );
    }

    fn report_multiple_kinds(
        &self,
        resolved: &ResolvedBindings,
        report: &mut ValidationReportBuilder,
    ) {
        let by_kind = resolved
            .bindings
            .iter()
            .map(|b| (b.contribution_type(), self.declaration_of(b)))
            .into_group_map();
        let declarations_by_kind = by_kind
            .into_iter()
            .sorted_by_key(|(kind, _)| kind.readable())
            .map(|(kind, declarations)| {
                format!("\t{}:\n\t\t{}", kind.readable(), declarations.join("\n\t\t"))
            })
            .join("\n");
        let anchor = self.anchor_of(resolved, report.root());
        report.error(
            DiagnosticKind::MultipleBindingKinds {
                key: resolved.binding_key.readable(),
                declarations_by_kind,
            }
            .to_string(),
            anchor,
        );
    }

    /// A cycle is reported once, from the record that captured the loop, and
    /// only when every edge on it is an immediate instance request.
    fn report_cycle(&self, resolved: &ResolvedBindings, report: &mut ValidationReportBuilder) {
        let path = &resolved.request_path;
        let Some(closing) = path.last() else {
            return;
        };
        let Some(loop_start) = path
            .iter()
            .position(|r| r.binding_key == closing.binding_key)
        else {
            return;
        };
        if loop_start == path.len() - 1 {
            return;
        }
        if path[loop_start + 1..].iter().any(|r| r.kind.breaks_cycles()) {
            return;
        }
        let rendered = path[..path.len() - 1]
            .iter()
            .enumerate()
            .map(|(index, request)| {
                let marker = if index == 0 {
                    "*--"
                } else if index < loop_start {
                    "|  "
                } else if index == loop_start {
                    "*->"
                } else {
                    "   "
                };
                format!("{} {}", marker, request.binding_key.readable())
            })
            .join("\n");
        report.error(
            DiagnosticKind::DependencyCycle { path: rendered }.to_string(),
            closing.anchor,
        );
    }

    fn report_malformed(
        &self,
        resolved: &ResolvedBindings,
        report: &mut ValidationReportBuilder,
    ) {
        let anchor = self.anchor_of(resolved, report.root());
        report.error(
            format!(
                "{} cannot be provided because its declaration is invalid\nrequested by: {}",
                resolved.binding_key.readable(),
                self.render_request_path(&resolved.request_path)
            ),
            anchor,
        );
    }

    /// A binding carrying a scope this component does not declare. Bindings
    /// owned by an ancestor were checked when that ancestor's graph was
    /// validated.
    fn check_scope(
        &self,
        graph: &ResolvedGraph,
        resolved: &ResolvedBindings,
        report: &mut ValidationReportBuilder,
    ) {
        if resolved.owner != graph.descriptor.type_data {
            return;
        }
        for binding in &resolved.bindings {
            let Some(scope) = &binding.scope else {
                continue;
            };
            if !graph.descriptor.scopes.contains(scope) {
                report.item_with_sub_anchor(
                    Severity::Error,
                    DiagnosticKind::IncompatibleScope {
                        binding: binding.description(self.model),
                        scope: scope.readable(),
                        component: graph.descriptor.type_data.readable(),
                    }
                    .to_string(),
                    binding.origin,
                    scope.clone(),
                );
            }
        }
    }

    /// Two map contributions carrying the same map key under one key.
    fn check_map_keys(&self, resolved: &ResolvedBindings, report: &mut ValidationReportBuilder) {
        for binding in &resolved.bindings {
            let BindingKind::Multibinding { contributions } = &binding.kind else {
                continue;
            };
            if !contributions
                .iter()
                .any(|c| c.contribution_type() == ContributionType::Map)
            {
                continue;
            }
            let by_map_key = contributions
                .iter()
                .filter_map(|c| {
                    c.map_key()
                        .and_then(map_key_identity)
                        .map(|identity| (identity.clone(), c))
                })
                .into_group_map();
            for (identity, colliding) in by_map_key
                .into_iter()
                .filter(|(_, colliding)| colliding.len() > 1)
                .sorted_by_key(|(identity, _)| identity.readable())
            {
                let declarations = colliding
                    .iter()
                    .map(|c| self.declaration_of(c))
                    .join("\n\t");
                let message = DiagnosticKind::DuplicateMapKeys {
                    map_key: identity.readable(),
                    key: resolved.binding_key.readable(),
                    declarations,
                }
                .to_string();
                match colliding[0].map_key().cloned() {
                    Some(map_key) => {
                        report.item_with_sub_anchor(
                            Severity::Error,
                            message,
                            colliding[0].origin,
                            map_key,
                        );
                    }
                    None => {
                        report.error(message, colliding[0].origin);
                    }
                }
            }
        }
    }

    /// A non-nullable request fulfilled by a nullable binding, at the
    /// configured severity.
    fn check_nullability(
        &self,
        graph: &ResolvedGraph,
        binding: &Binding,
        report: &mut ValidationReportBuilder,
    ) {
        for dependency in binding.implicit_dependencies() {
            self.check_request_nullability(graph, dependency, report);
        }
    }

    fn check_entry_point_nullability(
        &self,
        graph: &ResolvedGraph,
        report: &mut ValidationReportBuilder,
    ) {
        for request in &graph.entry_points {
            self.check_request_nullability(graph, request, report);
        }
    }

    fn check_request_nullability(
        &self,
        graph: &ResolvedGraph,
        request: &DependencyRequest,
        report: &mut ValidationReportBuilder,
    ) {
        if request.nullable || request.kind == RequestKind::MembersInjector {
            return;
        }
        let Some(target) = graph.resolved(&request.binding_key) else {
            return;
        };
        for binding in target.bindings.iter().filter(|b| b.nullable) {
            report.item(
                self.options.nullable_validation,
                DiagnosticKind::NullableMismatch {
                    request: self.model.qualified_name(request.anchor),
                    binding: binding.description(self.model),
                }
                .to_string(),
                request.anchor,
            );
        }
    }

    /// Provision bindings may not reach into the production family.
    fn check_production_edges(
        &self,
        graph: &ResolvedGraph,
        binding: &Binding,
        report: &mut ValidationReportBuilder,
    ) {
        if binding.binding_type() != crate::bindings::BindingType::Provision {
            return;
        }
        for dependency in binding.implicit_dependencies() {
            let produced_target = graph
                .resolved(&dependency.binding_key)
                .map(|target| {
                    target
                        .bindings
                        .iter()
                        .any(|b| b.binding_type() == crate::bindings::BindingType::Production)
                })
                .unwrap_or(false);
            if dependency.kind.is_production() || produced_target {
                report.error(
                    DiagnosticKind::ProvisionDependsOnProducer {
                        site: self.model.qualified_name(dependency.anchor),
                    }
                    .to_string(),
                    dependency.anchor,
                );
            }
        }
    }

    fn render_request_path(&self, path: &[DependencyRequest]) -> String {
        if path.is_empty() {
            return "<entry point>".to_owned();
        }
        path.iter()
            .map(|request| self.model.qualified_name(request.anchor))
            .join("\nrequested by: ")
    }

    fn anchor_of(
        &self,
        resolved: &ResolvedBindings,
        root: stiletto_common::elements::ElementId,
    ) -> stiletto_common::elements::ElementId {
        resolved
            .bindings
            .first()
            .map(|b| b.origin)
            .or_else(|| resolved.request_path.last().map(|r| r.anchor))
            .unwrap_or(root)
    }

    /// Declaration-site rendering: method signature for method-backed
    /// bindings, the binding description otherwise.
    fn declaration_of(&self, binding: &Binding) -> String {
        match &binding.kind {
            BindingKind::Provision { .. }
            | BindingKind::Production { .. }
            | BindingKind::ComponentMethod { .. } => {
                format!(
                    "{} ({})",
                    self.model.method_signature(binding.origin),
                    match binding.kind {
                        BindingKind::Production { .. } => "module produces",
                        BindingKind::ComponentMethod { .. } => "component dependency method",
                        _ => "module provides",
                    }
                )
            }
            BindingKind::Injection
                if self.model.element(binding.origin).kind == ElementKind::Constructor =>
            {
                format!(
                    "{} (injectable)",
                    self.model.method_signature(binding.origin)
                )
            }
            _ => binding.description(self.model),
        }
    }
}
