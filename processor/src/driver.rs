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

use crate::bindings::Binding;
use crate::components::{ComponentDescriptor, ComponentDescriptorFactory, ComponentKind};
use crate::error::{DiagnosticItem, Messager};
use crate::graph::{resolve_component, ResolvedGraph};
use crate::options::ProcessorOptions;
use crate::registry::InjectBindingRegistry;
use crate::reporter::ValidationReport;
use crate::validation::GraphValidator;
use crate::validators::SourceValidator;
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use stiletto_common::elements::{ElementId, ElementKind};
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use tracing::{debug, warn};

/// The downstream code emitter. Out of scope for the core; the driver hands
/// it resolved graphs whose validation came back clean, plus the injection
/// bindings discovered on demand during resolution.
pub trait Emitter {
    fn emit_component(&mut self, graph: &ResolvedGraph) -> anyhow::Result<()>;
    fn emit_injection_factories(&mut self, bindings: &[Binding]) -> anyhow::Result<()>;
}

/// For hosts that only want validation.
#[derive(Debug, Default)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn emit_component(&mut self, _graph: &ResolvedGraph) -> anyhow::Result<()> {
        Ok(())
    }

    fn emit_injection_factories(&mut self, _bindings: &[Binding]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What one round produced.
#[derive(Debug, Default)]
pub struct RoundOutcome {
    /// Graphs that validated clean and were handed to the emitter, root
    /// components first, subcomponents in declaration order.
    pub clean_graphs: Vec<ResolvedGraph>,
    pub components_with_errors: usize,
    /// Emissions that failed and were kept for the next round.
    pub deferred_emissions: usize,
}

/// Orchestrates discovery over rounds: leaf validation, descriptor
/// construction, graph resolution and validation, then emission. The
/// registry's pending-emission queue is the only state that crosses round
/// boundaries.
pub struct ProcessingDriver {
    options: ProcessorOptions,
    registry: InjectBindingRegistry,
    round: u32,
}

struct Discovered {
    inject_constructors: Vec<ElementId>,
    inject_fields: Vec<ElementId>,
    inject_methods: Vec<ElementId>,
    modules: Vec<ElementId>,
    components: Vec<ElementId>,
}

impl ProcessingDriver {
    pub fn new(options: ProcessorOptions) -> Self {
        ProcessingDriver {
            options,
            registry: InjectBindingRegistry::new(),
            round: 0,
        }
    }

    /// Builds a driver from raw host options; parse complaints come back for
    /// the host to surface as self-diagnostics.
    pub fn from_raw_options(raw: &HashMap<String, String>) -> (Self, Vec<String>) {
        let (options, complaints) = ProcessorOptions::parse(raw);
        (Self::new(options), complaints)
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn registry(&mut self) -> &mut InjectBindingRegistry {
        &mut self.registry
    }

    /// Runs one processing round over `model`. User errors go to `messager`
    /// and never fail the round; an `Err` means an internal invariant broke.
    pub fn process_round(
        &mut self,
        model: &SourceModel,
        messager: &mut dyn Messager,
        emitter: &mut dyn Emitter,
    ) -> anyhow::Result<RoundOutcome> {
        self.round += 1;
        debug!(round = self.round, "processing round started");
        let mut outcome = RoundOutcome::default();

        // discover and validate leaves; a violation never stops a sibling
        let discovered = discover(model);
        let options = self.options;
        let validator = SourceValidator::new(model, &options);
        for constructor in &discovered.inject_constructors {
            validator.validate_inject_constructor(*constructor, messager);
        }
        for field in &discovered.inject_fields {
            validator.validate_inject_field(*field, messager);
        }
        for method in &discovered.inject_methods {
            validator.validate_inject_method(*method, messager);
        }
        let mut dirty_modules = HashSet::<ElementId>::new();
        for module in &discovered.modules {
            if !validator.validate_module(*module, messager) {
                dirty_modules.insert(*module);
            }
        }

        // descriptors, then resolution, for structurally clean components
        let descriptor_factory = ComponentDescriptorFactory::new(model);
        for component in &discovered.components {
            let descriptor = match descriptor_factory.for_component(*component) {
                Ok(descriptor) => descriptor,
                Err(errors) => {
                    for error in errors {
                        messager.report(error);
                    }
                    outcome.components_with_errors += 1;
                    continue;
                }
            };
            // a module that failed leaf validation stops its components here
            let installs_dirty_module = descriptor.modules.iter().any(|module| {
                model
                    .type_element(module)
                    .map(|id| dirty_modules.contains(&id))
                    .unwrap_or(false)
            });
            if installs_dirty_module {
                outcome.components_with_errors += 1;
                continue;
            }
            if let Some(builder) = descriptor.builder {
                if !validator.validate_builder(builder, &descriptor.type_data, messager) {
                    outcome.components_with_errors += 1;
                    continue;
                }
            }
            let graph_validator = GraphValidator::new(model, &self.options);
            let scope_report = graph_validator.validate_scope_ancestry(&descriptor);
            let scopes_clean = scope_report.is_clean();
            scope_report.print_to(messager);
            if !scopes_clean {
                outcome.components_with_errors += 1;
                continue;
            }

            // a component and its subcomponents emit as one unit; their
            // reports compose and flatten on render
            let (graphs, report) = self.resolve_tree(model, &descriptor, &[])?;
            let clean = report.is_clean();
            report.print_to(messager);
            if !clean {
                outcome.components_with_errors += 1;
                continue;
            }
            for graph in graphs {
                match emitter.emit_component(&graph) {
                    Ok(()) => outcome.clean_graphs.push(graph),
                    Err(error) => {
                        warn!(error = %error, "component emission failed");
                        outcome.deferred_emissions += 1;
                    }
                }
            }
        }

        // drain the emission work list exactly once per round
        let pending = self.registry.drain_pending();
        if !pending.is_empty() {
            if let Err(error) = emitter.emit_injection_factories(&pending) {
                warn!(error = %error, "emission failed, retrying next round");
                outcome.deferred_emissions = pending.len();
                self.registry.restore_pending(pending);
            }
        }
        debug!(
            round = self.round,
            clean = outcome.clean_graphs.len(),
            errors = outcome.components_with_errors,
            "processing round finished"
        );
        Ok(outcome)
    }

    /// Resolves a component and its subcomponents, each as its own graph
    /// with the ancestor chain's bindings in scope. Child reports become
    /// sub-reports of the parent's.
    fn resolve_tree(
        &mut self,
        model: &SourceModel,
        descriptor: &ComponentDescriptor,
        ancestors: &[&ComponentDescriptor],
    ) -> anyhow::Result<(Vec<ResolvedGraph>, ValidationReport)> {
        let graph = resolve_component(model, &mut self.registry, descriptor, ancestors)
            .with_context(|| {
                format!("resolving component {}", descriptor.type_data.readable())
            })?;
        let graph_validator = GraphValidator::new(model, &self.options);
        let mut report = ValidationReport::about(descriptor.element);
        report.add_subreport(graph_validator.validate(&graph));

        let mut graphs = vec![graph];
        let chain: Vec<&ComponentDescriptor> = ancestors
            .iter()
            .copied()
            .chain(std::iter::once(descriptor))
            .collect();
        for child in &descriptor.subcomponents {
            let (child_graphs, child_report) = self.resolve_tree(model, child, &chain)?;
            graphs.extend(child_graphs);
            report.add_subreport(child_report);
        }
        Ok((graphs, report.build()))
    }
}

/// Classifies annotated elements by marker, in declaration order.
fn discover(model: &SourceModel) -> Discovered {
    let mut discovered = Discovered {
        inject_constructors: Vec::new(),
        inject_fields: Vec::new(),
        inject_methods: Vec::new(),
        modules: Vec::new(),
        components: Vec::new(),
    };
    for id in model.ids() {
        let element = model.element(id);
        if element.has_annotation(markers::INJECT) {
            match element.kind {
                ElementKind::Constructor => discovered.inject_constructors.push(id),
                ElementKind::Field => discovered.inject_fields.push(id),
                ElementKind::Method => discovered.inject_methods.push(id),
                _ => {}
            }
        }
        if element.has_annotation(markers::MODULE) {
            discovered.modules.push(id);
        }
        if matches!(
            ComponentDescriptorFactory::component_kind(model, id),
            Some(ComponentKind::Component) | Some(ComponentKind::Production)
        ) {
            discovered.components.push(id);
        }
    }
    discovered
}

/// Reports option-parse complaints as notes anchored at nothing in
/// particular; hosts with a better anchor can do their own reporting.
pub fn report_option_complaints(complaints: &[String], messager: &mut dyn Messager) {
    for complaint in complaints {
        messager.report(DiagnosticItem::note(
            complaint.clone(),
            ElementId::default(),
        ));
    }
}
