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

use crate::bindings::component::ComponentBindingFactory;
use crate::bindings::multibinding;
use crate::bindings::provision::ModuleBindingFactory;
use crate::bindings::{Binding, BindingKind};
use crate::components::ComponentDescriptor;
use crate::error::{DiagnosticKind, InvariantError};
use crate::keys::{BindingKey, BindingKeyKind, Key, KeyFactory};
use crate::registry::InjectBindingRegistry;
use crate::requests::{DependencyRequest, DependencyRequestFactory, RequestKind};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, ElementKind, Modifier};
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::{TypeData, TypeKind};
use tracing::{debug, trace};

/// Terminal classification of one binding key after resolution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Complete,
    Incomplete,
    MultipleBindingKinds,
    DuplicateBindings,
    Cycle,
    Malformed,
    Missing,
}

/// What satisfies one binding key, in what state, and who owns it. Created
/// once by the resolver and immutable afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolvedBindings {
    pub binding_key: BindingKey,
    pub state: ResolutionState,
    pub bindings: Vec<Binding>,
    pub owner: TypeData,
    /// The traversal chain that reached this key; captured for `Missing` and
    /// `Cycle` records so diagnostics can show the full dependency path.
    pub request_path: Vec<DependencyRequest>,
}

/// The resolved graph of one component, in deterministic order: entry
/// points as declared, binding keys in first-encounter order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolvedGraph {
    pub descriptor: ComponentDescriptor,
    pub entry_points: Vec<DependencyRequest>,
    #[serde(with = "indexmap::map::serde_seq")]
    pub resolved_bindings: IndexMap<BindingKey, ResolvedBindings>,
    #[serde(with = "indexmap::map::serde_seq")]
    pub transitive_modules: IndexMap<TypeData, IndexSet<TypeData>>,
}

impl ResolvedGraph {
    pub fn resolved(&self, binding_key: &BindingKey) -> Option<&ResolvedBindings> {
        self.resolved_bindings.get(binding_key)
    }

    /// Canonical ordered form; rebuilding from it preserves entry-point and
    /// per-key binding order.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_canonical_json(json: &str) -> serde_json::Result<ResolvedGraph> {
        serde_json::from_str(json)
    }
}

struct Frame {
    binding_key: BindingKey,
    /// The request kind of the edge that entered this key.
    edge: RequestKind,
}

/// Lazily materializes and resolves the binding graph of one component.
///
/// User errors never abort resolution; they are recorded as states so the
/// graph validator can report as much as possible in one pass. Only
/// invariant breaches are fatal.
pub struct BindingGraphResolver<'a> {
    model: &'a SourceModel,
    registry: &'a mut InjectBindingRegistry,
    descriptor: &'a ComponentDescriptor,
    key_factory: KeyFactory,
    request_factory: DependencyRequestFactory,
    module_factory: ModuleBindingFactory,
    explicit: IndexMap<Key, Vec<Binding>>,
    malformed: IndexMap<Key, DiagnosticKind>,
    module_owner: IndexMap<TypeData, TypeData>,
    dependency_owner: IndexMap<TypeData, TypeData>,
    scope_owner: Vec<(AnnotationData, TypeData)>,
    resolved: IndexMap<BindingKey, ResolvedBindings>,
    cycle_stack: Vec<Frame>,
}

/// Resolves `descriptor` against `registry`. `ancestors` is the component
/// chain above a subcomponent, root first; their modules and dependencies
/// stay visible to the child graph.
pub fn resolve_component(
    model: &SourceModel,
    registry: &mut InjectBindingRegistry,
    descriptor: &ComponentDescriptor,
    ancestors: &[&ComponentDescriptor],
) -> Result<ResolvedGraph, InvariantError> {
    debug!(component = %descriptor.type_data.readable(), "resolving component");
    let mut resolver = BindingGraphResolver {
        model,
        registry,
        descriptor,
        key_factory: KeyFactory::new(),
        request_factory: DependencyRequestFactory::new(),
        module_factory: ModuleBindingFactory::new(),
        explicit: IndexMap::new(),
        malformed: IndexMap::new(),
        module_owner: IndexMap::new(),
        dependency_owner: IndexMap::new(),
        scope_owner: Vec::new(),
        resolved: IndexMap::new(),
        cycle_stack: Vec::new(),
    };
    resolver.index_explicit_bindings(ancestors);

    let mut path = Vec::new();
    for entry_point in &descriptor.entry_points {
        resolver.resolve_request(&entry_point.request, &mut path)?;
    }
    if !resolver.cycle_stack.is_empty() {
        return Err(InvariantError::new("cycle stack not empty after resolution"));
    }

    Ok(ResolvedGraph {
        descriptor: descriptor.clone(),
        entry_points: descriptor
            .entry_points
            .iter()
            .map(|e| e.request.clone())
            .collect(),
        resolved_bindings: resolver.resolved,
        transitive_modules: descriptor.transitive_modules.clone(),
    })
}

impl<'a> BindingGraphResolver<'a> {
    /// Builds the explicit-bindings index once: the component-self bindings,
    /// each declared component dependency with its provision methods, and
    /// every binding method on every transitively installed module.
    /// Ancestors contribute first so ownership attributes to the outermost
    /// component that installed a module.
    fn index_explicit_bindings(&mut self, ancestors: &[&ComponentDescriptor]) {
        let component_factory = ComponentBindingFactory::new();
        let chain: Vec<&ComponentDescriptor> = ancestors
            .iter()
            .copied()
            .chain(std::iter::once(self.descriptor))
            .collect();

        for component in &chain {
            let binding =
                component_factory.for_instance(&component.type_data, component.element);
            self.push_explicit(binding);
            self.dependency_owner
                .insert(component.type_data.clone(), component.type_data.clone());
            for scope in &component.scopes {
                self.scope_owner
                    .push((scope.clone(), component.type_data.clone()));
            }
        }

        for component in &chain {
            for dependency in &component.dependencies {
                self.dependency_owner
                    .insert(dependency.clone(), component.type_data.clone());
                let origin = self
                    .model
                    .type_element(dependency)
                    .unwrap_or(component.element);
                self.push_explicit(component_factory.for_instance(dependency, origin));
                self.index_dependency_methods(&component_factory, dependency);
            }
        }

        for component in &chain {
            for module in &component.modules {
                if self.module_owner.contains_key(module) {
                    continue;
                }
                self.module_owner
                    .insert(module.clone(), component.type_data.clone());
                self.index_module_bindings(module);
            }
        }
    }

    fn index_dependency_methods(
        &mut self,
        component_factory: &ComponentBindingFactory,
        dependency: &TypeData,
    ) {
        let Some(element) = self.model.type_element(dependency) else {
            return;
        };
        for method in self.model.enclosed_of_kind(element, ElementKind::Method) {
            let data = self.model.element(method);
            if data.has_modifier(Modifier::Static)
                || !self.model.parameters(method).is_empty()
                || data.type_data.kind == TypeKind::Void
            {
                continue;
            }
            match component_factory.for_dependency_method(self.model, dependency, method) {
                Ok(binding) => self.push_explicit(binding),
                Err(kind) => {
                    let key = self.key_factory.for_type(&data.type_data);
                    self.malformed.entry(key).or_insert(kind);
                }
            }
        }
    }

    fn index_module_bindings(&mut self, module: &TypeData) {
        let Some(element) = self.model.type_element(module) else {
            return;
        };
        for method in self.model.enclosed_of_kind(element, ElementKind::Method) {
            if !ModuleBindingFactory::is_binding_method(self.model, method) {
                continue;
            }
            match self.module_factory.for_method(self.model, module, method) {
                Ok(binding) => self.push_explicit(binding),
                Err(kind) => {
                    // remember the failure under the key a requester would
                    // use, when one can still be derived
                    let return_type = &self.model.element(method).type_data;
                    if return_type.kind != TypeKind::Void {
                        let key = self.key_factory.for_type(return_type);
                        self.malformed.entry(key).or_insert(kind);
                    }
                }
            }
        }
    }

    fn push_explicit(&mut self, binding: Binding) {
        self.explicit
            .entry(binding.key.clone())
            .or_default()
            .push(binding);
    }

    /// Resolves one request, memoized per binding key. The cycle-stack frame
    /// taken here is released on every exit path.
    fn resolve_request(
        &mut self,
        request: &DependencyRequest,
        path: &mut Vec<DependencyRequest>,
    ) -> Result<ResolutionState, InvariantError> {
        let binding_key = request.binding_key.clone();
        if let Some(position) = self
            .cycle_stack
            .iter()
            .position(|f| f.binding_key == binding_key)
        {
            // A loop. It is only a cycle when every edge on it demands an
            // immediate instance; a deferring edge anywhere breaks it.
            let broken = request.kind.breaks_cycles()
                || self.cycle_stack[position + 1..]
                    .iter()
                    .any(|f| f.edge.breaks_cycles());
            return Ok(if broken {
                ResolutionState::Complete
            } else {
                ResolutionState::Cycle
            });
        }
        if let Some(existing) = self.resolved.get(&binding_key) {
            return Ok(existing.state);
        }

        trace!(key = %binding_key.readable(), "resolving");
        self.cycle_stack.push(Frame {
            binding_key: binding_key.clone(),
            edge: request.kind,
        });
        path.push(request.clone());
        // reserve the map slot so keys land in first-encounter order
        self.resolved.insert(
            binding_key.clone(),
            ResolvedBindings {
                binding_key: binding_key.clone(),
                state: ResolutionState::Incomplete,
                bindings: Vec::new(),
                owner: self.descriptor.type_data.clone(),
                request_path: Vec::new(),
            },
        );
        let outcome = self.resolve_uncached(request, path);
        path.pop();
        self.cycle_stack.pop();
        outcome
    }

    fn resolve_uncached(
        &mut self,
        request: &DependencyRequest,
        path: &mut Vec<DependencyRequest>,
    ) -> Result<ResolutionState, InvariantError> {
        let binding_key = &request.binding_key;
        let (bindings, lookup_state) = self.lookup(request);

        let mut dependency_state = ResolutionState::Complete;
        let mut cycle_closing: Option<DependencyRequest> = None;
        for binding in &bindings {
            for dependency in binding.implicit_dependencies().cloned().collect::<Vec<_>>() {
                let state = self.resolve_request(&dependency, path)?;
                if state == ResolutionState::Cycle
                    && !dependency.kind.breaks_cycles()
                    && cycle_closing.is_none()
                {
                    cycle_closing = Some(dependency.clone());
                }
                dependency_state = combine(dependency_state, state, dependency.kind);
            }
        }

        let override_state = match lookup_state {
            Some(state) => Some(state),
            None => self.validate_candidates(binding_key, &bindings)?,
        };
        let state = override_state.unwrap_or(dependency_state);

        let request_path = match state {
            ResolutionState::Missing | ResolutionState::Malformed => path.clone(),
            ResolutionState::Cycle => {
                let mut chain = path.clone();
                chain.extend(cycle_closing);
                chain
            }
            _ => Vec::new(),
        };
        let owner = self.owner_of(&bindings);
        self.resolved.insert(
            binding_key.clone(),
            ResolvedBindings {
                binding_key: binding_key.clone(),
                state,
                bindings,
                owner,
                request_path,
            },
        );
        Ok(state)
    }

    /// Candidate bindings for a key, together with an overriding state when
    /// lookup already knows the outcome (a malformed declaration).
    fn lookup(
        &mut self,
        request: &DependencyRequest,
    ) -> (Vec<Binding>, Option<ResolutionState>) {
        let binding_key = &request.binding_key;
        match binding_key.kind {
            BindingKeyKind::MembersInjection => {
                let binding = self
                    .registry
                    .get_or_find_members_injection(self.model, &binding_key.key);
                if !matches!(
                    &binding.kind,
                    BindingKind::MembersInjection { injection_sites, .. }
                        if injection_sites.is_empty()
                ) {
                    self.registry.mark_for_emission(&binding);
                }
                (vec![binding], None)
            }
            BindingKeyKind::Contribution => {
                let key = &binding_key.key;
                if let Some(kind) = self.malformed.get(key) {
                    debug!(key = %key.readable(), error = %kind, "malformed declaration");
                    return (Vec::new(), Some(ResolutionState::Malformed));
                }
                let mut candidates = self.explicit.get(key).cloned().unwrap_or_default();
                if let Some(provider_form) = self.key_factory.implicit_map_provider_key(key) {
                    if candidates.is_empty() {
                        let synthetic = multibinding::map_of_provider(
                            &self.request_factory,
                            key,
                            provider_form,
                            request.anchor,
                        );
                        return (vec![synthetic], None);
                    }
                    // an explicit binding for the plain map form collides
                    // with per-entry contributions; union them so the
                    // conflict surfaces
                    candidates
                        .extend(self.explicit.get(&provider_form).cloned().unwrap_or_default());
                }
                if candidates.is_empty() {
                    match self.registry.get_or_find_provision(self.model, key) {
                        Ok(Some(binding)) => {
                            self.registry.mark_for_emission(&binding);
                            candidates.push(binding);
                        }
                        Ok(None) => {}
                        Err(kind) => {
                            self.malformed.insert(key.clone(), kind);
                            return (Vec::new(), Some(ResolutionState::Malformed));
                        }
                    }
                }
                (self.aggregate_multibindings(key, candidates), None)
            }
        }
    }

    /// Collapses a homogeneous set of multibinding contributions into one
    /// aggregate binding. Heterogeneous sets stay as-is for validation to
    /// flag.
    fn aggregate_multibindings(&self, key: &Key, candidates: Vec<Binding>) -> Vec<Binding> {
        if candidates.is_empty()
            || !candidates
                .iter()
                .all(|c| c.contribution_type().is_multibinding())
        {
            return candidates;
        }
        let first = candidates[0].contribution_type();
        if !candidates
            .iter()
            .all(|c| c.contribution_type().aggregates_with(first))
        {
            return candidates;
        }
        vec![multibinding::multibinding(key, candidates)]
    }

    /// Overriding state for an ill-formed candidate set, `None` when the set
    /// is fine and the dependency state decides.
    fn validate_candidates(
        &self,
        binding_key: &BindingKey,
        bindings: &[Binding],
    ) -> Result<Option<ResolutionState>, InvariantError> {
        for binding in bindings {
            let is_members = matches!(binding.kind, BindingKind::MembersInjection { .. });
            match binding_key.kind {
                BindingKeyKind::Contribution if is_members => {
                    return Err(InvariantError::new(format!(
                        "members-injection binding under contribution key {}",
                        binding_key.readable()
                    )));
                }
                BindingKeyKind::MembersInjection if !is_members => {
                    return Err(InvariantError::new(format!(
                        "contribution binding under members-injection key {}",
                        binding_key.readable()
                    )));
                }
                _ => {}
            }
        }
        if bindings.is_empty() {
            return Ok(Some(ResolutionState::Missing));
        }
        if bindings.len() > 1 {
            let all_unique = bindings
                .iter()
                .all(|b| b.contribution_type() == crate::bindings::ContributionType::Unique);
            if all_unique || binding_key.kind == BindingKeyKind::MembersInjection {
                return Ok(Some(ResolutionState::DuplicateBindings));
            }
            return Ok(Some(ResolutionState::MultipleBindingKinds));
        }
        Ok(None)
    }

    /// The component a binding belongs to: the one that installed its
    /// module, declared its dependency, or declared the scope it carries.
    fn owner_of(&self, bindings: &[Binding]) -> TypeData {
        let own = self.descriptor.type_data.clone();
        let Some(binding) = bindings.first() else {
            return own;
        };
        match &binding.kind {
            BindingKind::Provision { module, .. } | BindingKind::Production { module, .. } => {
                self.module_owner.get(module).cloned().unwrap_or(own)
            }
            BindingKind::Component => self
                .dependency_owner
                .get(&binding.key.type_data)
                .cloned()
                .unwrap_or(own),
            BindingKind::ComponentMethod { dependency } => self
                .dependency_owner
                .get(dependency)
                .cloned()
                .unwrap_or(own),
            BindingKind::Injection => binding
                .scope
                .as_ref()
                .and_then(|scope| {
                    self.scope_owner
                        .iter()
                        .find(|(s, _)| s == scope)
                        .map(|(_, owner)| owner.clone())
                })
                .unwrap_or(own),
            _ => own,
        }
    }
}

fn combine(
    accumulated: ResolutionState,
    dependency: ResolutionState,
    edge: RequestKind,
) -> ResolutionState {
    // a deferring edge tolerates a cycle on the far side
    let effective = if dependency == ResolutionState::Cycle && edge.breaks_cycles() {
        ResolutionState::Complete
    } else {
        dependency
    };
    if accumulated == ResolutionState::Cycle || effective == ResolutionState::Cycle {
        return ResolutionState::Cycle;
    }
    if accumulated == ResolutionState::Complete && effective == ResolutionState::Complete {
        return ResolutionState::Complete;
    }
    ResolutionState::Incomplete
}

/// Whether the missing-binding message should ask for a provider method
/// (abstract or raw-parameterized target) rather than an injection
/// constructor (concrete target).
pub fn missing_because_abstract(model: &SourceModel, key: &Key) -> bool {
    match model.type_element(&key.type_data) {
        Some(element) => {
            let data = model.element(element);
            data.is_abstract() || data.type_data.args.len() != key.type_data.args.len()
        }
        None => true,
    }
}
