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

use crate::error::{DiagnosticItem, DiagnosticKind};
use crate::keys::KeyFactory;
use crate::requests::{DependencyRequest, DependencyRequestFactory, RequestKind};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, ElementId, ElementKind, Modifier};
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::{TypeData, TypeKind};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Component,
    Subcomponent,
    Production,
}

impl ComponentKind {
    pub fn is_production(self) -> bool {
        matches!(self, ComponentKind::Production)
    }
}

/// An abstract component method declaring a top-level request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntryPoint {
    pub method: ElementId,
    pub request: DependencyRequest,
}

/// Parsed shape of one component: its kind, the transitively closed module
/// set, declared dependencies, entry points and eagerly built subcomponent
/// children. Immutable once built.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ComponentDescriptor {
    pub element: ElementId,
    pub type_data: TypeData,
    pub kind: ComponentKind,
    pub scopes: Vec<AnnotationData>,
    /// All installed modules, includes expanded, in discovery order.
    pub modules: IndexSet<TypeData>,
    /// Per declared module, its expanded include closure.
    #[serde(with = "indexmap::map::serde_seq")]
    pub transitive_modules: IndexMap<TypeData, IndexSet<TypeData>>,
    pub dependencies: Vec<TypeData>,
    pub entry_points: Vec<EntryPoint>,
    pub subcomponents: Vec<ComponentDescriptor>,
    pub builder: Option<ElementId>,
}

/// Reads component interfaces into [`ComponentDescriptor`]s.
pub struct ComponentDescriptorFactory<'a> {
    model: &'a SourceModel,
    key_factory: KeyFactory,
    request_factory: DependencyRequestFactory,
}

impl<'a> ComponentDescriptorFactory<'a> {
    pub fn new(model: &'a SourceModel) -> Self {
        ComponentDescriptorFactory {
            model,
            key_factory: KeyFactory::new(),
            request_factory: DependencyRequestFactory::new(),
        }
    }

    /// Kind of the component `element` declares, if any.
    pub fn component_kind(model: &SourceModel, element: ElementId) -> Option<ComponentKind> {
        let data = model.element(element);
        if data.has_annotation(markers::COMPONENT) {
            Some(ComponentKind::Component)
        } else if data.has_annotation(markers::PRODUCTION_COMPONENT) {
            Some(ComponentKind::Production)
        } else if data.has_annotation(markers::SUBCOMPONENT) {
            Some(ComponentKind::Subcomponent)
        } else {
            None
        }
    }

    /// Builds the descriptor tree rooted at `element`, or every structural
    /// problem found on the way.
    pub fn for_component(
        &self,
        element: ElementId,
    ) -> Result<ComponentDescriptor, Vec<DiagnosticItem>> {
        let Some(kind) = Self::component_kind(self.model, element) else {
            return Err(vec![DiagnosticItem::error(
                format!(
                    "{} is not a component",
                    self.model.qualified_name(element)
                ),
                element,
            )]);
        };
        let mut errors = Vec::new();
        let data = self.model.element(element);
        let type_data = data.type_data.clone();

        let annotation = component_annotation(self.model, element, kind);
        let declared_modules = annotation
            .as_ref()
            .and_then(|a| a.value("modules"))
            .map(|v| v.as_types())
            .unwrap_or_default();
        let dependencies = annotation
            .as_ref()
            .and_then(|a| a.value("dependencies"))
            .map(|v| v.as_types())
            .unwrap_or_default();

        let (modules, transitive_modules) =
            self.collect_modules(element, &declared_modules, &mut errors);

        let mut entry_points = Vec::new();
        let mut subcomponents = Vec::new();
        for method in self
            .model
            .enclosed_of_kind(element, ElementKind::Method)
        {
            let method_data = self.model.element(method);
            if method_data.has_modifier(Modifier::Static) || !method_data.is_abstract() {
                continue;
            }
            if let Some(child) = self.subcomponent_target(method) {
                match self.for_component(child) {
                    Ok(descriptor) => subcomponents.push(descriptor),
                    Err(child_errors) => errors.extend(child_errors),
                }
                continue;
            }
            match self.entry_point(method, kind) {
                Ok(entry_point) => entry_points.push(entry_point),
                Err(kind) => errors.push(DiagnosticItem::error(kind.to_string(), method)),
            }
        }

        let builder = self
            .model
            .element(element)
            .enclosed
            .iter()
            .copied()
            .find(|e| self.model.element(*e).has_annotation(markers::COMPONENT_BUILDER));

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ComponentDescriptor {
            element,
            type_data,
            kind,
            scopes: self.model.scopes_of(element),
            modules,
            transitive_modules,
            dependencies,
            entry_points,
            subcomponents,
            builder,
        })
    }

    /// Expands `includes` chains into a closed, insertion-ordered set.
    fn collect_modules(
        &self,
        requester: ElementId,
        declared: &[TypeData],
        errors: &mut Vec<DiagnosticItem>,
    ) -> (IndexSet<TypeData>, IndexMap<TypeData, IndexSet<TypeData>>) {
        let mut all = IndexSet::new();
        let mut transitive = IndexMap::new();
        for module in declared {
            let mut closure = IndexSet::new();
            self.expand_module(requester, module, &mut closure, errors);
            all.extend(closure.iter().cloned());
            transitive.insert(module.clone(), closure);
        }
        (all, transitive)
    }

    fn expand_module(
        &self,
        requester: ElementId,
        module: &TypeData,
        closure: &mut IndexSet<TypeData>,
        errors: &mut Vec<DiagnosticItem>,
    ) {
        if closure.contains(module) {
            return;
        }
        let Some(module_element) = self.model.type_element(module) else {
            errors.push(DiagnosticItem::error(
                DiagnosticKind::ModuleNotFound {
                    module: module.readable(),
                    requester: self.model.qualified_name(requester),
                }
                .to_string(),
                requester,
            ));
            return;
        };
        let Some(annotation) = self.model.element(module_element).annotation(markers::MODULE)
        else {
            errors.push(DiagnosticItem::error(
                DiagnosticKind::NotAModule {
                    type_path: module.readable(),
                }
                .to_string(),
                module_element,
            ));
            return;
        };
        closure.insert(module.clone());
        let includes = annotation
            .value("includes")
            .map(|v| v.as_types())
            .unwrap_or_default();
        for included in includes {
            self.expand_module(module_element, &included, closure, errors);
        }
    }

    /// The subcomponent type a factory method returns, if that is what the
    /// method is.
    fn subcomponent_target(&self, method: ElementId) -> Option<ElementId> {
        let return_type = &self.model.element(method).type_data;
        if return_type.kind != TypeKind::Declared {
            return None;
        }
        let target = self.model.type_element(return_type)?;
        self.model
            .element(target)
            .has_annotation(markers::SUBCOMPONENT)
            .then_some(target)
    }

    /// Classifies an abstract component method as a provision or
    /// members-injection entry point.
    fn entry_point(
        &self,
        method: ElementId,
        kind: ComponentKind,
    ) -> Result<EntryPoint, DiagnosticKind> {
        let method_data = self.model.element(method);
        let parameters = self.model.parameters(method);
        let return_type = &method_data.type_data;

        if parameters.is_empty() && return_type.kind != TypeKind::Void {
            let request =
                self.request_factory
                    .for_site(self.model, method, kind.is_production())?;
            return Ok(EntryPoint { method, request });
        }
        if parameters.len() == 1 {
            let parameter_type = &self.model.element(parameters[0]).type_data;
            let returns_self = return_type.is_same_type(parameter_type);
            if return_type.kind == TypeKind::Void || returns_self {
                let key = self.key_factory.for_members_injection(parameter_type);
                let request =
                    self.request_factory
                        .synthesized(RequestKind::MembersInjector, key, method);
                return Ok(EntryPoint { method, request });
            }
        }
        Err(DiagnosticKind::MalformedComponentMethod {
            method: self.model.qualified_name(method),
        })
    }
}

fn component_annotation(
    model: &SourceModel,
    element: ElementId,
    kind: ComponentKind,
) -> Option<AnnotationData> {
    let marker = match kind {
        ComponentKind::Component => markers::COMPONENT,
        ComponentKind::Production => markers::PRODUCTION_COMPONENT,
        ComponentKind::Subcomponent => markers::SUBCOMPONENT,
    };
    model.element(element).annotation(marker).cloned()
}
