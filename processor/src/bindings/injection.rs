/*
Copyright 2021 Google LLC

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

use crate::bindings::binding::{Binding, BindingKind, InjectionSite, InjectionSiteKind};
use crate::error::DiagnosticKind;
use crate::keys::{Key, KeyFactory};
use crate::requests::{DependencyRequest, DependencyRequestFactory, RequestKind};
use std::collections::HashMap;
use stiletto_common::elements::{ElementId, ElementKind, Modifier};
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeData;

/// Builds implicit bindings from constructor-injected types and
/// members-injected types.
#[derive(Debug, Default, Clone, Copy)]
pub struct InjectionBindingFactory {
    key_factory: KeyFactory,
    request_factory: DependencyRequestFactory,
}

impl InjectionBindingFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Binding for a marked injection constructor, in its declared (possibly
    /// generic) form.
    pub fn for_constructor(
        &self,
        model: &SourceModel,
        constructor: ElementId,
    ) -> Result<Binding, DiagnosticKind> {
        let key = self.key_factory.for_inject_constructor(model, constructor)?;
        let enclosing = model
            .enclosing_type(constructor)
            .expect("injection constructor outside of a type");
        let mut explicit_dependencies = Vec::new();
        for parameter in model.parameters(constructor) {
            explicit_dependencies.push(self.request_factory.for_site(model, parameter, false)?);
        }
        Ok(Binding {
            key,
            origin: constructor,
            explicit_dependencies,
            framework_dependencies: Vec::new(),
            scope: model.scopes_of(enclosing).into_iter().next(),
            package: Some(model.package_of(constructor)),
            nullable: false,
            unresolved: None,
            kind: BindingKind::Injection,
        })
    }

    /// Attempts to materialize an injection binding for `key` on demand.
    ///
    /// Only unqualified keys on concrete declared types can succeed. A
    /// parameterized declaration used with matching type arguments yields a
    /// substituted binding whose `unresolved` slot points at the declared
    /// form; a raw use (argument count mismatch) yields nothing.
    pub fn try_for_key(
        &self,
        model: &SourceModel,
        key: &Key,
    ) -> Result<Option<Binding>, DiagnosticKind> {
        if key.qualifier.is_some() {
            return Ok(None);
        }
        let Some(type_id) = model.type_element(&key.type_data) else {
            return Ok(None);
        };
        let type_element = model.element(type_id);
        if type_element.is_abstract() || type_element.kind != ElementKind::Class {
            return Ok(None);
        }
        let Some(constructor) = injection_constructor(model, type_id) else {
            return Ok(None);
        };
        let declared_type = &type_element.type_data;
        if key.type_data.args.len() != declared_type.args.len() {
            // raw use of a parameterized type
            return Ok(None);
        }
        let declared = self.for_constructor(model, constructor)?;
        if declared_type.args.is_empty() {
            return Ok(Some(declared));
        }
        let assignments = type_variable_assignments(declared_type, &key.type_data);
        let mut resolved = declared.clone();
        resolved.key = key.clone();
        resolved.explicit_dependencies = substitute_requests(
            model,
            &self.request_factory,
            constructor,
            &assignments,
            false,
        )?;
        resolved.unresolved = Some(Box::new(declared));
        Ok(Some(resolved))
    }

    /// Binding that populates `key`'s injection sites. Always yields a
    /// binding; a type with no sites gets an empty one.
    pub fn members_injection_for_key(&self, model: &SourceModel, key: &Key) -> Binding {
        let Some(type_id) = model.type_element(&key.type_data) else {
            return self.empty_members_injection(key);
        };
        let type_element = model.element(type_id);
        let assignments = type_variable_assignments(&type_element.type_data, &key.type_data);

        let mut injection_sites = Vec::new();
        for member in &type_element.enclosed {
            let element = model.element(*member);
            if !element.has_annotation(markers::INJECT) {
                continue;
            }
            match element.kind {
                ElementKind::Field => {
                    let site_type = element.type_data.substitute(&assignments);
                    if let Ok(request) = self.request_factory.for_site_with_type(
                        model,
                        *member,
                        &site_type,
                        false,
                    ) {
                        injection_sites.push(InjectionSite {
                            kind: InjectionSiteKind::Field,
                            element: *member,
                            requests: vec![request],
                        });
                    }
                }
                ElementKind::Method => {
                    let mut requests = Vec::new();
                    for parameter in model.parameters(*member) {
                        let site_type =
                            model.element(parameter).type_data.substitute(&assignments);
                        if let Ok(request) = self.request_factory.for_site_with_type(
                            model,
                            parameter,
                            &site_type,
                            false,
                        ) {
                            requests.push(request);
                        }
                    }
                    injection_sites.push(InjectionSite {
                        kind: InjectionSiteKind::Method,
                        element: *member,
                        requests,
                    });
                }
                _ => {}
            }
        }

        let parent_key = type_element
            .superclass
            .as_ref()
            .map(|superclass| self.key_factory.for_members_injection(superclass));
        let explicit_dependencies: Vec<DependencyRequest> = injection_sites
            .iter()
            .flat_map(|site| site.requests.iter().cloned())
            .collect();
        let framework_dependencies = parent_key
            .clone()
            .map(|parent| {
                self.request_factory
                    .synthesized(RequestKind::MembersInjector, parent, type_id)
            })
            .into_iter()
            .collect();
        Binding {
            key: key.clone(),
            origin: type_id,
            explicit_dependencies,
            framework_dependencies,
            scope: None,
            package: Some(model.package_of(type_id)),
            nullable: false,
            unresolved: None,
            kind: BindingKind::MembersInjection {
                injection_sites,
                parent_key,
            },
        }
    }

    fn empty_members_injection(&self, key: &Key) -> Binding {
        Binding {
            key: key.clone(),
            origin: ElementId::default(),
            explicit_dependencies: Vec::new(),
            framework_dependencies: Vec::new(),
            scope: None,
            package: None,
            nullable: false,
            unresolved: None,
            kind: BindingKind::MembersInjection {
                injection_sites: Vec::new(),
                parent_key: None,
            },
        }
    }
}

/// The single marked injection constructor of a type, if any. Multiplicity
/// violations are the leaf validators' concern; discovery takes the first.
pub fn injection_constructor(model: &SourceModel, type_id: ElementId) -> Option<ElementId> {
    model
        .enclosed_of_kind(type_id, ElementKind::Constructor)
        .into_iter()
        .find(|c| {
            let element = model.element(*c);
            element.has_annotation(markers::INJECT) && !element.has_modifier(Modifier::Private)
        })
}

fn type_variable_assignments(
    declared: &TypeData,
    requested: &TypeData,
) -> HashMap<String, TypeData> {
    declared
        .args
        .iter()
        .zip(requested.args.iter())
        .map(|(variable, assigned)| (variable.path.clone(), assigned.clone()))
        .collect()
}

fn substitute_requests(
    model: &SourceModel,
    request_factory: &DependencyRequestFactory,
    constructor: ElementId,
    assignments: &HashMap<String, TypeData>,
    production: bool,
) -> Result<Vec<DependencyRequest>, DiagnosticKind> {
    let mut requests = Vec::new();
    for parameter in model.parameters(constructor) {
        let site_type = model.element(parameter).type_data.substitute(assignments);
        requests.push(request_factory.for_site_with_type(
            model,
            parameter,
            &site_type,
            production,
        )?);
    }
    Ok(requests)
}
