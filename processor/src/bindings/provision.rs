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

use crate::bindings::binding::{Binding, BindingKind, ContributionType};
use crate::error::DiagnosticKind;
use crate::keys::KeyFactory;
use crate::requests::DependencyRequestFactory;
use stiletto_common::elements::ElementId;
use stiletto_common::framework;
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::{TypeData, TypeKind};

/// Builds bindings from provider and producer methods declared in modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleBindingFactory {
    key_factory: KeyFactory,
    request_factory: DependencyRequestFactory,
}

impl ModuleBindingFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Whether `method` declares a binding at all.
    pub fn is_binding_method(model: &SourceModel, method: ElementId) -> bool {
        let element = model.element(method);
        element.has_annotation(markers::PROVIDES) || element.has_annotation(markers::PRODUCES)
    }

    pub fn for_method(
        &self,
        model: &SourceModel,
        module_type: &TypeData,
        method: ElementId,
    ) -> Result<Binding, DiagnosticKind> {
        let element = model.element(method);
        let provides = element.has_annotation(markers::PROVIDES);
        let produces = element.has_annotation(markers::PRODUCES);
        if provides && produces {
            return Err(DiagnosticKind::ProvidesAndProduces {
                method: model.qualified_name(method),
            });
        }

        if element.type_data.kind == TypeKind::Void {
            return Err(DiagnosticKind::BindingMethodMustReturnValue {
                method: model.qualified_name(method),
            });
        }
        if produces
            && framework::is_raw_or_wrapped(&element.type_data, framework::FUTURE)
            && element.type_data.args.is_empty()
        {
            return Err(DiagnosticKind::ProducesRawFuture {
                method: model.qualified_name(method),
            });
        }

        let contribution = contribution_type(model, method);
        let key = self
            .key_factory
            .for_binding_method(model, method, contribution, produces)?;
        let map_key = match contribution {
            ContributionType::Map => model.map_keys_of(method).into_iter().next(),
            _ => None,
        };

        let mut explicit_dependencies = Vec::new();
        for parameter in model.parameters(method) {
            explicit_dependencies.push(self.request_factory.for_site(model, parameter, produces)?);
        }

        let kind = if produces {
            BindingKind::Production {
                module: module_type.clone(),
                contribution,
                map_key,
            }
        } else {
            BindingKind::Provision {
                module: module_type.clone(),
                contribution,
                map_key,
            }
        };
        Ok(Binding {
            key,
            origin: method,
            explicit_dependencies,
            framework_dependencies: Vec::new(),
            scope: model.scopes_of(method).into_iter().next(),
            package: Some(model.package_of(method)),
            nullable: element.has_annotation(markers::NULLABLE),
            unresolved: None,
            kind,
        })
    }
}

fn contribution_type(model: &SourceModel, method: ElementId) -> ContributionType {
    let element = model.element(method);
    if element.has_annotation(markers::INTO_SET) {
        ContributionType::Set
    } else if element.has_annotation(markers::ELEMENTS_INTO_SET) {
        ContributionType::SetValues
    } else if element.has_annotation(markers::INTO_MAP) {
        ContributionType::Map
    } else {
        ContributionType::Unique
    }
}
