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

use crate::bindings::binding::{Binding, BindingKind};
use crate::error::DiagnosticKind;
use crate::keys::KeyFactory;
use stiletto_common::elements::ElementId;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeData;

/// Builds the bindings a component carries by virtue of existing: itself,
/// its declared dependencies, and their provision methods.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentBindingFactory {
    key_factory: KeyFactory,
}

impl ComponentBindingFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// The component (or a declared component dependency) as a binding of
    /// its own interface. No dependencies.
    pub fn for_instance(&self, type_data: &TypeData, origin: ElementId) -> Binding {
        Binding {
            key: self.key_factory.for_type(type_data),
            origin,
            explicit_dependencies: Vec::new(),
            framework_dependencies: Vec::new(),
            scope: None,
            package: None,
            nullable: false,
            unresolved: None,
            kind: BindingKind::Component,
        }
    }

    /// A zero-argument provision method on a declared component dependency.
    pub fn for_dependency_method(
        &self,
        model: &SourceModel,
        dependency: &TypeData,
        method: ElementId,
    ) -> Result<Binding, DiagnosticKind> {
        let qualifiers = model.qualifiers_of(method);
        if qualifiers.len() > 1 {
            return Err(DiagnosticKind::MultipleQualifiers {
                site: model.qualified_name(method),
            });
        }
        let key = self.key_factory.for_qualified(
            qualifiers.into_iter().next(),
            &model.element(method).type_data,
        );
        Ok(Binding {
            key,
            origin: method,
            explicit_dependencies: Vec::new(),
            framework_dependencies: Vec::new(),
            scope: None,
            package: None,
            nullable: false,
            unresolved: None,
            kind: BindingKind::ComponentMethod {
                dependency: dependency.clone(),
            },
        })
    }
}
