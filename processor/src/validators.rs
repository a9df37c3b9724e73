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

//! Shape checks on individual annotated elements, run before any graph is
//! built. A violation stops that element's advancement into later phases
//! but never affects its siblings.

use crate::error::{DiagnosticItem, DiagnosticKind, Messager};
use crate::options::ProcessorOptions;
use stiletto_common::elements::{ElementId, ElementKind, Modifier};
use stiletto_common::framework;
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeKind;

pub struct SourceValidator<'a> {
    model: &'a SourceModel,
    options: &'a ProcessorOptions,
}

impl<'a> SourceValidator<'a> {
    pub fn new(model: &'a SourceModel, options: &'a ProcessorOptions) -> Self {
        SourceValidator { model, options }
    }

    pub fn validate_inject_constructor(
        &self,
        constructor: ElementId,
        messager: &mut dyn Messager,
    ) -> bool {
        let mut clean = true;
        let data = self.model.element(constructor);
        let Some(enclosing) = self.model.enclosing_type(constructor) else {
            return false;
        };
        let enclosing_data = self.model.element(enclosing);

        if enclosing_data.is_abstract() {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::InjectConstructorOnAbstractType {
                    type_path: enclosing_data.type_data.readable(),
                }
                .to_string(),
                constructor,
            ));
            clean = false;
        }
        if data.has_modifier(Modifier::Private) {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::InjectOnPrivateConstructor.to_string(),
                constructor,
            ));
            clean = false;
        }
        let inject_constructors = self
            .model
            .enclosed_of_kind(enclosing, ElementKind::Constructor)
            .into_iter()
            .filter(|c| self.model.element(*c).has_annotation(markers::INJECT))
            .count();
        if inject_constructors > 1 {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::MultipleInjectConstructors {
                    type_path: enclosing_data.type_data.readable(),
                }
                .to_string(),
                constructor,
            ));
            clean = false;
        }
        if !self.model.qualifiers_of(constructor).is_empty() {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::QualifierOnConstructor {
                    type_path: enclosing_data.type_data.readable(),
                }
                .to_string(),
                constructor,
            ));
            clean = false;
        }
        for parameter in self.model.parameters(constructor) {
            clean &= self.validate_request_site(parameter, false, messager);
        }
        clean
    }

    pub fn validate_inject_field(&self, field: ElementId, messager: &mut dyn Messager) -> bool {
        let mut clean = true;
        let data = self.model.element(field);
        if data.has_modifier(Modifier::Private) {
            messager.report(DiagnosticItem {
                severity: self.options.private_member_validation,
                message: DiagnosticKind::InjectOnPrivateMember {
                    member: self.model.qualified_name(field),
                }
                .to_string(),
                anchor: field,
                sub_anchor: None,
            });
            clean = self.options.private_member_validation != crate::error::Severity::Error;
        }
        if data.has_modifier(Modifier::Static) {
            messager.report(DiagnosticItem {
                severity: self.options.static_member_validation,
                message: DiagnosticKind::InjectOnStaticMember {
                    member: self.model.qualified_name(field),
                }
                .to_string(),
                anchor: field,
                sub_anchor: None,
            });
            clean &= self.options.static_member_validation != crate::error::Severity::Error;
        }
        clean & self.validate_request_site(field, false, messager)
    }

    pub fn validate_inject_method(&self, method: ElementId, messager: &mut dyn Messager) -> bool {
        let mut clean = true;
        let data = self.model.element(method);
        if data.has_modifier(Modifier::Abstract) {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::AbstractInjectMethod.to_string(),
                method,
            ));
            clean = false;
        }
        if data.has_modifier(Modifier::Private) {
            messager.report(DiagnosticItem {
                severity: self.options.private_member_validation,
                message: DiagnosticKind::InjectOnPrivateMember {
                    member: self.model.qualified_name(method),
                }
                .to_string(),
                anchor: method,
                sub_anchor: None,
            });
            clean &= self.options.private_member_validation != crate::error::Severity::Error;
        }
        if data.has_modifier(Modifier::Static) {
            messager.report(DiagnosticItem {
                severity: self.options.static_member_validation,
                message: DiagnosticKind::InjectOnStaticMember {
                    member: self.model.qualified_name(method),
                }
                .to_string(),
                anchor: method,
                sub_anchor: None,
            });
            clean &= self.options.static_member_validation != crate::error::Severity::Error;
        }
        for parameter in self.model.parameters(method) {
            clean &= self.validate_request_site(parameter, false, messager);
        }
        clean
    }

    /// Validates every binding method declared by a module.
    pub fn validate_module(&self, module: ElementId, messager: &mut dyn Messager) -> bool {
        let mut clean = true;
        for method in self.model.enclosed_of_kind(module, ElementKind::Method) {
            let data = self.model.element(method);
            let provides = data.has_annotation(markers::PROVIDES);
            let produces = data.has_annotation(markers::PRODUCES);
            if provides || produces {
                clean &= self.validate_binding_method(method, provides, produces, messager);
            }
        }
        clean
    }

    fn validate_binding_method(
        &self,
        method: ElementId,
        provides: bool,
        produces: bool,
        messager: &mut dyn Messager,
    ) -> bool {
        let mut clean = true;
        let data = self.model.element(method);
        let name = self.model.qualified_name(method);

        if provides && produces {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::ProvidesAndProduces {
                    method: name.clone(),
                }
                .to_string(),
                method,
            ));
            clean = false;
        }
        if data.type_data.kind == TypeKind::Void {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::BindingMethodMustReturnValue {
                    method: name.clone(),
                }
                .to_string(),
                method,
            ));
            clean = false;
        }
        if produces
            && framework::is_raw_or_wrapped(&data.type_data, framework::FUTURE)
            && data.type_data.args.is_empty()
        {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::ProducesRawFuture {
                    method: name.clone(),
                }
                .to_string(),
                method,
            ));
            clean = false;
        }
        if data.has_annotation(markers::ELEMENTS_INTO_SET)
            && !framework::is_wrapper_of(&data.type_data, framework::SET)
        {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::ProvidesSetValuesReturnSet {
                    method: name.clone(),
                }
                .to_string(),
                method,
            ));
            clean = false;
        }
        if data.has_annotation(markers::INTO_MAP) {
            let map_keys = self.model.map_keys_of(method);
            match map_keys.len() {
                0 => {
                    messager.report(DiagnosticItem::error(
                        DiagnosticKind::MissingMapKey {
                            method: name.clone(),
                        }
                        .to_string(),
                        method,
                    ));
                    clean = false;
                }
                1 => {
                    if map_keys[0].values.len() != 1 {
                        messager.report(DiagnosticItem::error(
                            DiagnosticKind::MalformedMapKey {
                                method: name.clone(),
                            }
                            .to_string(),
                            method,
                        ));
                        clean = false;
                    }
                }
                _ => {
                    messager.report(DiagnosticItem::error(
                        DiagnosticKind::MultipleMapKeys {
                            method: name.clone(),
                        }
                        .to_string(),
                        method,
                    ));
                    clean = false;
                }
            }
        }
        if self.model.qualifiers_of(method).len() > 1 {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::MultipleQualifiers { site: name }.to_string(),
                method,
            ));
            clean = false;
        }
        for parameter in self.model.parameters(method) {
            clean &= self.validate_request_site(parameter, produces, messager);
        }
        clean
    }

    /// Builder methods are setters returning the builder (or nothing), plus
    /// one zero-argument method building the component.
    pub fn validate_builder(
        &self,
        builder: ElementId,
        component_type: &stiletto_common::type_data::TypeData,
        messager: &mut dyn Messager,
    ) -> bool {
        let mut clean = true;
        let builder_type = &self.model.element(builder).type_data;
        for method in self.model.enclosed_of_kind(builder, ElementKind::Method) {
            let data = self.model.element(method);
            if !data.is_abstract() {
                continue;
            }
            let parameters = self.model.parameters(method);
            let returns_builder = data.type_data.is_same_type(builder_type)
                || data.type_data.kind == TypeKind::Void;
            let is_setter = parameters.len() == 1 && returns_builder;
            let is_build = parameters.is_empty() && data.type_data.is_same_type(component_type);
            if !is_setter && !is_build {
                messager.report(DiagnosticItem::error(
                    DiagnosticKind::MalformedBuilderMethod {
                        method: self.model.qualified_name(method),
                    }
                    .to_string(),
                    method,
                ));
                clean = false;
            }
        }
        clean
    }

    /// Checks common to every request site: qualifier multiplicity, scope
    /// misuse, and the provision/production boundary.
    fn validate_request_site(
        &self,
        site: ElementId,
        production: bool,
        messager: &mut dyn Messager,
    ) -> bool {
        let mut clean = true;
        if self.model.qualifiers_of(site).len() > 1 {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::MultipleQualifiers {
                    site: self.model.qualified_name(site),
                }
                .to_string(),
                site,
            ));
            clean = false;
        }
        if !self.model.scopes_of(site).is_empty() {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::ScopeOnNonBindingSite {
                    site: self.model.qualified_name(site),
                }
                .to_string(),
                site,
            ));
            clean = false;
        }
        let site_type = &self.model.element(site).type_data;
        let is_production_request = framework::PRODUCTION_WRAPPERS
            .iter()
            .any(|wrapper| framework::is_wrapper_of(site_type, wrapper));
        if is_production_request && !production {
            messager.report(DiagnosticItem::error(
                DiagnosticKind::ProvisionDependsOnProducer {
                    site: self.model.qualified_name(site),
                }
                .to_string(),
                site,
            ));
            clean = false;
        }
        clean
    }
}
