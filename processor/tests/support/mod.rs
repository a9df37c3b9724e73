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

//! Builds in-memory source models the way a host front end would, so the
//! pipeline can be driven end to end without one.

#![allow(dead_code)]

use stiletto_common::elements::{
    AnnotationData, AnnotationValue, ElementData, ElementId, ElementKind, Modifier,
};
use stiletto_common::framework::markers;
use stiletto_common::source_model::{SourceModel, SourceModelBuilder};
use stiletto_common::type_data::TypeData;

pub struct ModelFixture {
    builder: SourceModelBuilder,
}

fn simple_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap()
}

impl ModelFixture {
    pub fn new() -> Self {
        ModelFixture {
            builder: SourceModelBuilder::new(),
        }
    }

    pub fn build(self) -> SourceModel {
        self.builder.build().expect("fixture model must build")
    }

    fn type_element(&mut self, kind: ElementKind, path: &str) -> ElementId {
        let mut data = ElementData::new(kind, simple_name(path));
        data.type_data = TypeData::global(path);
        self.builder.add(None, data)
    }

    pub fn class(&mut self, path: &str) -> ElementId {
        self.type_element(ElementKind::Class, path)
    }

    pub fn generic_class(&mut self, path: &str, type_params: &[&str]) -> ElementId {
        let mut data = ElementData::new(ElementKind::Class, simple_name(path));
        data.type_data = TypeData::global_with_args(
            path,
            type_params
                .iter()
                .map(|name| TypeData::type_variable(name))
                .collect(),
        );
        self.builder.add(None, data)
    }

    pub fn interface(&mut self, path: &str) -> ElementId {
        self.type_element(ElementKind::Interface, path)
    }

    pub fn abstract_class(&mut self, path: &str) -> ElementId {
        let id = self.type_element(ElementKind::Class, path);
        self.builder.element_mut(id).modifiers.push(Modifier::Abstract);
        id
    }

    pub fn set_superclass(&mut self, class: ElementId, superclass: &TypeData) {
        self.builder.element_mut(class).superclass = Some(superclass.clone());
    }

    pub fn annotate(&mut self, element: ElementId, annotation: AnnotationData) {
        self.builder.element_mut(element).annotations.push(annotation);
    }

    pub fn add_modifier(&mut self, element: ElementId, modifier: Modifier) {
        self.builder.element_mut(element).modifiers.push(modifier);
    }

    /// Declares an annotation type carrying the qualifier meta-marker.
    pub fn qualifier_type(&mut self, path: &str) -> ElementId {
        let id = self.type_element(ElementKind::AnnotationType, path);
        self.annotate(id, AnnotationData::marker(markers::QUALIFIER));
        id
    }

    /// Declares an annotation type carrying the scope meta-marker.
    pub fn scope_type(&mut self, path: &str) -> ElementId {
        let id = self.type_element(ElementKind::AnnotationType, path);
        self.annotate(id, AnnotationData::marker(markers::SCOPE));
        id
    }

    /// Declares an annotation type carrying the map-key meta-marker.
    pub fn map_key_type(&mut self, path: &str) -> ElementId {
        let id = self.type_element(ElementKind::AnnotationType, path);
        self.annotate(id, AnnotationData::marker(markers::MAP_KEY));
        id
    }

    pub fn inject_constructor(&mut self, class: ElementId, params: &[TypeData]) -> ElementId {
        let mut data = ElementData::new(ElementKind::Constructor, "new");
        data.type_data = TypeData::void();
        data.annotations.push(AnnotationData::marker(markers::INJECT));
        let constructor = self.builder.add(Some(class), data);
        for (index, param) in params.iter().enumerate() {
            self.parameter(constructor, &format!("p{}", index), param);
        }
        constructor
    }

    pub fn parameter(&mut self, owner: ElementId, name: &str, type_data: &TypeData) -> ElementId {
        let mut data = ElementData::new(ElementKind::Parameter, name);
        data.type_data = type_data.clone();
        self.builder.add(Some(owner), data)
    }

    pub fn field(&mut self, class: ElementId, name: &str, type_data: &TypeData) -> ElementId {
        let mut data = ElementData::new(ElementKind::Field, name);
        data.type_data = type_data.clone();
        self.builder.add(Some(class), data)
    }

    pub fn inject_field(&mut self, class: ElementId, name: &str, type_data: &TypeData) -> ElementId {
        let field = self.field(class, name, type_data);
        self.annotate(field, AnnotationData::marker(markers::INJECT));
        field
    }

    pub fn method(
        &mut self,
        owner: ElementId,
        name: &str,
        return_type: &TypeData,
        params: &[TypeData],
    ) -> ElementId {
        let mut data = ElementData::new(ElementKind::Method, name);
        data.type_data = return_type.clone();
        let method = self.builder.add(Some(owner), data);
        for (index, param) in params.iter().enumerate() {
            self.parameter(method, &format!("p{}", index), param);
        }
        method
    }

    /// A module type; `includes` are expanded transitively by the component
    /// descriptor factory.
    pub fn module(&mut self, path: &str, includes: &[TypeData]) -> ElementId {
        let id = self.type_element(ElementKind::Class, path);
        let mut annotation = AnnotationData::marker(markers::MODULE);
        if !includes.is_empty() {
            annotation = annotation.with_value(
                "includes",
                AnnotationValue::Array(
                    includes
                        .iter()
                        .map(|t| AnnotationValue::Type(t.clone()))
                        .collect(),
                ),
            );
        }
        self.annotate(id, annotation);
        id
    }

    pub fn provides(
        &mut self,
        module: ElementId,
        name: &str,
        return_type: &TypeData,
        params: &[TypeData],
    ) -> ElementId {
        let method = self.method(module, name, return_type, params);
        self.annotate(method, AnnotationData::marker(markers::PROVIDES));
        method
    }

    pub fn produces(
        &mut self,
        module: ElementId,
        name: &str,
        return_type: &TypeData,
        params: &[TypeData],
    ) -> ElementId {
        let method = self.method(module, name, return_type, params);
        self.annotate(method, AnnotationData::marker(markers::PRODUCES));
        method
    }

    pub fn component(
        &mut self,
        path: &str,
        modules: &[TypeData],
        dependencies: &[TypeData],
    ) -> ElementId {
        self.component_of_kind(path, markers::COMPONENT, modules, dependencies)
    }

    pub fn subcomponent(&mut self, path: &str, modules: &[TypeData]) -> ElementId {
        self.component_of_kind(path, markers::SUBCOMPONENT, modules, &[])
    }

    pub fn production_component(&mut self, path: &str, modules: &[TypeData]) -> ElementId {
        self.component_of_kind(path, markers::PRODUCTION_COMPONENT, modules, &[])
    }

    fn component_of_kind(
        &mut self,
        path: &str,
        marker: &str,
        modules: &[TypeData],
        dependencies: &[TypeData],
    ) -> ElementId {
        let id = self.type_element(ElementKind::Interface, path);
        let mut annotation = AnnotationData::marker(marker);
        if !modules.is_empty() {
            annotation = annotation.with_value(
                "modules",
                AnnotationValue::Array(
                    modules
                        .iter()
                        .map(|t| AnnotationValue::Type(t.clone()))
                        .collect(),
                ),
            );
        }
        if !dependencies.is_empty() {
            annotation = annotation.with_value(
                "dependencies",
                AnnotationValue::Array(
                    dependencies
                        .iter()
                        .map(|t| AnnotationValue::Type(t.clone()))
                        .collect(),
                ),
            );
        }
        self.annotate(id, annotation);
        id
    }

    /// An abstract component method, i.e. an entry point or subcomponent
    /// factory method.
    pub fn entry_point(
        &mut self,
        component: ElementId,
        name: &str,
        return_type: &TypeData,
    ) -> ElementId {
        let method = self.method(component, name, return_type, &[]);
        self.add_modifier(method, Modifier::Abstract);
        method
    }

    /// An abstract `void inject(target)` members-injection method.
    pub fn members_injection_method(
        &mut self,
        component: ElementId,
        name: &str,
        target: &TypeData,
    ) -> ElementId {
        let method = self.method(component, name, &TypeData::void(), &[target.clone()]);
        self.add_modifier(method, Modifier::Abstract);
        method
    }
}
