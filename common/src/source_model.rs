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

use crate::elements::{AnnotationData, ElementData, ElementId, ElementKind};
use crate::framework::markers;
use crate::type_data::{TypeData, PRIMITIVES};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable table of the host program's elements, with the queries the
/// processor needs. Built once per processing round and never mutated
/// afterwards; every element is addressed by [`ElementId`].
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourceModel {
    elements: Vec<ElementData>,
    type_index: HashMap<String, ElementId>,
}

impl SourceModel {
    pub fn builder() -> SourceModelBuilder {
        SourceModelBuilder::new()
    }

    pub fn element(&self, id: ElementId) -> &ElementData {
        &self.elements[id.0 as usize]
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> {
        (0..self.elements.len() as u32).map(ElementId)
    }

    pub fn enclosing(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).enclosing
    }

    /// Enclosed elements in declaration order, filtered by kind.
    pub fn enclosed_of_kind(&self, id: ElementId, kind: ElementKind) -> Vec<ElementId> {
        self.element(id)
            .enclosed
            .iter()
            .copied()
            .filter(|e| self.element(*e).kind == kind)
            .collect()
    }

    /// Ordered parameters of a method or constructor.
    pub fn parameters(&self, id: ElementId) -> Vec<ElementId> {
        self.enclosed_of_kind(id, ElementKind::Parameter)
    }

    /// The nearest enclosing type element, or the element itself.
    pub fn enclosing_type(&self, id: ElementId) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(e) = current {
            if self.element(e).is_type() {
                return Some(e);
            }
            current = self.element(e).enclosing;
        }
        None
    }

    /// Fully qualified name: the canonical type path for type elements,
    /// `Type.member` for members.
    pub fn qualified_name(&self, id: ElementId) -> String {
        let element = self.element(id);
        if element.is_type() {
            return element.type_data.canonical_string_path();
        }
        match self.enclosing_type(id) {
            Some(type_id) => format!(
                "{}.{}",
                self.element(type_id).type_data.canonical_string_path(),
                element.name
            ),
            None => element.name.clone(),
        }
    }

    /// Package of an element: the path of its enclosing type minus the type
    /// name itself.
    pub fn package_of(&self, id: ElementId) -> String {
        let Some(type_id) = self.enclosing_type(id) else {
            return String::new();
        };
        let erasure = self.element(type_id).type_data.erasure();
        match erasure.rfind("::") {
            Some(split) if split > 0 => erasure[..split].trim_start_matches(':').to_owned(),
            _ => String::new(),
        }
    }

    /// Declaration of a declared type, by erasure.
    pub fn type_element(&self, type_data: &TypeData) -> Option<ElementId> {
        self.type_index.get(&type_data.erasure()).copied()
    }

    /// `Type.method(Args) -> Return` rendering for diagnostics.
    pub fn method_signature(&self, id: ElementId) -> String {
        let element = self.element(id);
        let params = self
            .parameters(id)
            .iter()
            .map(|p| self.element(*p).type_data.readable())
            .collect::<Vec<String>>()
            .join(", ");
        let ret = match element.kind {
            ElementKind::Constructor => String::new(),
            _ => format!(" -> {}", element.type_data.readable()),
        };
        format!("{}({}){}", self.qualified_name(id), params, ret)
    }

    /// Local and inherited members, supertypes first, declaration order
    /// within each type.
    pub fn all_members(&self, type_id: ElementId) -> Vec<ElementId> {
        let mut chain = vec![type_id];
        let mut current = type_id;
        while let Some(super_type) = &self.element(current).superclass {
            match self.type_element(super_type) {
                Some(super_id) => {
                    chain.push(super_id);
                    current = super_id;
                }
                None => break,
            }
        }
        chain
            .iter()
            .rev()
            .flat_map(|t| self.element(*t).enclosed.iter().copied())
            .filter(|e| {
                matches!(
                    self.element(*e).kind,
                    ElementKind::Method | ElementKind::Field
                )
            })
            .collect()
    }

    /// Whether `overrider` overrides `overridden`: same name, same parameter
    /// erasures, and the overrider's type inherits from the overridden's.
    pub fn overrides(&self, overrider: ElementId, overridden: ElementId) -> bool {
        let a = self.element(overrider);
        let b = self.element(overridden);
        if a.kind != ElementKind::Method || b.kind != ElementKind::Method || a.name != b.name {
            return false;
        }
        let a_params = self.parameters(overrider);
        let b_params = self.parameters(overridden);
        if a_params.len() != b_params.len() {
            return false;
        }
        let params_match = a_params.iter().zip(b_params.iter()).all(|(x, y)| {
            self.element(*x)
                .type_data
                .erasure()
                .eq(&self.element(*y).type_data.erasure())
        });
        if !params_match {
            return false;
        }
        let (Some(a_type), Some(b_type)) = (self.enclosing_type(overrider), self.enclosing_type(overridden))
        else {
            return false;
        };
        a_type != b_type && self.inherits_from(a_type, b_type)
    }

    fn inherits_from(&self, type_id: ElementId, ancestor: ElementId) -> bool {
        let mut current = type_id;
        while let Some(super_type) = &self.element(current).superclass {
            match self.type_element(super_type) {
                Some(super_id) if super_id == ancestor => return true,
                Some(super_id) => current = super_id,
                None => return false,
            }
        }
        false
    }

    /// Whether the annotation's type declaration carries the given
    /// meta-marker.
    fn has_meta_marker(&self, annotation: &AnnotationData, marker: &str) -> bool {
        self.type_element(&annotation.type_data)
            .map(|decl| self.element(decl).has_annotation(marker))
            .unwrap_or(false)
    }

    pub fn is_qualifier(&self, annotation: &AnnotationData) -> bool {
        self.has_meta_marker(annotation, markers::QUALIFIER)
    }

    pub fn is_scope(&self, annotation: &AnnotationData) -> bool {
        self.has_meta_marker(annotation, markers::SCOPE)
    }

    pub fn is_map_key(&self, annotation: &AnnotationData) -> bool {
        self.has_meta_marker(annotation, markers::MAP_KEY)
    }

    pub fn qualifiers_of(&self, id: ElementId) -> Vec<AnnotationData> {
        self.element(id)
            .annotations
            .iter()
            .filter(|a| self.is_qualifier(a))
            .cloned()
            .collect()
    }

    pub fn scopes_of(&self, id: ElementId) -> Vec<AnnotationData> {
        self.element(id)
            .annotations
            .iter()
            .filter(|a| self.is_scope(a))
            .cloned()
            .collect()
    }

    pub fn map_keys_of(&self, id: ElementId) -> Vec<AnnotationData> {
        self.element(id)
            .annotations
            .iter()
            .filter(|a| self.is_map_key(a))
            .cloned()
            .collect()
    }
}

/// Accumulates elements, then freezes into an immutable [`SourceModel`].
#[derive(Debug, Default)]
pub struct SourceModelBuilder {
    elements: Vec<ElementData>,
}

impl SourceModelBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds an element, linking it under `parent` when given.
    pub fn add(&mut self, parent: Option<ElementId>, mut data: ElementData) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        data.enclosing = parent;
        self.elements.push(data);
        if let Some(parent) = parent {
            self.elements[parent.0 as usize].enclosed.push(id);
        }
        id
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut ElementData {
        &mut self.elements[id.0 as usize]
    }

    pub fn build(self) -> Result<SourceModel> {
        let mut type_index = HashMap::<String, ElementId>::new();
        for (index, element) in self.elements.iter().enumerate() {
            if element.is_type() {
                let erasure = element.type_data.erasure();
                if type_index
                    .insert(erasure.clone(), ElementId(index as u32))
                    .is_some()
                {
                    bail!("duplicated type declaration {}", erasure);
                }
            }
            if element.type_data.kind == crate::type_data::TypeKind::Primitive
                && !PRIMITIVES.contains(&element.type_data.path)
            {
                bail!("unknown primitive type {}", element.type_data.path);
            }
        }
        Ok(SourceModel {
            elements: self.elements,
            type_index,
        })
    }
}
