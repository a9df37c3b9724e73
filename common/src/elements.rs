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

use crate::type_data::TypeData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle into a [`crate::source_model::SourceModel`] element table.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct ElementId(pub u32);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Class,
    Interface,
    AnnotationType,
    Constructor,
    Method,
    Field,
    Parameter,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Private,
    Static,
    Abstract,
    Final,
}

/// An annotation use: the annotation's type plus its element values.
///
/// Values are kept in a sorted map so equality and hashing are structural,
/// never dependent on declaration order of the values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
pub struct AnnotationData {
    pub type_data: TypeData,
    pub values: BTreeMap<String, AnnotationValue>,
}

impl AnnotationData {
    pub fn new(type_data: TypeData) -> Self {
        AnnotationData {
            type_data,
            values: BTreeMap::new(),
        }
    }

    pub fn marker(path: &str) -> Self {
        AnnotationData::new(TypeData::global(path))
    }

    pub fn with_value(mut self, name: &str, value: AnnotationValue) -> Self {
        self.values.insert(name.to_owned(), value);
        self
    }

    pub fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.values.get(name)
    }

    /// Human readable form, e.g. `#[qualified(::blue::Blue)]`.
    pub fn readable(&self) -> String {
        if self.values.is_empty() {
            return format!("#[{}]", self.type_data.canonical_string_path());
        }
        let values = self
            .values
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value.readable()))
            .collect::<Vec<String>>()
            .join(", ");
        format!("#[{}({})]", self.type_data.canonical_string_path(), values)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    String(String),
    Int(i64),
    Bool(bool),
    Type(TypeData),
    EnumValue(TypeData, String),
    Annotation(Box<AnnotationData>),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn readable(&self) -> String {
        match self {
            AnnotationValue::String(s) => format!("\"{}\"", s),
            AnnotationValue::Int(i) => i.to_string(),
            AnnotationValue::Bool(b) => b.to_string(),
            AnnotationValue::Type(t) => t.canonical_string_path(),
            AnnotationValue::EnumValue(t, variant) => {
                format!("{}::{}", t.canonical_string_path(), variant)
            }
            AnnotationValue::Annotation(a) => a.readable(),
            AnnotationValue::Array(values) => format!(
                "[{}]",
                values
                    .iter()
                    .map(AnnotationValue::readable)
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }

    pub fn as_type(&self) -> Option<&TypeData> {
        match self {
            AnnotationValue::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_types(&self) -> Vec<TypeData> {
        match self {
            AnnotationValue::Type(t) => vec![t.clone()],
            AnnotationValue::Array(values) => values
                .iter()
                .filter_map(|v| v.as_type().cloned())
                .collect(),
            _ => vec![],
        }
    }
}

/// One element of the host program.
///
/// `type_data` is the declared type for type-level elements (type variables
/// appearing as arguments), the field/parameter type for fields and
/// parameters, and the return type for methods. Parameters of methods and
/// constructors are enclosed `Parameter` elements in declaration order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ElementData {
    pub kind: ElementKind,
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<AnnotationData>,
    pub enclosing: Option<ElementId>,
    pub enclosed: Vec<ElementId>,
    pub type_data: TypeData,
    /// Superclass of a `Class` element, if any.
    pub superclass: Option<TypeData>,
}

impl ElementData {
    pub fn new(kind: ElementKind, name: &str) -> Self {
        ElementData {
            kind,
            name: name.to_owned(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            enclosing: None,
            enclosed: Vec::new(),
            type_data: TypeData::new(),
            superclass: None,
        }
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_abstract(&self) -> bool {
        self.has_modifier(Modifier::Abstract) || self.kind == ElementKind::Interface
    }

    pub fn annotation(&self, path: &str) -> Option<&AnnotationData> {
        self.annotations
            .iter()
            .find(|a| a.type_data.erasure() == format!("::{}", path))
    }

    pub fn has_annotation(&self, path: &str) -> bool {
        self.annotation(path).is_some()
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Class | ElementKind::Interface | ElementKind::AnnotationType
        )
    }
}
