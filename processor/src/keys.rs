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

use crate::bindings::ContributionType;
use crate::error::DiagnosticKind;
use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, AnnotationValue, ElementId};
use stiletto_common::framework;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeData;

/// Canonical identity of a binding request: an optional qualifier and a
/// normalized type. Keys are value objects; equality and hashing are
/// structural.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub qualifier: Option<AnnotationData>,
    pub type_data: TypeData,
}

impl Key {
    /// Human readable form.
    pub fn readable(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{} {}", qualifier.readable(), self.type_data.readable()),
            None => self.type_data.readable(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKeyKind {
    Contribution,
    MembersInjection,
}

/// The identity a binding is indexed under within a component: contribution
/// keys name values the component can produce, members-injection keys name
/// types whose injection sites are populated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub kind: BindingKeyKind,
    pub key: Key,
}

impl BindingKey {
    pub fn contribution(key: Key) -> Self {
        BindingKey {
            kind: BindingKeyKind::Contribution,
            key,
        }
    }

    pub fn members_injection(key: Key) -> Self {
        BindingKey {
            kind: BindingKeyKind::MembersInjection,
            key,
        }
    }

    pub fn readable(&self) -> String {
        match self.kind {
            BindingKeyKind::Contribution => self.key.readable(),
            BindingKeyKind::MembersInjection => format!("members of {}", self.key.readable()),
        }
    }
}

/// Builds [`Key`]s from request sites and binding declarations, applying the
/// desugarings that give distinct source shapes one identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyFactory;

impl KeyFactory {
    pub fn new() -> Self {
        KeyFactory
    }

    pub fn for_type(&self, type_data: &TypeData) -> Key {
        self.for_qualified(None, type_data)
    }

    pub fn for_qualified(&self, qualifier: Option<AnnotationData>, type_data: &TypeData) -> Key {
        Key {
            qualifier,
            type_data: type_data.normalize(),
        }
    }

    /// Key of a provider/producer method, transformed by its contribution
    /// type: `Set` wraps the return in a set, `Map` wraps the value side in
    /// a provider keyed by the map-key annotation's value type, `SetValues`
    /// requires the return to already be a set. A producer method returning
    /// `Future<T>` keys at `T`.
    pub fn for_binding_method(
        &self,
        model: &SourceModel,
        method: ElementId,
        contribution: ContributionType,
        production: bool,
    ) -> Result<Key, DiagnosticKind> {
        let qualifiers = model.qualifiers_of(method);
        if qualifiers.len() > 1 {
            return Err(DiagnosticKind::MultipleQualifiers {
                site: model.qualified_name(method),
            });
        }
        let qualifier = qualifiers.into_iter().next();
        let mut return_type = model.element(method).type_data.clone();
        if production && framework::is_wrapper_of(&return_type, framework::FUTURE) {
            return_type = return_type.args[0].clone();
        }
        let type_data = match contribution {
            ContributionType::Unique => return_type,
            ContributionType::Set => framework::set_of(return_type),
            ContributionType::SetValues => {
                if !framework::is_wrapper_of(&return_type, framework::SET) {
                    return Err(DiagnosticKind::ProvidesSetValuesReturnSet {
                        method: model.qualified_name(method),
                    });
                }
                return_type
            }
            ContributionType::Map => {
                let map_key = self.map_key_annotation(model, method)?;
                let key_type = self.map_key_type(model, method, &map_key)?;
                framework::map_of(key_type, framework::provider_of(return_type))
            }
        };
        Ok(self.for_qualified(qualifier, &type_data))
    }

    /// Key of an injection constructor: the enclosing type, never qualified.
    pub fn for_inject_constructor(
        &self,
        model: &SourceModel,
        constructor: ElementId,
    ) -> Result<Key, DiagnosticKind> {
        let enclosing = model
            .enclosing_type(constructor)
            .expect("injection constructor outside of a type");
        let type_data = model.element(enclosing).type_data.clone();
        if !model.qualifiers_of(constructor).is_empty() {
            return Err(DiagnosticKind::QualifierOnConstructor {
                type_path: type_data.readable(),
            });
        }
        Ok(self.for_type(&type_data))
    }

    pub fn for_members_injection(&self, type_data: &TypeData) -> Key {
        self.for_type(type_data)
    }

    /// The `Map<K, Provider<V>>` form of a plain map key, defined only when
    /// the value side is not already a provider.
    pub fn implicit_map_provider_key(&self, key: &Key) -> Option<Key> {
        if !framework::is_wrapper_of(&key.type_data, framework::MAP) {
            return None;
        }
        if key.type_data.args.len() != 2 {
            return None;
        }
        let map_key = key.type_data.args[0].clone();
        let value = key.type_data.args[1].clone();
        if framework::is_raw_or_wrapped(&value, framework::PROVIDER) {
            return None;
        }
        Some(self.for_qualified(
            key.qualifier.clone(),
            &framework::map_of(map_key, framework::provider_of(value)),
        ))
    }

    fn map_key_annotation(
        &self,
        model: &SourceModel,
        method: ElementId,
    ) -> Result<AnnotationData, DiagnosticKind> {
        let mut map_keys = model.map_keys_of(method);
        match map_keys.len() {
            0 => Err(DiagnosticKind::MissingMapKey {
                method: model.qualified_name(method),
            }),
            1 => Ok(map_keys.remove(0)),
            _ => Err(DiagnosticKind::MultipleMapKeys {
                method: model.qualified_name(method),
            }),
        }
    }

    fn map_key_type(
        &self,
        model: &SourceModel,
        method: ElementId,
        map_key: &AnnotationData,
    ) -> Result<TypeData, DiagnosticKind> {
        if map_key.values.len() != 1 {
            return Err(DiagnosticKind::MalformedMapKey {
                method: model.qualified_name(method),
            });
        }
        let value = map_key.values.values().next().unwrap();
        match value {
            AnnotationValue::String(_) => Ok(TypeData::global("std::string::String")),
            AnnotationValue::Int(_) => Ok(TypeData::primitive("i32")),
            AnnotationValue::EnumValue(enum_type, _) => Ok(enum_type.clone()),
            _ => Err(DiagnosticKind::MalformedMapKey {
                method: model.qualified_name(method),
            }),
        }
    }
}

/// Identity of one map entry: the map-key annotation's single value.
pub fn map_key_identity(map_key: &AnnotationData) -> Option<&AnnotationValue> {
    map_key.values.values().next()
}
