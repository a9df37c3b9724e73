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

use crate::keys::Key;
use crate::requests::DependencyRequest;
use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, ElementId};
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeData;

/// Which family a binding belongs to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    Provision,
    Production,
    MembersInjection,
}

/// How a contribution participates in its key: on its own, or as one entry
/// of an aggregated set or map.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionType {
    Unique,
    Set,
    SetValues,
    Map,
}

impl ContributionType {
    pub fn is_multibinding(self) -> bool {
        !matches!(self, ContributionType::Unique)
    }

    /// Set and SetValues contributions aggregate together; Map stands alone.
    pub fn aggregates_with(self, other: ContributionType) -> bool {
        match (self, other) {
            (ContributionType::Set, ContributionType::SetValues)
            | (ContributionType::SetValues, ContributionType::Set) => true,
            _ => self == other,
        }
    }

    pub fn readable(self) -> &'static str {
        match self {
            ContributionType::Unique => "unique",
            ContributionType::Set => "set",
            ContributionType::SetValues => "set values",
            ContributionType::Map => "map",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionSiteKind {
    Field,
    Method,
}

/// One field or method populated during members injection, with the
/// requests its population needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InjectionSite {
    pub kind: InjectionSiteKind,
    pub element: ElementId,
    pub requests: Vec<DependencyRequest>,
}

/// A rule that satisfies one key, together with its dependency set.
///
/// The shared contract lives on the struct; what distinguishes the variants
/// is payload on [`BindingKind`]. Capability checks are pattern matches on
/// the kind, never downcasts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Binding {
    pub key: Key,
    /// The element the binding was declared on. Synthetic bindings anchor to
    /// the request site that caused them.
    pub origin: ElementId,
    /// Dependencies written by the user.
    pub explicit_dependencies: Vec<DependencyRequest>,
    /// Dependencies the framework introduces.
    pub framework_dependencies: Vec<DependencyRequest>,
    pub scope: Option<AnnotationData>,
    pub package: Option<String>,
    pub nullable: bool,
    /// The type-parameter-free origin when this binding was substituted from
    /// a generic declaration at the request site.
    pub unresolved: Option<Box<Binding>>,
    pub kind: BindingKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum BindingKind {
    /// Constructor on a concrete type marked for injection.
    Injection,
    /// A provider method inside a module.
    Provision {
        module: TypeData,
        contribution: ContributionType,
        map_key: Option<AnnotationData>,
    },
    /// A producer method inside a module.
    Production {
        module: TypeData,
        contribution: ContributionType,
        map_key: Option<AnnotationData>,
    },
    /// The component itself, or a declared component dependency instance.
    Component,
    /// A provision method on a declared component dependency.
    ComponentMethod { dependency: TypeData },
    /// Aggregates every contribution of one key into a set or map.
    Multibinding { contributions: Vec<Binding> },
    /// Adapts `Map<K, Provider<V>>` bindings to a `Map<K, V>` request.
    MapOfProvider,
    /// Populates the injection sites of an existing object.
    MembersInjection {
        injection_sites: Vec<InjectionSite>,
        parent_key: Option<Key>,
    },
}

impl Binding {
    /// Explicit dependencies followed by framework dependencies.
    pub fn implicit_dependencies(&self) -> impl Iterator<Item = &DependencyRequest> {
        self.explicit_dependencies
            .iter()
            .chain(self.framework_dependencies.iter())
    }

    pub fn binding_type(&self) -> BindingType {
        match &self.kind {
            BindingKind::Production { .. } => BindingType::Production,
            BindingKind::MembersInjection { .. } => BindingType::MembersInjection,
            BindingKind::Multibinding { contributions } => contributions
                .first()
                .map(Binding::binding_type)
                .unwrap_or(BindingType::Provision),
            _ => BindingType::Provision,
        }
    }

    pub fn contribution_type(&self) -> ContributionType {
        match &self.kind {
            BindingKind::Provision { contribution, .. }
            | BindingKind::Production { contribution, .. } => *contribution,
            _ => ContributionType::Unique,
        }
    }

    pub fn map_key(&self) -> Option<&AnnotationData> {
        match &self.kind {
            BindingKind::Provision { map_key, .. } | BindingKind::Production { map_key, .. } => {
                map_key.as_ref()
            }
            _ => None,
        }
    }

    /// Human readable name of the binding's declaration, in the shape the
    /// diagnostics use.
    pub fn description(&self, model: &SourceModel) -> String {
        match &self.kind {
            BindingKind::Injection => {
                format!("{} (injectable)", self.key.type_data.readable())
            }
            BindingKind::Provision { module, .. } => format!(
                "{}.{} (module provides)",
                module.canonical_string_path(),
                model.element(self.origin).name
            ),
            BindingKind::Production { module, .. } => format!(
                "{}.{} (module produces)",
                module.canonical_string_path(),
                model.element(self.origin).name
            ),
            BindingKind::Component => {
                format!("{} (component)", self.key.type_data.readable())
            }
            BindingKind::ComponentMethod { dependency } => format!(
                "{}.{} (component dependency method)",
                dependency.canonical_string_path(),
                model.element(self.origin).name
            ),
            BindingKind::Multibinding { .. } => {
                format!("{} (multibinding)", self.key.readable())
            }
            BindingKind::MapOfProvider => {
                format!("{} (map of providers)", self.key.readable())
            }
            BindingKind::MembersInjection { .. } => {
                format!("{} (members injection)", self.key.type_data.readable())
            }
        }
    }
}
