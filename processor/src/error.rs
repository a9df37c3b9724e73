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

use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, ElementId};
use thiserror::Error;

/// Severity of a user-visible diagnostic.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// One rendered diagnostic, anchored to the element it is about.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiagnosticItem {
    pub severity: Severity,
    pub message: String,
    pub anchor: ElementId,
    pub sub_anchor: Option<AnnotationData>,
}

impl DiagnosticItem {
    pub fn error(message: String, anchor: ElementId) -> Self {
        DiagnosticItem {
            severity: Severity::Error,
            message,
            anchor,
            sub_anchor: None,
        }
    }

    pub fn warning(message: String, anchor: ElementId) -> Self {
        DiagnosticItem {
            severity: Severity::Warning,
            message,
            anchor,
            sub_anchor: None,
        }
    }

    pub fn note(message: String, anchor: ElementId) -> Self {
        DiagnosticItem {
            severity: Severity::Note,
            message,
            anchor,
            sub_anchor: None,
        }
    }

    pub fn with_sub_anchor(mut self, sub_anchor: AnnotationData) -> Self {
        self.sub_anchor = Some(sub_anchor);
        self
    }
}

/// The host's diagnostic channel. Everything user visible funnels through
/// one of these; the core never prints.
pub trait Messager {
    fn report(&mut self, item: DiagnosticItem);
}

/// Buffers diagnostics in order, for hosts that surface them in bulk and
/// for tests.
#[derive(Debug, Default)]
pub struct RecordingMessager {
    pub items: Vec<DiagnosticItem>,
}

impl RecordingMessager {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.message.as_str()).collect()
    }

    pub fn has_message_containing(&self, fragment: &str) -> bool {
        self.items.iter().any(|i| i.message.contains(fragment))
    }
}

impl Messager for RecordingMessager {
    fn report(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }
}

/// Taxonomy of user errors. The processor records these; it never panics
/// over user input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiagnosticKind {
    // source level
    #[error("injection constructor must not be private")]
    InjectOnPrivateConstructor,
    #[error("injected {member} must not be private")]
    InjectOnPrivateMember { member: String },
    #[error("injected {member} must not be static")]
    InjectOnStaticMember { member: String },
    #[error("injected method must not be abstract")]
    AbstractInjectMethod,
    #[error("{type_path} has more than one injection constructor")]
    MultipleInjectConstructors { type_path: String },
    #[error("{type_path} is abstract and cannot have an injection constructor")]
    InjectConstructorOnAbstractType { type_path: String },
    #[error("more than one qualifier on {site}")]
    MultipleQualifiers { site: String },
    #[error("module {module} not found, required by {requester}")]
    ModuleNotFound { module: String, requester: String },
    #[error("{type_path} is installed as a module but is not one")]
    NotAModule { type_path: String },
    #[error("binding method {method} must return a value")]
    BindingMethodMustReturnValue { method: String },
    #[error("producer method {method} must not return a raw future")]
    ProducesRawFuture { method: String },
    #[error("{method} contributes set elements and must return a set")]
    ProvidesSetValuesReturnSet { method: String },
    #[error("map contribution {method} needs a map key annotation")]
    MissingMapKey { method: String },
    #[error("map contribution {method} has more than one map key annotation")]
    MultipleMapKeys { method: String },
    #[error("map key on {method} must carry exactly one value")]
    MalformedMapKey { method: String },
    #[error("binding method {method} cannot be both a provider and a producer")]
    ProvidesAndProduces { method: String },
    #[error(
        "component method {method} must either return a value and take no \
         parameters, or inject members into its single parameter"
    )]
    MalformedComponentMethod { method: String },
    #[error(
        "builder method {method} must either set a module and return the \
         builder, or take nothing and build the component"
    )]
    MalformedBuilderMethod { method: String },
    #[error("scope annotation is not allowed on {site}")]
    ScopeOnNonBindingSite { site: String },

    // key level
    #[error("qualifier is not allowed on an injection constructor of {type_path}")]
    QualifierOnConstructor { type_path: String },
    #[error("provision {site} cannot depend on a producer")]
    ProvisionDependsOnProducer { site: String },

    // graph level
    #[error("{type_path} cannot be provided without a provider method\nrequested by: {path}")]
    RequiresProvider { type_path: String, path: String },
    #[error(
        "{type_path} cannot be provided without an injection constructor\nrequested by: {path}"
    )]
    RequiresInjectionConstructor { type_path: String, path: String },
    #[error("found duplicated bindings for {key}, provided by:\n\t{declarations}")]
    DuplicateBindings { key: String, declarations: String },
    #[error("conflicting binding kinds for {key}:\n{declarations_by_kind}")]
    MultipleBindingKinds {
        key: String,
        declarations_by_kind: String,
    },
    #[error("Cyclic dependency detected:\n{path}")]
    DependencyCycle { path: String },
    #[error("{binding} is scoped with {scope} but {component} does not declare that scope")]
    IncompatibleScope {
        binding: String,
        scope: String,
        component: String,
    },
    #[error("{component} declares scope {scope} which {ancestor} already declares")]
    ScopeRepeatedInAncestry {
        component: String,
        scope: String,
        ancestor: String,
    },
    #[error("{request} is not nullable but is fulfilled by nullable binding {binding}")]
    NullableMismatch { request: String, binding: String },
    #[error("found duplicated map key {map_key} for {key}, provided by:\n\t{declarations}")]
    DuplicateMapKeys {
        map_key: String,
        key: String,
        declarations: String,
    },
}

/// A contradiction the processor never expects from any input. Fatal to the
/// current driver round.
#[derive(Debug, Error)]
#[error("stiletto internal invariant violated: {message}")]
pub struct InvariantError {
    pub message: String,
}

impl InvariantError {
    pub fn new(message: impl Into<String>) -> Self {
        InvariantError {
            message: message.into(),
        }
    }
}
