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

//! Compile-time core of the stiletto dependency-injection code generator.
//!
//! Given a [`stiletto_common::SourceModel`] of annotated elements, the
//! processor discovers bindings, resolves each component's binding graph,
//! validates it, and hands clean [`ResolvedGraph`]s to the host's emitter.
//! The processor never performs injection at runtime and never touches
//! source text; both sides of that boundary are collaborators.

pub mod bindings;
pub mod components;
pub mod driver;
pub mod error;
pub mod graph;
pub mod keys;
pub mod options;
pub mod registry;
pub mod reporter;
pub mod requests;
pub mod validation;
pub mod validators;

pub use bindings::{Binding, BindingKind, BindingType, ContributionType};
pub use components::{ComponentDescriptor, ComponentKind, EntryPoint};
pub use driver::{Emitter, NullEmitter, ProcessingDriver, RoundOutcome};
pub use error::{DiagnosticItem, DiagnosticKind, Messager, RecordingMessager, Severity};
pub use graph::{resolve_component, ResolutionState, ResolvedBindings, ResolvedGraph};
pub use keys::{BindingKey, BindingKeyKind, Key, KeyFactory};
pub use options::{ProcessorOptions, ScopeValidation};
pub use registry::InjectBindingRegistry;
pub use reporter::{ValidationReport, ValidationReportBuilder};
pub use requests::{DependencyRequest, DependencyRequestFactory, RequestKind};
pub use validation::GraphValidator;
pub use validators::SourceValidator;
