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

//! Source model shared between the stiletto processor and host front ends.
//!
//! A host front end lowers its language's elements into [`ElementData`]
//! records and structural [`TypeData`] values, then freezes them into a
//! [`SourceModel`]. The processor consumes nothing richer than the queries
//! on that model.

pub mod elements;
pub mod framework;
pub mod source_model;
pub mod type_data;

pub use elements::{AnnotationData, AnnotationValue, ElementData, ElementId, ElementKind, Modifier};
pub use source_model::{SourceModel, SourceModelBuilder};
pub use type_data::{TypeData, TypeKind, TypeRoot};
