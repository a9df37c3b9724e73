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

//! Well-known paths the processor recognizes by canonical name: the runtime
//! wrapper types a request site may use, the collection types multibindings
//! aggregate into, and the marker annotations that drive discovery.

use crate::type_data::TypeData;
use lazy_static::lazy_static;
use std::collections::HashSet;

pub const PROVIDER: &str = "stiletto::Provider";
pub const LAZY: &str = "stiletto::Lazy";
pub const MEMBERS_INJECTOR: &str = "stiletto::MembersInjector";
pub const PRODUCER: &str = "stiletto::Producer";
pub const PRODUCED: &str = "stiletto::Produced";
pub const FUTURE: &str = "std::future::Future";

pub const SET: &str = "std::collections::HashSet";
pub const MAP: &str = "std::collections::HashMap";

/// Marker annotation paths.
pub mod markers {
    pub const INJECT: &str = "stiletto::inject";
    pub const PROVIDES: &str = "stiletto::provides";
    pub const PRODUCES: &str = "stiletto::produces";
    pub const MODULE: &str = "stiletto::module";
    pub const COMPONENT: &str = "stiletto::component";
    pub const PRODUCTION_COMPONENT: &str = "stiletto::production_component";
    pub const SUBCOMPONENT: &str = "stiletto::subcomponent";
    pub const COMPONENT_BUILDER: &str = "stiletto::component_builder";
    pub const INTO_SET: &str = "stiletto::into_set";
    pub const ELEMENTS_INTO_SET: &str = "stiletto::elements_into_set";
    pub const INTO_MAP: &str = "stiletto::into_map";
    pub const MAP_KEY: &str = "stiletto::map_key";
    pub const QUALIFIER: &str = "stiletto::qualifier";
    pub const SCOPE: &str = "stiletto::scope";
    pub const NULLABLE: &str = "stiletto::nullable";
}

lazy_static! {
    /// Wrappers that only production components may request.
    pub static ref PRODUCTION_WRAPPERS: HashSet<String> = {
        let mut m = HashSet::<String>::new();
        m.insert(PRODUCER.to_owned());
        m.insert(PRODUCED.to_owned());
        m.insert(FUTURE.to_owned());
        m
    };
}

pub fn provider_of(inner: TypeData) -> TypeData {
    TypeData::global_with_args(PROVIDER, vec![inner])
}

pub fn lazy_of(inner: TypeData) -> TypeData {
    TypeData::global_with_args(LAZY, vec![inner])
}

pub fn set_of(element: TypeData) -> TypeData {
    TypeData::global_with_args(SET, vec![element])
}

pub fn map_of(key: TypeData, value: TypeData) -> TypeData {
    TypeData::global_with_args(MAP, vec![key, value])
}

/// Whether `type_data` is the given wrapper, by erased canonical path.
pub fn is_wrapper_of(type_data: &TypeData, wrapper_path: &str) -> bool {
    type_data.erasure() == format!("::{}", wrapper_path) && !type_data.args.is_empty()
}

/// Whether `type_data` is the given wrapper with or without arguments.
pub fn is_raw_or_wrapped(type_data: &TypeData, wrapper_path: &str) -> bool {
    type_data.erasure() == format!("::{}", wrapper_path)
}
