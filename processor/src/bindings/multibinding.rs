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

use crate::bindings::binding::{Binding, BindingKind};
use crate::keys::Key;
use crate::requests::{DependencyRequestFactory, RequestKind};
use stiletto_common::elements::ElementId;

/// Aggregates the ordered contributions of one key into a single set or map
/// binding. The aggregate depends on everything its contributions depend
/// on; the contributions themselves share the aggregate's key and are never
/// resolved separately.
pub fn multibinding(key: &Key, contributions: Vec<Binding>) -> Binding {
    let framework_dependencies = contributions
        .iter()
        .flat_map(|c| c.implicit_dependencies().cloned().collect::<Vec<_>>())
        .collect();
    let origin = contributions
        .first()
        .map(|c| c.origin)
        .unwrap_or_default();
    Binding {
        key: key.clone(),
        origin,
        explicit_dependencies: Vec::new(),
        framework_dependencies,
        scope: None,
        package: None,
        nullable: false,
        unresolved: None,
        kind: BindingKind::Multibinding { contributions },
    }
}

/// Adapts a `Map<K, V>` request to the `Map<K, Provider<V>>` bindings that
/// actually exist. Its sole dependency is a synthesized request for the
/// provider form.
pub fn map_of_provider(
    request_factory: &DependencyRequestFactory,
    requested: &Key,
    provider_form: Key,
    anchor: ElementId,
) -> Binding {
    let inner =
        request_factory.synthesized(RequestKind::Instance, provider_form, anchor);
    Binding {
        key: requested.clone(),
        origin: anchor,
        explicit_dependencies: Vec::new(),
        framework_dependencies: vec![inner],
        scope: None,
        package: None,
        nullable: false,
        unresolved: None,
        kind: BindingKind::MapOfProvider,
    }
}
