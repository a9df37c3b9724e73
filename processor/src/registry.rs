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

use crate::bindings::injection::InjectionBindingFactory;
use crate::bindings::Binding;
use crate::error::DiagnosticKind;
use crate::keys::Key;
use indexmap::IndexMap;
use stiletto_common::source_model::SourceModel;
use tracing::debug;

/// On-demand discovery of implicit bindings, with caches that make every
/// lookup idempotent for the lifetime of a driver.
///
/// Parameterized declarations are additionally cached under their unresolved
/// key, so every substituted instance shares one declared-form record. The
/// registry also keeps the work list of bindings whose generated support
/// code still has to be emitted; the driver drains it once per round.
#[derive(Debug, Default)]
pub struct InjectBindingRegistry {
    factory: InjectionBindingFactory,
    provision_bindings: IndexMap<Key, Option<Binding>>,
    members_injection_bindings: IndexMap<Key, Binding>,
    pending_emission: IndexMap<Key, Binding>,
}

impl InjectBindingRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Cached or newly materialized injection binding for `key`. Only
    /// unqualified keys on concrete classes can yield one; the outcome,
    /// including absence, is cached.
    pub fn get_or_find_provision(
        &mut self,
        model: &SourceModel,
        key: &Key,
    ) -> Result<Option<Binding>, DiagnosticKind> {
        if let Some(cached) = self.provision_bindings.get(key) {
            return Ok(cached.clone());
        }
        let binding = self.factory.try_for_key(model, key)?;
        if let Some(binding) = &binding {
            debug!(key = %key.readable(), "materialized injection binding");
            if let Some(unresolved) = &binding.unresolved {
                self.provision_bindings
                    .entry(unresolved.key.clone())
                    .or_insert_with(|| Some((**unresolved).clone()));
            }
        }
        self.provision_bindings.insert(key.clone(), binding.clone());
        Ok(binding)
    }

    /// Members-injection binding for `key`; always yields one, possibly with
    /// no injection sites.
    pub fn get_or_find_members_injection(
        &mut self,
        model: &SourceModel,
        key: &Key,
    ) -> Binding {
        if let Some(cached) = self.members_injection_bindings.get(key) {
            return cached.clone();
        }
        let binding = self.factory.members_injection_for_key(model, key);
        self.members_injection_bindings
            .insert(key.clone(), binding.clone());
        binding
    }

    /// Queues a binding whose generated support code must be emitted when
    /// the round completes.
    pub fn mark_for_emission(&mut self, binding: &Binding) {
        self.pending_emission
            .entry(binding.key.clone())
            .or_insert_with(|| binding.clone());
    }

    /// Hands out the queued work exactly once. If emission fails, the caller
    /// puts the work back with [`Self::restore_pending`] so the next round
    /// retries it.
    pub fn drain_pending(&mut self) -> Vec<Binding> {
        self.pending_emission
            .drain(..)
            .map(|(_, binding)| binding)
            .collect()
    }

    pub fn restore_pending(&mut self, bindings: Vec<Binding>) {
        for binding in bindings {
            self.pending_emission
                .entry(binding.key.clone())
                .or_insert(binding);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_emission.len()
    }
}
