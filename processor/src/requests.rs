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

use crate::error::DiagnosticKind;
use crate::keys::{BindingKey, Key, KeyFactory};
use serde::{Deserialize, Serialize};
use stiletto_common::elements::ElementId;
use stiletto_common::framework;
use stiletto_common::framework::markers;
use stiletto_common::source_model::SourceModel;
use stiletto_common::type_data::TypeData;

/// How a request site wants its key delivered. `Instance`, `Provider`,
/// `Lazy` and `ProviderOfLazy` share one underlying contribution key, only
/// the wrapping differs; the producer family belongs to production
/// components.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Instance,
    Provider,
    Lazy,
    ProviderOfLazy,
    MembersInjector,
    Producer,
    Produced,
    Future,
}

impl RequestKind {
    /// Whether an edge of this kind legally breaks a dependency cycle.
    /// Only provider/lazy wrapping defers construction; the production
    /// family does not.
    pub fn breaks_cycles(self) -> bool {
        matches!(
            self,
            RequestKind::Provider | RequestKind::Lazy | RequestKind::ProviderOfLazy
        )
    }

    pub fn is_production(self) -> bool {
        matches!(
            self,
            RequestKind::Producer | RequestKind::Produced | RequestKind::Future
        )
    }
}

/// A reference from one binding (or entry point) to another, carrying the
/// delivery kind and the request site for diagnostics.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRequest {
    pub kind: RequestKind,
    pub binding_key: BindingKey,
    pub anchor: ElementId,
    pub nullable: bool,
}

impl DependencyRequest {
    pub fn readable(&self) -> String {
        self.binding_key.readable()
    }
}

/// Classifies a request site (parameter, field, or method return) into a
/// `(kind, key)` pair by stripping the outermost framework wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyRequestFactory {
    key_factory: KeyFactory,
}

impl DependencyRequestFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Classifies the type of `site`. Production kinds are only legal when
    /// `production` is set, i.e. when the consuming binding belongs to the
    /// production family.
    pub fn for_site(
        &self,
        model: &SourceModel,
        site: ElementId,
        production: bool,
    ) -> Result<DependencyRequest, DiagnosticKind> {
        let site_type = model.element(site).type_data.clone();
        self.for_site_with_type(model, site, &site_type, production)
    }

    /// Same as [`Self::for_site`] with the site's type supplied by the
    /// caller, for declarations whose type variables were substituted at the
    /// request site.
    pub fn for_site_with_type(
        &self,
        model: &SourceModel,
        site: ElementId,
        site_type: &TypeData,
        production: bool,
    ) -> Result<DependencyRequest, DiagnosticKind> {
        let element = model.element(site);
        let qualifiers = model.qualifiers_of(site);
        if qualifiers.len() > 1 {
            return Err(DiagnosticKind::MultipleQualifiers {
                site: model.qualified_name(site),
            });
        }
        let qualifier = qualifiers.into_iter().next();
        let nullable = element.has_annotation(markers::NULLABLE);
        let (kind, keyed_type) = classify(site_type);

        if kind.is_production() && !production {
            return Err(DiagnosticKind::ProvisionDependsOnProducer {
                site: model.qualified_name(site),
            });
        }

        let binding_key = match kind {
            RequestKind::MembersInjector => {
                BindingKey::members_injection(self.key_factory.for_members_injection(&keyed_type))
            }
            _ => BindingKey::contribution(self.key_factory.for_qualified(qualifier, &keyed_type)),
        };
        Ok(DependencyRequest {
            kind,
            binding_key,
            anchor: site,
            nullable,
        })
    }

    /// A request the framework itself introduces, e.g. the inner map a
    /// synthetic map binding consumes.
    pub fn synthesized(&self, kind: RequestKind, key: Key, anchor: ElementId) -> DependencyRequest {
        let binding_key = match kind {
            RequestKind::MembersInjector => BindingKey::members_injection(key),
            _ => BindingKey::contribution(key),
        };
        DependencyRequest {
            kind,
            binding_key,
            anchor,
            nullable: false,
        }
    }
}

fn classify(type_data: &TypeData) -> (RequestKind, TypeData) {
    let unwrap = |t: &TypeData| t.args[0].clone();
    if framework::is_wrapper_of(type_data, framework::PROVIDER) {
        let inner = unwrap(type_data);
        if framework::is_wrapper_of(&inner, framework::LAZY) {
            return (RequestKind::ProviderOfLazy, unwrap(&inner));
        }
        return (RequestKind::Provider, inner);
    }
    if framework::is_wrapper_of(type_data, framework::LAZY) {
        return (RequestKind::Lazy, unwrap(type_data));
    }
    if framework::is_wrapper_of(type_data, framework::MEMBERS_INJECTOR) {
        return (RequestKind::MembersInjector, unwrap(type_data));
    }
    if framework::is_wrapper_of(type_data, framework::PRODUCER) {
        return (RequestKind::Producer, unwrap(type_data));
    }
    if framework::is_wrapper_of(type_data, framework::PRODUCED) {
        return (RequestKind::Produced, unwrap(type_data));
    }
    if framework::is_wrapper_of(type_data, framework::FUTURE) {
        return (RequestKind::Future, unwrap(type_data));
    }
    (RequestKind::Instance, type_data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_instance() {
        let (kind, inner) = classify(&TypeData::global("game::Renderer"));
        assert_eq!(kind, RequestKind::Instance);
        assert_eq!(inner, TypeData::global("game::Renderer"));
    }

    #[test]
    fn classify_provider() {
        let (kind, inner) = classify(&framework::provider_of(TypeData::global("game::Renderer")));
        assert_eq!(kind, RequestKind::Provider);
        assert_eq!(inner, TypeData::global("game::Renderer"));
    }

    #[test]
    fn classify_provider_of_lazy() {
        let (kind, inner) = classify(&framework::provider_of(framework::lazy_of(
            TypeData::global("game::Renderer"),
        )));
        assert_eq!(kind, RequestKind::ProviderOfLazy);
        assert_eq!(inner, TypeData::global("game::Renderer"));
    }

    #[test]
    fn only_provider_and_lazy_edges_break_cycles() {
        assert!(!RequestKind::Instance.breaks_cycles());
        assert!(RequestKind::Provider.breaks_cycles());
        assert!(RequestKind::Lazy.breaks_cycles());
        assert!(RequestKind::ProviderOfLazy.breaks_cycles());
        assert!(!RequestKind::Producer.breaks_cycles());
        assert!(!RequestKind::Produced.breaks_cycles());
        assert!(!RequestKind::Future.breaks_cycles());
    }
}
