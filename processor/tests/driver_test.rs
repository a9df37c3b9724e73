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

mod support;

use std::collections::HashMap;
use stiletto_common::elements::{AnnotationData, Modifier};
use stiletto_common::framework::markers;
use stiletto_common::type_data::TypeData;
use stiletto_processor::bindings::Binding;
use stiletto_processor::driver::{Emitter, NullEmitter, ProcessingDriver};
use stiletto_processor::graph::ResolvedGraph;
use stiletto_processor::options::ProcessorOptions;
use stiletto_processor::validators::SourceValidator;
use stiletto_processor::{RecordingMessager, Severity};
use support::ModelFixture;

#[derive(Default)]
struct CollectingEmitter {
    components: Vec<String>,
    factories: Vec<String>,
    fail_factories: bool,
}

impl Emitter for CollectingEmitter {
    fn emit_component(&mut self, graph: &ResolvedGraph) -> anyhow::Result<()> {
        self.components
            .push(graph.descriptor.type_data.canonical_string_path());
        Ok(())
    }

    fn emit_injection_factories(&mut self, bindings: &[Binding]) -> anyhow::Result<()> {
        if self.fail_factories {
            anyhow::bail!("emission failed");
        }
        self.factories.extend(
            bindings
                .iter()
                .map(|b| b.key.type_data.canonical_string_path()),
        );
        Ok(())
    }
}

#[test]
fn clean_round_emits_component_and_factories() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    let foo_class = fixture.class("test::Foo");
    fixture.inject_constructor(foo_class, &[]);
    let component = fixture.component("test::C", &[], &[]);
    fixture.entry_point(component, "foo", &foo);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let mut emitter = CollectingEmitter::default();
    let outcome = driver
        .process_round(&model, &mut messager, &mut emitter)
        .unwrap();

    assert_eq!(outcome.clean_graphs.len(), 1);
    assert_eq!(outcome.components_with_errors, 0);
    assert_eq!(messager.error_count(), 0, "{:?}", messager.messages());
    assert_eq!(emitter.components, vec!["::test::C"]);
    assert_eq!(emitter.factories, vec!["::test::Foo"]);
}

#[test]
fn failed_emission_is_retried_next_round() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    let foo_class = fixture.class("test::Foo");
    fixture.inject_constructor(foo_class, &[]);
    let component = fixture.component("test::C", &[], &[]);
    fixture.entry_point(component, "foo", &foo);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let mut failing = CollectingEmitter {
        fail_factories: true,
        ..Default::default()
    };
    let outcome = driver
        .process_round(&model, &mut messager, &mut failing)
        .unwrap();
    assert_eq!(outcome.deferred_emissions, 1);
    assert!(failing.factories.is_empty());

    let mut working = CollectingEmitter::default();
    driver
        .process_round(&model, &mut messager, &mut working)
        .unwrap();
    assert_eq!(working.factories, vec!["::test::Foo"]);
}

#[test]
fn graph_errors_prevent_emission_but_not_other_components() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    let foo_class = fixture.class("test::Foo");
    fixture.inject_constructor(foo_class, &[]);
    let missing = TypeData::global("test::MissingIface");
    fixture.interface("test::MissingIface");

    let broken = fixture.component("test::Broken", &[], &[]);
    fixture.entry_point(broken, "missing", &missing);
    let healthy = fixture.component("test::Healthy", &[], &[]);
    fixture.entry_point(healthy, "foo", &foo);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let mut emitter = CollectingEmitter::default();
    let outcome = driver
        .process_round(&model, &mut messager, &mut emitter)
        .unwrap();

    assert_eq!(outcome.components_with_errors, 1);
    assert_eq!(emitter.components, vec!["::test::Healthy"]);
    assert!(messager.has_message_containing("cannot be provided"));
}

#[test]
fn subcomponents_resolve_under_their_parent() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    fixture.class("test::Foo");
    let module = fixture.module("test::M", &[]);
    fixture.provides(module, "foo", &foo, &[]);
    let child_type = TypeData::global("test::Child");
    let child = fixture.subcomponent("test::Child", &[]);
    fixture.entry_point(child, "foo", &foo);
    let parent = fixture.component("test::Parent", &[TypeData::global("test::M")], &[]);
    fixture.entry_point(parent, "child", &child_type);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let mut emitter = CollectingEmitter::default();
    let outcome = driver
        .process_round(&model, &mut messager, &mut emitter)
        .unwrap();

    assert_eq!(messager.error_count(), 0, "{:?}", messager.messages());
    assert_eq!(outcome.clean_graphs.len(), 2);
    assert_eq!(emitter.components, vec!["::test::Parent", "::test::Child"]);
}

#[test]
fn repeated_scope_in_ancestry_blocks_resolution() {
    let mut fixture = ModelFixture::new();
    fixture.scope_type("test::AppScope");
    let child = fixture.subcomponent("test::Child", &[]);
    fixture.annotate(child, AnnotationData::marker("test::AppScope"));
    let child_type = TypeData::global("test::Child");
    let parent = fixture.component("test::Parent", &[], &[]);
    fixture.annotate(parent, AnnotationData::marker("test::AppScope"));
    fixture.entry_point(parent, "child", &child_type);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let outcome = driver
        .process_round(&model, &mut messager, &mut NullEmitter)
        .unwrap();

    assert_eq!(outcome.components_with_errors, 1);
    assert!(messager.has_message_containing("already declares"));
}

#[test]
fn private_inject_field_severity_follows_options() {
    let mut fixture = ModelFixture::new();
    let dep = TypeData::global("test::Dep");
    let dep_class = fixture.class("test::Dep");
    fixture.inject_constructor(dep_class, &[]);
    let target_class = fixture.class("test::Target");
    let field = fixture.inject_field(target_class, "dep", &dep);
    fixture.add_modifier(field, Modifier::Private);
    let model = fixture.build();

    let strict = ProcessorOptions::default();
    let mut messager = RecordingMessager::new();
    let validator = SourceValidator::new(&model, &strict);
    assert!(!validator.validate_inject_field(field, &mut messager));
    assert_eq!(messager.items[0].severity, Severity::Error);
    assert!(messager.has_message_containing("must not be private"));

    let mut raw = HashMap::new();
    raw.insert("privateMemberValidation".to_owned(), "warning".to_owned());
    let (lenient, complaints) = ProcessorOptions::parse(&raw);
    assert!(complaints.is_empty());
    let mut messager = RecordingMessager::new();
    let validator = SourceValidator::new(&model, &lenient);
    assert!(validator.validate_inject_field(field, &mut messager));
    assert_eq!(messager.items[0].severity, Severity::Warning);
}

#[test]
fn binding_method_shape_violations_are_reported() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    fixture.class("test::Foo");
    let module = fixture.module("test::M", &[]);
    // returns nothing
    fixture.provides(module, "nothing", &TypeData::void(), &[]);
    // produces a raw future
    fixture.produces(
        module,
        "raw_future",
        &TypeData::global("std::future::Future"),
        &[],
    );
    // contributes elements without returning a set
    let not_a_set = fixture.provides(module, "not_a_set", &foo, &[]);
    fixture.annotate(not_a_set, AnnotationData::marker(markers::ELEMENTS_INTO_SET));
    // map contribution without a map key
    let keyless = fixture.provides(module, "keyless", &foo, &[]);
    fixture.annotate(keyless, AnnotationData::marker(markers::INTO_MAP));
    let model = fixture.build();

    let options = ProcessorOptions::default();
    let validator = SourceValidator::new(&model, &options);
    let mut messager = RecordingMessager::new();
    assert!(!validator.validate_module(module, &mut messager));
    assert!(messager.has_message_containing("must return a value"));
    assert!(messager.has_message_containing("must not return a raw future"));
    assert!(messager.has_message_containing("must return a set"));
    assert!(messager.has_message_containing("needs a map key annotation"));
}

#[test]
fn provision_site_cannot_request_a_producer() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    let bar = TypeData::global("test::Bar");
    fixture.class("test::Foo");
    let bar_class = fixture.class("test::Bar");
    let constructor = fixture.inject_constructor(
        bar_class,
        &[TypeData::global_with_args(
            "stiletto::Producer",
            vec![foo.clone()],
        )],
    );
    let model = fixture.build();
    let _ = bar;

    let options = ProcessorOptions::default();
    let validator = SourceValidator::new(&model, &options);
    let mut messager = RecordingMessager::new();
    assert!(!validator.validate_inject_constructor(constructor, &mut messager));
    assert!(messager.has_message_containing("cannot depend on a producer"));
}

#[test]
fn production_component_accepts_producer_entry_points() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    fixture.class("test::Foo");
    let module = fixture.module("test::M", &[]);
    fixture.produces(module, "foo", &foo, &[]);
    let component = fixture.production_component("test::P", &[TypeData::global("test::M")]);
    fixture.entry_point(
        component,
        "foo",
        &TypeData::global_with_args("stiletto::Producer", vec![foo.clone()]),
    );
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let outcome = driver
        .process_round(&model, &mut messager, &mut NullEmitter)
        .unwrap();
    assert_eq!(messager.error_count(), 0, "{:?}", messager.messages());
    assert_eq!(outcome.clean_graphs.len(), 1);
}

#[test]
fn malformed_component_method_blocks_descriptor() {
    let mut fixture = ModelFixture::new();
    let foo = TypeData::global("test::Foo");
    fixture.class("test::Foo");
    let component = fixture.component("test::C", &[], &[]);
    // two parameters fit neither entry-point shape
    let method = fixture.method(component, "bad", &foo, &[foo.clone(), foo.clone()]);
    fixture.add_modifier(method, Modifier::Abstract);
    let model = fixture.build();

    let mut driver = ProcessingDriver::new(ProcessorOptions::default());
    let mut messager = RecordingMessager::new();
    let outcome = driver
        .process_round(&model, &mut messager, &mut NullEmitter)
        .unwrap();
    assert_eq!(outcome.components_with_errors, 1);
    assert!(messager.has_message_containing("component method"));
}
