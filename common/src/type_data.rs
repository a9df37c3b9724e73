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

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub enum TypeRoot {
    UNSPECIFIED = 0,
    GLOBAL = 1,
    CRATE = 2,
    PRIMITIVE = 3,
}

impl Default for TypeRoot {
    fn default() -> Self {
        TypeRoot::UNSPECIFIED
    }
}

/// Shape of a type, matched on instead of a host-side type visitor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Declared,
    Primitive,
    Array,
    Wildcard,
    TypeVariable,
    Void,
    Error,
}

impl Default for TypeKind {
    fn default() -> Self {
        TypeKind::Declared
    }
}

/// Structural representation of a host type.
///
/// `args` holds type arguments for declared types, the component type for
/// arrays, and the upper bound for wildcards. Two `TypeData` are equal iff
/// their structure is equal; identity never depends on where the value came
/// from.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Eq)]
pub struct TypeData {
    pub root: TypeRoot,
    pub kind: TypeKind,
    pub path: String,
    pub field_crate: String,
    pub args: Vec<TypeData>,
    pub trait_object: bool,
}

impl PartialEq for TypeData {
    fn eq(&self, other: &Self) -> bool {
        self.identity_string().eq(&other.identity_string())
    }
}

impl Hash for TypeData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_string().hash(state)
    }
}

impl TypeData {
    pub fn new() -> Self {
        Default::default()
    }

    /// A declared type with a fully qualified path.
    pub fn global(path: &str) -> Self {
        TypeData {
            root: TypeRoot::GLOBAL,
            kind: TypeKind::Declared,
            path: path.to_owned(),
            ..Default::default()
        }
    }

    pub fn global_with_args(path: &str, args: Vec<TypeData>) -> Self {
        TypeData {
            root: TypeRoot::GLOBAL,
            kind: TypeKind::Declared,
            path: path.to_owned(),
            args,
            ..Default::default()
        }
    }

    pub fn primitive(name: &str) -> Self {
        TypeData {
            root: TypeRoot::PRIMITIVE,
            kind: TypeKind::Primitive,
            path: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn type_variable(name: &str) -> Self {
        TypeData {
            root: TypeRoot::UNSPECIFIED,
            kind: TypeKind::TypeVariable,
            path: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn void() -> Self {
        TypeData {
            root: TypeRoot::UNSPECIFIED,
            kind: TypeKind::Void,
            ..Default::default()
        }
    }

    pub fn array_of(component: TypeData) -> Self {
        TypeData {
            root: TypeRoot::UNSPECIFIED,
            kind: TypeKind::Array,
            args: vec![component],
            ..Default::default()
        }
    }

    pub fn wildcard(bound: Option<TypeData>) -> Self {
        TypeData {
            root: TypeRoot::UNSPECIFIED,
            kind: TypeKind::Wildcard,
            args: bound.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Full path of the type in universal form ($CRATE always resolved).
    ///
    /// Modifiers like `dyn` are omitted.
    pub fn canonical_string_path(&self) -> String {
        match self.kind {
            TypeKind::Declared => match self.root {
                TypeRoot::GLOBAL => format!("::{}", self.path_with_args()),
                TypeRoot::CRATE => format!("::{}::{}", self.field_crate, self.path_with_args()),
                _ => panic!("canonical_string_path: declared type with no root"),
            },
            TypeKind::Primitive => self.path.clone(),
            TypeKind::Array => format!(
                "[{}]",
                self.args
                    .first()
                    .map(TypeData::canonical_string_path)
                    .unwrap_or_default()
            ),
            TypeKind::Wildcard => match self.args.first() {
                Some(bound) => format!("?:{}", bound.canonical_string_path()),
                None => "?".to_owned(),
            },
            TypeKind::TypeVariable => self.path.clone(),
            TypeKind::Void => "()".to_owned(),
            TypeKind::Error => "<error>".to_owned(),
        }
    }

    /// Path of the type without its arguments, what declaration lookups key
    /// on.
    pub fn erasure(&self) -> String {
        match self.kind {
            TypeKind::Declared => match self.root {
                TypeRoot::GLOBAL => format!("::{}", self.path),
                TypeRoot::CRATE => format!("::{}::{}", self.field_crate, self.path),
                _ => panic!("erasure: declared type with no root"),
            },
            _ => self.canonical_string_path(),
        }
    }

    /// Human readable form.
    pub fn readable(&self) -> String {
        let prefix = if self.trait_object { "dyn " } else { "" };
        format!("{}{}", prefix, self.canonical_string_path())
    }

    fn path_with_args(&self) -> String {
        let prefix = if self.trait_object { "dyn " } else { "" };
        if self.args.is_empty() {
            return format!("{}{}", prefix, self.path);
        }
        let args = self
            .args
            .iter()
            .map(TypeData::canonical_string_path)
            .collect::<Vec<String>>()
            .join(",");
        format!("{}{}<{}>", prefix, self.path, args)
    }

    fn identity_string(&self) -> String {
        format!("{:?}|{}", self.kind, self.canonical_string_path())
    }

    /// Canonical form used for key identity. Bare primitives become their
    /// declared `std::primitive::*` counterpart so a request for `i32` and a
    /// binding of the canonicalized form meet at the same key. Idempotent.
    pub fn normalize(&self) -> TypeData {
        let mut result = self.clone();
        if self.kind == TypeKind::Primitive {
            result.root = TypeRoot::GLOBAL;
            result.kind = TypeKind::Declared;
            result.path = format!("std::primitive::{}", self.path);
        }
        result.args = self.args.iter().map(TypeData::normalize).collect();
        result
    }

    pub fn is_same_type(&self, other: &TypeData) -> bool {
        self.normalize().eq(&other.normalize())
    }

    /// Component type of an array, `None` otherwise.
    pub fn component_type(&self) -> Option<&TypeData> {
        match self.kind {
            TypeKind::Array => self.args.first(),
            _ => None,
        }
    }

    /// Upper bound of a wildcard, `None` for unbounded or non-wildcards.
    pub fn bound(&self) -> Option<&TypeData> {
        match self.kind {
            TypeKind::Wildcard => self.args.first(),
            _ => None,
        }
    }

    /// Whether the type still mentions a type variable anywhere.
    pub fn has_type_variables(&self) -> bool {
        if self.kind == TypeKind::TypeVariable {
            return true;
        }
        self.args.iter().any(TypeData::has_type_variables)
    }

    /// Replaces type variables by name, the `asMemberOf` analog for
    /// resolving a generic declaration at a concrete use site.
    pub fn substitute(&self, assignments: &HashMap<String, TypeData>) -> TypeData {
        if self.kind == TypeKind::TypeVariable {
            if let Some(assigned) = assignments.get(&self.path) {
                return assigned.clone();
            }
            return self.clone();
        }
        let mut result = self.clone();
        result.args = self
            .args
            .iter()
            .map(|arg| arg.substitute(assignments))
            .collect();
        result
    }

    /// Nominal assignability: same erasure, with wildcard arguments on the
    /// target absorbing anything within their bound.
    pub fn is_assignable_to(&self, target: &TypeData) -> bool {
        if target.kind == TypeKind::Wildcard {
            return match target.bound() {
                Some(bound) => self.is_assignable_to(bound),
                None => true,
            };
        }
        if self.normalize().erasure() != target.normalize().erasure() {
            return false;
        }
        if self.args.len() != target.args.len() {
            return false;
        }
        self.args
            .iter()
            .zip(target.args.iter())
            .all(|(arg, target_arg)| arg.is_assignable_to(target_arg))
    }
}

lazy_static! {
    /// primitive data types with no path
    pub static ref PRIMITIVES: HashSet<String> = {
        let mut m = HashSet::<String>::new();
        m.insert("i8".to_owned());
        m.insert("u8".to_owned());
        m.insert("i16".to_owned());
        m.insert("u16".to_owned());
        m.insert("i32".to_owned());
        m.insert("u32".to_owned());
        m.insert("i64".to_owned());
        m.insert("u64".to_owned());
        m.insert("i128".to_owned());
        m.insert("u128".to_owned());
        m.insert("isize".to_owned());
        m.insert("usize".to_owned());
        m.insert("f32".to_owned());
        m.insert("f64".to_owned());
        m.insert("bool".to_owned());
        m.insert("char".to_owned());
        m
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_boxes_primitives() {
        let normalized = TypeData::primitive("i32").normalize();
        assert_eq!(normalized.canonical_string_path(), "::std::primitive::i32");
    }

    #[test]
    fn normalize_idempotent() {
        let once = TypeData::primitive("bool").normalize();
        assert_eq!(once.normalize(), once);
    }

    #[test]
    fn normalize_recurses_into_args() {
        let set = TypeData::global_with_args(
            "std::collections::HashSet",
            vec![TypeData::primitive("u8")],
        );
        assert_eq!(
            set.normalize().args[0].canonical_string_path(),
            "::std::primitive::u8"
        );
    }

    #[test]
    fn structural_equality_ignores_crate_root_spelling() {
        let a = TypeData::global("game::Renderer");
        let mut b = TypeData::new();
        b.root = TypeRoot::CRATE;
        b.kind = TypeKind::Declared;
        b.field_crate = "game".to_owned();
        b.path = "Renderer".to_owned();
        assert_eq!(a, b);
    }

    #[test]
    fn substitute_replaces_type_variables() {
        let mut assignments = HashMap::new();
        assignments.insert("T".to_owned(), TypeData::global("game::Renderer"));
        let generic =
            TypeData::global_with_args("game::Holder", vec![TypeData::type_variable("T")]);
        let substituted = generic.substitute(&assignments);
        assert_eq!(
            substituted.args[0].canonical_string_path(),
            "::game::Renderer"
        );
        assert!(!substituted.has_type_variables());
    }
}
