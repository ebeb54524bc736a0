//! Dynamic field derivation
//!
//! Walks a [`ServiceDescriptor`] and produces, per method, a UI-agnostic
//! description of every argument: its label, its type, a default value and
//! a nested [`FieldShape`] that a generic form renderer can follow. The
//! derivation is a pure structural recursion over [`TypeSpec`]; nothing is
//! cached and no shared state is touched, so it is safe to call per render.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MethodDescriptor, MethodKind, ServiceDescriptor, TypeSpec};
use crate::error::UnsupportedTypeError;

/// Leaf input widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Free text
    Text,
    /// Integral number
    Integer,
    /// Floating point number
    Float,
    /// Checkbox
    Boolean,
    /// Principal identifier, entered as text
    Principal,
    /// Raw bytes (`vec nat8`)
    Blob,
    /// Unit, no input needed
    Null,
}

/// Shape of a (possibly nested) field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "shape")]
pub enum FieldShape {
    /// Primitive input
    Input {
        /// Widget kind
        input: InputKind,
        /// Declared type name (e.g. `nat64`)
        type_name: String,
    },
    /// All members are filled
    Record {
        /// Members in declared order
        fields: Vec<NestedField>,
    },
    /// Exactly one case is chosen
    Variant {
        /// Cases in declared order
        options: Vec<NestedField>,
    },
    /// Value may be omitted
    Optional {
        /// Shape when present
        inner: Box<FieldShape>,
    },
    /// Repeated entries
    Vector {
        /// Shape of a single entry
        item: Box<FieldShape>,
    },
    /// Back-reference to a named type already being expanded
    Recursive {
        /// Name of the referenced type
        name: String,
    },
}

/// Named member inside a record, variant or tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedField {
    /// Member label
    pub label: String,
    /// Member shape
    pub shape: FieldShape,
    /// Value a fresh form starts with
    pub default_value: Value,
}

/// Top-level argument of a method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentField {
    /// Argument label (declared name or `argN`)
    pub label: String,
    /// Declared argument type
    pub type_spec: TypeSpec,
    /// Value a fresh form starts with
    pub default_value: Value,
    /// Nested field description
    pub shape: FieldShape,
}

/// Form description for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicField {
    /// Method the form invokes
    pub method_name: String,
    /// Query or update
    pub kind: MethodKind,
    /// Arguments in declared order
    pub argument_fields: Vec<ArgumentField>,
}

impl DynamicField {
    /// Default argument tuple, ready to pass to a call
    pub fn default_args(&self) -> Vec<Value> {
        self.argument_fields
            .iter()
            .map(|field| field.default_value.clone())
            .collect()
    }
}

/// Derive form descriptions for every method, in declaration order.
///
/// Fails on the first argument whose type cannot be represented rather than
/// returning a truncated field list.
pub fn derive_fields(
    descriptor: &ServiceDescriptor,
) -> Result<Vec<DynamicField>, UnsupportedTypeError> {
    descriptor
        .methods
        .iter()
        .map(|method| derive_method_field(descriptor, method))
        .collect()
}

/// Derive the form description of a single method.
pub fn derive_method_field(
    descriptor: &ServiceDescriptor,
    method: &MethodDescriptor,
) -> Result<DynamicField, UnsupportedTypeError> {
    let mut argument_fields = Vec::with_capacity(method.argument_types.len());

    for (index, argument) in method.argument_types.iter().enumerate() {
        let label = argument
            .name
            .clone()
            .unwrap_or_else(|| format!("arg{index}"));

        let mut walker = Walker {
            descriptor,
            method: &method.name,
            argument: &label,
            expanding: Vec::new(),
        };
        let (shape, default_value) = walker.walk(&argument.ty, &label)?;

        argument_fields.push(ArgumentField {
            label,
            type_spec: argument.ty.clone(),
            default_value,
            shape,
        });
    }

    Ok(DynamicField {
        method_name: method.name.clone(),
        kind: method.kind,
        argument_fields,
    })
}

struct Walker<'a> {
    descriptor: &'a ServiceDescriptor,
    method: &'a str,
    argument: &'a str,
    // named types on the current path, used to cut recursion
    expanding: Vec<String>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        ty: &TypeSpec,
        path: &str,
    ) -> Result<(FieldShape, Value), UnsupportedTypeError> {
        let result = match ty {
            TypeSpec::Null => (input(InputKind::Null, ty), Value::Null),
            TypeSpec::Bool => (input(InputKind::Boolean, ty), Value::Bool(false)),
            TypeSpec::Nat
            | TypeSpec::Int
            | TypeSpec::Nat8
            | TypeSpec::Nat16
            | TypeSpec::Nat32
            | TypeSpec::Nat64
            | TypeSpec::Int8
            | TypeSpec::Int16
            | TypeSpec::Int32
            | TypeSpec::Int64 => (input(InputKind::Integer, ty), Value::from(0)),
            TypeSpec::Float32 | TypeSpec::Float64 => {
                (input(InputKind::Float, ty), Value::from(0.0))
            }
            TypeSpec::Text => (input(InputKind::Text, ty), Value::String(String::new())),
            TypeSpec::Principal => {
                (input(InputKind::Principal, ty), Value::String(String::new()))
            }
            TypeSpec::Vec(inner) if **inner == TypeSpec::Nat8 => {
                (input(InputKind::Blob, ty), Value::Array(Vec::new()))
            }
            TypeSpec::Opt(inner) => {
                let (shape, _) = self.walk(inner, &format!("{path}.?"))?;
                (
                    FieldShape::Optional {
                        inner: Box::new(shape),
                    },
                    Value::Null,
                )
            }
            TypeSpec::Vec(inner) => {
                let (shape, _) = self.walk(inner, &format!("{path}[]"))?;
                (
                    FieldShape::Vector {
                        item: Box::new(shape),
                    },
                    Value::Array(Vec::new()),
                )
            }
            TypeSpec::Record(members) => {
                let mut fields = Vec::with_capacity(members.len());
                let mut defaults = Map::new();
                for member in members {
                    let (shape, default_value) =
                        self.walk(&member.ty, &format!("{path}.{}", member.label))?;
                    defaults.insert(member.label.clone(), default_value.clone());
                    fields.push(NestedField {
                        label: member.label.clone(),
                        shape,
                        default_value,
                    });
                }
                (FieldShape::Record { fields }, Value::Object(defaults))
            }
            TypeSpec::Tuple(items) => {
                let mut fields = Vec::with_capacity(items.len());
                let mut defaults = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let (shape, default_value) = self.walk(item, &format!("{path}.{index}"))?;
                    defaults.push(default_value.clone());
                    fields.push(NestedField {
                        label: index.to_string(),
                        shape,
                        default_value,
                    });
                }
                (FieldShape::Record { fields }, Value::Array(defaults))
            }
            TypeSpec::Variant(cases) => {
                if cases.is_empty() {
                    return Err(self.unsupported(path, "variant has no cases"));
                }
                let mut options = Vec::with_capacity(cases.len());
                for case in cases {
                    let (shape, default_value) =
                        self.walk(&case.ty, &format!("{path}.{}", case.label))?;
                    options.push(NestedField {
                        label: case.label.clone(),
                        shape,
                        default_value,
                    });
                }
                // first case is preselected
                let mut selected = Map::new();
                selected.insert(options[0].label.clone(), options[0].default_value.clone());
                (FieldShape::Variant { options }, Value::Object(selected))
            }
            TypeSpec::Named(name) => {
                if self.expanding.iter().any(|open| open == name) {
                    return Ok((FieldShape::Recursive { name: name.clone() }, Value::Null));
                }
                let descriptor = self.descriptor;
                let Some(resolved) = descriptor.resolve(name) else {
                    return Err(self.unsupported(path, &format!("type `{name}` is not defined")));
                };
                self.expanding.push(name.clone());
                let walked = self.walk(resolved, path);
                self.expanding.pop();
                walked?
            }
            TypeSpec::Reserved | TypeSpec::Empty | TypeSpec::Func | TypeSpec::Service => {
                return Err(self.unsupported(
                    path,
                    &format!("`{}` values cannot be entered in a form", ty.type_name()),
                ));
            }
        };
        Ok(result)
    }

    fn unsupported(&self, path: &str, reason: &str) -> UnsupportedTypeError {
        UnsupportedTypeError {
            method: self.method.to_string(),
            argument: self.argument.to_string(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn input(kind: InputKind, ty: &TypeSpec) -> FieldShape {
    FieldShape::Input {
        input: kind,
        type_name: ty.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{ArgumentSpec, FieldSpec};

    fn descriptor_with(arg: TypeSpec) -> ServiceDescriptor {
        ServiceDescriptor::new("aaaaa-aa").with_method(MethodDescriptor::update(
            "submit",
            vec![ArgumentSpec::named("payload", arg)],
            TypeSpec::Null,
        ))
    }

    #[test]
    fn test_primitive_defaults() {
        let descriptor = ServiceDescriptor::new("aaaaa-aa").with_method(MethodDescriptor::query(
            "sample",
            vec![
                ArgumentSpec::positional(TypeSpec::Text),
                ArgumentSpec::positional(TypeSpec::Nat64),
                ArgumentSpec::positional(TypeSpec::Bool),
                ArgumentSpec::positional(TypeSpec::opt(TypeSpec::Text)),
                ArgumentSpec::positional(TypeSpec::vec(TypeSpec::Nat8)),
            ],
            TypeSpec::Null,
        ));

        let fields = derive_fields(&descriptor).unwrap();
        let sample = &fields[0];
        let labels: Vec<_> = sample.argument_fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["arg0", "arg1", "arg2", "arg3", "arg4"]);
        assert_eq!(
            sample.default_args(),
            vec![
                Value::String(String::new()),
                Value::from(0),
                Value::Bool(false),
                Value::Null,
                Value::Array(vec![]),
            ]
        );
        assert_eq!(
            sample.argument_fields[4].shape,
            FieldShape::Input {
                input: InputKind::Blob,
                type_name: "vec nat8".into()
            }
        );
    }

    #[test]
    fn test_variant_defaults_to_first_case() {
        let descriptor = descriptor_with(TypeSpec::Variant(vec![
            FieldSpec::new("Text", TypeSpec::Text),
            FieldSpec::new("Nat", TypeSpec::Nat),
        ]));
        let field = &derive_fields(&descriptor).unwrap()[0].argument_fields[0];
        assert_eq!(field.default_value, serde_json::json!({"Text": ""}));
        match &field.shape {
            FieldShape::Variant { options } => assert_eq!(options.len(), 2),
            other => panic!("expected variant, got {other:?}"),
        }
    }

    #[test]
    fn test_recursive_type_is_cut() {
        let descriptor = descriptor_with(TypeSpec::named("Tree")).with_type(
            "Tree",
            TypeSpec::Record(vec![
                FieldSpec::new("value", TypeSpec::Int),
                FieldSpec::new("children", TypeSpec::vec(TypeSpec::named("Tree"))),
            ]),
        );

        let field = &derive_fields(&descriptor).unwrap()[0].argument_fields[0];
        let FieldShape::Record { fields } = &field.shape else {
            panic!("expected record");
        };
        assert_eq!(
            fields[1].shape,
            FieldShape::Vector {
                item: Box::new(FieldShape::Recursive {
                    name: "Tree".into()
                })
            }
        );
    }

    #[test]
    fn test_sibling_references_are_expanded() {
        // the same named type used twice side by side is not recursion
        let descriptor = descriptor_with(TypeSpec::Tuple(vec![
            TypeSpec::named("Amount"),
            TypeSpec::named("Amount"),
        ]))
        .with_type("Amount", TypeSpec::Nat);

        let field = &derive_fields(&descriptor).unwrap()[0].argument_fields[0];
        assert_eq!(field.default_value, serde_json::json!([0, 0]));
    }

    #[test]
    fn test_unsupported_nested_type_reports_path() {
        let descriptor = descriptor_with(TypeSpec::Record(vec![FieldSpec::new(
            "callback",
            TypeSpec::opt(TypeSpec::Func),
        )]));

        let err = derive_fields(&descriptor).unwrap_err();
        assert_eq!(err.method, "submit");
        assert_eq!(err.argument, "payload");
        assert_eq!(err.path, "payload.callback.?");
    }

    #[test]
    fn test_undefined_named_type() {
        let descriptor = descriptor_with(TypeSpec::named("Missing"));
        let err = derive_fields(&descriptor).unwrap_err();
        assert!(err.reason.contains("Missing"));
    }
}
