//! Service descriptor model
//!
//! A [`ServiceDescriptor`] is the static, typed description of a remote
//! actor: its methods, their argument and return types, and whether each
//! method is a read-only query or a state-mutating update. Argument types are
//! expressed in a small closed grammar ([`TypeSpec`]) that the field deriver
//! walks structurally.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod fields;

pub use fields::{ArgumentField, DynamicField, FieldShape, InputKind, NestedField, derive_fields};

/// Stable content hash of a descriptor
pub type DescriptorFingerprint = String;

/// Query/update classification of a remote method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Read-only call, safe to retry or refresh automatically
    Query,
    /// State-mutating call, executed only on explicit trigger
    Update,
}

impl MethodKind {
    /// True for read-only methods
    pub fn is_query(self) -> bool {
        matches!(self, MethodKind::Query)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Query => write!(f, "query"),
            MethodKind::Update => write!(f, "update"),
        }
    }
}

/// Argument and return types understood by the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSpec {
    /// Unit value
    Null,
    /// Boolean
    Bool,
    /// Unbounded natural number
    Nat,
    /// Unbounded integer
    Int,
    /// 8-bit natural
    Nat8,
    /// 16-bit natural
    Nat16,
    /// 32-bit natural
    Nat32,
    /// 64-bit natural
    Nat64,
    /// 8-bit integer
    Int8,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// UTF-8 text
    Text,
    /// Principal identifier
    Principal,
    /// Value that is accepted and ignored
    Reserved,
    /// Uninhabited type
    Empty,
    /// Optional value
    Opt(Box<TypeSpec>),
    /// Homogeneous sequence
    Vec(Box<TypeSpec>),
    /// Labelled product
    Record(Vec<FieldSpec>),
    /// Labelled sum
    Variant(Vec<FieldSpec>),
    /// Positional product
    Tuple(Vec<TypeSpec>),
    /// Reference into the descriptor's named type table (may be recursive)
    Named(String),
    /// Function reference
    Func,
    /// Service reference
    Service,
}

impl TypeSpec {
    /// Shorthand for `opt inner`
    pub fn opt(inner: TypeSpec) -> Self {
        TypeSpec::Opt(Box::new(inner))
    }

    /// Shorthand for `vec inner`
    pub fn vec(inner: TypeSpec) -> Self {
        TypeSpec::Vec(Box::new(inner))
    }

    /// Shorthand for a named type reference
    pub fn named(name: impl Into<String>) -> Self {
        TypeSpec::Named(name.into())
    }

    /// Short human-readable name used in labels and error messages
    pub fn type_name(&self) -> String {
        match self {
            TypeSpec::Null => "null".into(),
            TypeSpec::Bool => "bool".into(),
            TypeSpec::Nat => "nat".into(),
            TypeSpec::Int => "int".into(),
            TypeSpec::Nat8 => "nat8".into(),
            TypeSpec::Nat16 => "nat16".into(),
            TypeSpec::Nat32 => "nat32".into(),
            TypeSpec::Nat64 => "nat64".into(),
            TypeSpec::Int8 => "int8".into(),
            TypeSpec::Int16 => "int16".into(),
            TypeSpec::Int32 => "int32".into(),
            TypeSpec::Int64 => "int64".into(),
            TypeSpec::Float32 => "float32".into(),
            TypeSpec::Float64 => "float64".into(),
            TypeSpec::Text => "text".into(),
            TypeSpec::Principal => "principal".into(),
            TypeSpec::Reserved => "reserved".into(),
            TypeSpec::Empty => "empty".into(),
            TypeSpec::Opt(inner) => format!("opt {}", inner.type_name()),
            TypeSpec::Vec(inner) => format!("vec {}", inner.type_name()),
            TypeSpec::Record(_) => "record".into(),
            TypeSpec::Variant(_) => "variant".into(),
            TypeSpec::Tuple(items) => format!("tuple({})", items.len()),
            TypeSpec::Named(name) => name.clone(),
            TypeSpec::Func => "func".into(),
            TypeSpec::Service => "service".into(),
        }
    }
}

/// Labelled member of a record or variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field or case label
    pub label: String,
    /// Field type
    pub ty: TypeSpec,
}

impl FieldSpec {
    /// Create a labelled field
    pub fn new(label: impl Into<String>, ty: TypeSpec) -> Self {
        Self {
            label: label.into(),
            ty,
        }
    }
}

/// One positional argument of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Declared argument name, if the interface names it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument type
    pub ty: TypeSpec,
}

impl ArgumentSpec {
    /// Named argument
    pub fn named(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    /// Unnamed positional argument
    pub fn positional(ty: TypeSpec) -> Self {
        Self { name: None, ty }
    }
}

/// A single invocable method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name as exposed by the actor
    pub name: String,
    /// Query or update
    pub kind: MethodKind,
    /// Ordered argument types
    #[serde(default)]
    pub argument_types: Vec<ArgumentSpec>,
    /// Return type
    pub return_type: TypeSpec,
}

impl MethodDescriptor {
    /// Describe a query method
    pub fn query(
        name: impl Into<String>,
        argument_types: Vec<ArgumentSpec>,
        return_type: TypeSpec,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Query,
            argument_types,
            return_type,
        }
    }

    /// Describe an update method
    pub fn update(
        name: impl Into<String>,
        argument_types: Vec<ArgumentSpec>,
        return_type: TypeSpec,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Update,
            argument_types,
            return_type,
        }
    }
}

/// Typed description of a remote actor's interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Identifier of the remote service (canister id)
    pub canister_id: String,
    /// Methods in declaration order
    pub methods: Vec<MethodDescriptor>,
    /// Named type table referenced by [`TypeSpec::Named`]
    #[serde(default)]
    pub types: BTreeMap<String, TypeSpec>,
}

impl ServiceDescriptor {
    /// Create an empty descriptor for the given service
    pub fn new(canister_id: impl Into<String>) -> Self {
        Self {
            canister_id: canister_id.into(),
            methods: Vec::new(),
            types: BTreeMap::new(),
        }
    }

    /// Append a method, keeping declaration order
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Register a named type
    pub fn with_type(mut self, name: impl Into<String>, ty: TypeSpec) -> Self {
        self.types.insert(name.into(), ty);
        self
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Resolve a named type
    pub fn resolve(&self, name: &str) -> Option<&TypeSpec> {
        self.types.get(name)
    }

    /// Method names in declaration order
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|method| method.name.as_str())
    }

    /// Parse a descriptor from its JSON form
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Content hash over the canonical JSON encoding.
    ///
    /// Two descriptors with the same fingerprint describe the same interface,
    /// so stores keyed on it are shared.
    pub fn fingerprint(&self) -> DescriptorFingerprint {
        let mut hasher = Hasher::new();
        hasher.update(self.canister_id.as_bytes());
        hasher.update(b"|");
        // BTreeMap keeps the type table ordered, so the encoding is stable
        let encoded = match serde_json::to_vec(&(&self.methods, &self.types)) {
            Ok(encoded) => encoded,
            Err(err) => {
                // string-keyed maps and derived impls only; not expected to fail
                tracing::warn!(error = %err, "descriptor encoding failed, hashing debug form");
                format!("{:?}", (&self.methods, &self.types)).into_bytes()
            }
        };
        hasher.update(&encoded);
        format!("{}", hasher.finalize().to_hex())
    }
}
