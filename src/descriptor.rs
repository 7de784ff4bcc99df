//! Type descriptors and the annotation resolver.
//!
//! Rust has no runtime reflection over type annotations, so the "annotation"
//! a tool author writes is itself an explicit value: a [`TypeExpr`]. The
//! resolver normalizes a `TypeExpr` into a canonical [`TypeDescriptor`],
//! which is what the schema compiler and the argument materializer operate
//! on. Resolution is a pure function of the annotation's structural shape.
//!
//! # Structured records
//!
//! Record-like shapes (a validated model, a typed mapping, a named field
//! tuple) are all polymorphic over one capability, [`RecordShape`]: ordered
//! named fields, each with a type, an optional default, and an optional
//! description. A shape's field list is deferred behind a `OnceLock` so a
//! record can mention itself — or another record that mentions it back —
//! after its `Arc` already exists:
//!
//! ```rust
//! use toolspec::{ModelShape, FieldDecl, TypeExpr, resolve};
//!
//! let node = ModelShape::new("Node");
//! node.define([
//!     FieldDecl::new("value", TypeExpr::integer()),
//!     FieldDecl::new("next", TypeExpr::optional(TypeExpr::record(node.clone()))),
//! ]);
//!
//! // Legal: the self-reference sits behind an Optional boundary.
//! let descriptor = resolve(&TypeExpr::record(node)).unwrap();
//! # let _ = descriptor;
//! ```
//!
//! # Cycle rule
//!
//! A record that contains itself as a direct value type can never be
//! satisfied by finite data, so resolving it fails with
//! [`Error::RecursiveType`](crate::Error::RecursiveType). The same reference
//! wrapped in an `Optional` or a collection is fine: those boundaries let the
//! data terminate (`next: Optional[Node]` ends at null). The resolver tracks
//! the records on the current resolution path and whether a terminating
//! boundary was crossed since each was entered; a legal re-entry reuses the
//! in-progress [`StructuredType`] `Arc`, producing a cyclic descriptor
//! *graph* rather than an infinite tree.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Display form of the annotation shapes the resolver accepts.
/// Reported in `UnsupportedType` errors.
pub const SUPPORTED_ANNOTATIONS: &str =
    "string | integer | number | boolean | list[_] | set[_] | optional[_] | enum | literal | record";

/// The four scalar kinds a primitive parameter can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// UTF-8 text
    String,
    /// Whole number
    Integer,
    /// Floating point number (accepts integral values too)
    Number,
    /// True/false
    Boolean,
}

impl ScalarKind {
    /// The JSON Schema `type` string for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

/// An owned scalar literal, as used by enumerations and literal sets.
///
/// Equality is exact and case-sensitive: `"Celsius"` and `"celsius"` are
/// different members.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
}

impl Scalar {
    /// The scalar kind this literal belongs to.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Str(_) => ScalarKind::String,
            Scalar::Int(_) => ScalarKind::Integer,
            Scalar::Float(_) => ScalarKind::Number,
            Scalar::Bool(_) => ScalarKind::Boolean,
        }
    }

    /// Convert to a JSON value (for `enum` lists in emitted schemas).
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Value::from(*f),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }

    /// Exact membership test against a raw JSON value.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Str(s), Value::String(v)) => s == v,
            (Scalar::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (Scalar::Float(f), Value::Number(n)) => n.as_f64() == Some(*f),
            (Scalar::Bool(b), Value::Bool(v)) => b == v,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{s}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A type annotation as written by a tool author.
///
/// This is the input to [`resolve`]. Convenience constructors are provided
/// so definitions read naturally:
///
/// ```rust
/// use toolspec::TypeExpr;
///
/// let tags = TypeExpr::set_of(TypeExpr::string());
/// let unit = TypeExpr::literal(["celsius", "fahrenheit"]);
/// let retries = TypeExpr::optional(TypeExpr::integer());
/// # let _ = (tags, unit, retries);
/// ```
#[derive(Clone)]
pub enum TypeExpr {
    /// Text
    String,
    /// Whole number
    Integer,
    /// Floating point number
    Number,
    /// True/false
    Boolean,
    /// Ordered homogeneous collection
    List(Box<TypeExpr>),
    /// Unordered homogeneous collection with unique elements
    Set(Box<TypeExpr>),
    /// Value may be null/absent
    Optional(Box<TypeExpr>),
    /// Closed set of named members (declaration order preserved)
    Enumeration(Vec<Scalar>),
    /// Scalar constrained to a closed literal set (declaration order preserved)
    Literal(Vec<Scalar>),
    /// Structured record of named fields
    Record(Arc<dyn RecordShape>),
}

impl TypeExpr {
    /// A string annotation.
    pub fn string() -> Self {
        TypeExpr::String
    }

    /// An integer annotation.
    pub fn integer() -> Self {
        TypeExpr::Integer
    }

    /// A number (float) annotation.
    pub fn number() -> Self {
        TypeExpr::Number
    }

    /// A boolean annotation.
    pub fn boolean() -> Self {
        TypeExpr::Boolean
    }

    /// An ordered list of `element`.
    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List(Box::new(element))
    }

    /// An unordered, unique set of `element`.
    pub fn set_of(element: TypeExpr) -> Self {
        TypeExpr::Set(Box::new(element))
    }

    /// An optional `inner` (null or absent passes through as unset).
    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    /// A closed enumeration over the given members, in declaration order.
    pub fn enumeration<S: Into<Scalar>>(members: impl IntoIterator<Item = S>) -> Self {
        TypeExpr::Enumeration(members.into_iter().map(Into::into).collect())
    }

    /// A scalar constrained to the given literal values, in declaration order.
    pub fn literal<S: Into<Scalar>>(values: impl IntoIterator<Item = S>) -> Self {
        TypeExpr::Literal(values.into_iter().map(Into::into).collect())
    }

    /// A structured record annotation.
    pub fn record(shape: Arc<dyn RecordShape>) -> Self {
        TypeExpr::Record(shape)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::String => f.write_str("string"),
            TypeExpr::Integer => f.write_str("integer"),
            TypeExpr::Number => f.write_str("number"),
            TypeExpr::Boolean => f.write_str("boolean"),
            TypeExpr::List(el) => write!(f, "list[{el}]"),
            TypeExpr::Set(el) => write!(f, "set[{el}]"),
            TypeExpr::Optional(inner) => write!(f, "optional[{inner}]"),
            TypeExpr::Enumeration(members) => {
                write!(f, "enum[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{m}")?;
                }
                f.write_str("]")
            }
            TypeExpr::Literal(values) => {
                write!(f, "literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            TypeExpr::Record(shape) => write!(f, "record '{}'", shape.name()),
        }
    }
}

impl fmt::Debug for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeExpr({self})")
    }
}

/// One declared field of a structured record (or one tool parameter).
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type annotation
    pub type_expr: TypeExpr,
    /// Default value, if any. A field with a default is never required.
    pub default: Option<Value>,
    /// Human-readable description carried into the schema
    pub description: Option<String>,
}

impl FieldDecl {
    /// Declare a field with no default and no description.
    pub fn new(name: impl Into<String>, type_expr: TypeExpr) -> Self {
        Self {
            name: name.into(),
            type_expr,
            default: None,
            description: None,
        }
    }

    /// Attach a default value. The field becomes optional to callers; the
    /// default is coerced through the same rules as a supplied value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach a description, surfaced in derived schemas.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// The single capability every record-like native shape implements:
/// ordered named fields with per-field type and optional default, plus a way
/// to construct the native value from materialized field values.
pub trait RecordShape: Send + Sync {
    /// Record name (used in schemas and error messages).
    fn name(&self) -> &str;

    /// Record-level description, if any.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Declared fields, or `None` if the record has not been defined yet.
    /// Definitions are deferred so records can reference each other.
    fn fields(&self) -> Option<&[FieldDecl]>;

    /// Build the native value from materialized field values.
    /// Invoking a record tool is exactly this construction; no code runs.
    fn construct(&self, values: Map<String, Value>) -> Value;
}

/// Shared storage for the three record adapters.
struct RecordInner {
    name: String,
    description: Option<String>,
    fields: OnceLock<Vec<FieldDecl>>,
}

impl RecordInner {
    fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            fields: OnceLock::new(),
        }
    }

    fn define(&self, fields: impl IntoIterator<Item = FieldDecl>) {
        // First definition wins; redefining an already-defined record is a no-op.
        let _ = self.fields.set(fields.into_iter().collect());
    }

    fn fields(&self) -> Option<&[FieldDecl]> {
        self.fields.get().map(Vec::as_slice)
    }
}

/// Validated-model record adapter.
///
/// Constructs a JSON object in which every declared field is present:
/// absent optional fields are filled from their default, or null.
pub struct ModelShape {
    inner: RecordInner,
}

impl ModelShape {
    /// Create an (as yet field-less) model record.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, None),
        })
    }

    /// Create a model record with a description.
    pub fn with_description(name: impl Into<String>, description: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, Some(description.into())),
        })
    }

    /// Define the record's fields. May be called after `Arc`s to this record
    /// are already embedded in other annotations (self/mutual reference).
    pub fn define(&self, fields: impl IntoIterator<Item = FieldDecl>) {
        self.inner.define(fields);
    }
}

impl RecordShape for ModelShape {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    fn fields(&self) -> Option<&[FieldDecl]> {
        self.inner.fields()
    }

    fn construct(&self, mut values: Map<String, Value>) -> Value {
        let mut out = Map::new();
        for decl in self.fields().unwrap_or(&[]) {
            let value = values
                .remove(&decl.name)
                .or_else(|| decl.default.clone())
                .unwrap_or(Value::Null);
            out.insert(decl.name.clone(), value);
        }
        Value::Object(out)
    }
}

/// Typed-mapping record adapter.
///
/// Constructs a plain JSON object holding exactly the supplied (and
/// defaulted) keys; absent optional fields stay absent.
pub struct TypedMapShape {
    inner: RecordInner,
}

impl TypedMapShape {
    /// Create an (as yet field-less) typed mapping record.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, None),
        })
    }

    /// Create a typed mapping record with a description.
    pub fn with_description(name: impl Into<String>, description: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, Some(description.into())),
        })
    }

    /// Define the record's fields.
    pub fn define(&self, fields: impl IntoIterator<Item = FieldDecl>) {
        self.inner.define(fields);
    }
}

impl RecordShape for TypedMapShape {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    fn fields(&self) -> Option<&[FieldDecl]> {
        self.inner.fields()
    }

    fn construct(&self, values: Map<String, Value>) -> Value {
        Value::Object(values)
    }
}

/// Named-field-tuple record adapter.
///
/// Constructs a JSON array of the field values in declaration order, so the
/// positions stay meaningful; absent optional fields are filled from their
/// default, or null, to keep positions stable.
pub struct FieldTupleShape {
    inner: RecordInner,
}

impl FieldTupleShape {
    /// Create an (as yet field-less) field tuple record.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, None),
        })
    }

    /// Create a field tuple record with a description.
    pub fn with_description(name: impl Into<String>, description: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RecordInner::new(name, Some(description.into())),
        })
    }

    /// Define the record's fields.
    pub fn define(&self, fields: impl IntoIterator<Item = FieldDecl>) {
        self.inner.define(fields);
    }
}

impl RecordShape for FieldTupleShape {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    fn fields(&self) -> Option<&[FieldDecl]> {
        self.inner.fields()
    }

    fn construct(&self, mut values: Map<String, Value>) -> Value {
        let elements = self
            .fields()
            .unwrap_or(&[])
            .iter()
            .map(|decl| {
                values
                    .remove(&decl.name)
                    .or_else(|| decl.default.clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        Value::Array(elements)
    }
}

/// Canonical, resolved form of a type annotation.
///
/// This is what the schema compiler and the materializer consume. Structured
/// variants share their [`StructuredType`] through an `Arc`, so a descriptor
/// is a graph: legal self-references (through an Optional or collection
/// boundary) point back at the same node instead of recursing forever.
#[derive(Clone, Debug)]
pub enum TypeDescriptor {
    /// Scalar of the given kind
    Primitive(ScalarKind),
    /// Homogeneous collection
    Collection {
        /// Element descriptor
        element: Box<TypeDescriptor>,
        /// Ordered (list) vs unordered (set) semantics
        ordered: bool,
        /// Elements must be unique (set semantics; emits `uniqueItems`)
        unique: bool,
    },
    /// Inner value or null/absent
    Optional(Box<TypeDescriptor>),
    /// Closed member set, declaration order
    Enumeration(Vec<Scalar>),
    /// Closed literal set, declaration order
    LiteralSet(Vec<Scalar>),
    /// Structured record of named fields
    Structured(Arc<StructuredType>),
}

impl TypeDescriptor {
    /// Short display name used in type-mismatch diagnostics.
    pub fn expected_name(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.json_type().to_string(),
            TypeDescriptor::Collection { .. } => "array".to_string(),
            TypeDescriptor::Optional(inner) => format!("{} or null", inner.expected_name()),
            TypeDescriptor::Enumeration(members) => {
                format!("one of {} members", members.len())
            }
            TypeDescriptor::LiteralSet(values) => {
                format!("one of {} literals", values.len())
            }
            TypeDescriptor::Structured(st) => format!("object ({})", st.name()),
        }
    }
}

/// A resolved structured record: named fields plus the shape that constructs
/// the native value.
pub struct StructuredType {
    name: String,
    description: Option<String>,
    shape: Arc<dyn RecordShape>,
    fields: OnceLock<Vec<FieldDescriptor>>,
}

impl StructuredType {
    /// Record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record-level description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resolved fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        // Set by the resolver before any descriptor escapes `resolve()`.
        self.fields
            .get()
            .map(Vec::as_slice)
            .expect("BUG: structured type observed before resolution completed")
    }

    /// Construct the native value via the underlying record shape.
    pub fn construct(&self, values: Map<String, Value>) -> Value {
        self.shape.construct(values)
    }
}

impl fmt::Debug for StructuredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields are omitted: they may point back at this very node.
        f.debug_struct("StructuredType")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// One resolved field of a structured record.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Resolved type
    pub ty: TypeDescriptor,
    /// True iff no default exists and the type is not Optional
    pub required: bool,
    /// Declared default value, if any
    pub default: Option<Value>,
    /// Field description, if any
    pub description: Option<String>,
}

/// Resolve an annotation into its canonical descriptor.
///
/// Pure function of the annotation's structural shape. Fails with
/// [`Error::UnsupportedType`](crate::Error::UnsupportedType) for malformed
/// enumerations/literal sets or undefined records, and with
/// [`Error::RecursiveType`](crate::Error::RecursiveType) when a record
/// contains itself as a direct value type.
pub fn resolve(expr: &TypeExpr) -> Result<TypeDescriptor> {
    let descriptor = Resolver::default().resolve(expr)?;
    verify_no_direct_cycles(&descriptor)?;
    Ok(descriptor)
}

/// Resolve a parameter list as one unit, so records shared between
/// parameters resolve to the same `Arc`. Used by the tool builder.
pub fn resolve_fields(decls: &[FieldDecl]) -> Result<Vec<FieldDescriptor>> {
    let mut resolver = Resolver::default();
    let mut out = Vec::with_capacity(decls.len());
    for decl in decls {
        resolver.field_path.push(decl.name.clone());
        let resolved = resolver.resolve(&decl.type_expr);
        resolver.field_path.pop();
        let ty = resolved?;
        let required = decl.default.is_none() && !matches!(ty, TypeDescriptor::Optional(_));
        out.push(FieldDescriptor {
            name: decl.name.clone(),
            ty,
            required,
            default: decl.default.clone(),
            description: decl.description.clone(),
        });
    }
    for field in &out {
        verify_no_direct_cycles(&field.ty)?;
    }
    Ok(out)
}

/// Reject any cycle made purely of direct (non-boundary) record edges in
/// the finished descriptor graph. The path check during resolution catches
/// most of these, but a record first reached through a boundary is
/// memoized, and a later direct use of it could otherwise close a cycle
/// that no finite value satisfies.
fn verify_no_direct_cycles(root: &TypeDescriptor) -> Result<()> {
    let mut nodes: Vec<Arc<StructuredType>> = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();
    collect_structured(root, &mut nodes, &mut seen);

    let mut done: HashSet<usize> = HashSet::new();
    let mut stack: Vec<usize> = Vec::new();
    for node in &nodes {
        if !done.contains(&(Arc::as_ptr(node) as usize)) {
            direct_cycle_dfs(node, &mut stack, &mut done)?;
        }
    }
    Ok(())
}

fn collect_structured(
    descriptor: &TypeDescriptor,
    nodes: &mut Vec<Arc<StructuredType>>,
    seen: &mut HashSet<usize>,
) {
    match descriptor {
        TypeDescriptor::Structured(st) => {
            if seen.insert(Arc::as_ptr(st) as usize) {
                nodes.push(st.clone());
                for field in st.fields() {
                    collect_structured(&field.ty, nodes, seen);
                }
            }
        }
        TypeDescriptor::Optional(inner) => collect_structured(inner, nodes, seen),
        TypeDescriptor::Collection { element, .. } => collect_structured(element, nodes, seen),
        _ => {}
    }
}

fn direct_cycle_dfs(
    st: &Arc<StructuredType>,
    stack: &mut Vec<usize>,
    done: &mut HashSet<usize>,
) -> Result<()> {
    let key = Arc::as_ptr(st) as usize;
    stack.push(key);
    for field in st.fields() {
        // Only edges with no Optional/Collection boundary can force
        // infinite data.
        if let TypeDescriptor::Structured(child) = &field.ty {
            let child_key = Arc::as_ptr(child) as usize;
            if stack.contains(&child_key) {
                return Err(Error::recursive_type(child.name(), field.name.as_str()));
            }
            if !done.contains(&child_key) {
                direct_cycle_dfs(child, stack, done)?;
            }
        }
    }
    stack.pop();
    done.insert(key);
    Ok(())
}

/// One entry on the resolution path. `Boundary` marks an Optional or
/// collection edge, which is what makes a record cycle legal.
enum PathEntry {
    Record(usize),
    Boundary,
}

#[derive(Default)]
struct Resolver {
    /// Records already resolved (or in progress), keyed by shape identity.
    resolved: HashMap<usize, Arc<StructuredType>>,
    /// Records and boundaries on the current descent path.
    path: Vec<PathEntry>,
    /// Field names on the current descent path, for error reporting.
    field_path: Vec<String>,
}

impl Resolver {
    fn resolve(&mut self, expr: &TypeExpr) -> Result<TypeDescriptor> {
        match expr {
            TypeExpr::String => Ok(TypeDescriptor::Primitive(ScalarKind::String)),
            TypeExpr::Integer => Ok(TypeDescriptor::Primitive(ScalarKind::Integer)),
            TypeExpr::Number => Ok(TypeDescriptor::Primitive(ScalarKind::Number)),
            TypeExpr::Boolean => Ok(TypeDescriptor::Primitive(ScalarKind::Boolean)),
            TypeExpr::List(element) => self.resolve_collection(element, true, false),
            TypeExpr::Set(element) => self.resolve_collection(element, false, true),
            TypeExpr::Optional(inner) => {
                self.path.push(PathEntry::Boundary);
                let resolved = self.resolve(inner);
                self.path.pop();
                let inner = resolved?;
                // Nested optionals collapse: optional[optional[T]] is optional[T].
                match inner {
                    TypeDescriptor::Optional(_) => Ok(inner),
                    other => Ok(TypeDescriptor::Optional(Box::new(other))),
                }
            }
            TypeExpr::Enumeration(members) => {
                self.check_scalar_set(expr, members)?;
                Ok(TypeDescriptor::Enumeration(members.clone()))
            }
            TypeExpr::Literal(values) => {
                self.check_scalar_set(expr, values)?;
                Ok(TypeDescriptor::LiteralSet(values.clone()))
            }
            TypeExpr::Record(shape) => self.resolve_record(shape),
        }
    }

    fn resolve_collection(
        &mut self,
        element: &TypeExpr,
        ordered: bool,
        unique: bool,
    ) -> Result<TypeDescriptor> {
        self.path.push(PathEntry::Boundary);
        let resolved = self.resolve(element);
        self.path.pop();
        Ok(TypeDescriptor::Collection {
            element: Box::new(resolved?),
            ordered,
            unique,
        })
    }

    /// Enumerations and literal sets must be non-empty and homogeneous.
    fn check_scalar_set(&self, expr: &TypeExpr, values: &[Scalar]) -> Result<()> {
        let Some(first) = values.first() else {
            return Err(Error::unsupported_type(
                format!("{expr} (empty value set)"),
                SUPPORTED_ANNOTATIONS,
            ));
        };
        if values.iter().any(|v| v.kind() != first.kind()) {
            return Err(Error::unsupported_type(
                format!("{expr} (values must be of the same scalar kind)"),
                SUPPORTED_ANNOTATIONS,
            ));
        }
        Ok(())
    }

    fn resolve_record(&mut self, shape: &Arc<dyn RecordShape>) -> Result<TypeDescriptor> {
        let key = Arc::as_ptr(shape) as *const () as usize;

        // Re-entry of a record currently being resolved: legal only if an
        // Optional/collection boundary lies between its frame and here.
        if let Some(pos) = self
            .path
            .iter()
            .position(|entry| matches!(entry, PathEntry::Record(k) if *k == key))
        {
            let crossed_boundary = self.path[pos + 1..]
                .iter()
                .any(|entry| matches!(entry, PathEntry::Boundary));
            if crossed_boundary {
                let in_progress = self
                    .resolved
                    .get(&key)
                    .expect("BUG: record on path but not in resolved map");
                return Ok(TypeDescriptor::Structured(in_progress.clone()));
            }
            let field = self.field_path.last().cloned().unwrap_or_default();
            return Err(Error::recursive_type(shape.name(), field));
        }

        // Already fully resolved elsewhere in this annotation.
        if let Some(done) = self.resolved.get(&key) {
            return Ok(TypeDescriptor::Structured(done.clone()));
        }

        let decls = shape.fields().ok_or_else(|| {
            Error::unsupported_type(
                format!("record '{}' (fields not yet defined)", shape.name()),
                SUPPORTED_ANNOTATIONS,
            )
        })?;

        let structured = Arc::new(StructuredType {
            name: shape.name().to_string(),
            description: shape.description().map(str::to_string),
            shape: shape.clone(),
            fields: OnceLock::new(),
        });
        self.resolved.insert(key, structured.clone());
        self.path.push(PathEntry::Record(key));

        let mut fields = Vec::with_capacity(decls.len());
        let mut result = Ok(());
        for decl in decls {
            self.field_path.push(decl.name.clone());
            let resolved = self.resolve(&decl.type_expr);
            self.field_path.pop();
            match resolved {
                Ok(ty) => {
                    let required =
                        decl.default.is_none() && !matches!(ty, TypeDescriptor::Optional(_));
                    fields.push(FieldDescriptor {
                        name: decl.name.clone(),
                        ty,
                        required,
                        default: decl.default.clone(),
                        description: decl.description.clone(),
                    });
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.path.pop();
        result?;
        let _ = structured.fields.set(fields);
        Ok(TypeDescriptor::Structured(structured))
    }
}
