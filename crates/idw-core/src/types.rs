//! # Semantic Types
//!
//! Every block carries a semantic type. Types form a single-inheritance
//! hierarchy through the "based on" relation whose roots are the syntactic
//! types in [`syntax`] (boolean, integers, strings, tuples, lists and the
//! envelopes). A semantic type based on `tuple` or `list` declares the
//! parameters its elements must be based on; a type without parameters of
//! its own inherits those of its base.
//!
//! The type of a block is never written on the wire. Decoders assign types
//! from context (the parameter of the enclosing tuple or list, or the
//! identifier inside a self-contained envelope), which is why the
//! [`TypeRegistry`] is consulted only at self-contained boundaries.
//!
//! Types compare and hash by identifier.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EncodingError;

/// A semantic type: identifier, optional base type and parameters.
#[derive(Clone)]
pub struct SemanticType(Arc<TypeDefinition>);

struct TypeDefinition {
    identifier: String,
    base: Option<SemanticType>,
    parameters: Vec<SemanticType>,
}

impl SemanticType {
    /// A root type of the hierarchy. Use the constructors in [`syntax`]
    /// rather than minting new roots.
    pub fn syntactic(identifier: impl Into<String>) -> Self {
        Self(Arc::new(TypeDefinition {
            identifier: identifier.into(),
            base: None,
            parameters: Vec::new(),
        }))
    }

    /// A type based on `base` that inherits its parameters.
    pub fn based_on(identifier: impl Into<String>, base: &SemanticType) -> Self {
        Self::with_parameters(identifier, base, Vec::new())
    }

    /// A type based on `base` declaring its own parameters.
    pub fn with_parameters(
        identifier: impl Into<String>,
        base: &SemanticType,
        parameters: Vec<SemanticType>,
    ) -> Self {
        Self(Arc::new(TypeDefinition {
            identifier: identifier.into(),
            base: Some(base.clone()),
            parameters,
        }))
    }

    /// The registered identifier of this type.
    pub fn identifier(&self) -> &str {
        &self.0.identifier
    }

    /// The direct base type, if this is not a root.
    pub fn base(&self) -> Option<&SemanticType> {
        self.0.base.as_ref()
    }

    /// The syntactic root this type is ultimately based on.
    pub fn syntax(&self) -> &SemanticType {
        let mut current = self;
        while let Some(base) = current.base() {
            current = base;
        }
        current
    }

    /// True if `other` is this type or one of its ancestors.
    pub fn is_based_on(&self, other: &SemanticType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.base();
        }
        false
    }

    /// Fail with [`EncodingError::TypeMismatch`] unless this type is based on `other`.
    pub fn check_based_on(&self, other: &SemanticType) -> Result<(), EncodingError> {
        if self.is_based_on(other) {
            Ok(())
        } else {
            Err(EncodingError::TypeMismatch {
                expected: other.identifier().to_string(),
                found: self.identifier().to_string(),
            })
        }
    }

    /// The declared parameters, inherited from the nearest ancestor that has any.
    pub fn parameters(&self) -> &[SemanticType] {
        let mut current = Some(self);
        while let Some(ty) = current {
            if !ty.0.parameters.is_empty() {
                return &ty.0.parameters;
            }
            current = ty.base();
        }
        &[]
    }

    /// The single parameter of a list-like or envelope type.
    pub fn single_parameter(&self) -> Result<&SemanticType, EncodingError> {
        match self.parameters() {
            [parameter] => Ok(parameter),
            other => Err(EncodingError::InvalidValue(format!(
                "type {} must declare exactly one parameter, found {}",
                self.identifier(),
                other.len()
            ))),
        }
    }
}

impl PartialEq for SemanticType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.identifier == other.0.identifier
    }
}

impl Eq for SemanticType {}

impl std::hash::Hash for SemanticType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.identifier.hash(state);
    }
}

impl std::fmt::Debug for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SemanticType({})", self.identifier())
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// The syntactic root types.
pub mod syntax {
    use std::sync::OnceLock;

    use super::SemanticType;

    macro_rules! syntactic_type {
        ($(#[$doc:meta])* $name:ident => $identifier:literal) => {
            $(#[$doc])*
            pub fn $name() -> &'static SemanticType {
                static TYPE: OnceLock<SemanticType> = OnceLock::new();
                TYPE.get_or_init(|| SemanticType::syntactic($identifier))
            }
        };
    }

    syntactic_type!(/// One byte, `0` or `1`.
        boolean => "boolean@core.idw");
    syntactic_type!(/// Signed 8-bit integer.
        int8 => "int8@core.idw");
    syntactic_type!(/// Signed 16-bit big-endian integer.
        int16 => "int16@core.idw");
    syntactic_type!(/// Signed 32-bit big-endian integer.
        int32 => "int32@core.idw");
    syntactic_type!(/// Signed 64-bit big-endian integer.
        int64 => "int64@core.idw");
    syntactic_type!(/// Arbitrary-precision two's-complement integer.
        integer => "integer@core.idw");
    syntactic_type!(/// Variable-length non-negative integer.
        intvar => "intvar@core.idw");
    syntactic_type!(/// Raw bytes.
        bytes => "bytes@core.idw");
    syntactic_type!(/// UTF-8 string.
        string => "string@core.idw");
    syntactic_type!(/// Heterogeneous positional tuple.
        tuple => "tuple@core.idw");
    syntactic_type!(/// Homogeneous list.
        list => "list@core.idw");
    syntactic_type!(/// Type identifier paired with a payload.
        selfcontained => "selfcontained@core.idw");
    syntactic_type!(/// Optionally compressed payload.
        compression => "compression@core.idw");
    syntactic_type!(/// Hybrid-encryption envelope.
        encryption => "encryption@core.idw");
    syntactic_type!(/// Signed content with an optional authenticity tag.
        signature => "signature@core.idw");

    /// All syntactic types, in declaration order.
    pub fn all() -> [&'static SemanticType; 15] {
        [
            boolean(),
            int8(),
            int16(),
            int32(),
            int64(),
            integer(),
            intvar(),
            bytes(),
            string(),
            tuple(),
            list(),
            selfcontained(),
            compression(),
            encryption(),
            signature(),
        ]
    }
}

/// Resolves type identifiers found inside self-contained envelopes.
pub trait TypeRegistry: Send + Sync {
    /// Look up the semantic type registered under `identifier`.
    fn resolve(&self, identifier: &str) -> Result<SemanticType, EncodingError>;
}

/// A registry backed by a hash map, pre-populated with the syntactic types.
#[derive(Debug, Clone)]
pub struct MemoryTypeRegistry {
    types: HashMap<String, SemanticType>,
}

impl MemoryTypeRegistry {
    /// A registry containing only the syntactic types.
    pub fn new() -> Self {
        let types = syntax::all()
            .into_iter()
            .map(|ty| (ty.identifier().to_string(), ty.clone()))
            .collect();
        Self { types }
    }

    /// Register a type, replacing any previous type with the same identifier.
    pub fn register(&mut self, ty: SemanticType) {
        self.types.insert(ty.identifier().to_string(), ty);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, ty: SemanticType) -> Self {
        self.register(ty);
        self
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for MemoryTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for MemoryTypeRegistry {
    fn resolve(&self, identifier: &str) -> Result<SemanticType, EncodingError> {
        self.types
            .get(identifier)
            .cloned()
            .ok_or_else(|| EncodingError::UnknownType(identifier.to_string()))
    }
}
