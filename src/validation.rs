//! Link validation: the rules a candidate link must pass before it is offered
//! to the caller as an accepted candidate.
//!
//! The built-in rules enforce the Input/Output pairing and the self-link
//! policy. Applications add their own rules by implementing
//! [`LinkValidator`] and registering them with
//! [`EditorContext::add_link_validator`](crate::EditorContext::add_link_validator).

use thiserror::Error;

use crate::id::{ObjectKey, PinId, PinKind};
use crate::registry::ObjectRegistry;

/// Result of link validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Link is valid
    Valid,
    /// Link is invalid with a reason
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(err) => Some(err),
        }
    }
}

/// Reasons why a link validation failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Pin is not declared this frame; carries its canonical string
    #[error("pin {0} not found")]
    PinNotFound(String),
    #[error("cannot link a pin to itself")]
    SamePin,
    #[error("cannot link pins on the same node")]
    SameNode,
    /// Both pins are inputs or both are outputs
    #[error("must connect an input to an output")]
    IncompatibleDirection,
    #[error("link already exists")]
    DuplicateLink,
    #[error("pin {pin} has reached its limit of {max} links")]
    MaxConnectionsReached { pin: String, max: usize },
    #[error("{0}")]
    Custom(String),
}

/// Custom link validation rule.
///
/// `start` is the pin the drag began on, `end` the candidate under the
/// pointer; either may be the input.
///
/// ```
/// use blueprint_canvas::{LinkValidator, ObjectRegistry, PinId, ValidationError, ValidationResult};
///
/// struct OneLinkPerInput;
///
/// impl LinkValidator<u64> for OneLinkPerInput {
///     fn validate(&self, _start: &PinId<u64>, end: &PinId<u64>, registry: &ObjectRegistry<u64>) -> ValidationResult {
///         if registry.links_of_pin(end).is_empty() {
///             ValidationResult::Valid
///         } else {
///             ValidationResult::Invalid(ValidationError::MaxConnectionsReached { pin: end.as_string(), max: 1 })
///         }
///     }
/// }
/// ```
pub trait LinkValidator<K> {
    fn validate(&self, start: &PinId<K>, end: &PinId<K>, registry: &ObjectRegistry<K>) -> ValidationResult;
}

/// Standard rules:
/// 1. Pins must exist
/// 2. Pins must differ
/// 3. Pins must be on different nodes, unless `allow_same_node` is set
/// 4. One pin must be input, one must be output
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicLinkValidator {
    pub allow_same_node: bool,
}

impl BasicLinkValidator {
    pub fn new(allow_same_node: bool) -> Self {
        Self { allow_same_node }
    }
}

impl<K: ObjectKey> LinkValidator<K> for BasicLinkValidator {
    fn validate(&self, start: &PinId<K>, end: &PinId<K>, registry: &ObjectRegistry<K>) -> ValidationResult {
        if start == end {
            return ValidationResult::Invalid(ValidationError::SamePin);
        }

        let Some(start_pin) = registry.pin(start) else {
            return ValidationResult::Invalid(ValidationError::PinNotFound(start.as_string()));
        };
        let Some(end_pin) = registry.pin(end) else {
            return ValidationResult::Invalid(ValidationError::PinNotFound(end.as_string()));
        };

        if !self.allow_same_node && start_pin.node == end_pin.node {
            return ValidationResult::Invalid(ValidationError::SameNode);
        }

        if start_pin.kind == end_pin.kind {
            return ValidationResult::Invalid(ValidationError::IncompatibleDirection);
        }

        ValidationResult::Valid
    }
}

/// Rejects a candidate when the two pins are already linked, in either order.
#[derive(Clone, Debug, Default)]
pub struct NoDuplicatesValidator;

impl<K: ObjectKey> LinkValidator<K> for NoDuplicatesValidator {
    fn validate(&self, start: &PinId<K>, end: &PinId<K>, registry: &ObjectRegistry<K>) -> ValidationResult {
        if registry.has_duplicate_link(start, end) {
            ValidationResult::Invalid(ValidationError::DuplicateLink)
        } else {
            ValidationResult::Valid
        }
    }
}

/// All validators must return Valid for the link to be valid (AND logic).
/// Returns the first error encountered.
pub struct CompositeValidator<K> {
    validators: Vec<Box<dyn LinkValidator<K>>>,
}

impl<K> Default for CompositeValidator<K> {
    fn default() -> Self {
        Self { validators: Vec::new() }
    }
}

impl<K> CompositeValidator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator; validators run in the order they were added.
    pub fn add<V: LinkValidator<K> + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn push(&mut self, validator: Box<dyn LinkValidator<K>>) {
        self.validators.push(validator);
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl<K> LinkValidator<K> for CompositeValidator<K> {
    fn validate(&self, start: &PinId<K>, end: &PinId<K>, registry: &ObjectRegistry<K>) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(start, end, registry);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

/// Order two pins as `(output, input)`. `None` unless exactly one of them is
/// an output.
pub fn normalize_link<K: ObjectKey>(
    a: &PinId<K>,
    b: &PinId<K>,
    registry: &ObjectRegistry<K>,
) -> Option<(PinId<K>, PinId<K>)> {
    let kind_a = registry.pin(a)?.kind;
    let kind_b = registry.pin(b)?.kind;
    match (kind_a, kind_b) {
        (PinKind::Output, PinKind::Input) => Some((a.clone(), b.clone())),
        (PinKind::Input, PinKind::Output) => Some((b.clone(), a.clone())),
        _ => None,
    }
}
