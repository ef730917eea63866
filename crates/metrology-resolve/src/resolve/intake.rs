//! Declaration intake.
//!
//! Groups the flat list of raw declarations by owner type and checks that
//! each member is attached to a type of the right kind.
//!
//! # Pipeline Position
//!
//! ```text
//! Intake → Derivations/Instances → Relationships → Specialization → Filters → Model
//! ^^^^^^
//! YOU ARE HERE
//! ```
//!
//! Intake runs in two sweeps: the first registers every quantity and unit
//! declaration, the second attaches members. A member may therefore appear
//! before the declaration of its owner.

use crate::error::{Diagnostic, DiagnosticKind};
use indexmap::IndexMap;
use metrology_decl::{
    DeclarationKind, RawConstant, RawConversion, RawDeclaration, RawDerivation, RawFilter,
    RawQuantity, RawRelationship, RawUnit, RawUnitInstance,
};
use metrology_foundation::{Span, TypeId};
use tracing::debug;

/// A raw record together with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared<T> {
    /// Index of the declaration in the input list.
    pub index: usize,
    /// Span of the whole declaration.
    pub span: Span,
    pub decl: T,
}

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Quantity,
    Unit,
}

/// Everything declared on one quantity type.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityDecls {
    pub id: TypeId,
    pub quantity: Declared<RawQuantity>,
    pub relationships: Vec<Declared<RawRelationship>>,
    pub conversions: Vec<Declared<RawConversion>>,
    pub constants: Vec<Declared<RawConstant>>,
    pub filter: Option<Declared<RawFilter>>,
}

/// Everything declared on one unit type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDecls {
    pub id: TypeId,
    pub unit: Declared<RawUnit>,
    pub derivations: Vec<Declared<RawDerivation>>,
    pub instances: Vec<Declared<RawUnitInstance>>,
}

/// Declarations grouped by owner, in order of first declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationSet {
    pub quantities: IndexMap<TypeId, QuantityDecls>,
    pub units: IndexMap<TypeId, UnitDecls>,
}

impl DeclarationSet {
    pub fn kind_of(&self, ty: &TypeId) -> Option<TypeKind> {
        if self.quantities.contains_key(ty) {
            Some(TypeKind::Quantity)
        } else if self.units.contains_key(ty) {
            Some(TypeKind::Unit)
        } else {
            None
        }
    }

    pub fn is_unit(&self, ty: &TypeId) -> bool {
        self.units.contains_key(ty)
    }

    pub fn is_quantity(&self, ty: &TypeId) -> bool {
        self.quantities.contains_key(ty)
    }

    /// Number of declared quantity and unit types.
    pub fn type_count(&self) -> usize {
        self.quantities.len() + self.units.len()
    }
}

/// Groups raw declarations by owner type.
///
/// # Errors
///
/// Reports, and drops:
/// - [`DiagnosticKind::TypeAlreadyDefined`] for a second quantity/unit
///   declaration on one type
/// - [`DiagnosticKind::TypeNotUnit`] for derivations and instances on a
///   type that is not a unit
/// - [`DiagnosticKind::TypeNotQuantity`] / [`DiagnosticKind::UnrecognizedQuantity`]
///   for quantity members on a unit / undeclared type
/// - [`DiagnosticKind::DuplicateFilter`] for a second filter on a quantity
pub fn intake(declarations: &[RawDeclaration]) -> (DeclarationSet, Vec<Diagnostic>) {
    let mut set = DeclarationSet::default();
    let mut errors = Vec::new();
    let mut first_span: IndexMap<TypeId, Span> = IndexMap::new();

    for (index, raw) in declarations.iter().enumerate() {
        let owner = &raw.owner;
        let is_type_decl = matches!(
            raw.kind,
            DeclarationKind::Quantity(_) | DeclarationKind::Unit(_)
        );
        if !is_type_decl {
            continue;
        }

        if let Some(previous) = first_span.get(owner) {
            errors.push(
                Diagnostic::new(
                    DiagnosticKind::TypeAlreadyDefined,
                    raw.span,
                    format!("'{}' is already declared; this {} is ignored", owner, raw.kind.name()),
                )
                .with_origin(owner, index)
                .with_label(*previous, "first declared here".to_string()),
            );
            continue;
        }
        first_span.insert(owner.clone(), raw.span);

        match &raw.kind {
            DeclarationKind::Quantity(quantity) => {
                set.quantities.insert(
                    owner.clone(),
                    QuantityDecls {
                        id: owner.clone(),
                        quantity: declared(index, raw.span, quantity.clone()),
                        relationships: Vec::new(),
                        conversions: Vec::new(),
                        constants: Vec::new(),
                        filter: None,
                    },
                );
            }
            DeclarationKind::Unit(unit) => {
                set.units.insert(
                    owner.clone(),
                    UnitDecls {
                        id: owner.clone(),
                        unit: declared(index, raw.span, unit.clone()),
                        derivations: Vec::new(),
                        instances: Vec::new(),
                    },
                );
            }
            _ => {}
        }
    }

    for (index, raw) in declarations.iter().enumerate() {
        let owner = &raw.owner;
        match &raw.kind {
            DeclarationKind::Quantity(_) | DeclarationKind::Unit(_) => {}
            DeclarationKind::Derivation(derivation) => match set.units.get_mut(owner) {
                Some(unit) => unit
                    .derivations
                    .push(declared(index, raw.span, derivation.clone())),
                None => errors.push(not_a_unit(raw, index)),
            },
            DeclarationKind::UnitInstance(instance) => match set.units.get_mut(owner) {
                Some(unit) => unit
                    .instances
                    .push(declared(index, raw.span, instance.clone())),
                None => errors.push(not_a_unit(raw, index)),
            },
            DeclarationKind::Operation(relationship) => {
                if let Some(quantity) = quantity_owner(&mut set, raw, index, &mut errors) {
                    quantity
                        .relationships
                        .push(declared(index, raw.span, relationship.clone()));
                }
            }
            DeclarationKind::Conversion(conversion) => {
                if let Some(quantity) = quantity_owner(&mut set, raw, index, &mut errors) {
                    quantity
                        .conversions
                        .push(declared(index, raw.span, conversion.clone()));
                }
            }
            DeclarationKind::Constant(constant) => {
                if let Some(quantity) = quantity_owner(&mut set, raw, index, &mut errors) {
                    quantity
                        .constants
                        .push(declared(index, raw.span, constant.clone()));
                }
            }
            DeclarationKind::Filter(filter) => {
                if let Some(quantity) = quantity_owner(&mut set, raw, index, &mut errors) {
                    match &quantity.filter {
                        Some(existing) => errors.push(
                            Diagnostic::new(
                                DiagnosticKind::DuplicateFilter,
                                raw.span,
                                format!("'{}' already declares a unit filter", owner),
                            )
                            .with_origin(owner, index)
                            .with_label(existing.span, "first filter declared here".to_string()),
                        ),
                        None => quantity.filter = Some(declared(index, raw.span, filter.clone())),
                    }
                }
            }
        }
    }

    debug!(
        quantities = set.quantities.len(),
        units = set.units.len(),
        rejected = errors.len(),
        "declaration intake"
    );

    (set, errors)
}

fn declared<T>(index: usize, span: Span, decl: T) -> Declared<T> {
    Declared { index, span, decl }
}

fn not_a_unit(raw: &RawDeclaration, index: usize) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::TypeNotUnit,
        raw.span,
        format!(
            "'{}' declares a {} but is not a unit",
            raw.owner,
            raw.kind.name()
        ),
    )
    .with_origin(&raw.owner, index)
}

fn quantity_owner<'a>(
    set: &'a mut DeclarationSet,
    raw: &RawDeclaration,
    index: usize,
    errors: &mut Vec<Diagnostic>,
) -> Option<&'a mut QuantityDecls> {
    if set.units.contains_key(&raw.owner) {
        errors.push(
            Diagnostic::new(
                DiagnosticKind::TypeNotQuantity,
                raw.span,
                format!(
                    "'{}' declares a {} but is a unit, not a quantity",
                    raw.owner,
                    raw.kind.name()
                ),
            )
            .with_origin(&raw.owner, index),
        );
        return None;
    }
    let found = set.quantities.get_mut(&raw.owner);
    if found.is_none() {
        errors.push(
            Diagnostic::new(
                DiagnosticKind::UnrecognizedQuantity,
                raw.span,
                format!(
                    "'{}' declares a {} but is not a declared quantity",
                    raw.owner,
                    raw.kind.name()
                ),
            )
            .with_origin(&raw.owner, index),
        );
    }
    found
}
