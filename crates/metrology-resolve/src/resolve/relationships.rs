//! Quantity relationship resolution.
//!
//! Checks the relationships, conversions and constants a quantity declares
//! itself. Inherited members are merged later by specialization; this pass
//! only sees one quantity's own declarations, so quantities resolve
//! independently of each other.
//!
//! # Pipeline Position
//!
//! ```text
//! Intake → Derivations/Instances → Relationships → Specialization → Filters → Model
//!                                  ^^^^^^^^^^^^^
//!                                  YOU ARE HERE
//! ```

use super::context::{is_valid_name, locate, InstanceIndex, ResolveContext};
use super::intake::{Declared, QuantityDecls};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{
    BinaryRelationship, Constant, ConversionRelationship, Naming, OperationRelationship,
    Parameter, ProcessRelationship, Relationship, RelationshipKey,
};
use indexmap::IndexMap;
use metrology_decl::{
    Arity, Implementation, OperandPosition, OperatorKind, RawBinary, RawConstant, RawConversion,
    RawNaming, RawOperation, RawProcess, RawRelationship, Spanned,
};
use metrology_foundation::{Span, TypeId};
use tracing::debug;

/// Members a quantity declares itself, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnMembers {
    pub relationships: Vec<Relationship>,
    pub constants: Vec<Constant>,
}

enum Member<'d> {
    Relationship(&'d Declared<RawRelationship>),
    Conversion(&'d Declared<RawConversion>),
}

impl Member<'_> {
    fn index(&self) -> usize {
        match self {
            Member::Relationship(d) => d.index,
            Member::Conversion(d) => d.index,
        }
    }
}

/// Resolves the own relationships, conversions and constants of `quantity`.
///
/// Constants are checked against `instances`, the instances that survived
/// unit resolution.
pub fn resolve_relationships(
    quantity: &QuantityDecls,
    instances: &InstanceIndex,
    ctx: &ResolveContext<'_>,
) -> (OwnMembers, Vec<Diagnostic>) {
    let mut scope = Scope {
        quantity,
        instances,
        ctx,
        errors: Vec::new(),
        index: quantity.quantity.index,
        span: quantity.quantity.span,
    };

    let mut members: Vec<Member<'_>> = quantity
        .relationships
        .iter()
        .map(Member::Relationship)
        .chain(quantity.conversions.iter().map(Member::Conversion))
        .collect();
    members.sort_by_key(Member::index);

    let mut seen: IndexMap<RelationshipKey, Span> = IndexMap::new();
    let mut relationships = Vec::new();
    for member in members {
        let (resolved, span) = match member {
            Member::Relationship(declared) => {
                scope.at(declared.index, declared.span);
                (scope.relationship(&declared.decl), declared.span)
            }
            Member::Conversion(declared) => {
                scope.at(declared.index, declared.span);
                (scope.conversion(&declared.decl), declared.span)
            }
        };
        let Some(resolved) = resolved else {
            continue;
        };

        let key = resolved.key();
        if let Some(first) = seen.get(&key) {
            let (kind, message) = match &key {
                RelationshipKey::Member(name) => (
                    DiagnosticKind::DuplicateMemberName,
                    format!("'{}' already declares a member named '{name}'", quantity.id),
                ),
                _ => (
                    DiagnosticKind::DuplicateQuantityOperation,
                    format!("'{}' already declares this relationship", quantity.id),
                ),
            };
            let diagnostic = scope.diagnostic(kind, span, message);
            scope
                .errors
                .push(diagnostic.with_label(*first, "first declared here".to_string()));
            continue;
        }
        seen.insert(key, span);
        relationships.push(resolved);
    }

    let mut constants: Vec<Constant> = Vec::new();
    let mut constant_names: IndexMap<String, Span> = IndexMap::new();
    for declared in &quantity.constants {
        scope.at(declared.index, declared.span);
        let Some(constant) = scope.constant(&declared.decl) else {
            continue;
        };
        if let Some(first) = constant_names.get(&constant.name) {
            let diagnostic = scope.diagnostic(
                DiagnosticKind::DuplicateConstantName,
                locate(declared.decl.name.as_ref(), declared.span),
                format!(
                    "'{}' already declares a constant named '{}'",
                    quantity.id, constant.name
                ),
            );
            scope
                .errors
                .push(diagnostic.with_label(*first, "first declared here".to_string()));
            continue;
        }
        constant_names.insert(
            constant.name.clone(),
            locate(declared.decl.name.as_ref(), declared.span),
        );
        constants.push(constant);
    }

    debug!(
        quantity = %quantity.id,
        relationships = relationships.len(),
        constants = constants.len(),
        rejected = scope.errors.len(),
        "own members"
    );

    (
        OwnMembers {
            relationships,
            constants,
        },
        scope.errors,
    )
}

struct Scope<'q, 'c> {
    quantity: &'q QuantityDecls,
    instances: &'q InstanceIndex,
    ctx: &'q ResolveContext<'c>,
    errors: Vec<Diagnostic>,
    // Declaration currently being checked.
    index: usize,
    span: Span,
}

impl Scope<'_, '_> {
    fn at(&mut self, index: usize, span: Span) {
        self.index = index;
        self.span = span;
    }

    fn owner(&self) -> &TypeId {
        &self.quantity.id
    }

    fn diagnostic(&self, kind: DiagnosticKind, span: Span, message: String) -> Diagnostic {
        Diagnostic::new(kind, span, message).with_origin(&self.quantity.id, self.index)
    }

    fn report(&mut self, kind: DiagnosticKind, span: Span, message: String) {
        let diagnostic = self.diagnostic(kind, span, message);
        self.errors.push(diagnostic);
    }

    fn arity(&self, ty: &TypeId) -> Arity {
        self.ctx.arity(ty).unwrap_or(Arity::Scalar)
    }

    /// Resolves a referenced quantity. A missing reference drops the
    /// relationship without a diagnostic.
    fn quantity_ref(&mut self, reference: Option<&Spanned<TypeId>>) -> Option<TypeId> {
        let reference = reference?;
        if self.ctx.decls.is_quantity(&reference.node) {
            return Some(reference.node.clone());
        }
        let kind = if self.ctx.decls.is_unit(&reference.node) {
            DiagnosticKind::TypeNotQuantity
        } else {
            DiagnosticKind::UnrecognizedQuantity
        };
        self.report(
            kind,
            locate(Some(reference), self.span),
            format!("'{}' is not a declared quantity", reference.node),
        );
        None
    }

    /// Checks an explicitly given name; `None` passes through.
    fn member_name(&mut self, name: Option<&Spanned<String>>) -> Result<Option<String>, ()> {
        match name {
            None => Ok(None),
            Some(name) if is_valid_name(&name.node) => Ok(Some(name.node.clone())),
            Some(name) => {
                self.report(
                    DiagnosticKind::InvalidMemberName,
                    locate(Some(name), self.span),
                    format!("'{}' is not a valid member name", name.node),
                );
                Err(())
            }
        }
    }

    fn naming(&mut self, raw: &RawNaming) -> Option<Naming> {
        let member = self.member_name(raw.member.as_ref());
        let static_method = self.member_name(raw.static_method.as_ref());
        let mirrored = self.member_name(raw.mirrored.as_ref());
        Some(Naming {
            member: member.ok()?,
            static_method: static_method.ok()?,
            mirrored: mirrored.ok()?,
        })
    }

    fn relationship(&mut self, raw: &RawRelationship) -> Option<Relationship> {
        match raw {
            RawRelationship::Sum(b) => self.binary(b, BinaryKind::Sum),
            RawRelationship::Difference(b) => self.binary(b, BinaryKind::Difference),
            RawRelationship::Dot(b) => self.binary(b, BinaryKind::Dot),
            RawRelationship::Cross(b) => self.binary(b, BinaryKind::Cross),
            RawRelationship::Operation(op) => self.operation(op),
            RawRelationship::Process(p) => self.process(p, false),
            RawRelationship::Property(p) => self.process(p, true),
        }
    }

    fn binary(&mut self, raw: &RawBinary, kind: BinaryKind) -> Option<Relationship> {
        let other = self.quantity_ref(raw.other.as_ref());
        let result = self.quantity_ref(raw.result.as_ref());
        let naming = self.naming(&raw.naming);
        let (other, result, naming) = (other?, result?, naming?);

        let own = self.arity(self.owner());
        let (lhs, rhs, out) = (own, self.arity(&other), self.arity(&result));
        let valid = match kind {
            BinaryKind::Sum | BinaryKind::Difference => lhs == rhs && out == lhs,
            BinaryKind::Dot => lhs == rhs && lhs.is_vector() && out.is_scalar(),
            BinaryKind::Cross => [lhs, rhs, out].iter().all(|a| *a == Arity::Vector3),
        };
        if !valid {
            self.report(
                DiagnosticKind::InvalidQuantityOperation,
                self.span,
                format!(
                    "{} of {lhs} '{}' and {rhs} '{other}' cannot produce {out} '{result}'",
                    kind.name(),
                    self.owner()
                ),
            );
            return None;
        }

        let commutative = !matches!(kind, BinaryKind::Difference);
        if naming.mirrored.is_some() && (commutative || &other == self.owner()) {
            self.mirror_warning(&raw.naming);
        }

        let binary = BinaryRelationship {
            other,
            result,
            naming,
        };
        Some(match kind {
            BinaryKind::Sum => Relationship::Sum(binary),
            BinaryKind::Difference => Relationship::Difference(binary),
            BinaryKind::Dot => Relationship::Dot(binary),
            BinaryKind::Cross => Relationship::Cross(binary),
        })
    }

    fn operation(&mut self, raw: &RawOperation) -> Option<Relationship> {
        let other = self.quantity_ref(raw.other.as_ref());
        let result = self.quantity_ref(raw.result.as_ref());
        let naming = self.naming(&raw.naming);
        let (other, result, naming) = (other?, result?, naming?);

        let own = self.arity(self.owner());
        let (lhs, rhs) = match raw.position {
            OperandPosition::Left => (own, self.arity(&other)),
            OperandPosition::Right => (self.arity(&other), own),
        };
        let out = self.arity(&result);
        let valid = match raw.operator {
            OperatorKind::Add | OperatorKind::Subtract => lhs == rhs && out == lhs,
            OperatorKind::Multiply => {
                (lhs == rhs && out == lhs)
                    || (lhs.is_scalar() && out == rhs)
                    || (rhs.is_scalar() && out == lhs)
            }
            OperatorKind::Divide => (lhs == rhs || rhs.is_scalar()) && out == lhs,
        };
        if !valid {
            self.report(
                DiagnosticKind::InvalidQuantityOperation,
                self.span,
                format!(
                    "{lhs} {} {rhs} cannot produce {out} '{result}'",
                    raw.operator
                ),
            );
            return None;
        }

        let same_operands = &other == self.owner();
        if (naming.mirrored.is_some() && raw.operator.is_commutative())
            || ((naming.mirrored.is_some() || raw.mirror) && same_operands)
        {
            self.mirror_warning(&raw.naming);
        }

        let disabled_names = match raw.implementation {
            Implementation::None => !raw.naming.is_empty(),
            Implementation::Operator => {
                raw.naming.member.is_some() || raw.naming.static_method.is_some()
            }
            Implementation::Method | Implementation::OperatorAndMethod => false,
        };
        if disabled_names {
            let diagnostic = self.diagnostic(
                DiagnosticKind::NameSpecifiedForDisabledImplementation,
                self.span,
                format!(
                    "names are given for a method that is not implemented ({:?})",
                    raw.implementation
                ),
            );
            self.errors.push(diagnostic);
        }

        Some(Relationship::Operation(OperationRelationship {
            operator: raw.operator,
            position: raw.position,
            other,
            result,
            implementation: raw.implementation,
            mirror: raw.mirror,
            naming,
        }))
    }

    fn mirror_warning(&mut self, naming: &RawNaming) {
        let span = locate(naming.mirrored.as_ref(), self.span);
        self.report(
            DiagnosticKind::MirrorNotApplicable,
            span,
            "mirrored form is identical to the declared one".to_string(),
        );
    }

    fn process(&mut self, raw: &RawProcess, property: bool) -> Option<Relationship> {
        let result = self.quantity_ref(raw.result.as_ref());
        // A missing name was reported by the annotation layer.
        let name = match raw.name.as_ref() {
            Some(name) => self.member_name(Some(name)).ok().flatten(),
            None => None,
        };

        let expression = raw
            .expression
            .as_ref()
            .map(|e| e.node.trim())
            .filter(|e| !e.is_empty());
        if expression.is_none() {
            self.report(
                DiagnosticKind::InvalidProcessExpression,
                locate(raw.expression.as_ref(), self.span),
                format!(
                    "{} '{}' has no expression",
                    if property { "property" } else { "process" },
                    raw.name.as_ref().map_or("", |n| n.node.as_str())
                ),
            );
        }

        let mut parameters = Vec::with_capacity(raw.parameters.len());
        let mut parameters_ok = true;
        for parameter in &raw.parameters {
            match self.member_name(parameter.name.as_ref()) {
                Ok(Some(name)) => parameters.push(Parameter {
                    ty: parameter.ty.clone(),
                    name,
                }),
                Ok(None) => {
                    self.report(
                        DiagnosticKind::InvalidMemberName,
                        self.span,
                        "process parameter has no name".to_string(),
                    );
                    parameters_ok = false;
                }
                Err(()) => parameters_ok = false,
            }
        }
        if property && !raw.parameters.is_empty() {
            self.report(
                DiagnosticKind::InvalidQuantityOperation,
                self.span,
                "properties cannot take parameters".to_string(),
            );
            parameters_ok = false;
        }

        let process = ProcessRelationship {
            name: name?,
            expression: expression?.to_string(),
            result: result?,
            parameters,
            implement_static: raw.implement_static,
        };
        if !parameters_ok {
            return None;
        }
        Some(if property {
            Relationship::Property(process)
        } else {
            Relationship::Process(process)
        })
    }

    fn conversion(&mut self, raw: &RawConversion) -> Option<Relationship> {
        let target = self.quantity_ref(raw.target.as_ref())?;
        if &target == self.owner() {
            self.report(
                DiagnosticKind::QuantityConvertibleToSelf,
                locate(raw.target.as_ref(), self.span),
                format!("'{}' is declared convertible to itself", target),
            );
            return None;
        }
        let (from, to) = (self.arity(self.owner()), self.arity(&target));
        if from != to {
            self.report(
                DiagnosticKind::InvalidQuantityOperation,
                locate(raw.target.as_ref(), self.span),
                format!("cannot convert {from} '{}' to {to} '{target}'", self.owner()),
            );
            return None;
        }
        Some(Relationship::Conversion(ConversionRelationship {
            target,
            cast: raw.cast,
        }))
    }

    fn constant(&mut self, raw: &RawConstant) -> Option<Constant> {
        let name = raw.name.as_ref()?;
        let name = self.member_name(Some(name)).ok().flatten()?;

        let mut ok = true;
        let unit = self.ctx.unit_of(self.owner()).cloned();
        if let Some(unit) = &unit {
            if self.instances.contains(unit, &name) {
                self.report(
                    DiagnosticKind::ConstantSharesNameWithUnit,
                    locate(raw.name.as_ref(), self.span),
                    format!("constant '{name}' shares its name with an instance of '{unit}'"),
                );
                ok = false;
            }
        }

        let value = match raw.value.as_ref() {
            Some(value) if !value.node.is_blank() => Some(value.node.clone()),
            other => {
                self.report(
                    DiagnosticKind::InvalidConstantValue,
                    locate(other, self.span),
                    format!("constant '{name}' has no value"),
                );
                None
            }
        };

        let instance = raw.unit.as_ref()?;
        let known = unit
            .as_ref()
            .is_some_and(|unit| self.instances.contains(unit, &instance.node));
        if !known {
            self.report(
                DiagnosticKind::UnrecognizedUnitName,
                locate(Some(instance), self.span),
                match &unit {
                    Some(unit) => format!("'{}' is not an instance of '{unit}'", instance.node),
                    None => format!(
                        "'{}' has no unit, so '{}' cannot be resolved",
                        self.owner(),
                        instance.node
                    ),
                },
            );
            ok = false;
        }

        let multiples = self.member_name(raw.multiples.as_ref());
        let constant = Constant {
            name,
            value: value?,
            unit: instance.node.clone(),
            multiples: multiples.ok()?,
        };
        ok.then_some(constant)
    }
}

#[derive(Debug, Clone, Copy)]
enum BinaryKind {
    Sum,
    Difference,
    Dot,
    Cross,
}

impl BinaryKind {
    fn name(self) -> &'static str {
        match self {
            BinaryKind::Sum => "sum",
            BinaryKind::Difference => "difference",
            BinaryKind::Dot => "dot product",
            BinaryKind::Cross => "cross product",
        }
    }
}
