//! Integration test harness for metrology resolution.
//!
//! [`Declarations`] builds raw declaration lists the way the annotation
//! parser would hand them over. Every declaration gets its own span, and
//! every argument inside it gets a distinct sub-span, so tests can assert
//! exactly where a diagnostic points.

use metrology::{Resolution, ResolveConfig};
use metrology_decl::{
    DeclarationKind, FilterKind, InstanceRule, MetricPrefix, OperandPosition, OperatorKind,
    RawBinary, RawConstant, RawConversion, RawDeclaration, RawDerivation, RawFilter,
    RawOperation, RawQuantity, RawRelationship, RawUnit, RawUnitInstance, RawValue, Spanned,
    StackingMode,
};
use metrology_foundation::{Span, TypeId};
use metrology_resolve::DiagnosticKind;

/// Span of the declaration at `index`.
pub fn declaration_span(index: usize) -> Span {
    let start = index as u32 * 100;
    Span::new(0, start, start + 90, index as u16 + 1)
}

/// Span of argument `arg` of the declaration at `index`.
pub fn argument_span(index: usize, arg: usize) -> Span {
    let start = index as u32 * 100 + 1 + arg as u32 * 8;
    Span::new(0, start, start + 6, index as u16 + 1)
}

/// Builder for a list of raw declarations.
#[derive(Debug, Default, Clone)]
pub struct Declarations {
    items: Vec<RawDeclaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next declaration will get.
    pub fn next_index(&self) -> usize {
        self.items.len()
    }

    fn arg<T>(&self, arg: usize, node: T) -> Option<Spanned<T>> {
        Some(Spanned::new(node, argument_span(self.next_index(), arg)))
    }

    fn ty(&self, arg: usize, id: &str) -> Option<Spanned<TypeId>> {
        self.arg(arg, TypeId::from(id))
    }

    fn name(&self, arg: usize, name: &str) -> Option<Spanned<String>> {
        self.arg(arg, name.to_string())
    }

    pub fn push(mut self, owner: &str, kind: DeclarationKind) -> Self {
        let span = declaration_span(self.next_index());
        self.items.push(RawDeclaration::new(owner, span, kind));
        self
    }

    /// Scalar quantity measured in `unit`.
    pub fn quantity(self, id: &str, unit: &str) -> Self {
        let raw = RawQuantity {
            unit: self.ty(0, unit),
            ..Default::default()
        };
        self.quantity_with(id, raw)
    }

    /// Quantity specializing `parent`, inheriting everything else.
    pub fn specialization(self, id: &str, parent: &str) -> Self {
        let raw = RawQuantity {
            specializes: self.ty(0, parent),
            ..Default::default()
        };
        self.quantity_with(id, raw)
    }

    pub fn quantity_with(self, id: &str, raw: RawQuantity) -> Self {
        self.push(id, DeclarationKind::Quantity(raw))
    }

    pub fn unit(self, id: &str, quantity: &str) -> Self {
        let raw = RawUnit {
            quantity: self.ty(0, quantity),
            bias_term: false,
        };
        self.push(id, DeclarationKind::Unit(raw))
    }

    /// Unit whose instances carry an offset (temperatures).
    pub fn bias_unit(self, id: &str, quantity: &str) -> Self {
        let raw = RawUnit {
            quantity: self.ty(0, quantity),
            bias_term: true,
        };
        self.push(id, DeclarationKind::Unit(raw))
    }

    /// Derivation; argument 0 is the ID, 1 the expression, 2.. the
    /// signature elements.
    pub fn derivation(self, unit: &str, id: Option<&str>, expression: &str, signature: &[&str]) -> Self {
        self.derivation_with(unit, id, expression, signature, false)
    }

    pub fn derivation_with(
        self,
        unit: &str,
        id: Option<&str>,
        expression: &str,
        signature: &[&str],
        permutations: bool,
    ) -> Self {
        let raw = RawDerivation {
            id: id.and_then(|id| self.name(0, id)),
            expression: self.name(1, expression),
            signature: signature
                .iter()
                .enumerate()
                .map(|(i, ty)| self.ty(2 + i, ty))
                .collect(),
            permutations,
        };
        self.push(unit, DeclarationKind::Derivation(raw))
    }

    fn instance(self, unit: &str, name: &str, rule: InstanceRule) -> Self {
        let raw = RawUnitInstance {
            name: self.name(0, name),
            plural: Some(format!("{name}s")),
            symbol: None,
            rule,
        };
        self.push(unit, DeclarationKind::UnitInstance(raw))
    }

    pub fn fixed(self, unit: &str, name: &str) -> Self {
        self.instance(unit, name, InstanceRule::Fixed)
    }

    pub fn alias(self, unit: &str, name: &str, original: &str) -> Self {
        let rule = InstanceRule::Alias {
            original: self.name(1, original),
        };
        self.instance(unit, name, rule)
    }

    pub fn scaled(self, unit: &str, name: &str, original: &str, scale: RawValue) -> Self {
        let rule = InstanceRule::Scaled {
            original: self.name(1, original),
            scale: self.arg(2, scale),
        };
        self.instance(unit, name, rule)
    }

    pub fn prefixed(self, unit: &str, name: &str, original: &str, prefix: MetricPrefix) -> Self {
        let rule = InstanceRule::Prefixed {
            original: self.name(1, original),
            prefix: Some(prefix),
        };
        self.instance(unit, name, rule)
    }

    pub fn biased(self, unit: &str, name: &str, original: &str, bias: RawValue) -> Self {
        let rule = InstanceRule::Biased {
            original: self.name(1, original),
            bias: self.arg(2, bias),
        };
        self.instance(unit, name, rule)
    }

    /// Derived instance; argument 1 is the derivation ID, 2.. the
    /// contributing instance names.
    pub fn derived(self, unit: &str, name: &str, derivation: Option<&str>, units: &[&str]) -> Self {
        let rule = InstanceRule::Derived {
            derivation: derivation.and_then(|id| self.name(1, id)),
            units: units
                .iter()
                .enumerate()
                .map(|(i, u)| self.name(2 + i, u))
                .collect(),
        };
        self.instance(unit, name, rule)
    }

    pub fn operation(self, quantity: &str, operator: OperatorKind, other: &str, result: &str) -> Self {
        let raw = RawOperation {
            operator,
            position: OperandPosition::Left,
            other: self.ty(0, other),
            result: self.ty(1, result),
            implementation: Default::default(),
            mirror: false,
            naming: Default::default(),
        };
        self.push(quantity, DeclarationKind::Operation(RawRelationship::Operation(raw)))
    }

    pub fn sum(self, quantity: &str, other: &str, result: &str) -> Self {
        let raw = RawBinary {
            other: self.ty(0, other),
            result: self.ty(1, result),
            naming: Default::default(),
        };
        self.push(quantity, DeclarationKind::Operation(RawRelationship::Sum(raw)))
    }

    pub fn conversion(self, quantity: &str, target: &str) -> Self {
        let raw = RawConversion {
            target: self.ty(0, target),
            cast: Default::default(),
        };
        self.push(quantity, DeclarationKind::Conversion(raw))
    }

    pub fn constant(self, quantity: &str, name: &str, value: f64, unit: &str) -> Self {
        let raw = RawConstant {
            name: self.name(0, name),
            value: self.arg(1, RawValue::Number(value)),
            unit: self.name(2, unit),
            multiples: None,
        };
        self.push(quantity, DeclarationKind::Constant(raw))
    }

    pub fn filter(
        self,
        quantity: &str,
        kind: FilterKind,
        names: &[&str],
        stacking: Option<StackingMode>,
    ) -> Self {
        let raw = RawFilter {
            kind,
            names: names
                .iter()
                .enumerate()
                .filter_map(|(i, n)| self.name(i, n))
                .collect(),
            stacking,
        };
        self.push(quantity, DeclarationKind::Filter(raw))
    }

    pub fn build(self) -> Vec<RawDeclaration> {
        self.items
    }

    /// Resolves with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is rejected.
    pub fn resolve(&self) -> Resolution {
        self.resolve_with(&ResolveConfig::default())
    }

    pub fn resolve_with(&self, config: &ResolveConfig) -> Resolution {
        metrology::resolve(&self.items, config).expect("valid configuration")
    }
}

/// Length, time and speed with their units, but no unit instances.
pub fn mechanics() -> Declarations {
    Declarations::new()
        .quantity("Length", "UnitOfLength")
        .quantity("Time", "UnitOfTime")
        .quantity("Speed", "UnitOfSpeed")
        .unit("UnitOfLength", "Length")
        .unit("UnitOfTime", "Time")
        .unit("UnitOfSpeed", "Speed")
}

/// Diagnostic kinds in reported order.
pub fn kinds(resolution: &Resolution) -> Vec<DiagnosticKind> {
    resolution.diagnostics.iter().map(|d| d.kind).collect()
}

/// Instance names of `unit` in the resolved model.
pub fn instance_names(resolution: &Resolution, unit: &str) -> Vec<String> {
    resolution
        .model
        .unit(&TypeId::from(unit))
        .map(|u| u.instance_names().map(String::from).collect())
        .unwrap_or_default()
}
