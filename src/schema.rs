//! Schema-Datenmodell für die Grammar-Generierung.
//!
//! `SchemaModel` hält die Deklarationen aller registrierten XSD-Dateien:
//! globale Elemente, benannte Typen, Model Groups, Attribute Groups und
//! globale Attribute. Referenzen werden erst beim Kompilieren der Grammatik
//! aufgelöst, deshalb darf ein Modell vorübergehend unvollständig sein
//! (z.B. wenn CommonTypes erst in einem späteren Aufruf registriert wird).
//!
//! Das Modell ist nach dem Laden unveränderlich. [`SchemaModel::merge`]
//! arbeitet auf einer Kopie; bei Namenskollisionen gewinnt die zuletzt
//! registrierte Deklaration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::qname::{QName, XS_NS};

// ============================================================================
// Model
// ============================================================================

/// All declarations of the registered schemas.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct SchemaModel {
    pub elements: BTreeMap<QName, ElementDecl>,
    pub types: BTreeMap<QName, TypeDef>,
    pub groups: BTreeMap<QName, Particle>,
    pub attribute_groups: BTreeMap<QName, Vec<AttributeItem>>,
    pub attributes: BTreeMap<QName, AttributeUse>,
}

/// Counts of declarations replaced by [`SchemaModel::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub replaced: usize,
    pub added: usize,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
            && self.types.is_empty()
            && self.groups.is_empty()
            && self.attribute_groups.is_empty()
            && self.attributes.is_empty()
    }

    /// Merges `other` into `self`. Last registered wins: a declaration in
    /// `other` replaces one with the same kind and qualified name.
    pub fn merge(&mut self, other: SchemaModel) -> MergeReport {
        let mut report = MergeReport::default();
        merge_map(&mut self.elements, other.elements, "element", &mut report);
        merge_map(&mut self.types, other.types, "type", &mut report);
        merge_map(&mut self.groups, other.groups, "group", &mut report);
        merge_map(
            &mut self.attribute_groups,
            other.attribute_groups,
            "attributeGroup",
            &mut report,
        );
        merge_map(&mut self.attributes, other.attributes, "attribute", &mut report);
        report
    }

    /// Identity of the model's content, used as grammar cache key.
    ///
    /// Stable within a process: equal models always produce equal
    /// fingerprints, independent of the order of registration.
    pub fn fingerprint(&self) -> u64 {
        ahash::RandomState::with_seeds(
            0x5632_4743_4f44_4543,
            0x1511_8200_0000_0001,
            0x0c0f_fee0_0000_0000,
            0x0000_0000_0000_0014,
        )
        .hash_one(self)
    }

    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    pub fn type_def(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Global elements, also abstract ones, in EXI order (local name, URI).
    pub fn global_elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }

    /// Direct and transitive substitution group members of `head`, sorted.
    pub fn substitution_members(&self, head: &QName) -> Vec<&ElementDecl> {
        let mut members: Vec<&ElementDecl> = Vec::new();
        let mut pending = vec![head.clone()];
        while let Some(current) = pending.pop() {
            for decl in self.elements.values() {
                if decl.substitution_group.as_ref() == Some(&current)
                    && !members.iter().any(|m| m.name == decl.name)
                    && decl.name != *head
                {
                    members.push(decl);
                    pending.push(decl.name.clone());
                }
            }
        }
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }
}

fn merge_map<V>(
    target: &mut BTreeMap<QName, V>,
    source: BTreeMap<QName, V>,
    kind: &str,
    report: &mut MergeReport,
) {
    for (name, value) in source {
        if target.insert(name.clone(), value).is_some() {
            log::debug!("schema merge: {kind} {name} replaced by later registration");
            report.replaced += 1;
        } else {
            report.added += 1;
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Element declaration, global or local.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct ElementDecl {
    pub name: QName,
    /// `None` means `xs:anyType`.
    pub type_ref: Option<TypeRef>,
    pub nillable: bool,
    pub is_abstract: bool,
    pub substitution_group: Option<QName>,
}

impl ElementDecl {
    pub fn new(name: QName, type_ref: Option<TypeRef>) -> Self {
        Self {
            name,
            type_ref,
            nillable: false,
            is_abstract: false,
            substitution_group: None,
        }
    }
}

/// Reference to a named type or an inline (anonymous) definition.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum TypeRef {
    Named(QName),
    Anonymous(Box<TypeDef>),
}

impl TypeRef {
    pub fn builtin(local_name: &str) -> Self {
        Self::Named(QName::new(XS_NS, local_name))
    }
}

// ============================================================================
// Type Definitions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Hash)]
pub enum TypeDef {
    Simple(SimpleType),
    Complex(ComplexType),
}

/// Variety eines Simple Types (XSD 1.0 Part 2 §4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Variety {
    #[default]
    Atomic,
    List,
    Union,
}

/// Simple type: a base type plus facets.
///
/// `base` is `None` for lists and unions, which are carried as strings.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct SimpleType {
    pub variety: Variety,
    pub base: Option<Box<TypeRef>>,
    pub facets: Facets,
}

/// Constraining facets that influence the EXI representation or are checked
/// when encoding. `pattern` and `whiteSpace` are not modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    pub enumeration: Vec<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
    pub length: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Facets of a derived type override those of its base.
    pub fn restrict(&self, derived: &Facets) -> Facets {
        Facets {
            enumeration: if derived.enumeration.is_empty() {
                self.enumeration.clone()
            } else {
                derived.enumeration.clone()
            },
            min_inclusive: derived.min_inclusive.clone().or_else(|| self.min_inclusive.clone()),
            max_inclusive: derived.max_inclusive.clone().or_else(|| self.max_inclusive.clone()),
            min_exclusive: derived.min_exclusive.clone().or_else(|| self.min_exclusive.clone()),
            max_exclusive: derived.max_exclusive.clone().or_else(|| self.max_exclusive.clone()),
            length: derived.length.or(self.length),
            min_length: derived.min_length.or(self.min_length),
            max_length: derived.max_length.or(self.max_length),
        }
    }
}

/// Art der Typableitung für Complex Types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct ComplexType {
    /// Base type for `complexContent`/`simpleContent` derivations.
    pub base: Option<(Derivation, QName)>,
    pub attributes: Vec<AttributeItem>,
    pub any_attribute: bool,
    pub content: ContentModel,
    pub mixed: bool,
}

impl ComplexType {
    pub fn new(content: ContentModel) -> Self {
        Self {
            base: None,
            attributes: Vec::new(),
            any_attribute: false,
            content,
            mixed: false,
        }
    }
}

/// Content of a complex type as declared (before derivation is applied).
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum ContentModel {
    Empty,
    /// `simpleContent`: the character data type.
    Simple(TypeRef),
    Elements(Particle),
}

// ============================================================================
// Particles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Particle {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

impl Particle {
    pub fn once(term: Term) -> Self {
        Self { min_occurs: 1, max_occurs: MaxOccurs::Bounded(1), term }
    }
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Term {
    /// Local element declaration.
    Element(Box<ElementDecl>),
    /// `<xs:element ref="..."/>`
    ElementRef(QName),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    /// `<xs:group ref="..."/>`
    GroupRef(QName),
    Any(Wildcard),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wildcard {
    pub namespaces: NamespaceConstraint,
}

/// Namespace constraint of `xs:any` (`##any`, `##other`, or a list in which
/// `##local` is the empty URI and `##targetNamespace` is resolved).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceConstraint {
    Any,
    /// Any namespace except the given target namespace and no-namespace.
    Other(Arc<str>),
    List(Vec<Arc<str>>),
}

impl NamespaceConstraint {
    pub fn matches(&self, uri: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other(target) => !uri.is_empty() && uri != &**target,
            Self::List(uris) => uris.iter().any(|u| &**u == uri),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeUseKind {
    Optional,
    Required,
    Prohibited,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct AttributeUse {
    pub name: QName,
    /// `None` means `xs:anySimpleType`.
    pub type_ref: Option<TypeRef>,
    pub use_kind: AttributeUseKind,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub enum AttributeItem {
    Use(AttributeUse),
    /// `<xs:attribute ref="..." use="..."/>`
    Ref { name: QName, use_kind: AttributeUseKind },
    /// `<xs:attributeGroup ref="..."/>`
    Group(QName),
}
