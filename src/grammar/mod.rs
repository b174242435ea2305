//! Schema-informed grammars.
//!
//! A [`GrammarSet`] is compiled once per schema model and shared read-only by
//! every encode and decode call. Per type it holds the attribute uses and a
//! content rule tree:
//!
//! - [`RuleKind::Element`]: exactly one child element with a known grammar
//! - [`RuleKind::Sequence`]: rules in order
//! - [`RuleKind::Choice`]: one branch, selected by an n-bit index
//! - [`RuleKind::Wildcard`]: one element of any name allowed by the
//!   namespace constraint, in the self-describing generic encoding
//!
//! Each rule carries its [`Occurs`] and the precomputed lookahead sets the
//! encoder needs to take every decision from the next child's name alone.
//! The decoder never looks ahead: every decision is in the stream.

pub mod builder;
pub mod cache;

use core::fmt;

use crate::qname::QName;
use crate::schema::{MaxOccurs, NamespaceConstraint};
use crate::typed_value::ValueCodec;
use crate::{Error, FastHashMap, FastHashSet, Result, bit_width};

pub use builder::compile;
pub use cache::GrammarCache;

// ============================================================================
// GrammarSet
// ============================================================================

/// Index of a [`TypeGrammar`] in its [`GrammarSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

/// Compiled grammars of one schema model.
#[derive(Debug)]
pub struct GrammarSet {
    fingerprint: u64,
    types: Vec<TypeGrammar>,
    /// Non-abstract global elements, sorted by (local name, URI).
    roots: Vec<ElementGrammar>,
    root_index: FastHashMap<QName, usize>,
}

impl GrammarSet {
    pub(crate) fn new(fingerprint: u64, types: Vec<TypeGrammar>, roots: Vec<ElementGrammar>) -> Self {
        let root_index = roots
            .iter()
            .enumerate()
            .map(|(i, root)| (root.name.clone(), i))
            .collect();
        Self { fingerprint, types, roots, root_index }
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn roots(&self) -> &[ElementGrammar] {
        &self.roots
    }

    pub fn root(&self, index: usize) -> Option<&ElementGrammar> {
        self.roots.get(index)
    }

    pub fn root_index(&self, name: &QName) -> Option<usize> {
        self.root_index.get(name).copied()
    }

    /// Width of the root element code.
    pub fn root_bits(&self) -> u8 {
        bit_width::for_count(self.roots.len())
    }

    pub fn type_grammar(&self, id: TypeId) -> &TypeGrammar {
        &self.types[id.0 as usize]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// An element: name, nillability and the grammar of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementGrammar {
    pub name: QName,
    pub nillable: bool,
    pub type_id: TypeId,
}

#[derive(Debug)]
pub struct TypeGrammar {
    /// Type name, `None` for anonymous types.
    pub name: Option<QName>,
    /// Attribute uses sorted by (local name, URI).
    pub attributes: Vec<AttributeGrammar>,
    pub content: Content,
}

impl TypeGrammar {
    pub fn attribute(&self, name: &QName) -> Option<&AttributeGrammar> {
        self.attributes.iter().find(|a| a.name == *name)
    }

    /// Name for diagnostics.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "(anonymous type)".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttributeGrammar {
    pub name: QName,
    pub required: bool,
    pub codec: ValueCodec,
}

#[derive(Debug)]
pub enum Content {
    Empty,
    /// Simple type or `simpleContent`.
    Simple(ValueCodec),
    Elements(Rule),
    /// `xs:anyType`: attributes and content in the generic encoding.
    Any,
}

// ============================================================================
// Occurrence
// ============================================================================

/// How often a rule occurs and how that count travels in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Once,
    /// Presence bit.
    Optional,
    /// `min` mandatory occurrences, then a "more" bit before each further
    /// occurrence and a terminating 0 bit.
    Unbounded { min: u32 },
    /// Count prefix of `⌈log₂(max - min + 1)⌉` bits holding `count - min`.
    Counted { min: u32, max: u32 },
}

impl Occurs {
    pub fn from_bounds(min: u32, max: MaxOccurs) -> Self {
        match (min, max) {
            (1, MaxOccurs::Bounded(1)) => Self::Once,
            (0, MaxOccurs::Bounded(1)) => Self::Optional,
            (min, MaxOccurs::Unbounded) => Self::Unbounded { min },
            (min, MaxOccurs::Bounded(max)) => Self::Counted { min, max },
        }
    }

    pub fn min(&self) -> u32 {
        match *self {
            Self::Once => 1,
            Self::Optional => 0,
            Self::Unbounded { min } | Self::Counted { min, .. } => min,
        }
    }

    /// True if more than one occurrence is possible.
    pub fn is_repeated(&self) -> bool {
        match *self {
            Self::Once | Self::Optional => false,
            Self::Unbounded { .. } => true,
            Self::Counted { max, .. } => max > 1,
        }
    }

    /// True if the encoder must decide how many occurrences to take.
    fn has_decision(&self) -> bool {
        match *self {
            Self::Once => false,
            Self::Optional | Self::Unbounded { .. } => true,
            Self::Counted { min, max } => min < max,
        }
    }
}

// ============================================================================
// Lookahead sets
// ============================================================================

/// Element names (and wildcards) that can start a rule or follow it.
#[derive(Debug, Clone, Default)]
pub struct FirstSet {
    names: FastHashSet<QName>,
    wildcards: Vec<NamespaceConstraint>,
}

fn constraints_intersect(a: &NamespaceConstraint, b: &NamespaceConstraint) -> bool {
    use NamespaceConstraint::*;
    match (a, b) {
        (Any, _) | (_, Any) | (Other(_), Other(_)) => true,
        (List(uris), other) | (other, List(uris)) => uris.iter().any(|u| other.matches(u)),
    }
}

impl FirstSet {
    fn element(name: &QName) -> Self {
        let mut set = Self::default();
        set.names.insert(name.clone());
        set
    }

    fn wildcard(constraint: &NamespaceConstraint) -> Self {
        Self { names: FastHashSet::default(), wildcards: vec![constraint.clone()] }
    }

    fn union_with(&mut self, other: &FirstSet) {
        self.names.extend(other.names.iter().cloned());
        for w in &other.wildcards {
            if !self.wildcards.contains(w) {
                self.wildcards.push(w.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.wildcards.is_empty()
    }

    pub fn contains_name(&self, name: &QName) -> bool {
        self.names.contains(name)
    }

    pub fn wildcard_matches(&self, name: &QName) -> bool {
        self.wildcards.iter().any(|w| w.matches(&name.uri))
    }

    /// Describes the first conflict between `self` and `other`, if any.
    /// Explicit names never conflict with wildcards: the name wins.
    fn conflict(&self, other: &FirstSet) -> Option<String> {
        let (small, large) = if self.names.len() <= other.names.len() {
            (self, other)
        } else {
            (other, self)
        };
        if let Some(name) = small.names.iter().find(|n| large.names.contains(*n)) {
            return Some(format!("element '{name}'"));
        }
        let competing = self
            .wildcards
            .iter()
            .any(|a| other.wildcards.iter().any(|b| constraints_intersect(a, b)));
        competing.then(|| "two wildcards".to_string())
    }

    /// Human-readable list for error messages, sorted.
    pub fn describe(&self) -> String {
        let mut names: Vec<&QName> = self.names.iter().collect();
        names.sort();
        let mut parts: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
        if !self.wildcards.is_empty() {
            parts.push("any element".to_string());
        }
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(" or ")
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug)]
pub enum RuleKind {
    Element(ElementGrammar),
    Sequence(Vec<Rule>),
    Choice(Vec<Rule>),
    Wildcard(NamespaceConstraint),
}

/// A node of a content rule tree.
#[derive(Debug)]
pub struct Rule {
    pub kind: RuleKind,
    pub occurs: Occurs,
    first: FirstSet,
    /// True if the rule may produce no element at all (occurs included).
    nullable: bool,
    /// Names that may follow this rule inside its type.
    follow: FirstSet,
}

impl Rule {
    /// Builds a rule and computes its first set. Choices are checked for
    /// determinism here.
    pub(crate) fn new(kind: RuleKind, occurs: Occurs) -> Result<Self> {
        let (first, term_nullable) = match &kind {
            RuleKind::Element(e) => (FirstSet::element(&e.name), false),
            RuleKind::Wildcard(w) => (FirstSet::wildcard(w), false),
            RuleKind::Sequence(items) => {
                let mut first = FirstSet::default();
                let mut nullable = true;
                for item in items {
                    first.union_with(&item.first);
                    if !item.nullable {
                        nullable = false;
                        break;
                    }
                }
                (first, nullable)
            }
            RuleKind::Choice(branches) => {
                let mut first = FirstSet::default();
                let mut nullable_branches = 0;
                for (i, branch) in branches.iter().enumerate() {
                    for other in &branches[..i] {
                        if let Some(what) = other.first.conflict(&branch.first) {
                            return Err(Error::AmbiguousContentModel(format!(
                                "choice branches {} overlap on {what}",
                                branch.first.describe()
                            )));
                        }
                    }
                    if branch.nullable {
                        nullable_branches += 1;
                    }
                    first.union_with(&branch.first);
                }
                if nullable_branches > 1 {
                    return Err(Error::AmbiguousContentModel(format!(
                        "choice over {} has {nullable_branches} empty branches",
                        first.describe()
                    )));
                }
                (first, nullable_branches == 1)
            }
        };
        Ok(Self {
            kind,
            occurs,
            first,
            nullable: term_nullable || occurs.min() == 0,
            follow: FirstSet::default(),
        })
    }

    /// A rule that matches nothing (an empty choice branch).
    pub(crate) fn empty() -> Self {
        Self {
            kind: RuleKind::Sequence(Vec::new()),
            occurs: Occurs::Once,
            first: FirstSet::default(),
            nullable: true,
            follow: FirstSet::default(),
        }
    }

    pub fn first(&self) -> &FirstSet {
        &self.first
    }

    pub fn follow(&self) -> &FirstSet {
        &self.follow
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True if an element named `name` starts this rule rather than
    /// whatever follows it. Explicit names beat wildcards.
    pub fn starts_with(&self, name: &QName) -> bool {
        self.first.contains_name(name)
            || (self.first.wildcard_matches(name) && !self.follow.contains_name(name))
    }

    /// Assigns follow sets top-down and checks every optional or repeated
    /// rule for a first/follow conflict.
    pub(crate) fn assign_follow(&mut self, follow: &FirstSet) -> Result<()> {
        self.follow = follow.clone();
        if self.occurs.has_decision()
            && let Some(what) = self.first.conflict(follow)
        {
            return Err(Error::AmbiguousContentModel(format!(
                "optional or repeated {} cannot be told apart from what follows on {what}",
                self.first.describe()
            )));
        }
        // Eine Choice mit leerem Zweig entscheidet ebenfalls per Lookahead
        if !self.occurs.has_decision()
            && let RuleKind::Choice(branches) = &self.kind
            && branches.iter().any(|b| b.nullable)
            && let Some(what) = self.first.conflict(follow)
        {
            return Err(Error::AmbiguousContentModel(format!(
                "choice over {} with an empty branch cannot be told apart from what follows on {what}",
                self.first.describe()
            )));
        }
        let mut inner = follow.clone();
        if self.occurs.is_repeated() {
            inner.union_with(&self.first);
        }
        match &mut self.kind {
            RuleKind::Sequence(items) => {
                let mut next = inner;
                for item in items.iter_mut().rev() {
                    item.assign_follow(&next)?;
                    if item.nullable {
                        next.union_with(&item.first);
                    } else {
                        next = item.first.clone();
                    }
                }
            }
            RuleKind::Choice(branches) => {
                for branch in branches {
                    branch.assign_follow(&inner)?;
                }
            }
            RuleKind::Element(_) | RuleKind::Wildcard(_) => {}
        }
        Ok(())
    }

    /// Visits element and wildcard leaves in schema order. `repeated` is true
    /// if the leaf or any rule above it may occur more than once.
    pub fn visit_leaves<'r>(&'r self, f: &mut impl FnMut(&'r RuleKind, bool)) {
        self.visit_leaves_inner(false, f);
    }

    fn visit_leaves_inner<'r>(&'r self, repeated: bool, f: &mut impl FnMut(&'r RuleKind, bool)) {
        let repeated = repeated || self.occurs.is_repeated();
        match &self.kind {
            RuleKind::Sequence(items) | RuleKind::Choice(items) => {
                for item in items {
                    item.visit_leaves_inner(repeated, f);
                }
            }
            leaf => f(leaf, repeated),
        }
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => f.write_str("1"),
            Self::Optional => f.write_str("0..1"),
            Self::Unbounded { min } => write!(f, "{min}..*"),
            Self::Counted { min, max } => write!(f, "{min}..{max}"),
        }
    }
}
