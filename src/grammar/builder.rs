//! Kompiliert ein [`SchemaModel`] zu einem [`GrammarSet`].
//!
//! Typen landen in einer Arena. Benannte Typen und globale Elemente werden
//! memoisiert: der Platz in der Arena wird reserviert, bevor der Typ
//! kompiliert wird, damit rekursive Typen auf sich selbst verweisen können.
//!
//! Ableitungen werden hier aufgelöst:
//! - Extension: Basis-Partikel gefolgt vom eigenen Partikel, Attribute der
//!   Basis plus eigene (gleicher Name ersetzt, `prohibited` entfernt)
//! - Restriction: eigener Inhalt, Attribute wie bei Extension
//! - Simple-Type-Restriction: Facetten von der Basis erben, abgeleitete
//!   Facetten gewinnen

use crate::grammar::{
    AttributeGrammar, Content, ElementGrammar, FirstSet, GrammarSet, Occurs, Rule, RuleKind,
    TypeGrammar, TypeId,
};
use crate::qname::{QName, XS_NS};
use crate::schema::{
    AttributeItem, AttributeUse, AttributeUseKind, ComplexType, ContentModel, Derivation,
    ElementDecl, Facets, MaxOccurs, Particle, SchemaModel, SimpleType, Term, TypeDef, TypeRef,
    Variety,
};
use crate::typed_value::ValueCodec;
use crate::{Error, FastHashMap, Result};

/// Longest derivation chain followed before giving up.
const MAX_DERIVATION_DEPTH: usize = 64;

/// Compiles `model`. Fails on undefined references and on content models
/// the encoder could not decide deterministically.
pub fn compile(model: &SchemaModel) -> Result<GrammarSet> {
    compile_with_fingerprint(model, model.fingerprint())
}

pub(crate) fn compile_with_fingerprint(model: &SchemaModel, fingerprint: u64) -> Result<GrammarSet> {
    let mut builder = Builder::new(model);
    let mut roots = Vec::new();
    for decl in model.global_elements() {
        if decl.is_abstract {
            continue;
        }
        roots.push(builder.global_element(&decl.name)?);
    }
    let types = builder.finish()?;
    log::debug!(
        "compiled grammars {fingerprint:016x}: {} global elements, {} types",
        roots.len(),
        types.len()
    );
    Ok(GrammarSet::new(fingerprint, types, roots))
}

/// Effective content of a complex type after applying its derivation.
enum Effective {
    Empty,
    Simple(ValueCodec),
    Particle(Particle),
    Any,
}

struct Builder<'m> {
    model: &'m SchemaModel,
    types: Vec<Option<TypeGrammar>>,
    named_types: FastHashMap<QName, TypeId>,
    global_elements: FastHashMap<QName, ElementGrammar>,
    /// Model groups currently being expanded.
    group_stack: Vec<QName>,
}

impl<'m> Builder<'m> {
    fn new(model: &'m SchemaModel) -> Self {
        Self {
            model,
            types: Vec::new(),
            named_types: FastHashMap::default(),
            global_elements: FastHashMap::default(),
            group_stack: Vec::new(),
        }
    }

    fn finish(self) -> Result<Vec<TypeGrammar>> {
        self.types
            .into_iter()
            .enumerate()
            .map(|(i, t)| t.ok_or_else(|| Error::Internal(format!("type grammar {i} never filled"))))
            .collect()
    }

    fn reserve(&mut self) -> TypeId {
        self.types.push(None);
        TypeId((self.types.len() - 1) as u32)
    }

    fn fill(&mut self, id: TypeId, grammar: TypeGrammar) {
        self.types[id.0 as usize] = Some(grammar);
    }

    // ========================================================================
    // Elements and types
    // ========================================================================

    fn global_element(&mut self, name: &QName) -> Result<ElementGrammar> {
        if let Some(grammar) = self.global_elements.get(name) {
            return Ok(grammar.clone());
        }
        let model = self.model;
        let decl = model.element(name).ok_or_else(|| Error::UndefinedReference {
            kind: "element",
            name: name.to_string(),
        })?;
        match &decl.type_ref {
            Some(TypeRef::Anonymous(def)) => {
                let id = self.reserve();
                let grammar = ElementGrammar { name: decl.name.clone(), nillable: decl.nillable, type_id: id };
                self.global_elements.insert(name.clone(), grammar.clone());
                let compiled = self.compile_type(def, None)?;
                self.fill(id, compiled);
                Ok(grammar)
            }
            _ => {
                let grammar = self.element_grammar(decl)?;
                self.global_elements.insert(name.clone(), grammar.clone());
                Ok(grammar)
            }
        }
    }

    fn element_grammar(&mut self, decl: &ElementDecl) -> Result<ElementGrammar> {
        let type_id = match &decl.type_ref {
            Some(TypeRef::Named(type_name)) => self.named_type(type_name)?,
            Some(TypeRef::Anonymous(def)) => {
                let id = self.reserve();
                let compiled = self.compile_type(def, None)?;
                self.fill(id, compiled);
                id
            }
            None => self.any_type(),
        };
        Ok(ElementGrammar { name: decl.name.clone(), nillable: decl.nillable, type_id })
    }

    fn any_type(&mut self) -> TypeId {
        let name = QName::new(XS_NS, "anyType");
        if let Some(&id) = self.named_types.get(&name) {
            return id;
        }
        let id = self.reserve();
        self.named_types.insert(name.clone(), id);
        self.fill(id, TypeGrammar { name: Some(name), attributes: Vec::new(), content: Content::Any });
        id
    }

    fn named_type(&mut self, name: &QName) -> Result<TypeId> {
        if let Some(&id) = self.named_types.get(name) {
            return Ok(id);
        }
        if &*name.uri == XS_NS {
            if &*name.local_name == "anyType" {
                return Ok(self.any_type());
            }
            let codec = builtin_codec(name, &Facets::default())?;
            let id = self.reserve();
            self.named_types.insert(name.clone(), id);
            self.fill(
                id,
                TypeGrammar { name: Some(name.clone()), attributes: Vec::new(), content: Content::Simple(codec) },
            );
            return Ok(id);
        }
        let model = self.model;
        let def = model.type_def(name).ok_or_else(|| Error::UndefinedReference {
            kind: "type",
            name: name.to_string(),
        })?;
        let id = self.reserve();
        self.named_types.insert(name.clone(), id);
        let compiled = self.compile_type(def, Some(name.clone()))?;
        self.fill(id, compiled);
        Ok(id)
    }

    fn compile_type(&mut self, def: &TypeDef, name: Option<QName>) -> Result<TypeGrammar> {
        let label = || name.as_ref().map_or_else(|| "(anonymous type)".to_string(), ToString::to_string);
        match def {
            TypeDef::Simple(simple) => Ok(TypeGrammar {
                content: Content::Simple(self.simple_type_codec(simple, Facets::default(), 0)?),
                name,
                attributes: Vec::new(),
            }),
            TypeDef::Complex(complex) => {
                if complex.mixed {
                    log::warn!("mixed content of {} is encoded as element-only", label());
                }
                if complex.any_attribute {
                    log::warn!("attribute wildcard of {} is ignored", label());
                }
                let uses = self.effective_attributes(complex, 0)?;
                let mut attributes = uses
                    .into_iter()
                    .map(|u| {
                        let codec = match &u.type_ref {
                            Some(tr) => self.simple_codec(tr, Facets::default(), 0)?,
                            None => ValueCodec::string(),
                        };
                        Ok(AttributeGrammar {
                            name: u.name,
                            required: u.use_kind == AttributeUseKind::Required,
                            codec,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                attributes.sort_by(|a, b| a.name.cmp(&b.name));

                let content = match self.effective_content(complex, 0)? {
                    Effective::Empty => Content::Empty,
                    Effective::Simple(codec) => Content::Simple(codec),
                    Effective::Any => Content::Any,
                    Effective::Particle(particle) => match self.particle(&particle)? {
                        None => Content::Empty,
                        Some(mut rule) => {
                            rule.assign_follow(&FirstSet::default()).map_err(|e| match e {
                                Error::AmbiguousContentModel(msg) => {
                                    Error::AmbiguousContentModel(format!("{}: {msg}", label()))
                                }
                                other => other,
                            })?;
                            Content::Elements(rule)
                        }
                    },
                };
                Ok(TypeGrammar { name, attributes, content })
            }
        }
    }

    /// Complex base type of a derivation, `None` for built-in and simple bases.
    fn complex_base(&self, complex: &ComplexType) -> Result<Option<(Derivation, &'m ComplexType)>> {
        let Some((derivation, base)) = &complex.base else {
            return Ok(None);
        };
        if &*base.uri == XS_NS {
            return Ok(None);
        }
        let model = self.model;
        match model.type_def(base) {
            Some(TypeDef::Complex(b)) => Ok(Some((*derivation, b))),
            Some(TypeDef::Simple(_)) => Ok(None),
            None => Err(Error::UndefinedReference { kind: "type", name: base.to_string() }),
        }
    }

    fn effective_content(&mut self, complex: &ComplexType, depth: usize) -> Result<Effective> {
        check_depth(depth)?;
        let base = self.complex_base(complex)?;
        let extends = match base {
            Some((Derivation::Extension, b)) => Some(b),
            _ => None,
        };
        match &complex.content {
            ContentModel::Simple(tr) => Ok(Effective::Simple(self.simple_codec(tr, Facets::default(), 0)?)),
            ContentModel::Elements(own) => match extends {
                Some(b) => match self.effective_content(b, depth + 1)? {
                    Effective::Particle(inherited) => Ok(Effective::Particle(Particle::once(
                        Term::Sequence(vec![inherited, own.clone()]),
                    ))),
                    _ => Ok(Effective::Particle(own.clone())),
                },
                None => Ok(Effective::Particle(own.clone())),
            },
            ContentModel::Empty => match extends {
                Some(b) => self.effective_content(b, depth + 1),
                None => match &complex.base {
                    Some((Derivation::Extension, base))
                        if &*base.uri == XS_NS && &*base.local_name == "anyType" =>
                    {
                        Ok(Effective::Any)
                    }
                    _ => Ok(Effective::Empty),
                },
            },
        }
    }

    fn effective_attributes(&mut self, complex: &ComplexType, depth: usize) -> Result<Vec<AttributeUse>> {
        check_depth(depth)?;
        let mut uses = match self.complex_base(complex)? {
            Some((_, base)) => self.effective_attributes(base, depth + 1)?,
            None => Vec::new(),
        };
        let mut own = Vec::new();
        let mut visiting = Vec::new();
        self.expand_attribute_items(&complex.attributes, &mut own, &mut visiting)?;
        for item in own {
            uses.retain(|u| u.name != item.name);
            if item.use_kind != AttributeUseKind::Prohibited {
                uses.push(item);
            }
        }
        Ok(uses)
    }

    fn expand_attribute_items(
        &self,
        items: &[AttributeItem],
        out: &mut Vec<AttributeUse>,
        visiting: &mut Vec<QName>,
    ) -> Result<()> {
        for item in items {
            match item {
                AttributeItem::Use(u) => out.push(u.clone()),
                AttributeItem::Ref { name, use_kind } => {
                    let global = self.model.attributes.get(name).ok_or_else(|| {
                        Error::UndefinedReference { kind: "attribute", name: name.to_string() }
                    })?;
                    out.push(AttributeUse {
                        name: global.name.clone(),
                        type_ref: global.type_ref.clone(),
                        use_kind: *use_kind,
                    });
                }
                AttributeItem::Group(name) => {
                    if visiting.contains(name) {
                        return Err(Error::XsdParseError(format!(
                            "attribute group {name} references itself"
                        )));
                    }
                    let group = self.model.attribute_groups.get(name).ok_or_else(|| {
                        Error::UndefinedReference { kind: "attribute group", name: name.to_string() }
                    })?;
                    visiting.push(name.clone());
                    self.expand_attribute_items(group, out, visiting)?;
                    visiting.pop();
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Simple values
    // ========================================================================

    /// Codec for a simple type reference. `derived` carries the facets of the
    /// restrictions already walked through.
    fn simple_codec(&self, type_ref: &TypeRef, derived: Facets, depth: usize) -> Result<ValueCodec> {
        check_depth(depth)?;
        match type_ref {
            TypeRef::Named(name) if &*name.uri == XS_NS => {
                if matches!(&*name.local_name, "anyType" | "anySimpleType") {
                    return Ok(enumeration_or_string(&derived));
                }
                builtin_codec(name, &derived)
            }
            TypeRef::Named(name) => match self.model.type_def(name) {
                Some(TypeDef::Simple(simple)) => self.simple_type_codec(simple, derived, depth + 1),
                Some(TypeDef::Complex(complex)) => match &complex.content {
                    ContentModel::Simple(inner) => self.simple_codec(inner, derived, depth + 1),
                    _ => Err(Error::XsdParseError(format!(
                        "type {name} is used as a simple type but has no simple content"
                    ))),
                },
                None => Err(Error::UndefinedReference { kind: "type", name: name.to_string() }),
            },
            TypeRef::Anonymous(def) => match &**def {
                TypeDef::Simple(simple) => self.simple_type_codec(simple, derived, depth + 1),
                TypeDef::Complex(_) => Err(Error::XsdParseError(
                    "anonymous complex type used as a simple type".into(),
                )),
            },
        }
    }

    fn simple_type_codec(&self, simple: &SimpleType, derived: Facets, depth: usize) -> Result<ValueCodec> {
        let merged = simple.facets.restrict(&derived);
        match simple.variety {
            Variety::List | Variety::Union => Ok(enumeration_or_string(&merged)),
            Variety::Atomic => match &simple.base {
                Some(base) => self.simple_codec(base, merged, depth + 1),
                None => Ok(enumeration_or_string(&merged)),
            },
        }
    }

    // ========================================================================
    // Particles
    // ========================================================================

    fn particle(&mut self, particle: &Particle) -> Result<Option<Rule>> {
        if particle.max_occurs == MaxOccurs::Bounded(0) {
            return Ok(None);
        }
        let occurs = Occurs::from_bounds(particle.min_occurs, particle.max_occurs);
        let kind = match &particle.term {
            Term::Element(decl) => RuleKind::Element(self.element_grammar(decl)?),
            Term::ElementRef(name) => return self.element_ref(name, particle.min_occurs, occurs),
            Term::Any(wildcard) => RuleKind::Wildcard(wildcard.namespaces.clone()),
            Term::Sequence(items) => {
                let mut rules = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(rule) = self.particle(item)? {
                        rules.push(rule);
                    }
                }
                if rules.is_empty() {
                    return Ok(None);
                }
                RuleKind::Sequence(rules)
            }
            Term::Choice(items) => {
                let mut branches = Vec::with_capacity(items.len());
                for item in items {
                    branches.push(self.particle(item)?.unwrap_or_else(Rule::empty));
                }
                if branches.is_empty() {
                    return Ok(None);
                }
                RuleKind::Choice(branches)
            }
            Term::GroupRef(name) => {
                if self.group_stack.contains(name) {
                    return Err(Error::XsdParseError(format!("model group {name} references itself")));
                }
                let model = self.model;
                let group = model.groups.get(name).ok_or_else(|| Error::UndefinedReference {
                    kind: "group",
                    name: name.to_string(),
                })?;
                self.group_stack.push(name.clone());
                let inner = self.particle(group);
                self.group_stack.pop();
                return match inner? {
                    None => Ok(None),
                    Some(rule) if occurs == Occurs::Once => Ok(Some(rule)),
                    Some(rule) => Rule::new(RuleKind::Sequence(vec![rule]), occurs).map(Some),
                };
            }
        };
        Rule::new(kind, occurs).map(Some)
    }

    /// `<xs:element ref>`, widened to a choice over its substitution group.
    fn element_ref(&mut self, name: &QName, min_occurs: u32, occurs: Occurs) -> Result<Option<Rule>> {
        let model = self.model;
        let head = model.element(name).ok_or_else(|| Error::UndefinedReference {
            kind: "element",
            name: name.to_string(),
        })?;
        let members = model.substitution_members(name);
        if members.is_empty() && !head.is_abstract {
            let grammar = self.global_element(name)?;
            return Rule::new(RuleKind::Element(grammar), occurs).map(Some);
        }
        let mut candidates: Vec<&QName> = members
            .iter()
            .filter(|m| !m.is_abstract)
            .map(|m| &m.name)
            .collect();
        if !head.is_abstract {
            candidates.push(&head.name);
        }
        candidates.sort();
        if candidates.is_empty() {
            if min_occurs == 0 {
                log::debug!("abstract element {name} has no members, particle dropped");
                return Ok(None);
            }
            return Err(Error::UndefinedReference {
                kind: "substitution group member",
                name: name.to_string(),
            });
        }
        let mut branches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let grammar = self.global_element(candidate)?;
            branches.push(Rule::new(RuleKind::Element(grammar), Occurs::Once)?);
        }
        Rule::new(RuleKind::Choice(branches), occurs).map(Some)
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DERIVATION_DEPTH {
        return Err(Error::XsdParseError("type derivation chain too deep or cyclic".into()));
    }
    Ok(())
}

fn builtin_codec(name: &QName, facets: &Facets) -> Result<ValueCodec> {
    ValueCodec::for_builtin(&name.local_name, facets)?.ok_or_else(|| Error::UndefinedReference {
        kind: "type",
        name: name.to_string(),
    })
}

fn enumeration_or_string(facets: &Facets) -> ValueCodec {
    if facets.enumeration.is_empty() {
        ValueCodec::string()
    } else {
        ValueCodec::Enumeration(facets.enumeration.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::parse_xsd;

    const NS: &str = "urn:t";

    fn schema(body: &str) -> SchemaModel {
        parse_xsd(&format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns="urn:t" targetNamespace="urn:t" elementFormDefault="qualified">{body}</xs:schema>"#
        ))
        .unwrap()
    }

    fn q(local: &str) -> QName {
        QName::new(NS, local)
    }

    fn content_of<'g>(grammars: &'g GrammarSet, root: &str) -> &'g TypeGrammar {
        let index = grammars.root_index(&q(root)).unwrap();
        grammars.type_grammar(grammars.roots()[index].type_id)
    }

    #[test]
    fn roots_sorted_and_abstract_skipped() {
        let model = schema(
            r#"<xs:element name="Zeta" type="xs:string"/>
               <xs:element name="Alpha" type="xs:int"/>
               <xs:element name="Head" abstract="true" type="xs:string"/>"#,
        );
        let grammars = compile(&model).unwrap();
        let names: Vec<&str> = grammars.roots().iter().map(|r| &*r.name.local_name).collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
        assert_eq!(grammars.root_bits(), 1);
        assert!(matches!(content_of(&grammars, "Alpha").content, Content::Simple(_)));
    }

    #[test]
    fn extension_appends_particles_and_attributes() {
        let model = schema(
            r#"<xs:complexType name="BaseType">
                 <xs:sequence><xs:element name="A" type="xs:string"/></xs:sequence>
                 <xs:attribute name="Id" type="xs:ID" use="required"/>
               </xs:complexType>
               <xs:complexType name="DerivedType">
                 <xs:complexContent><xs:extension base="BaseType">
                   <xs:sequence><xs:element name="B" type="xs:boolean" minOccurs="0"/></xs:sequence>
                   <xs:attribute name="Extra" type="xs:string"/>
                 </xs:extension></xs:complexContent>
               </xs:complexType>
               <xs:element name="Msg" type="DerivedType"/>"#,
        );
        let grammars = compile(&model).unwrap();
        let msg = content_of(&grammars, "Msg");
        let names: Vec<&str> = msg.attributes.iter().map(|a| &*a.name.local_name).collect();
        assert_eq!(names, ["Extra", "Id"]);
        assert!(msg.attributes[1].required);

        let Content::Elements(rule) = &msg.content else { panic!("element content expected") };
        let mut leaves = Vec::new();
        rule.visit_leaves(&mut |kind, _| {
            if let RuleKind::Element(e) = kind {
                leaves.push(e.name.local_name.to_string());
            }
        });
        assert_eq!(leaves, ["A", "B"]);
    }

    #[test]
    fn simple_restriction_inherits_facets() {
        let model = schema(
            r#"<xs:simpleType name="percentValueType">
                 <xs:restriction base="xs:byte"><xs:minInclusive value="0"/></xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="limitedType">
                 <xs:restriction base="percentValueType"><xs:maxInclusive value="100"/></xs:restriction>
               </xs:simpleType>
               <xs:element name="P" type="limitedType"/>"#,
        );
        let grammars = compile(&model).unwrap();
        match &content_of(&grammars, "P").content {
            Content::Simple(ValueCodec::BoundedInteger { min, max }) => assert_eq!((*min, *max), (0, 100)),
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn recursive_named_type_compiles() {
        let model = schema(
            r#"<xs:complexType name="NodeType"><xs:sequence>
                 <xs:element name="Child" type="NodeType" minOccurs="0" maxOccurs="unbounded"/>
               </xs:sequence></xs:complexType>
               <xs:element name="Tree" type="NodeType"/>"#,
        );
        let grammars = compile(&model).unwrap();
        let tree = content_of(&grammars, "Tree");
        let Content::Elements(rule) = &tree.content else { panic!() };
        let RuleKind::Sequence(items) = &rule.kind else { panic!() };
        let RuleKind::Element(child) = &items[0].kind else { panic!() };
        assert_eq!(child.type_id, grammars.roots()[0].type_id);
        assert_eq!(items[0].occurs, Occurs::Unbounded { min: 0 });
    }

    #[test]
    fn substitution_group_becomes_choice() {
        let model = schema(
            r#"<xs:element name="Parameter" abstract="true" type="xs:string"/>
               <xs:element name="Voltage" substitutionGroup="Parameter" type="xs:string"/>
               <xs:element name="Current" substitutionGroup="Parameter" type="xs:string"/>
               <xs:element name="Box"><xs:complexType><xs:sequence>
                 <xs:element ref="Parameter"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        let grammars = compile(&model).unwrap();
        let Content::Elements(rule) = &content_of(&grammars, "Box").content else { panic!() };
        let RuleKind::Sequence(items) = &rule.kind else { panic!() };
        let RuleKind::Choice(branches) = &items[0].kind else { panic!("choice expected") };
        let names: Vec<String> = branches
            .iter()
            .map(|b| match &b.kind {
                RuleKind::Element(e) => e.name.local_name.to_string(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, ["Current", "Voltage"]);
    }

    #[test]
    fn undefined_references_fail() {
        let model = schema(r#"<xs:element name="M" type="MissingType"/>"#);
        assert!(matches!(
            compile(&model),
            Err(Error::UndefinedReference { kind: "type", .. })
        ));

        let model = schema(
            r#"<xs:element name="M"><xs:complexType><xs:sequence>
                 <xs:element ref="Nowhere"/></xs:sequence></xs:complexType></xs:element>"#,
        );
        assert!(matches!(
            compile(&model),
            Err(Error::UndefinedReference { kind: "element", .. })
        ));

        let model = schema(
            r#"<xs:element name="M"><xs:complexType>
                 <xs:attribute ref="Ghost"/></xs:complexType></xs:element>"#,
        );
        assert!(matches!(
            compile(&model),
            Err(Error::UndefinedReference { kind: "attribute", .. })
        ));
    }

    #[test]
    fn ambiguous_model_is_rejected() {
        let model = schema(
            r#"<xs:element name="M"><xs:complexType><xs:sequence>
                 <xs:element name="A" type="xs:string" minOccurs="0"/>
                 <xs:element name="A" type="xs:int"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        let err = compile(&model).unwrap_err();
        assert!(matches!(err, Error::AmbiguousContentModel(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }

    #[test]
    fn empty_choice_branch_before_same_name_is_rejected() {
        let model = schema(
            r#"<xs:element name="R"><xs:complexType><xs:sequence>
                 <xs:choice><xs:sequence/><xs:element name="B" type="xs:boolean"/></xs:choice>
                 <xs:element name="B" type="xs:boolean"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        assert!(matches!(compile(&model), Err(Error::AmbiguousContentModel(_))));
    }

    #[test]
    fn group_refs_and_max_zero() {
        let model = schema(
            r#"<xs:group name="Pair"><xs:sequence>
                 <xs:element name="X" type="xs:int"/><xs:element name="Y" type="xs:int"/>
               </xs:sequence></xs:group>
               <xs:element name="M"><xs:complexType><xs:sequence>
                 <xs:group ref="Pair" maxOccurs="3"/>
                 <xs:element name="Never" type="xs:int" minOccurs="0" maxOccurs="0"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        let grammars = compile(&model).unwrap();
        let Content::Elements(rule) = &content_of(&grammars, "M").content else { panic!() };
        let RuleKind::Sequence(items) = &rule.kind else { panic!() };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].occurs, Occurs::Counted { min: 1, max: 3 });
    }

    #[test]
    fn untyped_element_is_any() {
        let model = schema(r#"<xs:element name="Free"/>"#);
        let grammars = compile(&model).unwrap();
        assert!(matches!(content_of(&grammars, "Free").content, Content::Any));
    }
}
