//! XSD Schema Loader.
//!
//! Parsed XML Schema (XSD) Dateien und konvertiert sie in ein [`SchemaModel`].
//! Referenzen (`type`, `ref`, `base`, `substitutionGroup`) werden nur in
//! QNames übersetzt; aufgelöst werden sie erst beim Kompilieren der Grammatik.
//! Dadurch spielt die Reihenfolge der Deklarationen und der Dateien keine
//! Rolle.
//!
//! # Scope
//!
//! - `xs:element`, `xs:complexType`, `xs:simpleType`, `xs:group`,
//!   `xs:attributeGroup`, `xs:attribute`, `xs:any`, `xs:anyAttribute`
//! - `simpleContent`/`complexContent` mit `extension` und `restriction`
//! - Facets: `enumeration`, `min/maxInclusive`, `min/maxExclusive`,
//!   `length`, `min/maxLength`
//!
//! # Out of Scope
//!
//! - `xs:import`/`xs:include` werden ignoriert; jede Datei wird explizit
//!   registriert (siehe [`load_schema_paths`]).
//! - `xs:all` wird wie `xs:sequence` behandelt (Schema-Reihenfolge).
//! - `xs:key`, `xs:unique`, `xs:keyref`, `pattern`, `whiteSpace`.

mod loader;

pub use loader::load_schema_paths;

use std::sync::Arc;

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Error, Result};
use crate::qname::{QName, XML_NS, XS_NS};
use crate::schema::{
    AttributeItem, AttributeUse, AttributeUseKind, ComplexType, ContentModel, Derivation,
    ElementDecl, Facets, MaxOccurs, NamespaceConstraint, Particle, SchemaModel, SimpleType, Term,
    TypeDef, TypeRef, Variety, Wildcard,
};

/// Maximale Größe eines XSD-Dokuments (16 MiB).
///
/// DoS-Schutz durch Eingabegrößenbeschränkung.
const MAX_XSD_SIZE: usize = 16 * 1024 * 1024;

/// Parsed ein XSD-Dokument zu einem [`SchemaModel`].
///
/// # Beispiel
///
/// ```
/// use v2gcodec::xsd::parse_xsd;
///
/// let xsd = r#"
///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
///                targetNamespace="http://example.org">
///         <xs:element name="book" type="xs:string"/>
///     </xs:schema>
/// "#;
///
/// let model = parse_xsd(xsd).unwrap();
/// assert_eq!(model.elements.len(), 1);
/// ```
pub fn parse_xsd(xsd_content: &str) -> Result<SchemaModel> {
    if xsd_content.len() > MAX_XSD_SIZE {
        return Err(Error::XsdParseError(format!(
            "XSD document too large: {} bytes (max {} bytes)",
            xsd_content.len(),
            MAX_XSD_SIZE
        )));
    }

    let xml_opts = ParsingOptions { allow_dtd: true, ..Default::default() };
    let doc = Document::parse_with_options(xsd_content, xml_opts)
        .map_err(|e| Error::XsdParseError(format!("XML: {e}")))?;

    let root = doc.root_element();

    // Prüfe ob root ein xs:schema Element ist (Name UND Namespace)
    if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XS_NS) {
        return Err(Error::XsdParseError("Root element must be xs:schema".to_string()));
    }

    let mut parser = XsdParser::from_schema_element(&root);
    parser.parse_schema(&root)?;
    Ok(parser.model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormDefault {
    Qualified,
    Unqualified,
}

struct XsdParser {
    target_ns: Arc<str>,
    element_form_default: FormDefault,
    attribute_form_default: FormDefault,
    model: SchemaModel,
}

/// XSD-Kinder eines Knotens ohne `xs:annotation`.
fn xs_children<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| {
        n.is_element()
            && n.tag_name().namespace() == Some(XS_NS)
            && n.tag_name().name() != "annotation"
    })
}

fn required_attr<'a>(node: &Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::XsdParseError(format!("xs:{} without '{name}'", node.tag_name().name()))
    })
}

fn parse_bool_attr(node: &Node, name: &str) -> bool {
    matches!(node.attribute(name), Some("true") | Some("1"))
}

impl XsdParser {
    /// Initialisiert Parser aus schema-Element.
    fn from_schema_element(root: &Node) -> Self {
        let form = |attr: &str| match root.attribute(attr) {
            Some("qualified") => FormDefault::Qualified,
            _ => FormDefault::Unqualified,
        };
        Self {
            target_ns: root.attribute("targetNamespace").unwrap_or("").into(),
            element_form_default: form("elementFormDefault"),
            attribute_form_default: form("attributeFormDefault"),
            model: SchemaModel::new(),
        }
    }

    /// Löst einen QName-String aus Attributwerten auf (type, ref, base).
    ///
    /// Unprefixed QNames bedeuten laut XML-Namespace-Spec den Default-Namespace
    /// des Knotens. Ist der Default-Namespace der XSD-Namespace, landet
    /// `type="string"` daher korrekt bei `xs:string`.
    fn resolve_qname(&self, qname_str: &str, node: &Node) -> Result<QName> {
        let qname_str = qname_str.trim();
        if let Some((prefix, local)) = qname_str.split_once(':') {
            // Sonderfall: "xml" Prefix ist implizit immer definiert
            if prefix == "xml" {
                return Ok(QName::new(XML_NS, local));
            }
            let ns = node
                .namespaces()
                .find(|ns| ns.name() == Some(prefix))
                .map(|ns| ns.uri())
                .ok_or_else(|| {
                    Error::XsdParseError(format!("Unknown prefix '{prefix}' in '{qname_str}'"))
                })?;
            Ok(QName::new(ns, local))
        } else {
            let default_ns = node
                .namespaces()
                .find(|ns| ns.name().is_none())
                .map(|ns| ns.uri())
                .unwrap_or("");
            Ok(QName::new(default_ns, qname_str))
        }
    }

    fn global_name(&self, node: &Node) -> Result<QName> {
        Ok(QName::new(Arc::clone(&self.target_ns), required_attr(node, "name")?))
    }

    /// Namespace eines lokalen Elements oder Attributs (form / formDefault).
    fn local_name(&self, node: &Node, form_default: FormDefault) -> Result<QName> {
        let qualified = match node.attribute("form") {
            Some("qualified") => true,
            Some("unqualified") => false,
            _ => form_default == FormDefault::Qualified,
        };
        let uri: Arc<str> = if qualified { Arc::clone(&self.target_ns) } else { "".into() };
        Ok(QName::new(uri, required_attr(node, "name")?))
    }

    fn parse_schema(&mut self, root: &Node) -> Result<()> {
        for child in xs_children(root) {
            match child.tag_name().name() {
                "element" => {
                    let decl = self.parse_element_common(&child, self.global_name(&child)?)?;
                    self.model.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let name = self.global_name(&child)?;
                    let def = TypeDef::Complex(self.parse_complex_type(&child)?);
                    self.model.types.insert(name, def);
                }
                "simpleType" => {
                    let name = self.global_name(&child)?;
                    let def = TypeDef::Simple(self.parse_simple_type(&child)?);
                    self.model.types.insert(name, def);
                }
                "group" => {
                    let name = self.global_name(&child)?;
                    let particle = xs_children(&child)
                        .find(|n| matches!(n.tag_name().name(), "sequence" | "choice" | "all"))
                        .map(|n| self.parse_particle(&n))
                        .transpose()?
                        .unwrap_or_else(|| Particle::once(Term::Sequence(Vec::new())));
                    self.model.groups.insert(name, particle);
                }
                "attributeGroup" => {
                    let name = self.global_name(&child)?;
                    let mut items = Vec::new();
                    for attr in xs_children(&child) {
                        if let Some(item) = self.parse_attribute_item(&attr)? {
                            items.push(item);
                        }
                    }
                    self.model.attribute_groups.insert(name, items);
                }
                "attribute" => {
                    let name = self.global_name(&child)?;
                    let use_ = AttributeUse {
                        name: name.clone(),
                        type_ref: self.parse_attribute_type(&child)?,
                        use_kind: AttributeUseKind::Optional,
                    };
                    self.model.attributes.insert(name, use_);
                }
                "import" | "include" | "redefine" => {
                    log::debug!(
                        "xs:{} ignored, referenced schemas are registered explicitly",
                        child.tag_name().name()
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // Elements
    // ========================================================================

    fn parse_element_common(&self, node: &Node, name: QName) -> Result<ElementDecl> {
        let type_ref = if let Some(type_name) = node.attribute("type") {
            Some(TypeRef::Named(self.resolve_qname(type_name, node)?))
        } else {
            self.parse_inline_type(node)?
        };
        let mut decl = ElementDecl::new(name, type_ref);
        decl.nillable = parse_bool_attr(node, "nillable");
        decl.is_abstract = parse_bool_attr(node, "abstract");
        decl.substitution_group = node
            .attribute("substitutionGroup")
            .map(|s| self.resolve_qname(s, node))
            .transpose()?;
        Ok(decl)
    }

    fn parse_inline_type(&self, node: &Node) -> Result<Option<TypeRef>> {
        for child in xs_children(node) {
            let def = match child.tag_name().name() {
                "complexType" => TypeDef::Complex(self.parse_complex_type(&child)?),
                "simpleType" => TypeDef::Simple(self.parse_simple_type(&child)?),
                _ => continue,
            };
            return Ok(Some(TypeRef::Anonymous(Box::new(def))));
        }
        Ok(None)
    }

    // ========================================================================
    // Particles
    // ========================================================================

    fn parse_occurs(&self, node: &Node) -> Result<(u32, MaxOccurs)> {
        let min = match node.attribute("minOccurs") {
            Some(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::XsdParseError(format!("Invalid minOccurs: {s}")))?,
            None => 1,
        };
        let max = match node.attribute("maxOccurs").map(str::trim) {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(s) => s
                .parse()
                .map(MaxOccurs::Bounded)
                .map_err(|_| Error::XsdParseError(format!("Invalid maxOccurs: {s}")))?,
            None => MaxOccurs::Bounded(1),
        };
        // Validiere min <= max (XSD 1.0 Part 1 §3.8)
        if let MaxOccurs::Bounded(max_val) = max
            && min > max_val
        {
            return Err(Error::XsdParseError(format!(
                "minOccurs ({min}) cannot be greater than maxOccurs ({max_val})"
            )));
        }
        Ok((min, max))
    }

    fn parse_particle(&self, node: &Node) -> Result<Particle> {
        let (min, max) = self.parse_occurs(node)?;
        let term = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(r) => Term::ElementRef(self.resolve_qname(r, node)?),
                None => {
                    let name = self.local_name(node, self.element_form_default)?;
                    Term::Element(Box::new(self.parse_element_common(node, name)?))
                }
            },
            "any" => Term::Any(Wildcard {
                namespaces: self.parse_namespace_constraint(node.attribute("namespace"))?,
            }),
            "sequence" | "all" => Term::Sequence(self.parse_group_members(node)?),
            "choice" => Term::Choice(self.parse_group_members(node)?),
            "group" => Term::GroupRef(self.resolve_qname(required_attr(node, "ref")?, node)?),
            tag => return Err(Error::XsdParseError(format!("Unknown particle term: {tag}"))),
        };
        Ok(Particle { min_occurs: min, max_occurs: max, term })
    }

    fn parse_group_members(&self, node: &Node) -> Result<Vec<Particle>> {
        xs_children(node)
            .filter(|n| {
                matches!(
                    n.tag_name().name(),
                    "element" | "any" | "sequence" | "choice" | "all" | "group"
                )
            })
            .map(|n| self.parse_particle(&n))
            .collect()
    }

    /// Parsed Namespace-Constraint aus namespace-Attribut.
    fn parse_namespace_constraint(&self, ns_attr: Option<&str>) -> Result<NamespaceConstraint> {
        match ns_attr.map(str::trim) {
            None | Some("##any") => Ok(NamespaceConstraint::Any),
            Some("##other") => Ok(NamespaceConstraint::Other(Arc::clone(&self.target_ns))),
            Some(ns_list) => {
                let tokens: Vec<&str> = ns_list.split_whitespace().collect();
                if tokens.is_empty() {
                    return Err(Error::XsdParseError("Empty namespace list in xs:any".into()));
                }
                if tokens.len() > 1 && tokens.iter().any(|t| *t == "##any" || *t == "##other") {
                    return Err(Error::XsdParseError(
                        "'##any'/'##other' cannot be combined with other namespace values".into(),
                    ));
                }
                let uris = tokens
                    .iter()
                    .map(|token| match *token {
                        "##targetNamespace" => Arc::clone(&self.target_ns),
                        "##local" => "".into(),
                        other => other.into(),
                    })
                    .collect();
                Ok(NamespaceConstraint::List(uris))
            }
        }
    }

    // ========================================================================
    // Complex Types
    // ========================================================================

    fn parse_complex_type(&self, node: &Node) -> Result<ComplexType> {
        let mut ct = ComplexType::new(ContentModel::Empty);
        ct.mixed = parse_bool_attr(node, "mixed");
        self.parse_complex_body(node, &mut ct)?;
        Ok(ct)
    }

    /// Inhalt von `xs:complexType` bzw. von `extension`/`restriction` in
    /// `complexContent`.
    fn parse_complex_body(&self, node: &Node, ct: &mut ComplexType) -> Result<()> {
        for child in xs_children(node) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => {
                    ct.content = ContentModel::Elements(self.parse_particle(&child)?);
                }
                "attribute" | "attributeGroup" => {
                    if let Some(item) = self.parse_attribute_item(&child)? {
                        ct.attributes.push(item);
                    }
                }
                "anyAttribute" => ct.any_attribute = true,
                "simpleContent" => self.parse_simple_content(&child, ct)?,
                "complexContent" => {
                    if parse_bool_attr(&child, "mixed") {
                        ct.mixed = true;
                    }
                    let (derivation, body) = self.find_derivation(&child)?;
                    let base = self.resolve_qname(required_attr(&body, "base")?, &body)?;
                    ct.base = Some((derivation, base));
                    self.parse_complex_body(&body, ct)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn find_derivation<'a, 'input>(
        &self,
        node: &Node<'a, 'input>,
    ) -> Result<(Derivation, Node<'a, 'input>)> {
        xs_children(node)
            .find_map(|n| match n.tag_name().name() {
                "extension" => Some((Derivation::Extension, n)),
                "restriction" => Some((Derivation::Restriction, n)),
                _ => None,
            })
            .ok_or_else(|| {
                Error::XsdParseError(format!(
                    "xs:{} without extension or restriction",
                    node.tag_name().name()
                ))
            })
    }

    fn parse_simple_content(&self, node: &Node, ct: &mut ComplexType) -> Result<()> {
        let (derivation, body) = self.find_derivation(node)?;
        let base = self.resolve_qname(required_attr(&body, "base")?, &body)?;
        ct.content = match derivation {
            Derivation::Extension => ContentModel::Simple(TypeRef::Named(base.clone())),
            Derivation::Restriction => {
                let facets = self.parse_facets(&body)?;
                ContentModel::Simple(TypeRef::Anonymous(Box::new(TypeDef::Simple(SimpleType {
                    variety: Variety::Atomic,
                    base: Some(Box::new(TypeRef::Named(base.clone()))),
                    facets,
                }))))
            }
        };
        ct.base = Some((derivation, base));
        for child in xs_children(&body) {
            match child.tag_name().name() {
                "attribute" | "attributeGroup" => {
                    if let Some(item) = self.parse_attribute_item(&child)? {
                        ct.attributes.push(item);
                    }
                }
                "anyAttribute" => ct.any_attribute = true,
                _ => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // Simple Types
    // ========================================================================

    fn parse_simple_type(&self, node: &Node) -> Result<SimpleType> {
        for child in xs_children(node) {
            match child.tag_name().name() {
                "restriction" => {
                    let base = match child.attribute("base") {
                        Some(b) => Some(TypeRef::Named(self.resolve_qname(b, &child)?)),
                        None => xs_children(&child)
                            .find(|n| n.tag_name().name() == "simpleType")
                            .map(|n| self.parse_simple_type(&n))
                            .transpose()?
                            .map(|st| TypeRef::Anonymous(Box::new(TypeDef::Simple(st)))),
                    };
                    return Ok(SimpleType {
                        variety: Variety::Atomic,
                        base: base.map(Box::new),
                        facets: self.parse_facets(&child)?,
                    });
                }
                "list" => return Ok(SimpleType { variety: Variety::List, ..Default::default() }),
                "union" => return Ok(SimpleType { variety: Variety::Union, ..Default::default() }),
                _ => {}
            }
        }
        Err(Error::XsdParseError("xs:simpleType without restriction, list or union".into()))
    }

    fn parse_facets(&self, node: &Node) -> Result<Facets> {
        let mut facets = Facets::default();
        for child in xs_children(node) {
            let Some(value) = child.attribute("value") else {
                continue;
            };
            let length = || {
                value.trim().parse::<u64>().map_err(|_| {
                    Error::XsdParseError(format!(
                        "Invalid xs:{} value '{value}'",
                        child.tag_name().name()
                    ))
                })
            };
            match child.tag_name().name() {
                "enumeration" => facets.enumeration.push(value.to_string()),
                "minInclusive" => facets.min_inclusive = Some(value.trim().to_string()),
                "maxInclusive" => facets.max_inclusive = Some(value.trim().to_string()),
                "minExclusive" => facets.min_exclusive = Some(value.trim().to_string()),
                "maxExclusive" => facets.max_exclusive = Some(value.trim().to_string()),
                "length" => facets.length = Some(length()?),
                "minLength" => facets.min_length = Some(length()?),
                "maxLength" => facets.max_length = Some(length()?),
                _ => {}
            }
        }
        Ok(facets)
    }

    // ========================================================================
    // Attribute Parsing
    // ========================================================================

    fn parse_attribute_item(&self, node: &Node) -> Result<Option<AttributeItem>> {
        match node.tag_name().name() {
            "attribute" => {
                let use_kind = match node.attribute("use") {
                    Some("required") => AttributeUseKind::Required,
                    Some("prohibited") => AttributeUseKind::Prohibited,
                    _ => AttributeUseKind::Optional,
                };
                if let Some(r) = node.attribute("ref") {
                    let name = self.resolve_qname(r, node)?;
                    return Ok(Some(AttributeItem::Ref { name, use_kind }));
                }
                Ok(Some(AttributeItem::Use(AttributeUse {
                    name: self.local_name(node, self.attribute_form_default)?,
                    type_ref: self.parse_attribute_type(node)?,
                    use_kind,
                })))
            }
            "attributeGroup" => {
                let name = self.resolve_qname(required_attr(node, "ref")?, node)?;
                Ok(Some(AttributeItem::Group(name)))
            }
            _ => Ok(None),
        }
    }

    fn parse_attribute_type(&self, node: &Node) -> Result<Option<TypeRef>> {
        if let Some(type_name) = node.attribute("type") {
            return Ok(Some(TypeRef::Named(self.resolve_qname(type_name, node)?)));
        }
        xs_children(node)
            .find(|n| n.tag_name().name() == "simpleType")
            .map(|n| {
                self.parse_simple_type(&n)
                    .map(|st| TypeRef::Anonymous(Box::new(TypeDef::Simple(st))))
            })
            .transpose()
    }
}
