//! XSD schema validation for GPX markup.
//!
//! Supports the subset of XML Schema 1.0 used by the GPX 1.1 schema: top-level
//! element declarations, named and anonymous complex types built from `sequence`
//! and `choice` groups, `any` wildcards, attributes (required, fixed, typed), and
//! named simple types restricted by numeric bounds or enumerations.
//!
//! Child elements are checked for membership and cardinality; their relative order
//! inside a sequence is not enforced.
//!
//! ```rust
//! use gpxdoc_wasm::schema::SchemaValidator;
//!
//! let xsd = r#"<?xml version="1.0"?>
//! <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="point" type="pointType"/>
//!   <xs:complexType name="pointType">
//!     <xs:sequence>
//!       <xs:element name="ele" type="xs:decimal" minOccurs="0"/>
//!     </xs:sequence>
//!     <xs:attribute name="lat" type="xs:decimal" use="required"/>
//!   </xs:complexType>
//! </xs:schema>"#;
//!
//! let validator = SchemaValidator::from_xsd(xsd)?;
//! validator.validate(r#"<point lat="1.5"><ele>12</ele></point>"#)?;
//! assert!(validator.validate(r#"<point><ele>12</ele></point>"#).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use roxmltree::{Document as XmlDocument, Node};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Errors that can occur during schema validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Schema parse error: {message}")]
    SchemaParseError { message: String },

    #[error("Document parse error: {message} at line {line}, column {column}")]
    DocumentParseError {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("Type validation failed for '{name}': expected {expected_type}, found '{value}' at line {line}")]
    TypeValidationError {
        name: String,
        expected_type: String,
        value: String,
        line: u32,
    },

    #[error("Attribute validation failed for '{element}.{attribute}': {message} at line {line}")]
    AttributeValidationError {
        element: String,
        attribute: String,
        message: String,
        line: u32,
    },

    #[error("Cardinality error for '{element}': expected {min}..{}, found {actual} at line {line}", .max.map_or("unbounded".to_string(), |m| m.to_string()))]
    CardinalityError {
        element: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
        line: u32,
    },

    #[error("Required attribute '{attribute}' missing from element '{element}' at line {line}")]
    RequiredAttributeMissing {
        element: String,
        attribute: String,
        line: u32,
    },

    #[error("Unknown element '{element}' not defined in schema at line {line}")]
    UnknownElement { element: String, line: u32 },

    #[error("Element '{element}' is in namespace '{}', expected '{}' at line {line}", .found.as_deref().unwrap_or(""), .expected.as_deref().unwrap_or(""))]
    NamespaceMismatch {
        element: String,
        expected: Option<String>,
        found: Option<String>,
        line: u32,
    },

    #[error("Schema file not found: {}", .path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Debug, Clone, Default)]
struct Schema {
    target_namespace: Option<String>,
    /// `elementFormDefault="qualified"`: local elements also take the target namespace.
    qualified: bool,
    elements: HashMap<String, ElementDef>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
}

#[derive(Debug, Clone)]
struct ElementDef {
    name: String,
    type_ref: Option<String>,
    inline: Option<InlineType>,
    min_occurs: usize,
    max_occurs: Option<usize>,
}

#[derive(Debug, Clone)]
enum InlineType {
    Complex(ComplexType),
    Simple(SimpleType),
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    particles: Vec<Particle>,
    attributes: Vec<AttributeDef>,
}

impl ComplexType {
    fn has_wildcard(&self) -> bool {
        self.particles.iter().any(|p| matches!(p, Particle::Any))
    }

    fn element(&self, name: &str) -> Option<&ElementDef> {
        self.particles.iter().find_map(|p| match p {
            Particle::Element(def) if def.name == name => Some(def),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
enum Particle {
    Element(ElementDef),
    Any,
}

#[derive(Debug, Clone)]
struct AttributeDef {
    name: String,
    type_ref: String,
    inline: Option<SimpleType>,
    required: bool,
    fixed: Option<String>,
}

/// A restriction of a built-in or named simple type.
#[derive(Debug, Clone, Default)]
struct SimpleType {
    base: String,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_exclusive: Option<f64>,
    max_exclusive: Option<f64>,
    enumeration: Vec<String>,
}

/// Validates XML markup against a parsed XSD schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
}

impl SchemaValidator {
    /// Create a validator from XSD text.
    pub fn from_xsd(xsd: &str) -> Result<Self> {
        let schema = Self::parse_xsd(xsd)?;
        Ok(Self { schema })
    }

    /// Create a validator from an XSD file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ValidationError::SchemaNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ValidationError::IoError {
            message: e.to_string(),
        })?;

        Self::from_xsd(&content)
    }

    fn parse_xsd(xsd: &str) -> Result<Schema> {
        let doc = XmlDocument::parse(xsd).map_err(|e| ValidationError::SchemaParseError {
            message: e.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "schema" {
            return Err(ValidationError::SchemaParseError {
                message: "Root element must be <xs:schema>".to_string(),
            });
        }

        let mut schema = Schema {
            target_namespace: root
                .attribute("targetNamespace")
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            qualified: root.attribute("elementFormDefault") == Some("qualified"),
            ..Schema::default()
        };
        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "element" => {
                    let def = Self::parse_element(&child)?;
                    schema.elements.insert(def.name.clone(), def);
                }
                "complexType" => {
                    let name = required_attr(&child, "name", "complexType")?;
                    schema
                        .complex_types
                        .insert(name.to_string(), Self::parse_complex_type(&child)?);
                }
                "simpleType" => {
                    let name = required_attr(&child, "name", "simpleType")?;
                    schema
                        .simple_types
                        .insert(name.to_string(), Self::parse_simple_type(&child)?);
                }
                _ => {}
            }
        }

        Ok(schema)
    }

    fn parse_element(node: &Node) -> Result<ElementDef> {
        let name = required_attr(node, "name", "element")?.to_string();
        let type_ref = node.attribute("type").map(|s| s.to_string());
        let min_occurs = node
            .attribute("minOccurs")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1);
        let max_occurs = match node.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(s) => Some(s.parse::<usize>().map_err(|_| {
                ValidationError::SchemaParseError {
                    message: format!("Invalid maxOccurs '{s}' on element '{name}'"),
                }
            })?),
            None => Some(1),
        };

        let mut inline = None;
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "complexType" => {
                    inline = Some(InlineType::Complex(Self::parse_complex_type(&child)?));
                }
                "simpleType" => {
                    inline = Some(InlineType::Simple(Self::parse_simple_type(&child)?));
                }
                _ => {}
            }
        }

        Ok(ElementDef {
            name,
            type_ref,
            inline,
            min_occurs,
            max_occurs,
        })
    }

    fn parse_complex_type(node: &Node) -> Result<ComplexType> {
        let mut complex = ComplexType::default();

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "sequence" | "all" => Self::parse_group(&child, false, &mut complex.particles)?,
                "choice" => Self::parse_group(&child, true, &mut complex.particles)?,
                "attribute" => complex.attributes.push(Self::parse_attribute(&child)?),
                _ => {}
            }
        }

        Ok(complex)
    }

    /// Flatten a model group into the particle list. Members of a choice are optional.
    fn parse_group(node: &Node, optional: bool, particles: &mut Vec<Particle>) -> Result<()> {
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "element" => {
                    let mut def = Self::parse_element(&child)?;
                    if optional {
                        def.min_occurs = 0;
                    }
                    particles.push(Particle::Element(def));
                }
                "any" => particles.push(Particle::Any),
                "sequence" => Self::parse_group(&child, optional, particles)?,
                "choice" => Self::parse_group(&child, true, particles)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_attribute(node: &Node) -> Result<AttributeDef> {
        let name = required_attr(node, "name", "attribute")?.to_string();
        let type_ref = node.attribute("type").unwrap_or("xs:string").to_string();
        let inline = match node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "simpleType")
        {
            Some(st) => Some(Self::parse_simple_type(&st)?),
            None => None,
        };

        Ok(AttributeDef {
            name,
            type_ref,
            inline,
            required: node.attribute("use") == Some("required"),
            fixed: node.attribute("fixed").map(|s| s.to_string()),
        })
    }

    fn parse_simple_type(node: &Node) -> Result<SimpleType> {
        let mut simple = SimpleType {
            base: "xs:string".to_string(),
            ..Default::default()
        };

        let Some(restriction) = node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "restriction")
        else {
            // list and union types are accepted as plain strings
            return Ok(simple);
        };

        if let Some(base) = restriction.attribute("base") {
            simple.base = base.to_string();
        }

        for facet in restriction.children().filter(|n| n.is_element()) {
            let value = required_attr(&facet, "value", facet.tag_name().name())?;
            match facet.tag_name().name() {
                "minInclusive" => simple.min_inclusive = Some(facet_number(value)?),
                "maxInclusive" => simple.max_inclusive = Some(facet_number(value)?),
                "minExclusive" => simple.min_exclusive = Some(facet_number(value)?),
                "maxExclusive" => simple.max_exclusive = Some(facet_number(value)?),
                "enumeration" => simple.enumeration.push(value.to_string()),
                _ => {}
            }
        }

        Ok(simple)
    }

    /// Validate XML text against the schema.
    pub fn validate(&self, xml: &str) -> Result<()> {
        let doc = XmlDocument::parse(xml).map_err(|e| {
            let pos = e.pos();
            ValidationError::DocumentParseError {
                message: e.to_string(),
                line: pos.row,
                column: pos.col,
            }
        })?;
        self.validate_tree(&doc)
    }

    /// Validate an already parsed markup tree against the schema.
    pub fn validate_tree(&self, doc: &XmlDocument) -> Result<()> {
        let root = doc.root_element();
        let root_name = root.tag_name().name();

        let def = self
            .schema
            .elements
            .get(root_name)
            .ok_or_else(|| ValidationError::UnknownElement {
                element: root_name.to_string(),
                line: line_of(&root),
            })?;

        self.check_namespace(&root, true)?;
        self.validate_element(&root, def)
    }

    /// Global declarations always live in the target namespace; local ones only
    /// when the schema is qualified.
    fn expected_namespace(&self, global: bool) -> Option<&str> {
        if global || self.schema.qualified {
            self.schema.target_namespace.as_deref()
        } else {
            None
        }
    }

    fn check_namespace(&self, node: &Node, global: bool) -> Result<()> {
        let expected = self.expected_namespace(global);
        let found = node.tag_name().namespace();
        if found == expected {
            return Ok(());
        }
        Err(ValidationError::NamespaceMismatch {
            element: node.tag_name().name().to_string(),
            expected: expected.map(str::to_string),
            found: found.map(str::to_string),
            line: line_of(node),
        })
    }

    fn validate_element(&self, node: &Node, def: &ElementDef) -> Result<()> {
        match (&def.inline, &def.type_ref) {
            (Some(InlineType::Complex(complex)), _) => self.validate_complex(node, complex),
            (Some(InlineType::Simple(simple)), _) => {
                let text = text_content(node);
                self.check_simple(&text, simple)
                    .map_err(|expected| type_error(node, expected, &text))
            }
            (None, Some(type_ref)) => {
                let local = local_name(type_ref);
                if let Some(complex) = self.schema.complex_types.get(local) {
                    return self.validate_complex(node, complex);
                }
                let text = text_content(node);
                self.check_value(&text, type_ref)
                    .map_err(|expected| type_error(node, expected, &text))
            }
            // no declared type means anyType
            (None, None) => Ok(()),
        }
    }

    fn validate_complex(&self, node: &Node, complex: &ComplexType) -> Result<()> {
        let element = node.tag_name().name();
        let line = line_of(node);

        for attr_def in &complex.attributes {
            let Some(value) = node.attribute(attr_def.name.as_str()) else {
                if attr_def.required {
                    return Err(ValidationError::RequiredAttributeMissing {
                        element: element.to_string(),
                        attribute: attr_def.name.clone(),
                        line,
                    });
                }
                continue;
            };

            let checked = match &attr_def.inline {
                Some(simple) => self.check_simple(value, simple),
                None => self.check_value(value, &attr_def.type_ref),
            };
            if let Err(expected) = checked {
                return Err(ValidationError::AttributeValidationError {
                    element: element.to_string(),
                    attribute: attr_def.name.clone(),
                    message: format!("Expected type {expected}, found '{value}'"),
                    line,
                });
            }

            if let Some(fixed) = &attr_def.fixed {
                if value != fixed {
                    return Err(ValidationError::AttributeValidationError {
                        element: element.to_string(),
                        attribute: attr_def.name.clone(),
                        message: format!("Value must be '{fixed}', found '{value}'"),
                        line,
                    });
                }
            }
        }

        for attr in node.attributes().filter(|a| a.namespace().is_none()) {
            if !complex.attributes.iter().any(|d| d.name == attr.name()) {
                return Err(ValidationError::AttributeValidationError {
                    element: element.to_string(),
                    attribute: attr.name().to_string(),
                    message: "Attribute is not declared".to_string(),
                    line,
                });
            }
        }

        let children: Vec<_> = node.children().filter(|n| n.is_element()).collect();
        for child in &children {
            let child_name = child.tag_name().name();
            match complex.element(child_name) {
                Some(def) => {
                    self.check_namespace(child, false)?;
                    self.validate_element(child, def)?;
                }
                None if complex.has_wildcard() => {}
                None => {
                    return Err(ValidationError::UnknownElement {
                        element: child_name.to_string(),
                        line: line_of(child),
                    });
                }
            }
        }

        for particle in &complex.particles {
            let Particle::Element(def) = particle else {
                continue;
            };
            let count = children
                .iter()
                .filter(|n| n.tag_name().name() == def.name)
                .count();
            let too_many = def.max_occurs.is_some_and(|max| count > max);
            if count < def.min_occurs || too_many {
                return Err(ValidationError::CardinalityError {
                    element: def.name.clone(),
                    min: def.min_occurs,
                    max: def.max_occurs,
                    actual: count,
                    line,
                });
            }
        }

        Ok(())
    }

    /// Check a text value against a built-in or named simple type.
    /// On failure returns the name of the expected type.
    fn check_value(&self, value: &str, type_ref: &str) -> std::result::Result<(), String> {
        let local = local_name(type_ref);
        if let Some(ok) = check_builtin(local, value) {
            return if ok { Ok(()) } else { Err(type_ref.to_string()) };
        }
        match self.schema.simple_types.get(local) {
            Some(simple) => self
                .check_simple(value, simple)
                .map_err(|_| type_ref.to_string()),
            None => Err(format!("{type_ref} (undefined type)")),
        }
    }

    fn check_simple(&self, value: &str, simple: &SimpleType) -> std::result::Result<(), String> {
        self.check_value(value, &simple.base)?;

        if !simple.enumeration.is_empty() && !simple.enumeration.iter().any(|e| e == value) {
            return Err(format!("one of [{}]", simple.enumeration.join(", ")));
        }

        let has_bounds = simple.min_inclusive.is_some()
            || simple.max_inclusive.is_some()
            || simple.min_exclusive.is_some()
            || simple.max_exclusive.is_some();
        if has_bounds {
            let n = value
                .trim()
                .parse::<f64>()
                .map_err(|_| simple.base.clone())?;
            let in_range = simple.min_inclusive.is_none_or(|min| n >= min)
                && simple.max_inclusive.is_none_or(|max| n <= max)
                && simple.min_exclusive.is_none_or(|min| n > min)
                && simple.max_exclusive.is_none_or(|max| n < max);
            if !in_range {
                return Err(format!("{} within bounds", simple.base));
            }
        }

        Ok(())
    }
}

/// `Some(valid)` for built-in XSD types, `None` for anything else.
fn check_builtin(local: &str, value: &str) -> Option<bool> {
    let trimmed = value.trim();
    let ok = match local {
        "string" | "normalizedString" | "token" | "anyURI" | "anyType" | "anySimpleType"
        | "Name" | "NCName" | "ID" | "IDREF" => true,
        "decimal" | "double" | "float" => trimmed.parse::<f64>().is_ok(),
        "integer" | "int" | "long" | "short" | "byte" => trimmed.parse::<i64>().is_ok(),
        "nonNegativeInteger" | "unsignedLong" | "unsignedInt" | "unsignedShort" => {
            trimmed.parse::<u64>().is_ok()
        }
        "positiveInteger" => trimmed.parse::<u64>().is_ok_and(|n| n > 0),
        "boolean" => matches!(trimmed, "true" | "false" | "1" | "0"),
        "date" => is_date(trimmed),
        "dateTime" => is_date_time(trimmed),
        "gYear" => trimmed.len() >= 4 && trimmed.parse::<i32>().is_ok(),
        _ => return None,
    };
    Some(ok)
}

fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

fn is_date_time(s: &str) -> bool {
    let b = s.as_bytes();
    is_date(s)
        && b.len() >= 19
        && b[10] == b'T'
        && b[11..13].iter().all(u8::is_ascii_digit)
        && b[13] == b':'
        && b[14..16].iter().all(u8::is_ascii_digit)
        && b[16] == b':'
        && b[17..19].iter().all(u8::is_ascii_digit)
}

fn local_name(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

fn required_attr<'a>(node: &Node<'a, '_>, attr: &str, what: &str) -> Result<&'a str> {
    node.attribute(attr)
        .ok_or_else(|| ValidationError::SchemaParseError {
            message: format!("{what} must have '{attr}' attribute"),
        })
}

fn facet_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::SchemaParseError {
            message: format!("Facet value '{value}' is not numeric"),
        })
}

/// Concatenated text of all descendant text nodes, skipping comments and
/// processing instructions.
pub(crate) fn text_content(node: &Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn line_of(node: &Node) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

fn type_error(node: &Node, expected_type: String, value: &str) -> ValidationError {
    ValidationError::TypeValidationError {
        name: node.tag_name().name().to_string(),
        expected_type,
        value: value.to_string(),
        line: line_of(node),
    }
}

/// Bounded cache of parsed schema validators keyed by file path.
pub struct SchemaCache {
    cache: HashMap<PathBuf, Rc<SchemaValidator>>,
    order: VecDeque<PathBuf>,
    max_size: usize,
}

impl SchemaCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Get the cached validator for `path`, loading and caching it on first use.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Rc<SchemaValidator>> {
        if let Some(validator) = self.cache.get(path) {
            return Ok(Rc::clone(validator));
        }

        let validator = Rc::new(SchemaValidator::from_file(path)?);

        if self.cache.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.cache.remove(&oldest);
            }
        }

        self.order.push_back(path.to_path_buf());
        self.cache.insert(path.to_path_buf(), Rc::clone(&validator));

        Ok(validator)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.order.clear();
    }

    pub fn size(&self) -> usize {
        self.cache.len()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(8)
    }
}
