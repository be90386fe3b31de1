//! Encoding decoded values back into instance nodes

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xmlbind::{
    AtomicType, AttributeDecl, AttributeGroup, ComplexType, ContentKind, DecodedValue,
    ElementDecl, ElementParticle, GroupParticle, ModelGroup, Occurs, QName, SchemaRegistry,
    TypeRef, ValidationErrorKind, ValidationMode, XmlNode, XsdValue,
};

fn invoice_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();

    let mut attrs = AttributeGroup::new();
    attrs
        .add(AttributeDecl::new("id", AtomicType::integer()).required())
        .unwrap();
    attrs
        .add(
            AttributeDecl::new("currency", AtomicType::string())
                .with_fixed("EUR")
                .unwrap(),
        )
        .unwrap();

    let amount = ElementDecl::new(
        QName::local("amount"),
        TypeRef::simple(AtomicType::decimal()),
    )
    .local_scope();
    let due = ElementDecl::new(QName::local("due"), TypeRef::simple(AtomicType::date()))
        .local_scope()
        .with_occurs(Occurs::optional());
    let content = ModelGroup::sequence(vec![
        GroupParticle::Element(ElementParticle::local(Arc::new(amount))),
        GroupParticle::Element(ElementParticle::local(Arc::new(due))),
    ]);

    registry.register_element(ElementDecl::new(
        QName::local("invoice"),
        TypeRef::complex(
            ComplexType::new(None)
                .with_content(ContentKind::ElementOnly(Arc::new(content)))
                .with_attributes(attrs),
        ),
    ));
    registry.build().unwrap();
    registry
}

fn kinds(errors: &[xmlbind::ValidationError]) -> Vec<ValidationErrorKind> {
    errors.iter().map(|e| e.kind).collect()
}

#[test]
fn encodes_hand_built_value() {
    let registry = invoice_registry();

    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("id".to_string(), XsdValue::Integer(12));
    value
        .attributes
        .insert("currency".to_string(), XsdValue::String("EUR".to_string()));
    value.content = Some(vec![(
        QName::local("amount"),
        DecodedValue::with_text(
            QName::local("amount"),
            XsdValue::Decimal("99.50".parse().unwrap()),
        ),
    )]);

    let (node, errors) = registry.encode(&value, ValidationMode::Strict).unwrap();
    assert!(errors.is_empty());

    assert_eq!(node.attribute("id"), Some("12"));
    assert_eq!(node.attribute("currency"), Some("EUR"));
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].text.as_deref(), Some("99.50"));

    let xml = node.to_xml_string().unwrap();
    assert_eq!(
        xml,
        r#"<invoice id="12" currency="EUR"><amount>99.50</amount></invoice>"#
    );
}

#[test]
fn encode_missing_required_attribute() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value.content = Some(vec![(
        QName::local("amount"),
        DecodedValue::with_text(QName::local("amount"), XsdValue::Integer(1)),
    )]);

    let err = registry.encode(&value, ValidationMode::Strict).unwrap_err();
    match err {
        xmlbind::Error::Validation(e) => {
            assert_eq!(e.kind, ValidationErrorKind::MissingAttribute)
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn encode_rejects_wrong_fixed_attribute() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("id".to_string(), XsdValue::Integer(1));
    value
        .attributes
        .insert("currency".to_string(), XsdValue::String("USD".to_string()));

    let (_, errors) = registry.encode(&value, ValidationMode::Lax).unwrap();
    assert!(kinds(&errors).contains(&ValidationErrorKind::AttributeTypeError));
}

#[test]
fn encode_missing_required_child() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("id".to_string(), XsdValue::Integer(1));
    value.content = Some(vec![]);

    let (_, errors) = registry.encode(&value, ValidationMode::Lax).unwrap();
    assert!(kinds(&errors).contains(&ValidationErrorKind::TagExpected));
}

#[test]
fn encode_unexpected_child() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("id".to_string(), XsdValue::Integer(1));
    value.content = Some(vec![
        (
            QName::local("amount"),
            DecodedValue::with_text(QName::local("amount"), XsdValue::Integer(1)),
        ),
        (
            QName::local("bogus"),
            DecodedValue::new(QName::local("bogus")),
        ),
    ]);

    let (_, errors) = registry.encode(&value, ValidationMode::Lax).unwrap();
    assert!(kinds(&errors).contains(&ValidationErrorKind::UnexpectedChild));
}

#[test]
fn encode_type_mismatch_surfaces_as_content_error() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("id".to_string(), XsdValue::Integer(1));
    value.content = Some(vec![(
        QName::local("due"),
        // a date element carrying a boolean cannot be encoded
        DecodedValue::with_text(QName::local("due"), XsdValue::Boolean(true)),
    )]);

    let (_, errors) = registry.encode(&value, ValidationMode::Lax).unwrap();
    assert!(kinds(&errors).contains(&ValidationErrorKind::SimpleContentTypeError));
}

#[test]
fn skip_mode_encodes_structurally() {
    let registry = invoice_registry();
    let mut value = DecodedValue::new(QName::local("invoice"));
    value
        .attributes
        .insert("unknown".to_string(), XsdValue::String("x".to_string()));

    let (node, errors) = registry.encode(&value, ValidationMode::Skip).unwrap();
    assert!(errors.is_empty());
    assert_eq!(node.attribute("unknown"), Some("x"));
}

#[test]
fn roundtrip_through_decode_and_encode() {
    let registry = invoice_registry();
    let original = XmlNode::from_str(
        r#"<invoice id="3" currency="EUR"><amount>10.00</amount><due>2026-01-15</due></invoice>"#,
    )
    .unwrap();

    let (decoded, errors) = registry.decode(&original, ValidationMode::Strict).unwrap();
    assert!(errors.is_empty());
    let (encoded, errors) = registry.encode(&decoded, ValidationMode::Strict).unwrap();
    assert!(errors.is_empty());

    assert!(original.equivalent(&encoded));
}

#[test]
fn roundtrip_keeps_decode_time_defaults() {
    let registry = invoice_registry();
    // currency is fixed, so decoding adds it
    let original =
        XmlNode::from_str(r#"<invoice id="3"><amount>10.00</amount></invoice>"#).unwrap();

    let (decoded, _) = registry.decode(&original, ValidationMode::Strict).unwrap();
    assert_eq!(
        decoded.attribute("currency"),
        Some(&XsdValue::String("EUR".to_string()))
    );

    let (encoded, errors) = registry.encode(&decoded, ValidationMode::Strict).unwrap();
    assert!(errors.is_empty());
    assert_eq!(encoded.attribute("currency"), Some("EUR"));
}
