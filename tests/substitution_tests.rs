//! Substitution groups during content-model matching

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xmlbind::{
    AtomicType, AttributeDecl, AttributeGroup, ComplexType, ContentKind, DerivationMethod,
    ElementDecl, ElementParticle, GroupParticle, ModelGroup, Occurs, QName, SchemaRegistry,
    TypeRef, ValidationErrorKind, ValidationMode, XmlNode, XsdValue,
};

/// catalog of product+, where shirt substitutes product with an extended type
fn catalog_registry(abstract_head: bool) -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();

    registry.register_complex_type(
        ComplexType::new(Some(QName::local("ProductType")))
            .with_content(ContentKind::Simple(AtomicType::string())),
    );

    let mut shirt_attrs = AttributeGroup::new();
    shirt_attrs
        .add(AttributeDecl::new("size", AtomicType::string()).required())
        .unwrap();
    registry.register_complex_type(
        ComplexType::new(Some(QName::local("ShirtType")))
            .with_content(ContentKind::Simple(AtomicType::string()))
            .with_attributes(shirt_attrs)
            .with_base(QName::local("ProductType"), DerivationMethod::Extension),
    );

    let mut product = ElementDecl::new(
        QName::local("product"),
        TypeRef::named(QName::local("ProductType")),
    );
    if abstract_head {
        product = product.abstract_();
    }
    registry.register_element(product);
    registry.register_element(
        ElementDecl::new(
            QName::local("shirt"),
            TypeRef::named(QName::local("ShirtType")),
        )
        .with_substitution_group(QName::local("product")),
    );

    let content = ModelGroup::sequence(vec![GroupParticle::Element(
        ElementParticle::reference(QName::local("product"), Occurs::one_or_more()),
    )]);
    registry.register_element(ElementDecl::new(
        QName::local("catalog"),
        TypeRef::complex(
            ComplexType::new(None).with_content(ContentKind::ElementOnly(Arc::new(content))),
        ),
    ));
    registry.build().unwrap();
    registry
}

#[test]
fn member_accepted_where_head_is_expected() {
    let registry = catalog_registry(false);
    let node = XmlNode::from_str(
        r#"<catalog><product>generic</product><shirt size="L">tee</shirt></catalog>"#,
    )
    .unwrap();

    let (decoded, errors) = registry.decode(&node, ValidationMode::Strict).unwrap();
    assert!(errors.is_empty());

    let content = decoded.content.as_ref().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[1].0, QName::local("shirt"));
    // decoded through the member's own declaration: its type saw the
    // size attribute
    assert_eq!(
        content[1].1.attribute("size"),
        Some(&XsdValue::String("L".to_string()))
    );
    assert_eq!(
        content[1].1.text,
        Some(XsdValue::String("tee".to_string()))
    );
}

#[test]
fn member_validated_by_its_own_type() {
    let registry = catalog_registry(false);
    // shirt without its required size attribute
    let node = XmlNode::from_str(r#"<catalog><shirt>tee</shirt></catalog>"#).unwrap();

    let errors = registry.iter_errors(&node);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ValidationErrorKind::MissingAttribute);
}

#[test]
fn abstract_head_matches_only_through_substitution() {
    let registry = catalog_registry(true);

    let node = XmlNode::from_str(r#"<catalog><shirt size="M">tee</shirt></catalog>"#).unwrap();
    assert!(registry.is_valid(&node));

    let node = XmlNode::from_str(r#"<catalog><product>generic</product></catalog>"#).unwrap();
    assert!(!registry.is_valid(&node));
}

#[test]
fn expected_tags_include_substitutes() {
    let registry = catalog_registry(false);
    let node = XmlNode::from_str("<catalog/>").unwrap();

    let errors = registry.iter_errors(&node);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ValidationErrorKind::TagExpected);
    assert!(errors[0]
        .to_string()
        .contains("Tag ('product' | 'shirt') expected."));
}

#[test]
fn unrelated_tag_still_rejected() {
    let registry = catalog_registry(false);
    let node = XmlNode::from_str("<catalog><sock>x</sock></catalog>").unwrap();

    let errors = registry.iter_errors(&node);
    let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ValidationErrorKind::TagExpected,
            ValidationErrorKind::UnexpectedChild,
        ]
    );
}
