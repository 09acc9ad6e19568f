use std::cell::RefCell;

use loom_srcgen::{
    ClassKind, InnerSupplementer, Modifiers, RenderError, SrcAnnotation, SrcClass, SrcField,
    SrcGetProperty, SrcMethod, SrcParameter, SrcSetProperty, SrcStatementBlock, SrcType,
};
use pretty_assertions::assert_eq;

fn block(statement: &str) -> SrcStatementBlock {
    SrcStatementBlock::new().statement(statement)
}

#[test]
fn class_features_render_in_fixed_order() {
    let mut class = SrcClass::new("com.example.Widget", ClassKind::Class);
    class
        .set_modifiers(Modifiers::PUBLIC)
        .add_import("java.util.List")
        .superclass(SrcType::new("Base"))
        .add_interface(SrcType::new("Runnable"))
        .add_static_block(block("init();"))
        .add_method(
            SrcMethod::new("run")
                .modifiers(Modifiers::PUBLIC)
                .body(SrcStatementBlock::new()),
        )
        .add_set_property(
            SrcSetProperty::new("zeta", SrcType::new("int"))
                .modifiers(Modifiers::PUBLIC)
                .body(block("this.zeta = value;")),
        )
        .add_get_property(
            SrcGetProperty::new("name", SrcType::new("String"))
                .modifiers(Modifiers::PUBLIC)
                .body(block("return name;")),
        )
        .add_set_property(
            SrcSetProperty::new("name", SrcType::new("String"))
                .modifiers(Modifiers::PUBLIC)
                .body(block("this.name = value;")),
        )
        .add_constructor(
            SrcMethod::constructor()
                .modifiers(Modifiers::PUBLIC)
                .param(SrcParameter::new("name", SrcType::new("String")))
                .body_text("this.name = name;"),
        )
        .add_field(SrcField::new("name", SrcType::new("String")).modifiers(Modifiers::PRIVATE));

    let expected = "\
/* Generated by Loom */
package com.example;


import java.util.List;
public class Widget extends Base implements Runnable {
  private String name;
  public Widget(String name) {
    this.name = name;
  }
  public String getName() {
    return name;
  }
  public void setName(String value) {
    this.name = value;
  }

  public void setZeta(int value) {
    this.zeta = value;
  }

  public void run() {
  }

  static {
    init();
  }
}

";
    assert_eq!(class.render().unwrap(), expected);
    assert_eq!(class.render().unwrap(), class.render().unwrap());
}

#[test]
fn interface_members_without_default_or_static_are_abstract() {
    let mut iface = SrcClass::new("Shape", ClassKind::Interface);
    iface
        .set_modifiers(Modifiers::PUBLIC)
        .add_type_var(SrcType::new("T"))
        .add_interface(SrcType::new("Comparable").arg(SrcType::new("Shape")))
        .add_method(
            SrcMethod::new("area")
                .modifiers(Modifiers::PUBLIC)
                .returns(SrcType::new("double")),
        )
        .add_method(
            SrcMethod::new("describe")
                .modifiers(Modifiers::DEFAULT)
                .returns(SrcType::new("String"))
                .body_text("return \"shape\";"),
        );

    let expected = "\
/* Generated by Loom */

public interface Shape<T> extends Comparable<Shape> {
  double area();
  default String describe() {
    return \"shape\";
  }
}

";
    assert_eq!(iface.render().unwrap(), expected);
}

#[test]
fn enum_constants_end_with_a_semicolon() {
    let mut color = SrcClass::new("p.Color", ClassKind::Enum);
    color
        .set_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .add_enum_constant(SrcField::enum_constant("RED"))
        .add_enum_constant(
            SrcField::enum_constant("GREEN").annotation(SrcAnnotation::new("Deprecated")),
        );

    let expected = "\
/* Generated by Loom */
package p;


public enum Color {
  RED,
  @Deprecated
  GREEN;

}

";
    assert_eq!(color.render().unwrap(), expected);
}

#[test]
fn record_header_comes_from_the_primary_constructor() {
    let mut point = SrcClass::new("geo.Point", ClassKind::Record);
    point
        .set_modifiers(Modifiers::PUBLIC)
        .add_field(
            SrcField::new("ORIGIN", SrcType::new("Point"))
                .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL)
                .initializer("new Point(0, 0)"),
        )
        .add_field(SrcField::new("x", SrcType::new("int")))
        .add_field(
            SrcField::new("UNIT", SrcType::new("Point"))
                .modifiers(Modifiers::STATIC)
                .initializer("new Point(1, 1)"),
        )
        .add_constructor(
            SrcMethod::primary_constructor()
                .modifiers(Modifiers::PUBLIC)
                .param(SrcParameter::new("x", SrcType::new("int")))
                .param(SrcParameter::new("y", SrcType::new("int")))
                .body(SrcStatementBlock::new()),
        );

    let expected = "\
/* Generated by Loom */
package geo;


public record Point(int x, int y) {
  public static final Point ORIGIN = new Point(0, 0);
  public Point(int x, int y) {
  }
}

";
    assert_eq!(point.render().unwrap(), expected);
}

#[test]
fn record_without_primary_constructor_is_an_error() {
    let point = SrcClass::new("geo.Point", ClassKind::Record);
    assert_eq!(
        point.render(),
        Err(RenderError::MissingPrimaryConstructor {
            record: "geo.Point".into()
        })
    );
}

#[test]
fn concrete_method_without_body_is_an_error() {
    let mut class = SrcClass::new("p.Broken", ClassKind::Class);
    class.add_method(
        SrcMethod::new("size")
            .returns(SrcType::new("int"))
            .param(SrcParameter::new("from", SrcType::new("long"))),
    );
    assert_eq!(
        class.render(),
        Err(RenderError::MissingBody {
            class: "Broken".into(),
            method: "size(long)".into()
        })
    );

    let mut abstract_class = SrcClass::new("p.Fine", ClassKind::Class);
    abstract_class.add_method(
        SrcMethod::new("size")
            .modifiers(Modifiers::ABSTRACT)
            .returns(SrcType::new("int")),
    );
    assert!(abstract_class.render().unwrap().contains("  abstract int size();\n"));
}

#[test]
fn nested_names_colliding_with_any_enclosing_name_are_prefixed() {
    let mut outer = SrcClass::new("p.A", ClassKind::Class);
    let mut b = SrcClass::nested("B", &outer, ClassKind::Class);
    let a = SrcClass::nested("A", &b, ClassKind::Class);
    assert_eq!(a.simple_name(), "B_A");
    assert_eq!(a.name(), "p.A.B.B_A");

    let again = SrcClass::nested("B_A", &b, ClassKind::Class);
    assert_eq!(again.simple_name(), "B_A");

    b.add_inner_class(a);
    assert_eq!(b.disambiguated_name_in_nest("A"), "B_A");
    assert_eq!(b.disambiguated_name_in_nest("Other"), "Other");

    let self_named = SrcClass::nested("A", &outer, ClassKind::Interface);
    assert_eq!(self_named.simple_name(), "A_A");
    outer.add_inner_class(b);
    assert_eq!(outer.disambiguated_name_in_nest("B"), "B");
}

struct Recording {
    calls: RefCell<Vec<(String, bool)>>,
}

impl InnerSupplementer for Recording {
    fn supplement_inner(&self, fqn: &str, binary: bool, source: String) -> String {
        self.calls.borrow_mut().push((fqn.to_string(), binary));
        source.replace("class Inner {", "class Inner implements Extended {")
    }
}

#[test]
fn nested_classes_render_without_header_and_are_supplemented() {
    let mut outer = SrcClass::new("p.Outer", ClassKind::Class);
    outer.set_binary(true);
    let mut inner = SrcClass::nested("Inner", &outer, ClassKind::Class);
    inner
        .set_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
        .add_field(SrcField::new("value", SrcType::new("int")));
    outer.add_inner_class(inner);

    let recording = Recording {
        calls: RefCell::new(Vec::new()),
    };
    let rendered = outer.render_with(Some(&recording)).unwrap();

    let expected = "\
/* Generated by Loom */
package p;


class Outer {
  public static class Inner implements Extended {
    int value;
  }

}

";
    assert_eq!(rendered, expected);
    assert_eq!(
        recording.calls.into_inner(),
        vec![("p.Outer.Inner".to_string(), true)]
    );
}
