use serde::{Deserialize, Serialize};
use serde_ion::{
    from_element, from_slice, from_str, to_binary, to_element, to_string, to_string_pretty,
    Deserializer, Error, Reader, WriterOptions,
};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    total: f64,
    note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
enum Shape {
    Empty,
    Circle { radius: f64 },
    Rect(u32, u32),
    Label(String),
}

fn order() -> Order {
    Order {
        order_id: 1001,
        customer: User {
            id: 42,
            name: "Bob".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "A-1".to_string(),
                price: 19.99,
                quantity: 2,
            },
            Product {
                sku: "B-2".to_string(),
                price: 5.5,
                quantity: 1,
            },
        ],
        total: 45.48,
        note: None,
    }
}

#[test]
fn test_simple_struct() {
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        active: true,
        tags: vec!["admin".to_string(), "developer".to_string()],
    };

    let text = to_string(&user).unwrap();
    println!("User Ion: {}", text);
    assert_eq!(
        text,
        r#"{id:123,name:"Alice",active:true,tags:["admin","developer"]}"#
    );

    let back: User = from_str(&text).unwrap();
    assert_eq!(user, back);
}

#[test]
fn test_nested_struct_text_and_binary() {
    let order = order();

    let text = to_string(&order).unwrap();
    assert!(text.contains("note:null.null"));
    assert!(text.contains("price:1.999e1"));
    let from_text: Order = from_str(&text).unwrap();
    assert_eq!(from_text, order);

    let bytes = to_binary(&order).unwrap();
    assert_eq!(&bytes[..4], &[0xE0, 0x01, 0x00, 0xEA]);
    let from_binary: Order = from_slice(&bytes).unwrap();
    assert_eq!(from_binary, order);
}

#[test]
fn test_pretty_output_parses_back() {
    let order = order();
    let pretty = to_string_pretty(&order).unwrap();
    println!("Pretty:\n{}", pretty);
    assert!(pretty.contains("\n  customer: {\n    id: 42,"));
    let back: Order = from_str(&pretty).unwrap();
    assert_eq!(back, order);
}

#[test]
fn test_enums() {
    let shapes = vec![
        Shape::Empty,
        Shape::Circle { radius: 1.5 },
        Shape::Rect(3, 4),
        Shape::Label("it's".to_string()),
    ];

    let text = to_string(&shapes).unwrap();
    assert_eq!(
        text,
        r#"[Empty,Circle::{radius:1.5e0},Rect::[3,4],Label::"it\'s"]"#
    );
    let back: Vec<Shape> = from_str(&text).unwrap();
    assert_eq!(back, shapes);

    let back: Vec<Shape> = from_slice(&to_binary(&shapes).unwrap()).unwrap();
    assert_eq!(back, shapes);
}

#[test]
fn test_unit_variant_accepts_string() {
    let shape: Shape = from_str("\"Empty\"").unwrap();
    assert_eq!(shape, Shape::Empty);
}

#[test]
fn test_options() {
    let values = vec![Some(1), None, Some(-3)];
    let text = to_string(&values).unwrap();
    assert_eq!(text, "[1,null.null,-3]");
    let back: Vec<Option<i32>> = from_str(&text).unwrap();
    assert_eq!(back, values);

    let typed: Vec<Option<i32>> = from_str("[null.int, null, 4]").unwrap();
    assert_eq!(typed, vec![None, None, Some(4)]);
}

#[test]
fn test_maps_keep_key_order() {
    let mut map = BTreeMap::new();
    map.insert("alpha".to_string(), 1);
    map.insert("beta gamma".to_string(), 2);
    map.insert("null".to_string(), 3);

    let text = to_string(&map).unwrap();
    assert_eq!(text, "{alpha:1,'beta gamma':2,'null':3}");
    let back: BTreeMap<String, i32> = from_str(&text).unwrap();
    assert_eq!(back, map);
}

#[test]
fn test_unicode_and_escapes() {
    let strings = vec![
        "héllo wörld".to_string(),
        "tab\tnew\nline".to_string(),
        "quote \" and \\".to_string(),
        "emoji 🦀".to_string(),
    ];
    let text = to_string(&strings).unwrap();
    assert!(text.is_ascii());
    assert!(text.contains(r"\U0001F980"));
    let back: Vec<String> = from_str(&text).unwrap();
    assert_eq!(back, strings);

    let back: Vec<String> = from_slice(&to_binary(&strings).unwrap()).unwrap();
    assert_eq!(back, strings);
}

#[test]
fn test_special_floats() {
    let values = vec![f64::INFINITY, f64::NEG_INFINITY, -0.0, 1e300];
    let text = to_string(&values).unwrap();
    assert_eq!(text, "[+inf,-inf,-0e0,1e300]");
    let back: Vec<f64> = from_str(&text).unwrap();
    assert_eq!(back, values);
    assert!(back[2].is_sign_negative());

    let nan: f64 = from_str("nan").unwrap();
    assert!(nan.is_nan());
}

#[test]
fn test_numbers_from_other_ion_types() {
    let value: f64 = from_str("12.5").unwrap();
    assert_eq!(value, 12.5);
    let value: f64 = from_str("7").unwrap();
    assert_eq!(value, 7.0);
    let value: i64 = from_str("-0x1F").unwrap();
    assert_eq!(value, -31);
    let value: u32 = from_str("0b1010_1010").unwrap();
    assert_eq!(value, 170);
}

#[test]
fn test_integer_range_errors() {
    let result: Result<u8, _> = from_str("256");
    assert!(result.is_err());
    let result: Result<u64, _> = from_str("-1");
    assert!(result.is_err());
}

#[test]
fn test_deeply_nested() {
    let value = vec![vec![vec![vec![1u8]]], vec![]];
    let text = to_string(&value).unwrap();
    assert_eq!(text, "[[[[1]]],[]]");
    let back: Vec<Vec<Vec<Vec<u8>>>> = from_slice(&to_binary(&value).unwrap()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_large_collection() {
    let items: Vec<Product> = (0..500)
        .map(|i| Product {
            sku: format!("SKU-{}", i),
            price: f64::from(i) * 0.5,
            quantity: i,
        })
        .collect();

    let bytes = to_binary(&items).unwrap();
    let back: Vec<Product> = from_slice(&bytes).unwrap();
    assert_eq!(back, items);

    let text = to_string(&items).unwrap();
    let back: Vec<Product> = from_str(&text).unwrap();
    assert_eq!(back, items);
}

#[test]
fn test_binary_symbols_are_interned_once() {
    let users: Vec<User> = (0..20)
        .map(|i| User {
            id: i,
            name: format!("user{}", i),
            active: i % 2 == 0,
            tags: Vec::new(),
        })
        .collect();
    let bytes = to_binary(&users).unwrap();
    let mut reader = Reader::new(&bytes);
    reader.next().unwrap();
    let locals = reader.symbol_table().local_symbols();
    let names: Vec<_> = locals.iter().flatten().map(String::as_str).collect();
    assert_eq!(names, ["id", "active", "tags"]);
}

#[test]
fn test_streaming_multiple_values() {
    let mut de = Deserializer::from_str("1 two::{x: 1} \"three\"");
    let first: Option<i32> = de.next_value().unwrap();
    assert_eq!(first, Some(1));
    let second: Option<BTreeMap<String, i32>> = de.next_value().unwrap();
    assert_eq!(second.map(|m| m["x"]), Some(1));
    let third: Option<String> = de.next_value().unwrap();
    assert_eq!(third.as_deref(), Some("three"));
    let end: Option<i32> = de.next_value().unwrap();
    assert_eq!(end, None);
    de.end().unwrap();
}

#[test]
fn test_trailing_values_rejected() {
    let result: Result<i32, _> = from_str("1 2");
    assert!(result.is_err());
}

#[test]
fn test_element_bridge() {
    let element = to_element(&order()).unwrap();
    let items = element.get("items").and_then(|e| e.value.as_sequence());
    assert_eq!(items.map(<[_]>::len), Some(2));
    let back: Order = from_element(&element).unwrap();
    assert_eq!(back, order());
}

#[test]
fn test_malformed_text() {
    let result: Result<User, _> = from_str("{id: 1, name: \"unterminated}");
    assert!(matches!(result, Err(Error::MalformedInput { .. })));

    let result: Result<Vec<i32>, _> = from_str("[1, 2");
    assert!(matches!(result, Err(Error::MalformedInput { .. })));
}

#[test]
fn test_truncated_binary() {
    let bytes = to_binary(&order()).unwrap();
    let result: Result<Order, _> = from_slice(&bytes[..bytes.len() - 3]);
    assert!(matches!(result, Err(Error::MalformedInput { .. })));
}

#[test]
fn test_pretty_indent_option() {
    let options = WriterOptions::pretty().with_indent(4);
    let text = serde_ion::to_string_with_options(&vec![1, 2], options).unwrap();
    assert_eq!(text, "[\n    1,\n    2\n]");
}
