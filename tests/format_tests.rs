//! Format-level scenarios: cursor traversal, symbol table layering and the
//! behavior of both encodings on edge cases.

use serde::{Deserialize, Serialize};
use serde_ion::binary_writer::BinaryWriter;
use serde_ion::numeric::encode_fixed_uint;
use serde_ion::text_writer::TextWriter;
use serde_ion::writer::copy_values;
use serde_ion::{
    Deserializer, Error, Format, IonType, IonWriter, Reader, ReaderOptions, ReaderState,
    SharedSymbolTable, SimpleCatalog, Symbol,
};
use std::rc::Rc;

fn fruit_options() -> ReaderOptions {
    let catalog =
        SimpleCatalog::new().with_table(SharedSymbolTable::new("fruit", 1, ["apple", "pear", "plum"]));
    ReaderOptions::new().with_catalog(Rc::new(catalog))
}

fn read_symbols(reader: &mut Reader<'_>) -> Vec<Symbol> {
    let mut out = Vec::new();
    while reader.next().unwrap().is_some() {
        out.push(reader.symbol_value().unwrap().unwrap());
    }
    out
}

#[test]
fn test_top_level_values_are_newline_separated() {
    let mut writer = TextWriter::new();
    writer.write_symbol(&Symbol::from("a")).unwrap();
    writer.write_symbol(&Symbol::from("b")).unwrap();
    assert_eq!(writer.finish().unwrap(), "a\nb");
}

#[test]
fn test_blob_is_base64() {
    let mut writer = TextWriter::new();
    writer.write_blob(&[1, 2, 3]).unwrap();
    assert_eq!(writer.finish().unwrap(), "{{AQID}}");

    let mut reader = Reader::new(b"{{ AQID }}");
    assert_eq!(reader.next().unwrap(), Some(IonType::Blob));
    assert_eq!(reader.bytes_value().unwrap(), Some(vec![1, 2, 3]));
}

#[test]
fn test_early_step_out() {
    for input in [b"[1,2,[3,4]]".to_vec(), text_to_binary("[1,2,[3,4]]")] {
        let mut reader = Reader::new(&input);
        assert_eq!(reader.next().unwrap(), Some(IonType::List));
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), Some(1));
        reader.step_out().unwrap();
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.next().unwrap(), None);
        assert_eq!(reader.state(), ReaderState::AtEndOfStream);
    }
}

#[test]
fn test_nested_traversal() {
    let mut reader = Reader::new(b"{a: [1, (x y)], b: null.list} 7");
    assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
    reader.step_in().unwrap();
    assert_eq!(reader.next().unwrap(), Some(IonType::List));
    assert_eq!(reader.field_name().unwrap(), Some(Symbol::from("a")));
    reader.step_in().unwrap();
    reader.next().unwrap();
    assert_eq!(reader.next().unwrap(), Some(IonType::Sexp));
    reader.step_in().unwrap();
    assert_eq!(reader.depth(), 3);
    assert_eq!(read_symbols(&mut reader), vec![Symbol::from("x"), Symbol::from("y")]);
    reader.step_out().unwrap();
    reader.step_out().unwrap();
    assert_eq!(reader.next().unwrap(), Some(IonType::List));
    assert!(reader.is_null());
    assert!(matches!(reader.step_in(), Err(Error::InvalidState(_))));
    reader.step_out().unwrap();
    assert_eq!(reader.next().unwrap(), Some(IonType::Int));
    assert_eq!(reader.i64_value().unwrap(), Some(7));
}

#[test]
fn test_import_layering_in_binary() {
    #[rustfmt::skip]
    let input = [
        0xE0, 0x01, 0x00, 0xEA,
        // $ion_symbol_table::{
        0xEE, 0x9C, 0x81, 0x83, 0xDE, 0x98,
        //   imports: [{name: "fruit", version: 1, max_id: 3}],
        0x86, 0xBE, 0x8E, 0xDD,
        0x84, 0x85, b'f', b'r', b'u', b'i', b't',
        0x85, 0x21, 0x01,
        0x88, 0x21, 0x03,
        //   symbols: ["kiwi"] }
        0x87, 0xB5, 0x84, b'k', b'i', b'w', b'i',
        // $10 $12 $13
        0x71, 0x0A, 0x71, 0x0C, 0x71, 0x0D,
    ];
    let mut reader = Reader::with_options(&input, fruit_options());
    assert_eq!(reader.format(), Format::Binary);
    assert_eq!(
        read_symbols(&mut reader),
        vec![Symbol::from("apple"), Symbol::from("plum"), Symbol::from("kiwi")]
    );
}

#[test]
fn test_import_without_catalog_yields_unknown() {
    let input = br#"
        $ion_symbol_table::{imports: [{name: "fruit", version: 1, max_id: 3}], symbols: ["kiwi"]}
        $10 $13
    "#;
    let mut reader = Reader::new(input);
    assert_eq!(
        read_symbols(&mut reader),
        vec![Symbol::Unknown(10), Symbol::from("kiwi")]
    );
}

#[test]
fn test_version_marker_resets_symbols() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Fruit {
        Apple,
        Pear,
    }

    let mut stream = serde_ion::to_binary(&vec![Fruit::Apple]).unwrap();
    stream.extend(serde_ion::to_binary(&vec![Fruit::Pear]).unwrap());

    let mut de = Deserializer::from_slice(&stream);
    let first: Option<Vec<Fruit>> = de.next_value().unwrap();
    let second: Option<Vec<Fruit>> = de.next_value().unwrap();
    assert_eq!(first, Some(vec![Fruit::Apple]));
    assert_eq!(second, Some(vec![Fruit::Pear]));
    de.end().unwrap();
}

#[test]
fn test_text_version_marker_resets_symbols() {
    let input = b"$ion_symbol_table::{symbols: [\"a\"]} $10 $ion_1_0 $10";
    let mut reader = Reader::new(input);
    assert_eq!(read_symbols(&mut reader), vec![Symbol::from("a"), Symbol::Unknown(10)]);
    assert!(reader.symbol_table().is_system());
}

#[test]
fn test_binary_skip_matches_scan() {
    let input = text_to_binary("[[1, 2], {a: 3, b: \"long string value here\"}] 4");

    let mut skipping = Reader::new(&input);
    assert_eq!(skipping.next().unwrap(), Some(IonType::List));
    assert_eq!(skipping.next().unwrap(), Some(IonType::Int));
    assert_eq!(skipping.i64_value().unwrap(), Some(4));

    let mut scanning = Reader::new(&input);
    scanning.next().unwrap();
    let element = scanning.read_element().unwrap();
    assert!(element.is_some());
    assert_eq!(scanning.next().unwrap(), Some(IonType::Int));
    assert_eq!(scanning.i64_value().unwrap(), Some(4));
}

#[test]
fn test_error_state_after_malformed_input() {
    for input in [&b"[1, 2 }"[..], &b"\"open"[..]] {
        let mut reader = Reader::new(input);
        let mut failure = None;
        for _ in 0..8 {
            let step = match reader.next() {
                Ok(Some(IonType::List)) => reader.step_in(),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(e) = step {
                failure = Some(e);
                break;
            }
        }
        assert!(failure.is_some_and(|e| e.is_data_error()));
        assert_eq!(reader.state(), ReaderState::Error);
        assert!(matches!(reader.next(), Err(Error::InvalidState(_))));
    }
}

#[test]
fn test_truncated_binary_container() {
    let mut input = text_to_binary("[1, 2, 3]");
    input.truncate(input.len() - 1);
    let mut reader = Reader::new(&input);
    assert!(reader.next().unwrap_err().is_data_error());
    assert_eq!(reader.state(), ReaderState::Error);
}

#[test]
fn test_fixed_uint_overflow() {
    let mut out = Vec::new();
    let err = encode_fixed_uint(&mut out, 256, 1).unwrap_err();
    assert!(matches!(err, Error::EncodingOverflow { length: 1, .. }));
    assert!(out.is_empty());
}

#[test]
fn test_writer_state_errors() {
    let mut writer = TextWriter::new();
    writer.set_field_name(Symbol::from("a"));
    assert!(matches!(writer.write_bool(true), Err(Error::InvalidState(_))));

    let mut writer = BinaryWriter::new();
    assert!(matches!(writer.step_out(), Err(Error::InvalidState(_))));
    writer.step_in(IonType::Struct).unwrap();
    assert!(matches!(writer.write_i64(1), Err(Error::InvalidState(_))));
}

#[test]
fn test_transcode_preserves_data_model() {
    let source = "a::b::{'x y': 1.50, ts: 2001-01-01T, sym: kiwi, nested: (+ - [null.timestamp])}\n{{\"raw\"}}";
    let mut reader = Reader::new(source.as_bytes());
    let mut binary = BinaryWriter::new();
    copy_values(&mut reader, &mut binary).unwrap();
    let bytes = binary.finish().unwrap();

    let mut reader = Reader::new(&bytes);
    let mut text = TextWriter::new();
    copy_values(&mut reader, &mut text).unwrap();
    let round = text.finish().unwrap();

    let expected = Reader::new(source.as_bytes()).read_all().unwrap();
    let actual = Reader::new(round.as_bytes()).read_all().unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn test_symbol_zero_has_no_text() {
    for input in [b"$0".to_vec(), vec![0xE0, 0x01, 0x00, 0xEA, 0x71, 0x00]] {
        let mut reader = Reader::new(&input);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert!(matches!(reader.symbol_value(), Err(Error::UnknownSymbol(0))));
    }

    let mut reader = Reader::new(b"[$0]");
    let mut writer = TextWriter::new();
    assert!(matches!(
        copy_values(&mut reader, &mut writer),
        Err(Error::UnknownSymbol(0))
    ));
}

fn text_to_binary(text: &str) -> Vec<u8> {
    let mut reader = Reader::new(text.as_bytes());
    let mut writer = BinaryWriter::new();
    copy_values(&mut reader, &mut writer).unwrap();
    writer.finish().unwrap()
}
