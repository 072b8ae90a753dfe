use super::{FieldValue, Fields, Serializer};
use crate::utils::Error;

fn publish_fields(topic: &str, message: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("command".into(), "publish".into());
    fields.insert("topic".into(), topic.into());
    fields.insert("message".into(), message.into());
    fields
}

fn list_fields(topics: &[&str]) -> Fields {
    let mut fields = Fields::new();
    fields.insert("command".into(), "topic_list_result".into());
    fields.insert(
        "topics".into(),
        FieldValue::List(topics.iter().map(|t| t.to_string()).collect()),
    );
    fields
}

#[test]
fn serializer_tags_match_wire_values() {
    assert_eq!(Serializer::Json.tag(), 0);
    assert_eq!(Serializer::Xml.tag(), 1);
    assert_eq!(Serializer::Native.tag(), 2);
    for serializer in Serializer::ALL {
        assert_eq!(Serializer::try_from(serializer.tag()).unwrap(), serializer);
    }
}

#[test]
fn unknown_serializer_tag_is_rejected() {
    let err = Serializer::try_from(7).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSerializer(7)));
}

#[test]
fn serializer_parses_from_cli_names() {
    assert_eq!("JSON".parse::<Serializer>().unwrap(), Serializer::Json);
    assert_eq!("xml".parse::<Serializer>().unwrap(), Serializer::Xml);
    assert_eq!("bincode".parse::<Serializer>().unwrap(), Serializer::Native);
    assert!("yaml".parse::<Serializer>().is_err());
}

#[test]
fn lossless_codecs_preserve_text_and_lists() {
    for serializer in [Serializer::Json, Serializer::Native] {
        let codec = serializer.codec();
        let text = publish_fields("a/b", "{\"temp\": 25}");
        assert_eq!(codec.decode(&codec.encode(&text).unwrap()).unwrap(), text);

        let list = list_fields(&["a", "a/b", "weird,name"]);
        assert_eq!(codec.decode(&codec.encode(&list).unwrap()).unwrap(), list);
    }
}

#[test]
fn json_body_is_a_plain_object() {
    let bytes = Serializer::Json
        .codec()
        .encode(&publish_fields("t", "v"))
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["command"], "publish");
    assert_eq!(value["topic"], "t");
    assert_eq!(value["message"], "v");
}

#[test]
fn json_decode_stringifies_scalars() {
    let fields = Serializer::Json
        .codec()
        .decode(br#"{"command":"publish","topic":"t","message":42}"#)
        .unwrap();
    assert_eq!(fields["message"], FieldValue::Text("42".into()));
}

#[test]
fn json_rejects_non_objects_and_nesting() {
    let codec = Serializer::Json.codec();
    assert!(codec.decode(b"[1,2]").unwrap_err().is_protocol());
    assert!(codec.decode(br#"{"a":{"b":1}}"#).unwrap_err().is_protocol());
    assert!(codec.decode(b"not json").unwrap_err().is_protocol());
}

#[test]
fn xml_round_trips_text_with_markup_characters() {
    let codec = Serializer::Xml.codec();
    let fields = publish_fields("a/b", "<tag attr=\"x\">'&'\nline</tag>");
    let bytes = codec.encode(&fields).unwrap();
    let rendered = String::from_utf8(bytes.clone()).unwrap();
    assert!(rendered.starts_with("<message "));
    assert!(!rendered.contains('\n'));
    assert_eq!(codec.decode(&bytes).unwrap(), fields);
}

#[test]
fn xml_flattens_list_values() {
    let codec = Serializer::Xml.codec();
    let bytes = codec.encode(&list_fields(&["a", "a/b"])).unwrap();
    let decoded = codec.decode(&bytes).unwrap();

    // the list does not survive: it comes back as one text attribute
    assert_eq!(decoded["topics"], FieldValue::Text("a,a/b".into()));
    assert_ne!(decoded, list_fields(&["a", "a/b"]));
}

#[test]
fn xml_accepts_declaration_single_quotes_and_closing_tag() {
    let codec = Serializer::Xml.codec();
    let fields = codec
        .decode(b"<?xml version='1.0'?>\n<message command='subscribe' topic=\"x&#47;y\"></message>")
        .unwrap();
    assert_eq!(fields["command"], FieldValue::Text("subscribe".into()));
    assert_eq!(fields["topic"], FieldValue::Text("x/y".into()));
}

#[test]
fn xml_rejects_malformed_documents() {
    let codec = Serializer::Xml.codec();
    for bad in [
        &b"<other command=\"x\"/>"[..],
        b"<message command=\"x\"",
        b"<message command=x/>",
        b"<message a=\"1\" a=\"2\"/>",
        b"<message a=\"&bogus;\"/>",
        b"<message/><message/>",
        b"\xff\xfe",
    ] {
        assert!(codec.decode(bad).unwrap_err().is_protocol());
    }
}

#[test]
fn native_rejects_garbage() {
    let codec = Serializer::Native.codec();
    assert!(codec.decode(&[0xff, 0xff, 0xff]).unwrap_err().is_protocol());
}
