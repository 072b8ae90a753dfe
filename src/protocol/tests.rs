use std::time::Duration;

use tokio::io::{AsyncWriteExt, duplex};

use super::frame::MAX_BODY_LEN;
use super::*;
use crate::codec::{FieldValue, Fields, Serializer};
use crate::utils::Error;

fn all_messages() -> Vec<Message> {
    vec![
        Message::subscribe("a/b"),
        Message::publish("a/b/c", "hello, world"),
        Message::TopicList,
        Message::TopicListResult {
            topics: vec!["a".into(), "a/b".into()],
        },
        Message::unsubscribe("a"),
    ]
}

#[test]
fn fields_round_trip_every_variant() {
    for message in all_messages() {
        let fields = message.to_fields();
        assert_eq!(
            fields["command"],
            FieldValue::Text(message.command().as_str().into())
        );
        assert_eq!(Message::from_fields(fields).unwrap(), message);
    }
}

#[test]
fn lossless_codecs_round_trip_every_variant() {
    for serializer in [Serializer::Json, Serializer::Native] {
        for message in all_messages() {
            let frame = encode_frame(&message, serializer).unwrap();
            let (tag, decoded) = decode_payload(&frame[2..]).unwrap();
            assert_eq!(tag, serializer);
            assert_eq!(decoded, message);
        }
    }
}

#[test]
fn xml_round_trips_everything_but_topic_lists() {
    for message in all_messages() {
        let frame = encode_frame(&message, Serializer::Xml).unwrap();
        let (_, decoded) = decode_payload(&frame[2..]).unwrap();
        if message.command() == Command::TopicListResult {
            assert_eq!(
                decoded,
                Message::TopicListResult {
                    topics: vec!["a,a/b".into()]
                }
            );
            assert_ne!(decoded, message);
        } else {
            assert_eq!(decoded, message);
        }
    }
}

#[test]
fn xml_empty_topic_list_decodes_empty() {
    let message = Message::TopicListResult { topics: vec![] };
    let frame = encode_frame(&message, Serializer::Xml).unwrap();
    let (_, decoded) = decode_payload(&frame[2..]).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn frame_header_layout() {
    let frame = encode_frame(&Message::subscribe("t"), Serializer::Native).unwrap();
    let length = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    assert_eq!(length, frame.len() - 2);
    assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 2);
}

#[test]
fn unknown_command_is_a_format_error() {
    let mut fields = Fields::new();
    fields.insert("command".into(), "register".into());
    let err = Message::from_fields(fields).unwrap_err();
    assert!(matches!(err, Error::ProtocolFormat(_)));
}

#[test]
fn missing_fields_are_format_errors() {
    let mut fields = Fields::new();
    fields.insert("command".into(), "publish".into());
    fields.insert("topic".into(), "t".into());
    assert!(Message::from_fields(fields).unwrap_err().is_protocol());

    assert!(Message::from_fields(Fields::new()).unwrap_err().is_protocol());
}

#[test]
fn oversized_body_is_rejected() {
    let big = "x".repeat(MAX_BODY_LEN);
    let err = encode_frame(&Message::publish("t", big), Serializer::Json).unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn unsupported_serializer_tag_in_payload() {
    let err = decode_payload(&[0, 9, b'{', b'}']).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSerializer(9)));
}

#[tokio::test]
async fn read_frame_decodes_a_written_message() {
    let (mut client, mut server) = duplex(1024);
    send_message(&mut client, &Message::publish("a", "1"), Serializer::Json)
        .await
        .unwrap();

    let inbound = read_frame(&mut server).await.unwrap();
    assert_eq!(
        inbound,
        Inbound::Message {
            serializer: Serializer::Json,
            message: Message::publish("a", "1"),
        }
    );
}

#[tokio::test]
async fn sentinel_and_end_of_stream_are_distinguished() {
    let (mut client, mut server) = duplex(64);
    send_close(&mut client).await.unwrap();
    assert_eq!(
        read_frame(&mut server).await.unwrap(),
        Inbound::Closed(CloseReason::Sentinel)
    );

    drop(client);
    assert_eq!(
        read_frame(&mut server).await.unwrap(),
        Inbound::Closed(CloseReason::EndOfStream)
    );
}

#[tokio::test]
async fn frames_split_across_writes_are_reassembled() {
    let (mut client, mut server) = duplex(4);
    let frame = encode_frame(&Message::publish("a/b", "split me"), Serializer::Xml).unwrap();

    let writer = tokio::spawn(async move {
        for byte in frame {
            client.write_all(&[byte]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        client
    });

    let inbound = read_frame(&mut server).await.unwrap();
    assert_eq!(
        inbound,
        Inbound::Message {
            serializer: Serializer::Xml,
            message: Message::publish("a/b", "split me"),
        }
    );
    drop(writer.await.unwrap());
}

#[tokio::test]
async fn truncated_frame_is_a_format_error() {
    let (mut client, mut server) = duplex(64);
    let frame = encode_frame(&Message::subscribe("abc"), Serializer::Json).unwrap();
    client.write_all(&frame[..frame.len() - 3]).await.unwrap();
    drop(client);

    let err = read_frame(&mut server).await.unwrap_err();
    assert!(matches!(err, Error::ProtocolFormat(_)));
}

#[tokio::test]
async fn length_one_frame_is_a_format_error() {
    let (mut client, mut server) = duplex(64);
    client.write_all(&[0, 1, 0]).await.unwrap();

    let err = read_frame(&mut server).await.unwrap_err();
    assert!(err.is_protocol());
}

#[tokio::test]
async fn command_driven_send_builds_records() {
    let (mut client, mut server) = duplex(1024);
    send(&mut client, Command::Publish, Serializer::Native, "t", Some("v"))
        .await
        .unwrap();
    send(&mut client, Command::TopicList, Serializer::Native, "", None)
        .await
        .unwrap();
    send(
        &mut client,
        Command::TopicListResult,
        Serializer::Json,
        "",
        Some("a\na/b"),
    )
    .await
    .unwrap();

    let expect = [
        Message::publish("t", "v"),
        Message::TopicList,
        Message::TopicListResult {
            topics: vec!["a".into(), "a/b".into()],
        },
    ];
    for expected in expect {
        let Inbound::Message { message, .. } = read_frame(&mut server).await.unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(message, expected);
    }
}
