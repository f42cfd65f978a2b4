//! End-to-end tests over compound files built in memory.

use std::{
    io::{Cursor, Write},
    path::Path,
};

use cfb::CompoundFile;
use chrono::{FixedOffset, TimeZone};
use msg_extract::{
    DecodeOptions, Message, MsgReader, RecipientKind, TimestampPolicy, build_message,
};

type Container = CompoundFile<Cursor<Vec<u8>>>;

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn container(streams: &[(&str, &[u8])]) -> Container {
    let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    for (path, data) in streams {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            if !comp.exists(parent) {
                comp.create_storage_all(parent).unwrap();
            }
        }
        comp.create_stream(path).unwrap().write_all(data).unwrap();
    }
    comp.flush().unwrap();
    comp
}

fn read(streams: &[(&str, &[u8])]) -> Message {
    let comp = container(streams);
    Message::from_reader(comp.into_inner()).unwrap()
}

#[test]
fn narrow_subject() {
    let message = read(&[("/__substg1.0_0037001E", b"Hello")]);
    assert_eq!(message.subject.as_deref(), Some("Hello"));
    assert_eq!(message.property(0x37), Some("Hello"));
}

#[test]
fn wide_body() {
    let body = utf16("Hi");
    let message = read(&[("/__substg1.0_1000001F", &body)]);
    assert_eq!(message.body_text.as_deref(), Some("Hi"));
}

#[test]
fn textual_creation_date() {
    let message = read(&[("/__substg1.0_3007001E", b"Mon, 2 Jan 2006 15:04:05 -0700")]);
    let expected = FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2006, 1, 2, 15, 4, 5)
        .unwrap();
    assert_eq!(message.creation_date, Some(expected));

    let message = read(&[("/__substg1.0_3007001E", b"")]);
    assert_eq!(message.creation_date, None);
}

#[test]
fn later_stream_wins_on_shared_tag() {
    let wide = utf16("Wide Name");
    let comp = container(&[
        ("/__substg1.0_0042001E", b"Narrow Name"),
        ("/__substg1.0_0042001F", &wide),
    ]);
    let last = comp
        .read_storage("/")
        .unwrap()
        .filter(|e| e.name().starts_with("__substg1.0_0042"))
        .last()
        .unwrap()
        .name()
        .to_string();
    let expected = if last.ends_with("001E") {
        "Narrow Name"
    } else {
        "Wide Name"
    };

    let message = Message::from_reader(comp.into_inner()).unwrap();
    assert_eq!(message.from.name.as_deref(), Some(expected));
    assert_eq!(message.property(0x42), Some(expected));
}

#[test]
fn malformed_stream_name_is_skipped() {
    let body = utf16("Still here");
    let message = read(&[
        ("/__substg1.0_00ZZ001E", b"ignored"),
        ("/__substg1.0_0037001E", b"Subject"),
        ("/__substg1.0_1000001F", &body),
        ("/__properties_version1.0", &[0u8; 32]),
    ]);
    assert_eq!(message.subject.as_deref(), Some("Subject"));
    assert_eq!(message.body_text.as_deref(), Some("Still here"));
    assert_eq!(message.properties.len(), 2);
}

#[test]
fn not_a_compound_file() {
    assert!(Message::from_reader(Cursor::new(b"Not an OLE file".to_vec())).is_err());
    assert!(Message::from_path("/definitely/not/here.msg").is_err());
}

#[test]
fn binary_timestamps_follow_the_policy() {
    // 2020-02-29T23:59:59Z
    let ticks: u64 = (1_583_020_799_000 + 11_644_473_600_000) * 10_000;
    let bytes = ticks.to_be_bytes();
    let comp = container(&[("/__substg1.0_00390040", &bytes)]);
    let message = Message::from_reader(comp.into_inner()).unwrap();
    assert_eq!(
        message.client_submit_time.map(|t| t.to_rfc3339()),
        Some("2020-02-29T23:59:59+00:00".to_string())
    );

    let comp = container(&[("/__substg1.0_00390040", &bytes)]);
    let options = DecodeOptions::default().with_timestamp_policy(TimestampPolicy::TextOnly);
    let message = Message::from_reader_with(comp.into_inner(), options).unwrap();
    assert_eq!(message.client_submit_time, None);
    assert!(message.property(0x39).is_some());
}

#[test]
fn narrow_charset_is_configurable() {
    let comp = container(&[("/__substg1.0_0037001E", b"\xcf\xf0\xe8\xe2\xe5\xf2")]);
    let options = DecodeOptions::default().with_narrow_charset_label("windows-1251");
    let message = Message::from_reader_with(comp.into_inner(), options).unwrap();
    assert_eq!(message.subject.as_deref(), Some("Привет"));
}

#[test]
fn recipients_and_attachments() {
    let display_to = utf16("Bob");
    let display_cc = utf16("Carol");
    let bob = utf16("Bob");
    let bob_smtp = utf16("bob@example.com");
    let carol = utf16("Carol");
    let carol_addr = utf16("carol@example.com");
    let file_name = utf16("notes.txt");
    let embedded_subject = utf16("Forwarded");
    let mut comp = container(&[
        ("/__substg1.0_0E04001F", &display_to),
        ("/__substg1.0_0E03001F", &display_cc),
        ("/__recip_version1.0_#00000000/__substg1.0_3001001F", &bob),
        ("/__recip_version1.0_#00000000/__substg1.0_39FE001F", &bob_smtp),
        ("/__recip_version1.0_#00000001/__substg1.0_3001001F", &carol),
        ("/__recip_version1.0_#00000001/__substg1.0_3003001F", &carol_addr),
        ("/__attach_version1.0_#00000000/__substg1.0_3707001F", &file_name),
        ("/__attach_version1.0_#00000000/__substg1.0_37010102", b"file contents"),
        (
            "/__attach_version1.0_#00000001/__substg1.0_3701000D/__substg1.0_0037001F",
            &embedded_subject,
        ),
    ]);

    let mut reader = MsgReader::new(&mut comp, Path::new("/"));
    let message = reader.message().unwrap();
    // recipient storages take part in the pass, attachments do not
    assert!(matches!(message.to.name.as_deref(), Some("Bob" | "Carol")));
    assert_eq!(message.property(0x3707), None);
    assert_eq!(message.property(0x0037), None);

    let recipients = reader.recipients().unwrap();
    assert_eq!(recipients.len(), 2);
    let bob = recipients
        .iter()
        .find(|r| r.name.as_deref() == Some("Bob"))
        .unwrap();
    assert_eq!(bob.email.as_deref(), Some("bob@example.com"));
    assert_eq!(message.recipient_kind(bob), RecipientKind::To);
    let carol = recipients
        .iter()
        .find(|r| r.name.as_deref() == Some("Carol"))
        .unwrap();
    assert_eq!(carol.email.as_deref(), Some("carol@example.com"));
    assert_eq!(message.recipient_kind(carol), RecipientKind::Cc);

    let attachments = reader.attachments().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "notes.txt");
    assert_eq!(attachments[0].data, b"file contents");

    let embedded = reader.embedded_messages().unwrap();
    assert_eq!(embedded.len(), 1);
    let inner = MsgReader::new(&mut comp, &embedded[0]).message().unwrap();
    assert_eq!(inner.subject.as_deref(), Some("Forwarded"));
}

#[test]
fn recipient_tags_share_the_property_table() {
    let message_level = utf16("Message Name");
    let recipient_level = utf16("Recipient Name");
    let comp = container(&[
        ("/__substg1.0_3001001F", &message_level),
        ("/__recip_version1.0_#00000000/__substg1.0_3001001F", &recipient_level),
    ]);
    let recipient_last = comp
        .read_storage("/")
        .unwrap()
        .last()
        .unwrap()
        .name()
        .starts_with("__recip_version1.0_");
    let expected = if recipient_last {
        "Recipient Name"
    } else {
        "Message Name"
    };

    let message = Message::from_reader(comp.into_inner()).unwrap();
    assert_eq!(message.property(0x3001), Some(expected));
    assert_eq!(message.to.name.as_deref(), Some(expected));
    assert_eq!(message.properties.len(), 1);
}

#[test]
fn raw_property_bytes() {
    let mut comp = container(&[("/__substg1.0_10130102", b"<html></html>")]);
    let mut reader = MsgReader::new(&mut comp, Path::new("/"));
    let raw = reader.raw_property(0x1013, 0x0102).unwrap();
    assert_eq!(raw.data, b"<html></html>");
    assert!(reader.raw_property(0x1000, 0x001F).is_err());
}

#[test]
fn stream_entries_without_a_container() {
    let streams = vec![
        ("__substg1.0_0037001E".to_string(), 5, &b"Hello"[..]),
        ("__substg1.0_007D001E".to_string(), 0, &b"ignored past len"[..]),
    ];
    let message = build_message(streams, DecodeOptions::default()).unwrap();
    assert_eq!(message.subject.as_deref(), Some("Hello"));
    assert_eq!(message.headers.as_deref(), Some(""));
}

#[test]
fn containers_decode_independently_across_threads() {
    let subjects = ["one", "two", "three", "four"];
    let buffers: Vec<_> = subjects
        .iter()
        .map(|s| {
            container(&[("/__substg1.0_0037001E", s.as_bytes())])
                .into_inner()
                .into_inner()
        })
        .collect();
    let decoded: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = buffers
            .iter()
            .map(|buf| scope.spawn(move || Message::from_reader(Cursor::new(buf.as_slice()))))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().subject.unwrap())
            .collect()
    });
    assert_eq!(decoded, subjects);
}
