//! S3 XML response rendering.
//!
//! All non-empty responses the action core emits are XML-encoded. This
//! module provides the handful of renderers the two fully-specified
//! verbs need, using `quick-xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

// ── Error response ──────────────────────────────────────────────────

/// Render an S3 `<Error>` XML document.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchBucket</Code>
///   <Message>The specified bucket does not exist</Message>
///   <Resource>/mybucket</Resource>
///   <RequestId>abcd-1234</RequestId>
/// </Error>
/// ```
pub fn render_error(code: &str, message: &str, resource: &str, request_id: &str) -> String {
    let mut writer = new_writer();
    write_simple_element_group(
        &mut writer,
        "Error",
        &[
            ("Code", code),
            ("Message", message),
            ("Resource", resource),
            ("RequestId", request_id),
        ],
    );
    finish(writer)
}

// ── DeleteResult ────────────────────────────────────────────────────

/// One successfully deleted key (`spec.md` §6: `Deleted` children).
pub struct DeletedEntry<'a> {
    pub key: &'a str,
}

/// One failed key (`spec.md` §6: `Error` children, same insertion order).
pub struct DeleteErrorEntry<'a> {
    pub key: &'a str,
    pub code: &'a str,
    pub message: &'a str,
}

/// Render `<DeleteResult>` for `DeleteMultipleObjects`. `spec.md` §4.4.3:
/// the XML order equals the response builder's insertion order, which is
/// the order object-delete outcomes were observed in, not the caller's
/// input order -- callers are expected to have merged deleted/errors in
/// that observed order before calling this.
pub fn render_delete_result(deleted: &[DeletedEntry<'_>], errors: &[DeleteErrorEntry<'_>]) -> String {
    let mut writer = new_writer();
    let root = BytesStart::new("DeleteResult")
        .with_attributes([("xmlns", "http://s3.amazonaws.com/doc/2006-03-01/")]);
    writer.write_event(Event::Start(root)).expect("start root");

    for entry in deleted {
        writer
            .write_event(Event::Start(BytesStart::new("Deleted")))
            .expect("start Deleted");
        write_text_element(&mut writer, "Key", entry.key);
        writer
            .write_event(Event::End(BytesEnd::new("Deleted")))
            .expect("end Deleted");
    }

    for entry in errors {
        writer
            .write_event(Event::Start(BytesStart::new("Error")))
            .expect("start Error");
        write_text_element(&mut writer, "Key", entry.key);
        write_text_element(&mut writer, "Code", entry.code);
        write_text_element(&mut writer, "Message", entry.message);
        writer
            .write_event(Event::End(BytesEnd::new("Error")))
            .expect("end Error");
    }

    writer
        .write_event(Event::End(BytesEnd::new("DeleteResult")))
        .expect("end root");

    finish(writer)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn new_writer() -> Writer<Cursor<Vec<u8>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .expect("xml decl");
    writer
}

fn finish(writer: Writer<Cursor<Vec<u8>>>) -> String {
    String::from_utf8(writer.into_inner().into_inner()).expect("valid utf-8")
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .expect("start tag");
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .expect("text");
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .expect("end tag");
}

/// Write a parent element containing a flat list of child text elements.
///
/// ```xml
/// <parent>
///   <child1>value1</child1>
///   <child2>value2</child2>
/// </parent>
/// ```
fn write_simple_element_group(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    parent: &str,
    children: &[(&str, &str)],
) {
    writer
        .write_event(Event::Start(BytesStart::new(parent)))
        .expect("start parent");
    for (tag, value) in children {
        write_text_element(writer, tag, value);
    }
    writer
        .write_event(Event::End(BytesEnd::new(parent)))
        .expect("end parent");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_error_document() {
        let xml = render_error("NoSuchBucket", "nope", "/b", "REQ1");
        assert!(xml.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml.contains("<RequestId>REQ1</RequestId>"));
    }

    #[test]
    fn renders_delete_result_in_insertion_order() {
        let deleted = [DeletedEntry { key: "a" }];
        let errors = [DeleteErrorEntry {
            key: "b",
            code: "InternalError",
            message: "boom",
        }];
        let xml = render_delete_result(&deleted, &errors);
        let deleted_at = xml.find("<Deleted>").unwrap();
        let error_at = xml.find("<Error>").unwrap();
        assert!(deleted_at < error_at);
    }
}
