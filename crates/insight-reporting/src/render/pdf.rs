//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Minimal PDF 1.4 serializer: uncompressed content streams, base-14 fonts,
//! exact cross-reference table.
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::layout::{Font, Page, PAGE_HEIGHT, PAGE_WIDTH};

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FIRST_FONT_ID: usize = 3;
const INFO_ID: usize = FIRST_FONT_ID + Font::ALL.len();
const FIRST_PAGE_ID: usize = INFO_ID + 1;
const PRODUCER: &str = "insight-reporting";

pub(crate) struct DocumentInfo<'a> {
    /// WinAnsi-encoded title.
    pub title: &'a [u8],
    pub created: DateTime<Utc>,
}

#[derive(Default)]
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Objects must be written in ascending id order starting at 1.
    fn object(&mut self, id: usize, body: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.buf.len());
        self.raw(format!("{id} 0 obj\n").as_bytes());
        self.raw(body);
        self.raw(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, content: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = writeln!(table, "{offset:010} 00000 n ");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R /Info {INFO_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );
        self.raw(table.as_bytes());
        self.buf
    }
}

/// Serialize laid-out pages. Output depends only on the arguments.
pub(crate) fn write_document(pages: &[Page], info: &DocumentInfo<'_>) -> Vec<u8> {
    let mut writer = PdfWriter::default();
    writer.raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    writer.object(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").as_bytes(),
    );

    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", page_id(index)))
        .collect::<Vec<_>>()
        .join(" ");
    writer.object(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            pages.len()
        )
        .as_bytes(),
    );

    for (offset, font) in Font::ALL.into_iter().enumerate() {
        writer.object(
            FIRST_FONT_ID + offset,
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            )
            .as_bytes(),
        );
    }

    let mut info_dict = b"<< /Title (".to_vec();
    escape_into(&mut info_dict, info.title);
    info_dict.extend_from_slice(
        format!(
            ") /Producer ({PRODUCER}) /CreationDate (D:{}Z) >>",
            info.created.format("%Y%m%d%H%M%S")
        )
        .as_bytes(),
    );
    writer.object(INFO_ID, &info_dict);

    let fonts = Font::ALL
        .into_iter()
        .enumerate()
        .map(|(offset, font)| format!("/{} {} 0 R", font.resource_name(), FIRST_FONT_ID + offset))
        .collect::<Vec<_>>()
        .join(" ");
    for (index, page) in pages.iter().enumerate() {
        let id = page_id(index);
        writer.object(
            id,
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << {fonts} >> >> /Contents {} 0 R >>",
                id + 1
            )
            .as_bytes(),
        );
        writer.stream(id + 1, &content_stream(page));
    }

    writer.finish()
}

fn page_id(index: usize) -> usize {
    FIRST_PAGE_ID + 2 * index
}

fn content_stream(page: &Page) -> Vec<u8> {
    let mut out = Vec::new();
    for run in &page.runs {
        out.extend_from_slice(
            format!(
                "BT /{} {:.2} Tf {:.2} {:.2} Td (",
                run.font.resource_name(),
                run.size,
                run.x,
                run.y
            )
            .as_bytes(),
        );
        escape_into(&mut out, &run.bytes);
        out.extend_from_slice(b") Tj ET\n");
    }
    out
}

/// Literal-string escaping; bytes outside printable ASCII become octal escapes.
fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            0x20..=0x7E => out.push(byte),
            _ => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
}
