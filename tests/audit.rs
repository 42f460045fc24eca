//! End-to-end audits over in-memory documents: one test per way a
//! redaction can leak.

mod common;

use common::{zlib_compress, PdfBuilder};
use redact_check::{analyze_bytes, AnalysisOptions, Denylist, NoOpOcr, Verdict};

fn deny(patterns: &[&str]) -> Denylist {
    let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
    Denylist::load(&owned, None).unwrap()
}

fn audit(data: Vec<u8>, patterns: &[&str]) -> redact_check::DocumentReport {
    analyze_bytes(
        "test.pdf",
        data,
        &deny(patterns),
        &AnalysisOptions::default(),
        &NoOpOcr,
    )
}

#[test]
fn clean_document_passes() {
    let data = PdfBuilder::new()
        .single_page("BT /F1 12 Tf (Nothing sensitive here) Tj ET", "<< >>")
        .build();
    let report = audit(data, &["John Doe", "SSN 123-44-5555"]);
    assert_eq!(report.verdict, Verdict::Pass);
    assert!(report.findings.is_empty());
}

#[test]
fn plain_text_leak_fails() {
    let data = PdfBuilder::new()
        .single_page("BT (Call John Doe at noon) Tj ET", "<< >>")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.findings[0].surface, "page 1 content");
}

#[test]
fn fragmented_show_operators_still_match() {
    // The phrase is split mid-word across TJ elements and a second BT block
    let content = "BT [(Jo) -12 (hn )] TJ ET BT [(Do) -4 (e)] TJ ET";
    let data = PdfBuilder::new().single_page(content, "<< >>").build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn hex_string_show_operator_matches() {
    // "John Doe" as a hex string
    let content = "BT <4A6F686E20446F65> Tj ET";
    let data = PdfBuilder::new().single_page(content, "<< >>").build();
    let report = audit(data, &["john doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn flate_compressed_content_is_decoded() {
    let compressed = zlib_compress(b"BT (Account 998877) Tj ET");
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>",
        )
        .stream_object(4, "/Filter /FlateDecode", &compressed)
        .build();
    let report = audit(data, &["Account 998877"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn form_xobject_content_is_scanned() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /XObject << /Fm1 5 0 R >> >> >>",
        )
        .stream_object(4, "", b"q /Fm1 Do Q")
        .stream_object(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 100 100]",
            b"BT (hidden in a form) Tj ET",
        )
        .build();
    let report = audit(data, &["hidden in a form"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn annotation_text_is_scanned() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /Text /F 2 /Contents (reviewer: John Doe approved) >>",
        )
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("annotation"));
}

#[test]
fn annotation_appearance_stream_is_interpreted() {
    // The leak lives only in the widget's /AP normal appearance, as a hex
    // string no raw-byte mining would reconstruct
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /Widget /Rect [0 0 120 20] \
             /AP << /N 6 0 R >> >>",
        )
        .stream_object(6, "", b"BT /F1 10 Tf <4A6F686E20446F65> Tj ET")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("appearance"));
}

#[test]
fn fragmented_appearance_stream_still_matches() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /Widget /Rect [0 0 120 20] \
             /AP << /N 6 0 R >> >>",
        )
        .stream_object(6, "", b"BT [(Jo) -20 (hn) -20 ( Doe)] TJ ET")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn appearance_substates_are_walked() {
    // /N holds named sub-states (one per widget state) instead of a stream
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /Widget /Rect [0 0 120 20] \
             /AP << /N << /Off 6 0 R /On 7 0 R >> >> >>",
        )
        .stream_object(6, "", b"BT (nothing) Tj ET")
        .stream_object(7, "", b"BT (call John Doe) Tj ET")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("/N On appearance"));
}

#[test]
fn appearance_stream_not_double_reported_as_leftover() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /Widget /Rect [0 0 120 20] \
             /AP << /N 6 0 R >> >>",
        )
        .stream_object(6, "", b"BT (call John Doe) Tj ET")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report
        .findings
        .iter()
        .all(|f| !f.surface.contains("unreferenced stream")));
}

#[test]
fn file_attachment_annotation_payload_is_scanned() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> \
             /Annots [5 0 R] >>",
        )
        .stream_object(4, "", b"BT (clean page) Tj ET")
        .object(
            5,
            "<< /Type /Annot /Subtype /FileAttachment /Rect [0 0 20 20] /FS 6 0 R >>",
        )
        .object(6, "<< /Type /Filespec /F (notes.txt) /EF << /F 7 0 R >> >>")
        .stream_object(7, "", b"call John Doe about the settlement")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("embedded file 'notes.txt'"));
}

#[test]
fn form_field_value_is_scanned() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [5 0 R] >> >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>")
        .stream_object(4, "", b"BT (clean) Tj ET")
        .object(5, "<< /FT /Tx /T (ssn) /V (123-44-5555) >>")
        .build();
    let report = audit(data, &["123-44-5555"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("form field"));
}

#[test]
fn info_dictionary_is_scanned() {
    let data = PdfBuilder::new()
        .single_page("BT (clean) Tj ET", "<< >>")
        .object(9, "<< /Author (John Doe) /Producer (WP 9.1) >>")
        .trailer_entry("/Info 9 0 R")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.findings[0].surface, "document info");
}

#[test]
fn xmp_metadata_is_scanned() {
    let xmp = br#"<?xml version="1.0"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:dc="http://purl.org/dc/elements/1.1/">
      <dc:creator>John Doe</dc:creator>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R /Metadata 5 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>")
        .stream_object(4, "", b"BT (clean) Tj ET")
        .stream_object(5, "/Type /Metadata /Subtype /XML", xmp)
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.findings[0].surface, "XMP metadata");
}

#[test]
fn disabled_layer_name_is_scanned() {
    let data = PdfBuilder::new()
        .object(
            1,
            "<< /Type /Catalog /Pages 2 0 R \
             /OCProperties << /OCGs [5 0 R] /D << /OFF [5 0 R] >> >> >>",
        )
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>")
        .stream_object(4, "", b"BT (clean) Tj ET")
        .object(5, "<< /Type /OCG /Name (draft notes by John Doe) >>")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.starts_with("layer"));
}

#[test]
fn embedded_file_bytes_are_mined() {
    let payload = b"\x00\x01binary then John Doe appears\x02";
    let data = PdfBuilder::new()
        .object(
            1,
            "<< /Type /Catalog /Pages 2 0 R \
             /Names << /EmbeddedFiles << /Names [(orig.txt) 6 0 R] >> >> >>",
        )
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>")
        .stream_object(4, "", b"BT (clean) Tj ET")
        .object(6, "<< /Type /Filespec /F (orig.txt) /EF << /F 7 0 R >> >>")
        .stream_object(7, "", payload)
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("embedded file"));
}

#[test]
fn unreferenced_stream_is_mined_as_leftover() {
    // Object 9 is in the xref but nothing references it
    let data = PdfBuilder::new()
        .single_page("BT (clean) Tj ET", "<< >>")
        .stream_object(9, "", b"orphaned draft mentioning John Doe")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.findings[0].surface.contains("unreferenced stream"));
}

#[test]
fn encrypted_document_errors_closed() {
    let data = PdfBuilder::new()
        .single_page("BT (whatever) Tj ET", "<< >>")
        .trailer_entry("/Encrypt 8 0 R")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Error);
    assert_eq!(report.verdict.exit_code(), 2);
    assert!(report.error.as_deref().unwrap_or("").contains("encrypt"));
}

#[test]
fn canonicalization_defeats_ligature_evasion() {
    // The font maps code 0x01 to U+FB01 (fi ligature); the pattern is the
    // plain "confidential"
    let cmap = b"1 beginbfchar\n<01> <FB01>\nendbfchar";
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .stream_object(4, "", b"BT /F1 12 Tf (Con\x01dential) Tj ET")
        .object(
            5,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /ToUnicode 6 0 R >>",
        )
        .stream_object(6, "", cmap)
        .build();
    let report = audit(data, &["confidential"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn whitespace_run_in_text_matches_single_space_pattern() {
    let content = "BT (John) Tj ET BT (   Doe) Tj ET";
    let data = PdfBuilder::new().single_page(content, "<< >>").build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn xref_stream_document_is_audited() {
    // Same single-page document, indexed by a cross-reference stream
    // instead of a classic table.
    let mut data = b"%PDF-1.7\n".to_vec();
    let mut offsets = Vec::new();
    for body in [
        "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n",
        "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n",
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>\nendobj\n",
    ] {
        offsets.push(data.len());
        data.extend_from_slice(body.as_bytes());
    }
    let content = b"BT (memo for John Doe) Tj ET";
    offsets.push(data.len());
    data.extend_from_slice(
        format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
    );
    data.extend_from_slice(content);
    data.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_off = data.len();
    let mut rows: Vec<u8> = vec![0, 0, 0, 255];
    for off in &offsets {
        rows.extend_from_slice(&[1, (off >> 8) as u8, (off & 0xFF) as u8, 0]);
    }
    rows.extend_from_slice(&[1, (xref_off >> 8) as u8, (xref_off & 0xFF) as u8, 0]);
    data.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&rows);
    data.extend_from_slice(b"\nendstream\nendobj\n");
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());

    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.findings[0].surface, "page 1 content");
}

#[test]
fn object_stream_members_are_resolved() {
    // Catalog, page tree, and page dictionary live inside an object
    // stream; only the content stream is a top-level object.
    let members = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>",
    ];
    let mut pairs = String::new();
    let mut body = String::new();
    for (i, member) in members.iter().enumerate() {
        pairs.push_str(&format!("{} {} ", i + 1, body.len()));
        body.push_str(member);
        body.push(' ');
    }
    let first = pairs.len();
    let objstm_payload = format!("{}{}", pairs, body);

    let mut data = b"%PDF-1.7\n".to_vec();

    let content = b"BT (compressed John Doe) Tj ET";
    let content_off = data.len();
    data.extend_from_slice(
        format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
    );
    data.extend_from_slice(content);
    data.extend_from_slice(b"\nendstream\nendobj\n");

    let objstm_off = data.len();
    data.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /ObjStm /N 3 /First {} /Length {} >>\nstream\n",
            first,
            objstm_payload.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(objstm_payload.as_bytes());
    data.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_off = data.len();
    let mut rows: Vec<u8> = vec![0, 0, 0, 255];
    for index in 0..3u8 {
        rows.extend_from_slice(&[2, 0, 6, index]);
    }
    rows.extend_from_slice(&[1, (content_off >> 8) as u8, (content_off & 0xFF) as u8, 0]);
    rows.extend_from_slice(&[1, (xref_off >> 8) as u8, (xref_off & 0xFF) as u8, 0]);
    rows.extend_from_slice(&[1, (objstm_off >> 8) as u8, (objstm_off & 0xFF) as u8, 0]);
    data.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 7 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&rows);
    data.extend_from_slice(b"\nendstream\nendobj\n");
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());

    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn report_counts_surfaces() {
    let data = PdfBuilder::new()
        .single_page("BT (clean) Tj ET", "<< >>")
        .object(9, "<< /Author (nobody) >>")
        .trailer_entry("/Info 9 0 R")
        .build();
    let report = audit(data, &["John Doe"]);
    assert_eq!(report.verdict, Verdict::Pass);
    // Page content plus document info
    assert_eq!(report.surfaces_checked, 2);
}
