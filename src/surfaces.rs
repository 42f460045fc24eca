//! Surface enumeration.
//!
//! A "surface" is any place text can survive a botched redaction: page
//! content, annotations, form fields, document metadata, optional content
//! groups, embedded files, and finally every stream the other surfaces did
//! not claim. The enumerator is exhaustive by construction: claiming is
//! explicit, and whatever is left over gets mined for printable runs.

use crate::document::{Document, Page};
use crate::object::{self, Object, ObjectRef};
use std::collections::{HashMap, HashSet};

/// What kind of surface a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Page content stream (plus the form XObjects it draws).
    ContentStream,
    /// Annotation text entries.
    Annotation,
    /// AcroForm field values.
    FormField,
    /// Document info dictionary or XMP packet.
    Metadata,
    /// Optional content group names.
    Layer,
    /// Embedded file payload.
    EmbeddedFile,
    /// Unclaimed stream mined for printable runs.
    RawLeftover,
    /// Text recovered by rasterizing and OCRing a page.
    OcrSynthetic,
}

/// Payload of one surface.
#[derive(Debug)]
pub enum SurfacePayload {
    /// Decoded page content plus the resources needed to interpret it.
    PageContent {
        /// Concatenated decoded content streams.
        content: Vec<u8>,
        /// Inherited resource dictionary.
        resources: HashMap<String, Object>,
        /// Zero-based page index.
        page_index: usize,
    },
    /// Already-extracted text.
    Text(String),
    /// Raw bytes to be mined for printable runs.
    Bytes(Vec<u8>),
}

/// One scannable surface.
#[derive(Debug)]
pub struct Surface {
    /// Kind tag.
    pub kind: SurfaceKind,
    /// Human-readable label used in findings, e.g. "page 3 content".
    pub label: String,
    /// True for content the viewer would not normally show (hidden
    /// annotations, disabled layers). Scanned all the same.
    pub hidden: bool,
    /// The payload.
    pub payload: SurfacePayload,
}

/// Result of enumeration: the surfaces plus non-fatal anomalies.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// All surfaces found, in document order.
    pub surfaces: Vec<Surface>,
    /// Anomalies worth escalating under strict verdicts.
    pub warnings: Vec<String>,
}

/// Minimum printable-run length worth scanning from raw bytes.
const MIN_PRINTABLE_RUN: usize = 3;

/// Name tree traversal cap.
const MAX_TREE_DEPTH: u32 = 32;

/// Extract printable ASCII runs from raw bytes, one per line.
pub fn printable_runs(data: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for &b in data {
        if (0x20..=0x7E).contains(&b) {
            run.push(b as char);
        } else {
            if run.len() >= MIN_PRINTABLE_RUN {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&run);
            }
            run.clear();
        }
    }
    if run.len() >= MIN_PRINTABLE_RUN {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&run);
    }
    out
}

/// Enumerate every scannable surface of a document.
pub fn enumerate(doc: &Document) -> Enumeration {
    let mut en = Enumeration::default();
    let mut claimed: HashSet<u32> = HashSet::new();

    let pages = doc.pages();
    for page in &pages {
        collect_page_content(doc, page, &mut claimed, &mut en);
        collect_annotations(doc, page, &mut claimed, &mut en);
    }

    collect_form_fields(doc, &mut claimed, &mut en);
    collect_info(doc, &mut en);
    collect_xmp(doc, &mut claimed, &mut en);
    collect_layers(doc, &mut en);
    collect_embedded_files(doc, &mut claimed, &mut en);

    // Resource-graph streams that carry no prose of their own
    for page in &pages {
        claim_resource_streams(doc, &page.resources, &mut claimed, 0);
    }

    collect_raw_leftovers(doc, &claimed, &mut en);
    en
}

fn collect_page_content(
    doc: &Document,
    page: &Page,
    claimed: &mut HashSet<u32>,
    en: &mut Enumeration,
) {
    let label = format!("page {} content", page.index + 1);
    let Some(contents) = page.dict.get("Contents") else {
        en.warnings.push(format!("page {} has no /Contents", page.index + 1));
        return;
    };

    let refs: Vec<ObjectRef> = match contents {
        Object::Reference(r) => {
            // May point at a single stream or an array of streams
            match doc.fetch(*r) {
                Object::Array(items) => {
                    claimed.insert(r.id);
                    items.iter().filter_map(|o| o.as_reference()).collect()
                },
                _ => vec![*r],
            }
        },
        Object::Array(items) => items.iter().filter_map(|o| o.as_reference()).collect(),
        _ => Vec::new(),
    };

    let mut content = Vec::new();
    for r in refs {
        match doc.decoded_stream(r) {
            Ok(payload) => {
                claimed.insert(r.id);
                content.extend_from_slice(&payload);
                // Streams in a /Contents array are one logical stream;
                // keep operators from abutting across the seam.
                content.push(b'\n');
            },
            Err(e) => {
                en.warnings
                    .push(format!("{}: stream {} undecodable: {}", label, r, e));
            },
        }
    }

    if content.is_empty() {
        en.warnings.push(format!("{} is empty", label));
        return;
    }

    en.surfaces.push(Surface {
        kind: SurfaceKind::ContentStream,
        label,
        hidden: false,
        payload: SurfacePayload::PageContent {
            content,
            resources: page.resources.clone(),
            page_index: page.index,
        },
    });
}

fn collect_annotations(
    doc: &Document,
    page: &Page,
    claimed: &mut HashSet<u32>,
    en: &mut Enumeration,
) {
    let Some(annots) = page.dict.get("Annots").map(|a| doc.resolve(a)) else {
        return;
    };
    let Some(annots) = annots.as_array() else {
        return;
    };

    for (i, annot) in annots.iter().enumerate() {
        let annot = doc.resolve(annot);
        let Some(dict) = annot.as_dict() else {
            continue;
        };
        let subtype = dict
            .get("Subtype")
            .and_then(|o| o.as_name())
            .unwrap_or("Annot");
        let label = format!("page {} annotation {} ({})", page.index + 1, i + 1, subtype);

        // Flag bit 2 marks the annotation hidden; it is scanned regardless
        let flags = dict.get("F").and_then(|o| o.as_int()).unwrap_or(0);
        let hidden = flags & 0x2 != 0;

        let mut parts = Vec::new();
        for key in ["Contents", "T", "TU", "TM", "V", "RC", "DS"] {
            if let Some(bytes) = doc.resolve(dict.get(key).unwrap_or(&Object::Null)).as_string_bytes()
            {
                let text = object::decode_text_string(bytes);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
        if !parts.is_empty() {
            en.surfaces.push(Surface {
                kind: SurfaceKind::Annotation,
                label: label.clone(),
                hidden,
                payload: SurfacePayload::Text(parts.join("\n")),
            });
        }

        // What the viewer actually paints for this annotation are its
        // appearance streams. They are content streams in their own right.
        for (state, r) in appearance_streams(doc, dict) {
            if !claimed.insert(r.id) {
                continue;
            }
            emit_appearance(
                doc,
                r,
                &format!("{} /{} appearance", label, state),
                hidden,
                &page.resources,
                page.index,
                claimed,
                en,
            );
        }

        // A file attachment carries its payload in the /FS filespec
        if subtype == "FileAttachment" {
            if let Some(fs) = dict.get("FS") {
                collect_one_filespec(doc, fs, claimed, en);
            }
        }
    }
}

/// Streams reachable from an annotation's /AP dictionary: each of /N, /R
/// and /D is either a stream or one dictionary level of named sub-states.
fn appearance_streams(
    doc: &Document,
    annot: &HashMap<String, Object>,
) -> Vec<(String, ObjectRef)> {
    let mut out = Vec::new();
    let Some(ap) = annot.get("AP").map(|a| doc.resolve(a)) else {
        return out;
    };
    let Some(ap) = ap.as_dict() else {
        return out;
    };

    for state in ["N", "R", "D"] {
        let Some(entry) = ap.get(state) else {
            continue;
        };
        match entry.as_reference() {
            Some(r) => match doc.fetch(r) {
                Object::Stream { .. } => out.push((state.to_string(), r)),
                Object::Dictionary(sub) => push_substates(state, &sub, &mut out),
                _ => {},
            },
            None => {
                if let Some(sub) = entry.as_dict() {
                    push_substates(state, sub, &mut out);
                }
            },
        }
    }
    out
}

fn push_substates(state: &str, sub: &HashMap<String, Object>, out: &mut Vec<(String, ObjectRef)>) {
    let mut keys: Vec<&String> = sub.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(r) = sub[key].as_reference() {
            out.push((format!("{} {}", state, key), r));
        }
    }
}

/// Emit one appearance stream as an interpretable content surface.
#[allow(clippy::too_many_arguments)]
fn emit_appearance(
    doc: &Document,
    r: ObjectRef,
    label: &str,
    hidden: bool,
    fallback_resources: &HashMap<String, Object>,
    page_index: usize,
    claimed: &mut HashSet<u32>,
    en: &mut Enumeration,
) {
    let content = match doc.decoded_stream(r) {
        Ok(payload) => payload.to_vec(),
        Err(e) => {
            en.warnings
                .push(format!("{}: stream {} undecodable: {}", label, r, e));
            return;
        },
    };
    if content.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    // The stream's own /Resources when present, the page's otherwise
    let resources = doc
        .fetch(r)
        .as_dict()
        .and_then(|d| d.get("Resources"))
        .map(|res| doc.resolve(res))
        .as_ref()
        .and_then(|res| res.as_dict())
        .cloned()
        .unwrap_or_else(|| fallback_resources.clone());
    claim_resource_streams(doc, &resources, claimed, 0);

    en.surfaces.push(Surface {
        kind: SurfaceKind::Annotation,
        label: label.to_string(),
        hidden,
        payload: SurfacePayload::PageContent {
            content,
            resources,
            page_index,
        },
    });
}

fn collect_form_fields(doc: &Document, claimed: &mut HashSet<u32>, en: &mut Enumeration) {
    let Some(catalog) = doc.catalog() else {
        return;
    };
    let Some(acroform) = catalog.get("AcroForm").map(|a| doc.resolve(a)) else {
        return;
    };
    let Some(fields) = acroform
        .as_dict()
        .and_then(|d| d.get("Fields"))
        .map(|f| doc.resolve(f))
    else {
        return;
    };
    let Some(fields) = fields.as_array() else {
        return;
    };

    let mut visited = HashSet::new();
    for field in fields {
        walk_field(doc, field, "", &mut visited, claimed, en, 0);
    }
}

fn walk_field(
    doc: &Document,
    field: &Object,
    parent_name: &str,
    visited: &mut HashSet<ObjectRef>,
    claimed: &mut HashSet<u32>,
    en: &mut Enumeration,
    depth: u32,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    if let Some(r) = field.as_reference() {
        if !visited.insert(r) {
            return;
        }
    }
    let field = doc.resolve(field);
    let Some(dict) = field.as_dict() else {
        return;
    };

    let partial = dict
        .get("T")
        .map(|t| doc.resolve(t))
        .as_ref()
        .and_then(|t| t.as_string_bytes())
        .map(object::decode_text_string)
        .unwrap_or_default();
    let full_name = match (parent_name.is_empty(), partial.is_empty()) {
        (true, _) => partial.clone(),
        (false, true) => parent_name.to_string(),
        (false, false) => format!("{}.{}", parent_name, partial),
    };

    let mut parts = Vec::new();
    if !partial.is_empty() {
        parts.push(partial);
    }
    for key in ["TU", "V", "DV"] {
        let value = doc.resolve(dict.get(key).unwrap_or(&Object::Null));
        match value {
            Object::String(bytes) => {
                let text = object::decode_text_string(&bytes);
                if !text.is_empty() {
                    parts.push(text);
                }
            },
            Object::Name(name) => parts.push(name),
            _ => {},
        }
    }

    let label = if full_name.is_empty() {
        "form field".to_string()
    } else {
        format!("form field '{}'", full_name)
    };
    if !parts.is_empty() {
        en.surfaces.push(Surface {
            kind: SurfaceKind::FormField,
            label: label.clone(),
            hidden: false,
            payload: SurfacePayload::Text(parts.join("\n")),
        });
    }

    // Widgets placed on a page were already claimed through its /Annots;
    // this catches appearance streams of fields no page references.
    for (state, r) in appearance_streams(doc, dict) {
        if !claimed.insert(r.id) {
            continue;
        }
        emit_appearance(
            doc,
            r,
            &format!("{} /{} appearance", label, state),
            false,
            &HashMap::new(),
            0,
            claimed,
            en,
        );
    }

    if let Some(kids) = dict.get("Kids").map(|k| doc.resolve(k)) {
        if let Some(kids) = kids.as_array() {
            for kid in kids {
                walk_field(doc, kid, &full_name, visited, claimed, en, depth + 1);
            }
        }
    }
}

fn collect_info(doc: &Document, en: &mut Enumeration) {
    let Some(info) = doc.info() else {
        return;
    };

    let mut lines: Vec<String> = Vec::new();
    let mut keys: Vec<&String> = info.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(bytes) = doc.resolve(&info[key]).as_string_bytes() {
            let text = object::decode_text_string(bytes);
            if !text.is_empty() {
                lines.push(format!("{}: {}", key, text));
            }
        }
    }
    if lines.is_empty() {
        return;
    }

    en.surfaces.push(Surface {
        kind: SurfaceKind::Metadata,
        label: "document info".to_string(),
        hidden: false,
        payload: SurfacePayload::Text(lines.join("\n")),
    });
}

fn collect_xmp(doc: &Document, claimed: &mut HashSet<u32>, en: &mut Enumeration) {
    let Some(catalog) = doc.catalog() else {
        return;
    };
    let Some(meta_ref) = catalog.get("Metadata").and_then(|o| o.as_reference()) else {
        return;
    };
    claimed.insert(meta_ref.id);

    let payload = match doc.decoded_stream(meta_ref) {
        Ok(p) => p,
        Err(e) => {
            en.warnings
                .push(format!("XMP metadata stream {} undecodable: {}", meta_ref, e));
            return;
        },
    };

    let text = match xmp_text(&payload) {
        Ok(text) => text,
        Err(e) => {
            en.warnings.push(format!("XMP packet is not well-formed ({})", e));
            // Mine the raw packet instead of dropping it
            printable_runs(&payload)
        },
    };
    if text.is_empty() {
        return;
    }

    en.surfaces.push(Surface {
        kind: SurfaceKind::Metadata,
        label: "XMP metadata".to_string(),
        hidden: false,
        payload: SurfacePayload::Text(text),
    });
}

/// Pull character data and attribute values out of an XMP packet.
fn xmp_text(payload: &[u8]) -> std::result::Result<String, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(payload);
    let mut out = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Text(t) => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        out.push(text.to_string());
                    }
                }
            },
            Event::Start(start) | Event::Empty(start) => {
                for attr in start.attributes().flatten() {
                    if let Ok(value) = attr.unescape_value() {
                        let value = value.trim();
                        if !value.is_empty() {
                            out.push(value.to_string());
                        }
                    }
                }
            },
            _ => {},
        }
        buf.clear();
    }

    Ok(out.join("\n"))
}

fn collect_layers(doc: &Document, en: &mut Enumeration) {
    let Some(catalog) = doc.catalog() else {
        return;
    };
    let Some(ocprops) = catalog.get("OCProperties").map(|o| doc.resolve(o)) else {
        return;
    };
    let Some(ocprops) = ocprops.as_dict() else {
        return;
    };

    // /D /OFF lists the groups switched off in the default configuration
    let off_refs: HashSet<ObjectRef> = ocprops
        .get("D")
        .map(|d| doc.resolve(d))
        .as_ref()
        .and_then(|d| d.as_dict())
        .and_then(|d| d.get("OFF"))
        .map(|off| doc.resolve(off))
        .as_ref()
        .and_then(|off| off.as_array())
        .map(|items| items.iter().filter_map(|o| o.as_reference()).collect())
        .unwrap_or_default();

    let Some(ocgs) = ocprops.get("OCGs").map(|o| doc.resolve(o)) else {
        return;
    };
    let Some(ocgs) = ocgs.as_array() else {
        return;
    };

    for ocg in ocgs {
        let ocg_ref = ocg.as_reference();
        let resolved = doc.resolve(ocg);
        let Some(dict) = resolved.as_dict() else {
            continue;
        };
        let Some(name_bytes) = dict.get("Name").and_then(|n| n.as_string_bytes()) else {
            continue;
        };
        let name = object::decode_text_string(name_bytes);
        if name.is_empty() {
            continue;
        }
        let hidden = ocg_ref.map(|r| off_refs.contains(&r)).unwrap_or(false);

        en.surfaces.push(Surface {
            kind: SurfaceKind::Layer,
            label: format!("layer '{}'", name),
            hidden,
            payload: SurfacePayload::Text(name),
        });
    }
}

fn collect_embedded_files(doc: &Document, claimed: &mut HashSet<u32>, en: &mut Enumeration) {
    let Some(catalog) = doc.catalog() else {
        return;
    };
    let Some(names) = catalog.get("Names").map(|n| doc.resolve(n)) else {
        return;
    };
    let Some(embedded) = names
        .as_dict()
        .and_then(|d| d.get("EmbeddedFiles"))
        .map(|e| doc.resolve(e))
    else {
        return;
    };

    let mut visited = HashSet::new();
    walk_name_tree(doc, &embedded, &mut visited, 0, &mut |filespec| {
        collect_one_filespec(doc, filespec, claimed, en);
    });
}

fn walk_name_tree(
    doc: &Document,
    node: &Object,
    visited: &mut HashSet<ObjectRef>,
    depth: u32,
    sink: &mut dyn FnMut(&Object),
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    if let Some(r) = node.as_reference() {
        if !visited.insert(r) {
            return;
        }
    }
    let node = doc.resolve(node);
    let Some(dict) = node.as_dict() else {
        return;
    };

    if let Some(kids) = dict.get("Kids").map(|k| doc.resolve(k)) {
        if let Some(kids) = kids.as_array() {
            for kid in kids {
                walk_name_tree(doc, kid, visited, depth + 1, sink);
            }
        }
    }
    if let Some(names) = dict.get("Names").map(|n| doc.resolve(n)) {
        if let Some(pairs) = names.as_array() {
            // Alternating name, value entries
            for pair in pairs.chunks(2) {
                if let [_, value] = pair {
                    sink(value);
                }
            }
        }
    }
}

fn collect_one_filespec(
    doc: &Document,
    filespec: &Object,
    claimed: &mut HashSet<u32>,
    en: &mut Enumeration,
) {
    let filespec = doc.resolve(filespec);
    let Some(dict) = filespec.as_dict() else {
        return;
    };

    let name = ["UF", "F"]
        .iter()
        .find_map(|k| dict.get(*k).and_then(|o| o.as_string_bytes()))
        .map(object::decode_text_string)
        .unwrap_or_else(|| "unnamed".to_string());
    let label = format!("embedded file '{}'", name);

    let Some(ef) = dict.get("EF").map(|e| doc.resolve(e)) else {
        return;
    };
    let Some(stream_ref) = ef
        .as_dict()
        .and_then(|d| ["UF", "F"].iter().find_map(|k| d.get(*k)))
        .and_then(|o| o.as_reference())
    else {
        return;
    };
    claimed.insert(stream_ref.id);

    match doc.decoded_stream(stream_ref) {
        Ok(payload) => {
            en.surfaces.push(Surface {
                kind: SurfaceKind::EmbeddedFile,
                label,
                hidden: false,
                payload: SurfacePayload::Bytes(payload.to_vec()),
            });
        },
        Err(e) => {
            en.warnings
                .push(format!("{}: stream {} undecodable: {}", label, stream_ref, e));
        },
    }
}

/// Claim streams reachable from a resource dictionary that other surfaces
/// account for: form and image XObjects, font programs, and ToUnicode maps.
fn claim_resource_streams(
    doc: &Document,
    resources: &HashMap<String, Object>,
    claimed: &mut HashSet<u32>,
    depth: u32,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }

    if let Some(xobjects) = resources.get("XObject").map(|x| doc.resolve(x)) {
        if let Some(xobjects) = xobjects.as_dict() {
            for entry in xobjects.values() {
                let Some(r) = entry.as_reference() else {
                    continue;
                };
                if !claimed.insert(r.id) {
                    continue;
                }
                // Nested form resources carry their own XObjects
                if let Some(dict) = doc.fetch(r).as_dict() {
                    if let Some(inner) = dict.get("Resources").map(|res| doc.resolve(res)) {
                        if let Some(inner) = inner.as_dict() {
                            claim_resource_streams(doc, inner, claimed, depth + 1);
                        }
                    }
                }
            }
        }
    }

    if let Some(fonts) = resources.get("Font").map(|f| doc.resolve(f)) {
        if let Some(fonts) = fonts.as_dict() {
            for font in fonts.values() {
                let font = doc.resolve(font);
                let Some(dict) = font.as_dict() else {
                    continue;
                };
                if let Some(r) = dict.get("ToUnicode").and_then(|o| o.as_reference()) {
                    claimed.insert(r.id);
                }
                if let Some(desc) = dict.get("FontDescriptor").map(|d| doc.resolve(d)) {
                    if let Some(desc) = desc.as_dict() {
                        for key in ["FontFile", "FontFile2", "FontFile3"] {
                            if let Some(r) = desc.get(key).and_then(|o| o.as_reference()) {
                                claimed.insert(r.id);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn collect_raw_leftovers(doc: &Document, claimed: &HashSet<u32>, en: &mut Enumeration) {
    for r in doc.object_refs() {
        if claimed.contains(&r.id) {
            continue;
        }
        let obj = doc.fetch(r);
        let Object::Stream { ref dict, ref data } = obj else {
            continue;
        };

        // Structural streams hold the file format itself, not content
        let type_name = dict.get("Type").and_then(|o| o.as_name()).unwrap_or("");
        if matches!(type_name, "ObjStm" | "XRef") {
            continue;
        }

        let bytes = match object::decode_stream_payload(dict, data) {
            Ok(decoded) => decoded,
            Err(e) => {
                en.warnings
                    .push(format!("leftover stream {} undecodable: {}, mining raw bytes", r, e));
                data.to_vec()
            },
        };

        let mined = printable_runs(&bytes);
        if mined.is_empty() {
            continue;
        }

        en.surfaces.push(Surface {
            kind: SurfaceKind::RawLeftover,
            label: format!("unreferenced stream {}", r),
            hidden: true,
            payload: SurfacePayload::Bytes(bytes),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_runs_threshold() {
        let data = b"\x00\x01ab\x02token\x03\x04longer run here\x05";
        let mined = printable_runs(data);
        // "ab" is below the three-byte floor
        assert_eq!(mined, "token\nlonger run here");
    }

    #[test]
    fn test_printable_runs_all_binary() {
        assert_eq!(printable_runs(&[0u8, 1, 2, 3, 255]), "");
    }

    #[test]
    fn test_printable_runs_trailing_run_kept() {
        assert_eq!(printable_runs(b"\x00visible"), "visible");
    }

    #[test]
    fn test_xmp_text_extraction() {
        let xml = br#"<?xml version="1.0"?>
            <x:xmpmeta xmlns:x="adobe:ns:meta/">
              <rdf:Description xmlns:rdf="r" xmlns:dc="d" dc:creator="Jane Roe">
                <dc:title>Quarterly Report</dc:title>
              </rdf:Description>
            </x:xmpmeta>"#;
        let text = xmp_text(xml).unwrap();
        assert!(text.contains("Jane Roe"));
        assert!(text.contains("Quarterly Report"));
    }

    #[test]
    fn test_xmp_malformed_is_error() {
        assert!(xmp_text(b"<unclosed ><tag").is_err());
    }
}
