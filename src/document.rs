//! Document facade: owns the raw bytes, the merged xref, and the object
//! cache. Resolution is lazy and memoized; a reference is only chased when
//! something asks for it, and each object is parsed at most once.
//!
//! The robustness posture is asymmetric. Structural damage degrades softly
//! (dangling references resolve to Null, cycles are cut), but encryption is
//! a hard stop: an encrypted file cannot be audited and must not pass.

use crate::error::{Error, Result};
use crate::object::{self, Object, ObjectRef};
use crate::xref::{self, XrefEntry, XrefTable};
use crate::{objstm, parser};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// How deep into the file the `%PDF-` header may sit. Some generators
/// prepend junk (HTTP headers, printer preambles).
const MAX_HEADER_JUNK: usize = 1024;

/// Cap on resolution recursion depth.
const MAX_RESOLVE_DEPTH: u32 = 100;

/// Cap on page-tree traversal depth.
const MAX_PAGE_TREE_DEPTH: u32 = 64;

/// A parsed PDF document.
pub struct Document {
    data: Vec<u8>,
    /// Version from the header, e.g. "1.7".
    pub version: String,
    xref: XrefTable,
    cache: RefCell<HashMap<ObjectRef, Object>>,
    resolving: RefCell<HashSet<u32>>,
    depth: Cell<u32>,
    decoded: RefCell<HashMap<ObjectRef, Rc<Vec<u8>>>>,
}

/// A leaf of the page tree with its inherited resources.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based page index in tree order.
    pub index: usize,
    /// The page dictionary itself.
    pub dict: HashMap<String, Object>,
    /// Inherited /Resources, already resolved to a dictionary.
    pub resources: HashMap<String, Object>,
}

impl Document {
    /// Open a document from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a document from bytes already in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let version = parse_header(&data)?;
        let startxref = xref::find_startxref(&data)?;
        let xref = xref::load(&data, startxref)?;

        if xref.is_empty() {
            return Err(Error::InvalidXref);
        }

        let doc = Self {
            data,
            version,
            xref,
            cache: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
            depth: Cell::new(0),
            decoded: RefCell::new(HashMap::new()),
        };

        // Fail closed on encryption. Even a broken /Encrypt entry means the
        // strings and streams cannot be trusted as plaintext.
        if doc.xref.trailer.contains_key("Encrypt") {
            return Err(Error::UnsupportedEncryption);
        }

        Ok(doc)
    }

    /// The merged trailer dictionary.
    pub fn trailer(&self) -> &HashMap<String, Object> {
        &self.xref.trailer
    }

    /// Resolve a value: references are chased (through chains) to their
    /// target, anything else is returned as-is.
    pub fn resolve(&self, obj: &Object) -> Object {
        match obj {
            Object::Reference(r) => self.fetch(*r),
            other => other.clone(),
        }
    }

    /// Fetch an indirect object by reference.
    ///
    /// Dangling references, free entries, cycles, and parse failures all
    /// degrade to Null; the surrounding audit decides what that means.
    pub fn fetch(&self, r: ObjectRef) -> Object {
        if let Some(obj) = self.cache.borrow().get(&r) {
            return obj.clone();
        }

        if self.depth.get() >= MAX_RESOLVE_DEPTH {
            log::warn!("resolution depth cap reached at {}", r);
            return Object::Null;
        }
        if !self.resolving.borrow_mut().insert(r.id) {
            log::warn!("reference cycle through {}, cutting to null", r);
            return Object::Null;
        }

        self.depth.set(self.depth.get() + 1);
        let obj = self.load_uncached(r);

        // A fetched reference target that is itself a reference is chased
        // here so callers always see a direct object. The cycle guard must
        // still cover this object while chasing, or `N 0 obj N 0 R` would
        // recurse forever.
        let obj = match obj {
            Object::Reference(inner) => self.fetch(inner),
            other => other,
        };

        self.depth.set(self.depth.get() - 1);
        self.resolving.borrow_mut().remove(&r.id);

        self.cache.borrow_mut().insert(r, obj.clone());
        obj
    }

    fn load_uncached(&self, r: ObjectRef) -> Object {
        let entry = match self.xref.get(r.id) {
            Some(e) => *e,
            None => {
                log::warn!("dangling reference {}, resolving to null", r);
                return Object::Null;
            },
        };

        match entry {
            XrefEntry::Free => Object::Null,
            XrefEntry::Uncompressed { offset, gen } => {
                if gen != r.gen {
                    log::warn!(
                        "generation mismatch for {} (table has {}), using table entry",
                        r,
                        gen
                    );
                }
                self.load_at_offset(r, offset)
            },
            XrefEntry::Compressed { container, index } => {
                self.load_from_objstm(r, container, index)
            },
        }
    }

    fn load_at_offset(&self, r: ObjectRef, offset: u64) -> Object {
        let offset = offset as usize;
        if offset >= self.data.len() {
            log::warn!("offset for {} beyond file end, resolving to null", r);
            return Object::Null;
        }

        match parser::parse_indirect_object(&self.data[offset..]) {
            Ok((actual, obj)) => {
                if actual.id != r.id {
                    log::warn!("xref points {} at object {}, using what is there", r, actual);
                }
                obj
            },
            Err(e) => {
                log::warn!("failed to parse {}: {}, resolving to null", r, e);
                Object::Null
            },
        }
    }

    fn load_from_objstm(&self, r: ObjectRef, container: u32, index: u32) -> Object {
        let container_ref = ObjectRef::new(container, 0);
        let stream = self.fetch(container_ref);
        let (dict, _) = match object::expect_stream(&stream) {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("object stream {} for {}: {}", container_ref, r, e);
                return Object::Null;
            },
        };
        let dict = dict.clone();

        let payload = match self.decoded_stream(container_ref) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("object stream {} payload: {}, members resolve to null", container_ref, e);
                return Object::Null;
            },
        };

        let members = match objstm::parse(&dict, &payload) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("object stream {}: {}, members resolve to null", container_ref, e);
                return Object::Null;
            },
        };

        // Cache every member; siblings are almost always wanted next.
        let mut found = Object::Null;
        let mut cache = self.cache.borrow_mut();
        for (member_ref, obj) in members {
            if member_ref.id == r.id {
                found = obj.clone();
            }
            cache.entry(member_ref).or_insert(obj);
        }
        if found.is_null() && index as usize > 0 {
            log::warn!("{} not found in object stream {} (index {})", r, container_ref, index);
        }
        found
    }

    /// Decoded payload of a stream object, memoized per reference.
    pub fn decoded_stream(&self, r: ObjectRef) -> Result<Rc<Vec<u8>>> {
        if let Some(cached) = self.decoded.borrow().get(&r) {
            return Ok(Rc::clone(cached));
        }

        let obj = self.fetch(r);
        let (dict, data) = object::expect_stream(&obj)?;
        // /Length may itself be indirect; the parser handled the common
        // case, but the filter chain still needs resolved parameters.
        let decoded = Rc::new(object::decode_stream_payload(dict, data)?);
        self.decoded
            .borrow_mut()
            .insert(r, Rc::clone(&decoded));
        Ok(decoded)
    }

    /// The document catalog (/Root), resolved.
    pub fn catalog(&self) -> Option<HashMap<String, Object>> {
        let root = self.xref.trailer.get("Root")?;
        self.resolve(root).as_dict().cloned()
    }

    /// The /Info dictionary, resolved, if present.
    pub fn info(&self) -> Option<HashMap<String, Object>> {
        let info = self.xref.trailer.get("Info")?;
        self.resolve(info).as_dict().cloned()
    }

    /// All leaf pages in tree order, with inherited /Resources.
    pub fn pages(&self) -> Vec<Page> {
        let mut pages = Vec::new();
        let Some(catalog) = self.catalog() else {
            log::warn!("document has no usable /Root catalog");
            return pages;
        };
        let Some(root_ref) = catalog.get("Pages") else {
            log::warn!("catalog has no /Pages");
            return pages;
        };

        let mut visited = HashSet::new();
        let root = self.resolve(root_ref);
        self.walk_page_node(
            &root,
            root_ref.as_reference(),
            &HashMap::new(),
            &mut visited,
            &mut pages,
            0,
        );
        pages
    }

    fn walk_page_node(
        &self,
        node: &Object,
        node_ref: Option<ObjectRef>,
        inherited_resources: &HashMap<String, Object>,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<Page>,
        depth: u32,
    ) {
        if depth > MAX_PAGE_TREE_DEPTH {
            log::warn!("page tree deeper than {}, truncating walk", MAX_PAGE_TREE_DEPTH);
            return;
        }
        if let Some(r) = node_ref {
            if !visited.insert(r) {
                log::warn!("page tree cycle through {}, skipping", r);
                return;
            }
        }

        let Some(dict) = node.as_dict() else {
            return;
        };

        let resources = match dict.get("Resources") {
            Some(res) => self
                .resolve(res)
                .as_dict()
                .cloned()
                .unwrap_or_else(|| inherited_resources.clone()),
            None => inherited_resources.clone(),
        };

        let kids = dict.get("Kids").map(|k| self.resolve(k));
        match kids.as_ref().and_then(|k| k.as_array()) {
            Some(kids) => {
                for kid in kids {
                    let kid_ref = kid.as_reference();
                    let kid_obj = self.resolve(kid);
                    self.walk_page_node(&kid_obj, kid_ref, &resources, visited, pages, depth + 1);
                }
            },
            None => {
                // Leaf page. /Type is not trusted; a node without kids is a
                // page as far as content extraction goes.
                pages.push(Page {
                    index: pages.len(),
                    dict: dict.clone(),
                    resources,
                });
            },
        }
    }

    /// All object numbers the xref knows about, for exhaustive sweeps.
    pub fn object_refs(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self
            .xref
            .iter()
            .filter_map(|(&id, entry)| match entry {
                XrefEntry::Free => None,
                XrefEntry::Uncompressed { gen, .. } => Some(ObjectRef::new(id, *gen)),
                XrefEntry::Compressed { .. } => Some(ObjectRef::new(id, 0)),
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        refs
    }
}

fn parse_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(MAX_HEADER_JUNK)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or(Error::InvalidHeader)?;

    let after = &data[pos + 5..];
    let end = after
        .iter()
        .position(|&c| !matches!(c, b'0'..=b'9' | b'.'))
        .unwrap_or(after.len());
    if end == 0 {
        return Err(Error::InvalidHeader);
    }
    if pos > 0 {
        log::warn!("{} bytes of junk before the PDF header", pos);
    }
    // The slice is digits and dots only
    Ok(String::from_utf8_lossy(&after[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal single-page document built with exact offsets.
    fn tiny_pdf() -> Vec<u8> {
        let header = b"%PDF-1.4\n".to_vec();
        let mut data = header;
        let mut offsets = Vec::new();

        let bodies: Vec<String> = vec![
            "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_string(),
            "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n".to_string(),
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /Resources << >> >>\nendobj\n".to_string(),
        ];
        for body in &bodies {
            offsets.push(data.len());
            data.extend_from_slice(body.as_bytes());
        }

        let xref_off = data.len();
        data.extend_from_slice(b"xref\n0 4\n");
        data.extend_from_slice(b"0000000000 65535 f \n");
        for off in &offsets {
            data.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        data.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\n");
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());
        data
    }

    #[test]
    fn test_open_tiny_pdf() {
        let doc = Document::from_bytes(tiny_pdf()).unwrap();
        assert_eq!(doc.version, "1.4");
        let pages = doc.pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 0);
    }

    #[test]
    fn test_header_with_leading_junk() {
        let mut data = b"PRINTER PREAMBLE\n".to_vec();
        data.extend_from_slice(&tiny_pdf());
        // Offsets shift, so only the header parse is asserted here
        assert_eq!(parse_header(&data).unwrap(), "1.4");
    }

    #[test]
    fn test_missing_header_is_error() {
        match Document::from_bytes(b"not a pdf at all".to_vec()) {
            Err(Error::InvalidHeader) => {},
            other => panic!("expected InvalidHeader, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_encrypted_document_is_rejected() {
        // Rebuild the trailer with an /Encrypt key; the xref offset above
        // it is unchanged.
        let data = tiny_pdf();
        let tail = b"trailer\n<< /Size 4 /Root 1 0 R /Encrypt 9 0 R >>\n";
        let trailer_pos = data.windows(8).position(|w| w == b"trailer\n").unwrap();
        let startxref_pos = data
            .windows(9)
            .position(|w| w == b"startxref")
            .unwrap();
        let mut rebuilt = data[..trailer_pos].to_vec();
        rebuilt.extend_from_slice(tail);
        rebuilt.extend_from_slice(&data[startxref_pos..]);

        match Document::from_bytes(rebuilt) {
            Err(Error::UnsupportedEncryption) => {},
            other => panic!("expected UnsupportedEncryption, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_dangling_reference_resolves_to_null() {
        let doc = Document::from_bytes(tiny_pdf()).unwrap();
        assert!(doc.fetch(ObjectRef::new(99, 0)).is_null());
    }

    #[test]
    fn test_fetch_is_memoized() {
        let doc = Document::from_bytes(tiny_pdf()).unwrap();
        let first = doc.fetch(ObjectRef::new(1, 0));
        let second = doc.fetch(ObjectRef::new(1, 0));
        assert_eq!(first, second);
        assert!(doc.cache.borrow().contains_key(&ObjectRef::new(1, 0)));
    }

    #[test]
    fn test_object_refs_skips_free() {
        let doc = Document::from_bytes(tiny_pdf()).unwrap();
        let refs = doc.object_refs();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.id != 0));
    }
}
