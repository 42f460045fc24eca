//! Test fixture builder producing structurally valid PDFs with correct
//! xref offsets.

use std::collections::BTreeMap;

/// Builds a classic-xref PDF from numbered object bodies.
pub struct PdfBuilder {
    objects: BTreeMap<u32, Vec<u8>>,
    trailer_extra: String,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            trailer_extra: String::new(),
        }
    }

    /// Add object `id 0 obj <body> endobj`.
    pub fn object(mut self, id: u32, body: &str) -> Self {
        self.objects.insert(id, body.as_bytes().to_vec());
        self
    }

    /// Add a stream object. `dict_extra` is spliced into the dictionary
    /// after /Length.
    pub fn stream_object(mut self, id: u32, dict_extra: &str, payload: &[u8]) -> Self {
        let mut body = format!("<< /Length {} {} >>\nstream\n", payload.len(), dict_extra)
            .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\nendstream");
        self.objects.insert(id, body);
        self
    }

    /// Append extra entries to the trailer dictionary.
    pub fn trailer_entry(mut self, entry: &str) -> Self {
        self.trailer_extra.push(' ');
        self.trailer_extra.push_str(entry);
        self
    }

    /// A catalog, page tree, and single page with the given content stream
    /// and resource dictionary, as objects 1-4.
    pub fn single_page(self, content: &str, resources: &str) -> Self {
        self.object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                &format!(
                    "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources {} >>",
                    resources
                ),
            )
            .stream_object(4, "", content.as_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = b"%PDF-1.7\n".to_vec();
        let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();

        for (&id, body) in &self.objects {
            offsets.insert(id, data.len());
            data.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            data.extend_from_slice(body);
            data.extend_from_slice(b"\nendobj\n");
        }

        let max_id = self.objects.keys().copied().max().unwrap_or(0);
        let xref_off = data.len();
        data.extend_from_slice(format!("xref\n0 {}\n", max_id + 1).as_bytes());
        data.extend_from_slice(b"0000000000 65535 f \n");
        for id in 1..=max_id {
            match offsets.get(&id) {
                Some(off) => {
                    data.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes())
                },
                None => data.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        data.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R{} >>\n",
                max_id + 1,
                self.trailer_extra
            )
            .as_bytes(),
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());
        data
    }
}

/// Deflate bytes as a zlib stream, for FlateDecode fixtures.
#[allow(dead_code)]
pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
