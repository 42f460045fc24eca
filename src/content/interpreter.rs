//! Content stream interpreter.
//!
//! Walks the operator sequence keeping just enough graphics state to answer
//! the two questions the audit asks: what text does this page show, and
//! where do filled rectangles and images sit relative to that text. Glyph
//! metrics are estimated (half an em per glyph), which is plenty for
//! overlap detection and useless for layout, by intent.

use crate::content::operators::ContentScanner;
use crate::content::{Matrix, Rect};
use crate::document::Document;
use crate::fonts::Font;
use crate::object::Object;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Form XObject recursion cap.
const MAX_FORM_DEPTH: u32 = 32;

/// One shown string with its decode and placement.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Decoded Unicode text.
    pub text: String,
    /// Resource name of the font that showed it.
    pub font: String,
    /// True for the first run after a BT operator.
    pub starts_text_object: bool,
    /// Estimated device-space bounding box.
    pub bbox: Rect,
}

/// Everything extracted from one content stream (including any form
/// XObjects it invokes).
#[derive(Debug, Default)]
pub struct InterpretedContent {
    /// Text runs in stream order.
    pub runs: Vec<TextRun>,
    /// Device-space rects painted by fill operators.
    pub fill_rects: Vec<Rect>,
    /// Device-space rects covered by image XObjects.
    pub image_rects: Vec<Rect>,
    /// Human-readable anomalies encountered while interpreting.
    pub warnings: Vec<String>,
    /// Total operations executed, damaged ones excluded.
    pub ops: usize,
}

struct Interp<'a> {
    doc: &'a Document,
    out: InterpretedContent,
    visited_forms: HashSet<crate::object::ObjectRef>,
}

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    font: Option<Rc<Font>>,
    size: f64,
    leading: f64,
    fresh_text_object: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font: None,
            size: 0.0,
            leading: 0.0,
            fresh_text_object: false,
        }
    }

    fn translate_line(&mut self, tx: f64, ty: f64) {
        let t = Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        };
        self.tlm = t.then(&self.tlm);
        self.tm = self.tlm;
    }
}

/// Interpret a decoded content stream against its resource dictionary.
pub fn interpret(
    doc: &Document,
    content: &[u8],
    resources: &HashMap<String, Object>,
) -> InterpretedContent {
    let mut interp = Interp {
        doc,
        out: InterpretedContent::default(),
        visited_forms: HashSet::new(),
    };
    interp.run(content, resources, Matrix::IDENTITY, 0);
    interp.out
}

impl<'a> Interp<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: &HashMap<String, Object>,
        base_ctm: Matrix,
        depth: u32,
    ) {
        let mut ctm = base_ctm;
        let mut gs_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::new();
        let mut fonts: HashMap<String, Rc<Font>> = HashMap::new();
        let mut path_rects: Vec<Rect> = Vec::new();

        let mut scanner = ContentScanner::new(content);
        while let Some(op) = scanner.next() {
            self.out.ops += 1;
            let args = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => gs_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = gs_stack.pop() {
                        ctm = saved;
                    }
                },
                "cm" => {
                    if let Some(m) = matrix_args(args) {
                        ctm = m.then(&ctm);
                    }
                },

                "BT" => {
                    text.tm = Matrix::IDENTITY;
                    text.tlm = Matrix::IDENTITY;
                    text.fresh_text_object = true;
                },
                "ET" => {},
                "Tf" => {
                    if let [name, size] = args {
                        if let (Some(name), Some(size)) = (name.as_name(), size.as_number()) {
                            text.font =
                                Some(self.lookup_font(resources, &mut fonts, name));
                            text.size = size;
                        }
                    }
                },
                "TL" => {
                    if let Some(l) = args.first().and_then(|o| o.as_number()) {
                        text.leading = l;
                    }
                },
                "Td" => {
                    if let [tx, ty] = args {
                        if let (Some(tx), Some(ty)) = (tx.as_number(), ty.as_number()) {
                            text.translate_line(tx, ty);
                        }
                    }
                },
                "TD" => {
                    if let [tx, ty] = args {
                        if let (Some(tx), Some(ty)) = (tx.as_number(), ty.as_number()) {
                            text.leading = -ty;
                            text.translate_line(tx, ty);
                        }
                    }
                },
                "Tm" => {
                    if let Some(m) = matrix_args(args) {
                        text.tm = m;
                        text.tlm = m;
                    }
                },
                "T*" => {
                    let leading = text.leading;
                    text.translate_line(0.0, -leading);
                },

                "Tj" => {
                    if let Some(bytes) = args.first().and_then(|o| o.as_string_bytes()) {
                        self.show(&mut text, &ctm, bytes);
                    }
                },
                "'" => {
                    let leading = text.leading;
                    text.translate_line(0.0, -leading);
                    if let Some(bytes) = args.first().and_then(|o| o.as_string_bytes()) {
                        self.show(&mut text, &ctm, bytes);
                    }
                },
                "\"" => {
                    let leading = text.leading;
                    text.translate_line(0.0, -leading);
                    if let Some(bytes) = args.get(2).and_then(|o| o.as_string_bytes()) {
                        self.show(&mut text, &ctm, bytes);
                    }
                },
                "TJ" => {
                    if let Some(items) = args.first().and_then(|o| o.as_array()) {
                        for item in items {
                            match item {
                                Object::String(bytes) => self.show(&mut text, &ctm, bytes),
                                _ => {
                                    if let Some(adj) = item.as_number() {
                                        let dx = -adj / 1000.0 * text.size;
                                        let t = Matrix {
                                            e: dx,
                                            ..Matrix::IDENTITY
                                        };
                                        text.tm = t.then(&text.tm);
                                    }
                                },
                            }
                        }
                    }
                },

                "re" => {
                    if let [x, y, w, h] = args {
                        if let (Some(x), Some(y), Some(w), Some(h)) =
                            (x.as_number(), y.as_number(), w.as_number(), h.as_number())
                        {
                            path_rects.push(Rect::from_corners(x, y, x + w, y + h));
                        }
                    }
                },
                "f" | "F" | "f*" | "b" | "b*" | "B" | "B*" => {
                    for r in path_rects.drain(..) {
                        self.out.fill_rects.push(ctm.apply_rect(&r));
                    }
                },
                "n" | "S" | "s" => path_rects.clear(),

                "Do" => {
                    if let Some(name) = args.first().and_then(|o| o.as_name()) {
                        self.invoke_xobject(resources, name, ctm, depth);
                    }
                },

                _ => {},
            }
        }

        if scanner.skipped_bytes > 0 {
            self.out.warnings.push(format!(
                "resynchronized past {} unparseable bytes",
                scanner.skipped_bytes
            ));
        }
    }

    fn show(&mut self, text: &mut TextState, ctm: &Matrix, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let font = match &text.font {
            Some(f) => Rc::clone(f),
            None => {
                let f = Rc::new(Font::fallback("none"));
                text.font = Some(Rc::clone(&f));
                f
            },
        };

        let decoded = font.decode(bytes);

        // Half an em per glyph keeps the estimate inside the right order
        // of magnitude for Latin text.
        let glyphs = font.glyph_count(bytes) as f64;
        let width = 0.5 * text.size * glyphs;
        let height = text.size;
        let trm = text.tm.then(ctm);
        let bbox = trm.apply_rect(&Rect::from_corners(0.0, 0.0, width.max(0.0), height.max(0.0)));

        self.out.runs.push(TextRun {
            text: decoded,
            font: font.name.clone(),
            starts_text_object: text.fresh_text_object,
            bbox,
        });
        text.fresh_text_object = false;

        // Advance the text matrix past what was shown
        let t = Matrix {
            e: width,
            ..Matrix::IDENTITY
        };
        text.tm = t.then(&text.tm);
    }

    fn lookup_font(
        &mut self,
        resources: &HashMap<String, Object>,
        cache: &mut HashMap<String, Rc<Font>>,
        name: &str,
    ) -> Rc<Font> {
        if let Some(f) = cache.get(name) {
            return Rc::clone(f);
        }

        let font = resources
            .get("Font")
            .map(|f| self.doc.resolve(f))
            .as_ref()
            .and_then(|f| f.as_dict())
            .and_then(|fonts| fonts.get(name))
            .map(|f| self.doc.resolve(f))
            .as_ref()
            .and_then(|f| f.as_dict())
            .map(|dict| Font::from_dict(self.doc, name, dict))
            .unwrap_or_else(|| Font::fallback(name));

        let font = Rc::new(font);
        cache.insert(name.to_string(), Rc::clone(&font));
        font
    }

    fn invoke_xobject(
        &mut self,
        resources: &HashMap<String, Object>,
        name: &str,
        ctm: Matrix,
        depth: u32,
    ) {
        let Some(xobjects) = resources.get("XObject").map(|x| self.doc.resolve(x)) else {
            return;
        };
        let Some(entry) = xobjects.as_dict().and_then(|d| d.get(name)) else {
            return;
        };
        let entry_ref = entry.as_reference();
        let obj = self.doc.resolve(entry);
        let Some(dict) = obj.as_dict() else {
            return;
        };

        match dict.get("Subtype").and_then(|o| o.as_name()) {
            Some("Image") => {
                // Images are placed in the unit square of the current CTM
                let rect = ctm.apply_rect(&Rect::from_corners(0.0, 0.0, 1.0, 1.0));
                self.out.image_rects.push(rect);
            },
            Some("Form") => {
                if depth >= MAX_FORM_DEPTH {
                    self.out
                        .warnings
                        .push(format!("form XObject /{} exceeds nesting depth", name));
                    return;
                }
                let Some(r) = entry_ref else {
                    // Inline form dictionaries do not occur; a direct
                    // object here cannot be cycle-guarded, skip it.
                    return;
                };
                if !self.visited_forms.insert(r) {
                    self.out
                        .warnings
                        .push(format!("form XObject cycle through {}", r));
                    return;
                }

                let payload = match self.doc.decoded_stream(r) {
                    Ok(p) => p,
                    Err(e) => {
                        self.out
                            .warnings
                            .push(format!("form XObject /{}: {}", name, e));
                        self.visited_forms.remove(&r);
                        return;
                    },
                };

                let form_resources = dict
                    .get("Resources")
                    .map(|res| self.doc.resolve(res))
                    .as_ref()
                    .and_then(|res| res.as_dict())
                    .cloned()
                    .unwrap_or_else(|| resources.clone());

                let form_ctm = dict
                    .get("Matrix")
                    .and_then(|m| m.as_array().map(|a| a.to_vec()))
                    .and_then(|a| matrix_args(&a))
                    .map(|m| m.then(&ctm))
                    .unwrap_or(ctm);

                self.run(&payload, &form_resources, form_ctm, depth + 1);
                self.visited_forms.remove(&r);
            },
            _ => {},
        }
    }
}

fn matrix_args(args: &[Object]) -> Option<Matrix> {
    if args.len() != 6 {
        return None;
    }
    let mut v = [0.0; 6];
    for (slot, obj) in v.iter_mut().zip(args) {
        *slot = obj.as_number()?;
    }
    Some(Matrix {
        a: v[0],
        b: v[1],
        c: v[2],
        d: v[3],
        e: v[4],
        f: v[5],
    })
}
