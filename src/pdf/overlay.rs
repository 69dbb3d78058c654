//! Watermark overlay template
//!
//! The overlay is a single in-memory PDF page holding the rotated,
//! semi-transparent watermark text. It is built once and its content is
//! stamped onto every page of a target document.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::config::WatermarkStyle;
use crate::error::{Error, Result};
use crate::layout::format_number;

/// Resource name of the watermark font inside target pages
pub const FONT_RESOURCE: &str = "WmF1";

/// Resource name of the opacity graphics state inside target pages
pub const GSTATE_RESOURCE: &str = "WmGS1";

/// A one-page PDF holding the rendered watermark
#[derive(Debug, Clone)]
pub struct WatermarkOverlay {
    text: String,
    document: Document,
    page_id: ObjectId,
    /// Everything that affects rendering: content stream, font and opacity
    signature: Vec<u8>,
}

impl WatermarkOverlay {
    /// Render `text` onto a new page using `style`
    pub fn build(text: &str, style: &WatermarkStyle) -> Result<Self> {
        if !(0.0..=1.0).contains(&style.opacity) {
            return Err(Error::General(format!("Opacity out of range: {}", style.opacity)));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = use_standard_font(&mut doc, &style.font);
        let gstate_id = add_opacity_state(&mut doc, style.opacity);

        let mut fonts = Dictionary::new();
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        let mut gstates = Dictionary::new();
        gstates.set(GSTATE_RESOURCE, Object::Reference(gstate_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(gstates));

        let content = watermark_content(text, style);
        let mut signature = content.clone();
        signature.extend_from_slice(format!("{} {}", style.font, style.opacity).as_bytes());
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(style.page.media_box().iter().map(|v| Object::Integer(*v)).collect()),
        );
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(Self {
            text: text.to_string(),
            document: doc,
            page_id,
            signature,
        })
    }

    /// The watermark text as given
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The template document (one page)
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the template page inside [`Self::document`]
    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Two overlays with equal signatures render identically
    pub(crate) fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Raw content stream of the template page
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(self.document.get_page_content(self.page_id)?)
    }
}

/// Reference one of the standard 14 fonts (no embedding needed)
fn use_standard_font(doc: &mut Document, name: &str) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(name.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

fn add_opacity_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(opacity));
    gstate.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(gstate))
}

/// Content stream operators for the watermark
///
/// Everything sits inside q/Q so nothing leaks into later content.
fn watermark_content(text: &str, style: &WatermarkStyle) -> Vec<u8> {
    let (r, g, b) = style.color;
    let mut content = Vec::new();
    content.extend_from_slice(b"q\n");
    content.extend_from_slice(format!("/{} gs\n", GSTATE_RESOURCE).as_bytes());
    content.extend_from_slice(
        format!("{} {} {} rg\n", format_number(r), format_number(g), format_number(b)).as_bytes(),
    );
    content.extend_from_slice(format!("{} cm\n", style.transform().to_operands()).as_bytes());
    content.extend_from_slice(b"BT\n");
    content.extend_from_slice(format!("/{} {} Tf\n", FONT_RESOURCE, format_number(style.font_size)).as_bytes());
    content.extend_from_slice(b"0 0 Td\n(");
    content.extend_from_slice(&escape_pdf_bytes(&encode_win_ansi(text)));
    content.extend_from_slice(b") Tj\nET\nQ\n");
    content
}

/// Single-byte encoding for the standard fonts; chars outside Latin-1 become '?'
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Escape special characters in PDF literal strings
fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' | b'(' | b')' => {
                escaped.push(b'\\');
                escaped.push(b);
            }
            b'\r' => escaped.extend_from_slice(b"\\r"),
            b'\n' => escaped.extend_from_slice(b"\\n"),
            _ => escaped.push(b),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_string(overlay: &WatermarkOverlay) -> String {
        String::from_utf8_lossy(&overlay.content().unwrap()).into_owned()
    }

    #[test]
    fn test_overlay_is_single_letter_page() {
        let overlay = WatermarkOverlay::build("LIBRARY COPY", &WatermarkStyle::default()).unwrap();
        let pages = overlay.document().get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages.get(&1), Some(&overlay.page_id()));

        let page = overlay.document().get_dictionary(overlay.page_id()).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 612);
        assert_eq!(media_box[3].as_i64().unwrap(), 792);
    }

    #[test]
    fn test_signature_tracks_style() {
        let default = WatermarkOverlay::build("COPY", &WatermarkStyle::default()).unwrap();
        let again = WatermarkOverlay::build("COPY", &WatermarkStyle::default()).unwrap();
        let faint = WatermarkStyle { opacity: 0.2, ..WatermarkStyle::default() };
        let faint = WatermarkOverlay::build("COPY", &faint).unwrap();
        let courier = WatermarkStyle { font: "Courier".to_string(), ..WatermarkStyle::default() };
        let courier = WatermarkOverlay::build("COPY", &courier).unwrap();

        assert_eq!(default.signature(), again.signature());
        assert_ne!(default.signature(), faint.signature());
        assert_ne!(default.signature(), courier.signature());
    }

    #[test]
    fn test_overlay_content_operators() {
        let overlay = WatermarkOverlay::build("LIBRARY COPY", &WatermarkStyle::default()).unwrap();
        let content = content_string(&overlay);

        assert!(content.starts_with("q\n"));
        assert!(content.ends_with("Q\n"));
        assert!(content.contains("/WmGS1 gs"));
        assert!(content.contains("0.5 0.5 0.5 rg"));
        assert!(content.contains("0.7071 0.7071 -0.7071 0.7071 100 200 cm"));
        assert!(content.contains("/WmF1 80 Tf"));
        assert!(content.contains("(LIBRARY COPY) Tj"));
    }

    #[test]
    fn test_overlay_resources() {
        let overlay = WatermarkOverlay::build("X", &WatermarkStyle::default()).unwrap();
        let doc = overlay.document();
        let page = doc.get_dictionary(overlay.page_id()).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();

        let font_ref = resources
            .get(b"Font").unwrap().as_dict().unwrap()
            .get(FONT_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let font = doc.get_dictionary(font_ref).unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");

        let gs_ref = resources
            .get(b"ExtGState").unwrap().as_dict().unwrap()
            .get(GSTATE_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let gs = doc.get_dictionary(gs_ref).unwrap();
        assert_eq!(gs.get(b"ca").unwrap().as_float().unwrap(), 0.5);
    }

    #[test]
    fn test_overlay_is_deterministic() {
        let style = WatermarkStyle::default();
        let a = WatermarkOverlay::build("LIBRARY COPY", &style).unwrap();
        let b = WatermarkOverlay::build("LIBRARY COPY", &style).unwrap();
        assert_eq!(a.content().unwrap(), b.content().unwrap());
    }

    #[test]
    fn test_overlay_rejects_bad_opacity() {
        let style = WatermarkStyle { opacity: 1.5, ..Default::default() };
        assert!(WatermarkOverlay::build("X", &style).is_err());
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape_pdf_bytes(b"a(b)c\\d"), b"a\\(b\\)c\\\\d".to_vec());
        assert_eq!(escape_pdf_bytes(b"line\nbreak"), b"line\\nbreak".to_vec());
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("COPY"), b"COPY".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
