//! HTML to PDF rasterization

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use regex::Regex;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::PageLayout;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("PDF backend is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("PDF rendering failed: {reason}")]
    Render { reason: String },
}

/// Turns an HTML document and its stylesheets into a paginated document
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `rasterize` can succeed at all
    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(&self, html: &str, stylesheets: &[String], layout: PageLayout) -> Result<Vec<u8>, RasterError>;
}

/// Rasterizer used when PDF output is disabled
#[derive(Debug, Clone, Default)]
pub struct NullRasterizer;

impl Rasterizer for NullRasterizer {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn rasterize(&self, _html: &str, _stylesheets: &[String], _layout: PageLayout) -> Result<Vec<u8>, RasterError> {
        Err(RasterError::Unavailable {
            reason: "no PDF rasterizer configured".to_string(),
        })
    }
}

/// Minimal PDF writer that lays out the document's text flow
///
/// Markup is reduced to lines of text: headings are set in bold, block
/// elements start new lines and list items get a dash. Inline `data:` images
/// are embedded on their own line. From stylesheets only `font-size` and
/// `color` on `body` and `h1`..`h3` are honored.
#[derive(Debug, Clone)]
pub struct TextPdfRasterizer {
    pub margin: f64,
    pub font_size: f64,
    pub heading_size: f64,
}

impl Default for TextPdfRasterizer {
    fn default() -> Self {
        Self {
            margin: 50.0,
            font_size: 10.0,
            heading_size: 14.0,
        }
    }
}

/// A line of extracted document text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub heading: bool,
}

/// Flow content of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextLine),
    /// Image source as found in the `src` attribute
    Image(String),
}

/// Typography read from stylesheets
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStyle {
    pub font_size: f64,
    pub heading_size: f64,
    pub text_color: Option<(u8, u8, u8)>,
    pub heading_color: Option<(u8, u8, u8)>,
}

impl PdfStyle {
    /// Apply stylesheets in order; later rules win
    pub fn with_stylesheets(mut self, stylesheets: &[String]) -> Self {
        for sheet in stylesheets {
            for (selectors, declarations) in css_rules(sheet) {
                let body = selectors.iter().any(|s| s == "body" || s == "html");
                let heading = selectors.iter().any(|s| matches!(s.as_str(), "h1" | "h2" | "h3"));
                if !body && !heading {
                    continue;
                }
                for (property, value) in declarations {
                    match property.as_str() {
                        "font-size" => {
                            if let Some(size) = parse_font_size(&value) {
                                if body {
                                    self.font_size = size;
                                }
                                if heading {
                                    self.heading_size = size;
                                }
                            }
                        }
                        "color" => {
                            if let Some(color) = parse_hex_color(&value) {
                                if body {
                                    self.text_color = Some(color);
                                }
                                if heading {
                                    self.heading_color = Some(color);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        self
    }
}

type CssRule = (Vec<String>, Vec<(String, String)>);

fn css_rules(sheet: &str) -> Vec<CssRule> {
    static RULE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(rule) = RULE.get_or_init(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").ok()) else {
        return Vec::new();
    };

    let sheet = strip_css_comments(sheet);
    rule.captures_iter(&sheet)
        .map(|caps| {
            let selectors: Vec<String> = caps[1]
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            let declarations: Vec<(String, String)> = caps[2]
                .split(';')
                .filter_map(|d| d.split_once(':'))
                .map(|(p, v)| (p.trim().to_ascii_lowercase(), v.trim().to_string()))
                .collect();
            (selectors, declarations)
        })
        .collect()
}

fn strip_css_comments(sheet: &str) -> String {
    let mut out = String::with_capacity(sheet.len());
    let mut rest = sheet;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        rest = tail.find("*/").map_or("", |end| &tail[end + 2..]);
    }
    out.push_str(rest);
    out
}

/// Font size in points from `12pt` or `16px`
fn parse_font_size(value: &str) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let (number, scale) = if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 0.75)
    } else {
        return None;
    };
    number.trim().parse::<f64>().ok().filter(|n| *n > 0.0).map(|n| n * scale)
}

fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|c| c * 17);
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "section", "ul", "ol", "table", "hr",
];
const SKIPPED_TAGS: &[&str] = &["style", "script", "head", "title"];

fn image_source(tag: &str) -> Option<String> {
    static SRC: OnceLock<Option<Regex>> = OnceLock::new();
    let src = SRC
        .get_or_init(|| Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).ok())
        .as_ref()?;
    src.captures(tag).map(|caps| caps[1].to_string())
}

/// Reduce HTML to lines of plain text and images
pub fn html_to_blocks(html: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut heading = false;
    let mut chars = html.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '<' {
            current.push(c);
            continue;
        }

        let mut end = start;
        for (i, tc) in chars.by_ref() {
            end = i;
            if tc == '>' {
                break;
            }
        }
        let tag = &html[start + 1..end.max(start + 1)];
        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
            let needle = format!("</{}", name);
            let rest = &html[(end + 1).min(html.len())..];
            let skip_to = rest
                .to_ascii_lowercase()
                .find(&needle)
                .map_or(html.len(), |pos| end + 1 + pos);
            while chars.peek().is_some_and(|(i, _)| *i < skip_to) {
                chars.next();
            }
            continue;
        }

        if name == "img" {
            if let Some(src) = image_source(tag) {
                flush(&mut current, heading, &mut blocks);
                blocks.push(Block::Image(src));
            }
            continue;
        }

        if BLOCK_TAGS.contains(&name.as_str()) {
            flush(&mut current, heading, &mut blocks);
            if !closing && name == "li" {
                current.push_str("- ");
            }
        }
        if name.len() == 2 && name.starts_with('h') && name[1..].parse::<u8>().is_ok_and(|l| l <= 3) {
            flush(&mut current, heading, &mut blocks);
            heading = !closing;
        }
    }
    flush(&mut current, heading, &mut blocks);

    blocks
}

fn flush(current: &mut String, heading: bool, blocks: &mut Vec<Block>) {
    let text = decode_entities(&current.split_whitespace().collect::<Vec<_>>().join(" "));
    if !text.is_empty() {
        blocks.push(Block::Text(TextLine { text, heading }));
    }
    current.clear();
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if !line.is_empty() && line.chars().count() + 1 + word_len > max_chars {
            wrapped.push(std::mem::take(&mut line));
        }
        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                if !line.is_empty() {
                    wrapped.push(std::mem::take(&mut line));
                }
                line = chunk.iter().collect();
            }
            continue;
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        wrapped.push(line);
    }
    wrapped
}

/// Decoded RGB image ready to be written as an image XObject
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// zlib-compressed 8-bit RGB samples
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// Decode a base64 `data:` URI holding a raster image
    pub fn from_data_uri(src: &str) -> Option<Self> {
        let (header, payload) = src.strip_prefix("data:")?.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded.to_rgb8(),
            Err(e) => {
                debug!(mime = %header, error = %e, "Skipping image the PDF writer cannot decode");
                return None;
            }
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(decoded.as_raw()).ok()?;
        Some(Self {
            width: decoded.width(),
            height: decoded.height(),
            data: encoder.finish().ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Placement {
    Text { text: String, heading: bool, y: f64 },
    Image { index: usize, width: f64, height: f64, y: f64 },
}

impl TextPdfRasterizer {
    fn base_style(&self) -> PdfStyle {
        PdfStyle {
            font_size: self.font_size,
            heading_size: self.heading_size,
            text_color: None,
            heading_color: None,
        }
    }

    /// Lay out blocks into pages; images index into `images`
    fn paginate(
        &self,
        blocks: &[Block],
        images: &[Option<EmbeddedImage>],
        style: &PdfStyle,
        layout: PageLayout,
    ) -> Vec<Vec<Placement>> {
        let usable_width = (layout.width - 2.0 * self.margin).max(style.font_size);
        let bottom = self.margin;
        let top = layout.height - self.margin;
        let max_image_height = (top - bottom) * 0.6;

        let mut pages: Vec<Vec<Placement>> = vec![Vec::new()];
        let mut y = top;
        let mut image_index = 0;

        for block in blocks {
            match block {
                Block::Text(line) => {
                    let size = if line.heading { style.heading_size } else { style.font_size };
                    let leading = size * 1.4;
                    let max_chars = ((usable_width / (size * 0.5)) as usize).max(10);

                    for piece in wrap(&line.text, max_chars) {
                        if y - leading < bottom {
                            pages.push(Vec::new());
                            y = top;
                        }
                        y -= leading;
                        if let Some(page) = pages.last_mut() {
                            page.push(Placement::Text {
                                text: piece,
                                heading: line.heading,
                                y,
                            });
                        }
                    }
                }
                Block::Image(_) => {
                    let index = image_index;
                    image_index += 1;
                    let Some(Some(image)) = images.get(index) else {
                        continue;
                    };

                    // 96 dpi pixels, shrunk to fit the text column
                    let natural_width = image.width as f64 * 0.75;
                    let natural_height = image.height as f64 * 0.75;
                    let scale = (usable_width / natural_width)
                        .min(max_image_height / natural_height)
                        .min(1.0);
                    let (width, height) = (natural_width * scale, natural_height * scale);

                    if y - height - style.font_size < bottom {
                        pages.push(Vec::new());
                        y = top;
                    }
                    y -= height + style.font_size * 0.5;
                    if let Some(page) = pages.last_mut() {
                        page.push(Placement::Image { index, width, height, y });
                    }
                }
            }
        }

        pages
    }

    fn content_stream(&self, placements: &[Placement], style: &PdfStyle) -> String {
        let mut stream = String::new();
        for placement in placements {
            match placement {
                Placement::Text { text, heading, y } => {
                    let (font, size, color) = if *heading {
                        ("F2", style.heading_size, style.heading_color.or(style.text_color))
                    } else {
                        ("F1", style.font_size, style.text_color)
                    };
                    let (r, g, b) = color.unwrap_or((0, 0, 0));
                    let _ = writeln!(
                        stream,
                        "BT {:.3} {:.3} {:.3} rg /{} {} Tf 1 0 0 1 {:.2} {:.2} Tm ({}) Tj ET",
                        r as f64 / 255.0,
                        g as f64 / 255.0,
                        b as f64 / 255.0,
                        font,
                        size,
                        self.margin,
                        y,
                        escape_pdf_text(text)
                    );
                }
                Placement::Image { index, width, height, y } => {
                    let _ = writeln!(
                        stream,
                        "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im{} Do Q",
                        width,
                        height,
                        self.margin,
                        y,
                        index + 1
                    );
                }
            }
        }
        stream
    }
}

fn stream_object(dictionary: &str, data: &[u8]) -> Vec<u8> {
    let mut object = format!("<< {} /Length {} >>\nstream\n", dictionary, data.len()).into_bytes();
    object.extend_from_slice(data);
    object.extend_from_slice(b"\nendstream");
    object
}

impl Rasterizer for TextPdfRasterizer {
    fn name(&self) -> &str {
        "text-pdf"
    }

    fn rasterize(&self, html: &str, stylesheets: &[String], layout: PageLayout) -> Result<Vec<u8>, RasterError> {
        if layout.width <= 2.0 * self.margin || layout.height <= 2.0 * self.margin {
            return Err(RasterError::Render {
                reason: format!("page {}x{} is smaller than its margins", layout.width, layout.height),
            });
        }

        let style = self.base_style().with_stylesheets(stylesheets);
        let blocks = html_to_blocks(html);
        let images: Vec<Option<EmbeddedImage>> = blocks
            .iter()
            .filter_map(|block| match block {
                Block::Image(src) => Some(EmbeddedImage::from_data_uri(src)),
                Block::Text(_) => None,
            })
            .collect();
        let pages = self.paginate(&blocks, &images, &style, layout);

        // Objects: 1 catalog, 2 page tree, 3-4 fonts, one per image, then (page, content) pairs
        let first_image_id = 5;
        let first_page_id = first_image_id + images.len();
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| first_page_id + i * 2).collect();

        let x_objects: String = images
            .iter()
            .enumerate()
            .filter(|(_, image)| image.is_some())
            .map(|(i, _)| format!("/Im{} {} 0 R", i + 1, first_image_id + i))
            .collect::<Vec<_>>()
            .join(" ");
        let resources = if x_objects.is_empty() {
            "<< /Font << /F1 3 0 R /F2 4 0 R >> >>".to_string()
        } else {
            format!("<< /Font << /F1 3 0 R /F2 4 0 R >> /XObject << {} >> >>", x_objects)
        };

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                page_ids.iter().map(|id| format!("{} 0 R", id)).collect::<Vec<_>>().join(" "),
                pages.len()
            )
            .into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
        ];
        for image in &images {
            // Undecodable images keep their slot so numbering stays stable
            let object = match image {
                Some(image) => stream_object(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
                        image.width, image.height
                    ),
                    &image.data,
                ),
                None => b"null".to_vec(),
            };
            objects.push(object);
        }
        for (page, id) in pages.iter().zip(&page_ids) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] /Resources {} /Contents {} 0 R >>",
                    layout.width,
                    layout.height,
                    resources,
                    id + 1
                )
                .into_bytes(),
            );
            let stream = self.content_stream(page, &style);
            objects.push(stream_object("", stream.as_bytes()));
        }

        let mut pdf: Vec<u8> = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            pdf.extend_from_slice(object);
            pdf.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = pdf.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(trailer, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            trailer,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        pdf.extend_from_slice(trailer.as_bytes());

        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const A4: PageLayout = PageLayout {
        width: 595.0,
        height: 842.0,
    };

    fn create_test_png_uri(width: u32, height: u32) -> String {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(bytes.into_inner()))
    }

    fn text_of(html: &str) -> Vec<TextLine> {
        html_to_blocks(html)
            .into_iter()
            .filter_map(|b| match b {
                Block::Text(line) => Some(line),
                Block::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_html_to_blocks() {
        let html = r#"<html><head><title>T</title><style>body { color: red; }</style></head>
            <body><h1>Report &amp; Summary</h1><p>First   paragraph</p><ul><li>one</li><li>two</li></ul></body></html>"#;
        assert_eq!(
            text_of(html),
            vec![
                TextLine { text: "Report & Summary".to_string(), heading: true },
                TextLine { text: "First paragraph".to_string(), heading: false },
                TextLine { text: "- one".to_string(), heading: false },
                TextLine { text: "- two".to_string(), heading: false },
            ]
        );
    }

    #[test]
    fn test_images_become_blocks() {
        let blocks = html_to_blocks(r#"<p>Before<img src="data:image/png;base64,AAAA" alt="plot">After</p>"#);
        assert_eq!(
            blocks,
            vec![
                Block::Text(TextLine { text: "Before".to_string(), heading: false }),
                Block::Image("data:image/png;base64,AAAA".to_string()),
                Block::Text(TextLine { text: "After".to_string(), heading: false }),
            ]
        );
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("", 5).is_empty());
    }

    #[test]
    fn test_escape_pdf_text() {
        assert_eq!(escape_pdf_text(r"a(b)\c é"), r"a\(b\)\\c ?");
    }

    #[test]
    fn test_style_from_stylesheets() {
        let style = TextPdfRasterizer::default().base_style().with_stylesheets(&[
            "/* defaults */ body { font-size: 16px; color: #333333 } .card { color: #fff }".to_string(),
            "h1, h2 { color: #c00; font-size: 18pt }".to_string(),
        ]);
        assert_eq!(style.font_size, 12.0);
        assert_eq!(style.heading_size, 18.0);
        assert_eq!(style.text_color, Some((0x33, 0x33, 0x33)));
        assert_eq!(style.heading_color, Some((0xcc, 0, 0)));
    }

    #[test]
    fn test_parse_css_values() {
        assert_eq!(parse_font_size("11pt"), Some(11.0));
        assert_eq!(parse_font_size("2em"), None);
        assert_eq!(parse_hex_color("#1a2B3c"), Some((0x1a, 0x2b, 0x3c)));
        assert_eq!(parse_hex_color("red"), None);
    }

    #[test]
    fn test_rasterize_produces_pdf() {
        let bytes = TextPdfRasterizer::default()
            .rasterize("<h1>Title</h1><p>Body</p>", &[], A4)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(Title) Tj"));
        assert!(text.contains("/Count 1"));
        assert!(!text.contains("/XObject"));
    }

    #[test]
    fn test_stylesheets_change_output() {
        let sheets = vec!["body { font-size: 12pt; color: #336699 }".to_string()];
        let bytes = TextPdfRasterizer::default().rasterize("<p>Body</p>", &sheets, A4).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("0.200 0.400 0.600 rg /F1 12 Tf"));
    }

    #[test]
    fn test_png_is_embedded_as_image() {
        let html = format!(r#"<h2>Clustering</h2><img src="{}"><p>Caption</p>"#, create_test_png_uri(40, 20));
        let bytes = TextPdfRasterizer::default().rasterize(&html, &[], A4).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Image /Width 40 /Height 20"));
        assert!(text.contains("/XObject << /Im1 5 0 R >>"));
        assert!(text.contains("/Im1 Do"));
        assert!(text.contains("(Caption) Tj"));
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let html = r#"<img src="data:image/svg+xml;base64,PHN2Zy8+"><p>Text</p>"#;
        let bytes = TextPdfRasterizer::default().rasterize(html, &[], A4).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("Do Q"));
        assert!(text.contains("(Text) Tj"));
    }

    #[test]
    fn test_long_documents_paginate() {
        let html: String = (0..200).map(|i| format!("<p>Line {}</p>", i)).collect();
        let text = String::from_utf8(TextPdfRasterizer::default().rasterize(&html, &[], A4).unwrap()).unwrap();
        assert!(!text.contains("/Count 1 "));
        assert!(text.contains("(Line 199) Tj"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let html = format!(r#"<p>x</p><img src="{}">"#, create_test_png_uri(8, 8));
        let bytes = TextPdfRasterizer::default().rasterize(&html, &[], A4).unwrap();
        let xref = bytes.windows(6).rposition(|w| w == b"\nxref\n").unwrap() + 1;
        let table = String::from_utf8_lossy(&bytes[xref..]).to_string();
        for (n, entry) in table.lines().skip(3).take(6).enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(format!("{} 0 obj", n + 1).as_bytes()));
        }
    }

    #[test]
    fn test_null_rasterizer() {
        assert!(!NullRasterizer.is_available());
        assert!(matches!(
            NullRasterizer.rasterize("", &[], A4),
            Err(RasterError::Unavailable { .. })
        ));
    }
}
