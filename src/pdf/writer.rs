//! Assembling output pages from placed source pages and images
//!
//! All placement happens in page space (origin top left, y down, points).
//! [`PdfWriter`] is the only place that converts to PDF user space.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::geometry::{AffineTransform, PageSize, Rectangle};
use crate::pdf::source::{PageHandle, PdfDocument};
use crate::raster::buffer::PixelBuffer;
use crate::raster::chop::ContentHash;

/// Receives drawing instructions for a sequence of output pages
pub trait PageWriter {
    /// Start a new output page of `width` x `height` points
    fn set_page_size(&mut self, width: f64, height: f64) -> Result<()>;

    /// Draw a whole source page; `transform` maps source page space to output page space
    fn draw_page(&mut self, page: PageHandle, transform: &AffineTransform) -> Result<()>;

    /// Draw `pixels` stretched over `rect` of the output page
    ///
    /// Images with the same `hash` are interchangeable, so a writer may store
    /// the pixels only once.
    fn draw_image(&mut self, pixels: &PixelBuffer, rect: &Rectangle, hash: &ContentHash) -> Result<()>;

    fn end_page(&mut self) -> Result<()>;

    /// Write out the finished document
    fn finish(&mut self) -> Result<()>;
}

/// Format a matrix for a content stream `cm` operator
fn cm_operands(m: &AffineTransform) -> String {
    m.to_array()
        .iter()
        .map(|v| {
            let v = if v.abs() < 1e-9 { 0.0 } else { *v };
            let s = format!("{:.6}", v);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            s.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

struct OpenPage {
    size: PageSize,
    content: String,
    xobjects: Dictionary,
}

/// Page writer that produces a PDF with lopdf
///
/// Output pages reference their source pages as Form XObjects, so vector
/// content survives cropping, fitting and rotation unchanged.
pub struct PdfWriter<'a> {
    source: &'a PdfDocument,
    output_path: PathBuf,
    doc: Document,
    forms: HashMap<ObjectId, ObjectId>,
    images: HashMap<ContentHash, ObjectId>,
    pages: Vec<ObjectId>,
    current: Option<OpenPage>,
}

impl<'a> PdfWriter<'a> {
    /// Writer for pages drawn from `source`, saved to `output_path` on [`PageWriter::finish`]
    pub fn new(source: &'a PdfDocument, output_path: &Path) -> Self {
        Self {
            source,
            output_path: output_path.to_path_buf(),
            doc: source.document().clone(),
            forms: HashMap::new(),
            images: HashMap::new(),
            pages: Vec::new(),
            current: None,
        }
    }

    /// Number of distinct images embedded so far
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn current_page(&mut self) -> Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| Error::RenderBackend("drawing without an open page".to_string()))
    }

    /// Wrap a source page as a Form XObject, once per source page
    fn page_form(&mut self, page: PageHandle) -> Result<ObjectId> {
        if let Some(id) = self.forms.get(&page.id) {
            return Ok(*id);
        }

        let page_box = self.source.page_box(page)?;
        let content = self.source.page_content(page)?;
        let resources = self.source.page_resources(page)?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Form".to_vec()));
        dict.set("FormType", Object::Integer(1));
        dict.set("BBox", page_box.to_object());
        dict.set(
            "Matrix",
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        dict.set("Resources", Object::Dictionary(resources));

        let id = self.doc.add_object(Stream::new(dict, content));
        self.forms.insert(page.id, id);
        Ok(id)
    }

    /// Embed pixels as an Image XObject with an SMask for transparency
    fn image_xobject(&mut self, pixels: &PixelBuffer, hash: &ContentHash) -> Result<ObjectId> {
        if let Some(id) = self.images.get(hash) {
            debug!("Reusing image {}", hash);
            return Ok(*id);
        }

        let (rgb, alpha) = pixels.to_rgb_and_alpha();

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(pixels.width() as i64));
        dict.set("Height", Object::Integer(pixels.height() as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));

        if !pixels.is_fully_opaque() {
            let mut mask = Dictionary::new();
            mask.set("Type", Object::Name(b"XObject".to_vec()));
            mask.set("Subtype", Object::Name(b"Image".to_vec()));
            mask.set("Width", Object::Integer(pixels.width() as i64));
            mask.set("Height", Object::Integer(pixels.height() as i64));
            mask.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            mask.set("BitsPerComponent", Object::Integer(8));
            let mask_id = self.doc.add_object(Stream::new(mask, alpha));
            dict.set("SMask", Object::Reference(mask_id));
        }

        let id = self.doc.add_object(Stream::new(dict, rgb));
        self.images.insert(*hash, id);
        Ok(id)
    }

    /// Page space of an output page to PDF user space
    fn output_flip(size: PageSize) -> AffineTransform {
        AffineTransform::new(1.0, 0.0, 0.0, -1.0, 0.0, size.height)
    }

    /// Replace the document's page tree with the written pages
    fn install_page_tree(&mut self) -> Result<()> {
        let pages_id = self.doc.new_object_id();

        for &page_id in &self.pages {
            if let Object::Dictionary(page) = self.doc.get_object_mut(page_id)? {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.pages.len() as i64));
        pages.set(
            "Kids",
            Object::Array(self.pages.iter().map(|&id| Object::Reference(id)).collect()),
        );
        self.doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| Error::General("No Root in trailer".to_string()))?;

        match self.doc.get_object_mut(catalog_id)? {
            Object::Dictionary(catalog) => {
                catalog.set("Pages", Object::Reference(pages_id));
                // outlines and named destinations point at the replaced pages
                catalog.remove(b"Outlines");
                catalog.remove(b"Dests");
                Ok(())
            }
            _ => Err(Error::General("Catalog is not a dictionary".to_string())),
        }
    }
}

impl PageWriter for PdfWriter<'_> {
    fn set_page_size(&mut self, width: f64, height: f64) -> Result<()> {
        if self.current.is_some() {
            self.end_page()?;
        }
        Rectangle::from_size(width, height).ensure_non_degenerate()?;

        self.current = Some(OpenPage {
            size: PageSize::new(width, height),
            content: String::new(),
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    fn draw_page(&mut self, page: PageHandle, transform: &AffineTransform) -> Result<()> {
        let to_page_space = self.source.page_space(page)?;
        let form_id = self.page_form(page)?;
        let name = format!("Pg{}", form_id.0);

        let current = self.current_page()?;

        // source user space -> source page space -> output page space -> output user space
        let matrix = to_page_space.then(transform).then(&Self::output_flip(current.size));

        current
            .content
            .push_str(&format!("q\n{} cm\n/{} Do\nQ\n", cm_operands(&matrix), name));
        current.xobjects.set(name, Object::Reference(form_id));
        Ok(())
    }

    fn draw_image(&mut self, pixels: &PixelBuffer, rect: &Rectangle, hash: &ContentHash) -> Result<()> {
        pixels.ensure_analyzable()?;
        let image_id = self.image_xobject(pixels, hash)?;
        let name = format!("Im{}", image_id.0);

        let current = self.current_page()?;

        // the image occupies the unit square of its own space, y up
        let matrix = AffineTransform::new(
            rect.width,
            0.0,
            0.0,
            rect.height,
            rect.x,
            current.size.height - rect.y - rect.height,
        );

        current
            .content
            .push_str(&format!("q\n{} cm\n/{} Do\nQ\n", cm_operands(&matrix), name));
        current.xobjects.set(name, Object::Reference(image_id));
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        let page = self
            .current
            .take()
            .ok_or_else(|| Error::RenderBackend("end_page without an open page".to_string()))?;

        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), page.content.into_bytes()));

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(page.xobjects));

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Page".to_vec()));
        dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.size.width as f32),
                Object::Real(page.size.height as f32),
            ]),
        );
        dict.set("Resources", Object::Dictionary(resources));
        dict.set("Contents", Object::Reference(content_id));

        self.pages.push(self.doc.add_object(dict));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.current.is_some() {
            self.end_page()?;
        }

        self.install_page_tree()?;

        let pruned = self.doc.prune_objects();
        debug!(
            "Writing {} pages to {} ({} unused objects dropped, {} images)",
            self.pages.len(),
            self.output_path.display(),
            pruned.len(),
            self.images.len()
        );

        self.doc.compress();
        self.doc.save(&self.output_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cm_operands() {
        let m = AffineTransform::new(1.0, 0.0, 0.0, -1.0, 12.5, 842.0);
        assert_eq!(cm_operands(&m), "1 0 0 -1 12.5 842");

        let tiny = AffineTransform::new(6.123e-17, -1.0, 1.0, 6.123e-17, 0.0, 0.333333333);
        assert_eq!(cm_operands(&tiny), "0 -1 1 0 0 0.333333");
    }
}
