//! Read access to the pages of an input PDF

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::geometry::{AffineTransform, PageSize};

/// Parent chains longer than this are treated as cyclic
const MAX_TREE_DEPTH: usize = 64;

/// A page of a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle {
    /// Zero-based page index
    pub index: usize,
    /// Object id of the page dictionary
    pub id: ObjectId,
}

impl PageHandle {
    /// One-based page number, as used by external renderers
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Something that can enumerate pages and report their sizes
pub trait DocumentSource {
    fn page_count(&self) -> usize;

    fn page(&self, index: usize) -> Result<PageHandle>;

    /// Size of the visible page area in points, as displayed
    fn page_size(&self, page: PageHandle) -> Result<PageSize>;

    /// All pages in order
    fn pages(&self) -> Result<Vec<PageHandle>> {
        (0..self.page_count()).map(|i| self.page(i)).collect()
    }
}

/// A page box in PDF user space (origin bottom left, y up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.width(), self.height())
    }

    /// Map PDF user space to page space (origin top left, y down) of the
    /// page as displayed after a clockwise `/Rotate` of `rotation` degrees
    pub fn page_space(&self, rotation: u16) -> AffineTransform {
        match rotation {
            90 => AffineTransform::new(0.0, 1.0, 1.0, 0.0, -self.lly, -self.llx),
            180 => AffineTransform::new(-1.0, 0.0, 0.0, 1.0, self.urx, -self.lly),
            270 => AffineTransform::new(0.0, -1.0, -1.0, 0.0, self.ury, self.urx),
            _ => AffineTransform::new(1.0, 0.0, 0.0, -1.0, -self.llx, self.ury),
        }
    }

    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx as f32),
            Object::Real(self.lly as f32),
            Object::Real(self.urx as f32),
            Object::Real(self.ury as f32),
        ])
    }

    /// Parse a rectangle array, normalizing swapped corners
    fn from_object(doc: &Document, object: &Object) -> Result<Self> {
        let values = match resolve(doc, object)? {
            Object::Array(values) if values.len() == 4 => values,
            _ => return Err(Error::General("Page box is not an array of four numbers".to_string())),
        };

        let mut numbers = [0.0; 4];
        for (slot, value) in numbers.iter_mut().zip(values) {
            *slot = number(resolve(doc, value)?)
                .ok_or_else(|| Error::General("Page box contains a non-numeric value".to_string()))?;
        }
        let [x0, y0, x1, y1] = numbers;

        Ok(PageBox {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        })
    }
}

/// Follow a reference to the object it points at
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// A PDF loaded with lopdf
#[derive(Debug)]
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Load a PDF from disk
    ///
    /// Fails with [`Error::FileNotFound`] for a missing file and
    /// [`Error::EmptyPdf`] for a document without pages.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)?;
        Self::from_document(doc, path)
    }

    /// Wrap an already parsed document; `path` is used by external renderers
    pub fn from_document(doc: Document, path: &Path) -> Result<Self> {
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(Error::EmptyPdf(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_ids,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn page_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        Ok(self.doc.get_dictionary(id)?)
    }

    /// Look up a page attribute, walking up the page tree for inheritable keys
    pub fn inherited_attribute(&self, page: PageHandle, key: &[u8]) -> Result<Option<&Object>> {
        let mut dict = self.page_dictionary(page.id)?;

        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Ok(Some(resolve(&self.doc, value)?));
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => dict = self.doc.get_dictionary(*parent)?,
                _ => return Ok(None),
            }
        }

        Err(Error::General(format!("Page tree above page {} is too deep", page.number())))
    }

    /// The visible area of a page: the CropBox, or the MediaBox without one
    pub fn page_box(&self, page: PageHandle) -> Result<PageBox> {
        let media_box = match self.inherited_attribute(page, b"MediaBox")? {
            Some(object) => PageBox::from_object(&self.doc, object)?,
            None => {
                return Err(Error::General(format!("Page {} has no MediaBox", page.number())));
            }
        };

        match self.inherited_attribute(page, b"CropBox")? {
            Some(object) => PageBox::from_object(&self.doc, object),
            None => Ok(media_box),
        }
    }

    /// Copy every object of `other` into this document
    ///
    /// Returns handles to the pages of `other`. They do not join this
    /// document's page list but can be drawn by a writer for this document.
    pub fn import_pages(&mut self, other: PdfDocument) -> Vec<PageHandle> {
        let mut doc = other.doc;
        doc.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        self.doc.max_id = self.doc.max_id.max(doc.max_id);
        self.doc.objects.extend(doc.objects);

        page_ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| PageHandle { index, id })
            .collect()
    }

    /// The page's `/Rotate`, normalized to 0, 90, 180 or 270
    pub fn page_rotation(&self, page: PageHandle) -> Result<u16> {
        let degrees = match self.inherited_attribute(page, b"Rotate")? {
            Some(Object::Integer(degrees)) => *degrees,
            Some(Object::Real(degrees)) if degrees.fract() == 0.0 => *degrees as i64,
            None => 0,
            Some(_) => {
                return Err(Error::General(format!("Page {} has a non-integer /Rotate", page.number())));
            }
        };

        if degrees % 90 != 0 {
            return Err(Error::General(format!(
                "Page {} has /Rotate {}, which is not a multiple of 90",
                page.number(),
                degrees
            )));
        }
        Ok(degrees.rem_euclid(360) as u16)
    }

    /// User space to page space of the page as displayed
    pub fn page_space(&self, page: PageHandle) -> Result<AffineTransform> {
        Ok(self.page_box(page)?.page_space(self.page_rotation(page)?))
    }

    /// The resources a page's content stream draws with
    pub fn page_resources(&self, page: PageHandle) -> Result<Dictionary> {
        match self.inherited_attribute(page, b"Resources")? {
            Some(Object::Dictionary(resources)) => Ok(resources.clone()),
            _ => Ok(Dictionary::new()),
        }
    }

    /// The concatenated, decoded content streams of a page
    pub fn page_content(&self, page: PageHandle) -> Result<Vec<u8>> {
        Ok(self.doc.get_page_content(page.id)?)
    }
}

impl DocumentSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page(&self, index: usize) -> Result<PageHandle> {
        let id = self.page_ids.get(index).copied().ok_or_else(|| {
            Error::General(format!(
                "Page index {} out of range for {} pages",
                index,
                self.page_ids.len()
            ))
        })?;

        Ok(PageHandle { index, id })
    }

    fn page_size(&self, page: PageHandle) -> Result<PageSize> {
        let size = self.page_box(page)?.size();
        match self.page_rotation(page)? {
            90 | 270 => Ok(size.swapped()),
            _ => Ok(size),
        }
    }
}
