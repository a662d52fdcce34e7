//! Integration tests for the PDF page tools library

use lopdf::{Dictionary, Document, Object, Stream};
use pdf_pagetools::geometry::{AffineTransform, PageSize, Rectangle};
use pdf_pagetools::layout::parse_paper_size;
use pdf_pagetools::pdf::{
    crop_pages, extract_metadata, nup_pages, nup_pdf, overlay_pages, overlay_pdf, pagefit_pdf, rasterize_pages,
    rotate_pdf, CropOptions, DocumentSource, NupOptions, OverlayOptions, PageHandle, PageWriter,
    PagefitOptions, PdfDocument, PdfWriter, RasterizeOptions, Rasterizer, RotateOptions,
};
use pdf_pagetools::raster::{Argb, Color, ContentHash, PixelBuffer, PixelRect};
use pdf_pagetools::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a PDF with one page per entry of `sizes`, each showing a filled square
fn write_test_pdf(path: &Path, sizes: &[(f64, f64)], title: Option<&str>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &(width, height) in sizes {
        let content = b"0 0 1 rg 10 10 50 50 re f".to_vec();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ]),
        );
        page.set("Resources", Object::Dictionary(Dictionary::new()));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    if let Some(title) = title {
        let mut info = Dictionary::new();
        info.set("Title", Object::string_literal(title));
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));
    }

    doc.save(path).expect("Failed to write test PDF");
}

/// Set `/Rotate` on every page of the PDF at `path`
fn set_page_rotation(path: &Path, degrees: i64) {
    let mut doc = Document::load(path).expect("Failed to load test PDF");
    let ids: Vec<_> = doc.get_pages().into_values().collect();
    for id in ids {
        doc.get_dictionary_mut(id).unwrap().set("Rotate", Object::Integer(degrees));
    }
    doc.save(path).expect("Failed to write test PDF");
}

/// Decoded content of every output page, in order
fn page_contents(path: &Path) -> Vec<String> {
    let doc = Document::load(path).expect("Failed to load output");
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8(doc.get_page_content(id).unwrap()).unwrap())
        .collect()
}

fn has_name(dict: &Dictionary, key: &[u8], value: &[u8]) -> bool {
    matches!(dict.get(key), Ok(Object::Name(name)) if name == value)
}

fn page_sizes(path: &Path) -> Vec<PageSize> {
    extract_metadata(path).expect("Failed to read output").page_sizes
}

fn assert_size(actual: PageSize, width: f64, height: f64) {
    assert!(
        (actual.width - width).abs() < 0.01 && (actual.height - height).abs() < 0.01,
        "expected {}x{}, got {:?}",
        width,
        height,
        actual
    );
}

/// Renders white pages with black boxes, given in points, at any resolution
struct BoxRasterizer {
    sizes: Vec<PageSize>,
    boxes: Vec<Vec<Rectangle>>,
}

impl Rasterizer for BoxRasterizer {
    fn render(&self, page: PageHandle, dpi: f64, background: Color) -> Result<PixelBuffer> {
        let scale = dpi / 72.0;
        let size = self.sizes[page.index];
        let width = (size.width * scale).round() as usize;
        let height = (size.height * scale).round() as usize;

        let mut image = PixelBuffer::filled(width, height, background.to_argb());
        for b in &self.boxes[page.index] {
            let rect = PixelRect::new(
                (b.x * scale) as usize,
                (b.y * scale) as usize,
                (b.width * scale) as usize,
                (b.height * scale) as usize,
            );
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    image.set(x, y, Argb(0xff00_0000));
                }
            }
        }
        Ok(image)
    }
}

/// A rasterizer whose backend is unavailable
struct BrokenRasterizer;

impl Rasterizer for BrokenRasterizer {
    fn render(&self, _page: PageHandle, _dpi: f64, _background: Color) -> Result<PixelBuffer> {
        Err(Error::RenderBackend("no renderer".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Drawn {
    Page { size: PageSize },
    Source { index: usize, transform: AffineTransform },
    Image { rect: Rectangle, hash: ContentHash },
    End,
}

/// Page writer that records what it is asked to draw
#[derive(Default)]
struct RecordingWriter {
    log: Vec<Drawn>,
    finished: bool,
}

impl PageWriter for RecordingWriter {
    fn set_page_size(&mut self, width: f64, height: f64) -> Result<()> {
        self.log.push(Drawn::Page {
            size: PageSize::new(width, height),
        });
        Ok(())
    }

    fn draw_page(&mut self, page: PageHandle, transform: &AffineTransform) -> Result<()> {
        self.log.push(Drawn::Source {
            index: page.index,
            transform: *transform,
        });
        Ok(())
    }

    fn draw_image(&mut self, _pixels: &PixelBuffer, rect: &Rectangle, hash: &ContentHash) -> Result<()> {
        self.log.push(Drawn::Image { rect: *rect, hash: *hash });
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        self.log.push(Drawn::End);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

impl RecordingWriter {
    fn images(&self) -> Vec<(Rectangle, ContentHash)> {
        self.log
            .iter()
            .filter_map(|d| match d {
                Drawn::Image { rect, hash } => Some((*rect, *hash)),
                _ => None,
            })
            .collect()
    }
}

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn fixture(sizes: &[(f64, f64)]) -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let input = dir.path().join("input.pdf");
    let output = dir.path().join("output.pdf");
    write_test_pdf(&input, sizes, Some("Test Handout"));
    Fixture { _dir: dir, input, output }
}

#[test]
fn test_info_reports_pages_and_title() {
    let f = fixture(&[(612.0, 792.0), (842.0, 595.0)]);

    let metadata = extract_metadata(&f.input).expect("Failed to read metadata");
    assert_eq!(metadata.page_count, 2);
    assert_eq!(metadata.title.as_deref(), Some("Test Handout"));
    assert_eq!(metadata.author, None);
    assert_size(metadata.page_sizes[0], 612.0, 792.0);
    assert_size(metadata.page_sizes[1], 842.0, 595.0);
}

#[test]
fn test_pagefit_onto_a5() {
    let f = fixture(&[(612.0, 792.0), (792.0, 612.0)]);

    let options = PagefitOptions {
        paper: parse_paper_size("A5").unwrap(),
        ..Default::default()
    };
    pagefit_pdf(&f.input, &f.output, &options).expect("Failed to fit pages");

    let sizes = page_sizes(&f.output);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], 420.0, 595.0);
    // auto orientation turns the paper for landscape pages
    assert_size(sizes[1], 595.0, 420.0);
}

#[test]
fn test_pagefit_output_references_source_page() {
    let f = fixture(&[(612.0, 792.0)]);
    pagefit_pdf(&f.input, &f.output, &PagefitOptions::default()).expect("Failed to fit pages");

    let doc = Document::load(&f.output).expect("Failed to load output");
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let content = String::from_utf8(doc.get_page_content(page_id).unwrap()).unwrap();
    assert!(content.contains(" cm"), "{}", content);
    assert!(content.contains(" Do"), "{}", content);

    // the form carries the original drawing
    let forms: Vec<&Stream> = doc
        .objects
        .values()
        .filter_map(|o| match o {
            Object::Stream(s) if has_name(&s.dict, b"Subtype", b"Form") => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(forms.len(), 1);
}

#[test]
fn test_rotate_quarter_turn_swaps_page_size() {
    let f = fixture(&[(100.0, 200.0), (300.0, 300.0)]);

    rotate_pdf(&f.input, &f.output, &RotateOptions { angle: 90.0 }).expect("Failed to rotate");

    let sizes = page_sizes(&f.output);
    assert_size(sizes[0], 200.0, 100.0);
    assert_size(sizes[1], 300.0, 300.0);
}

#[test]
fn test_rotate_arbitrary_angle_grows_page() {
    let f = fixture(&[(100.0, 100.0)]);

    rotate_pdf(&f.input, &f.output, &RotateOptions { angle: -45.0 }).expect("Failed to rotate");

    let diagonal = 100.0 * std::f64::consts::SQRT_2;
    assert_size(page_sizes(&f.output)[0], diagonal, diagonal);
}

#[test]
fn test_crop_uniform_uses_smallest_margins() {
    let f = fixture(&[(200.0, 100.0), (200.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let rasterizer = BoxRasterizer {
        sizes: vec![PageSize::new(200.0, 100.0); 2],
        boxes: vec![
            vec![Rectangle::new(20.0, 10.0, 40.0, 20.0)],
            vec![Rectangle::new(50.0, 5.0, 130.0, 85.0)],
        ],
    };

    let mut writer = PdfWriter::new(&source, &f.output);
    crop_pages(&source, &rasterizer, &mut writer, &CropOptions::default()).expect("Failed to crop");
    writer.finish().expect("Failed to write");

    // top 5, right 20, bottom 10, left 20 on both pages
    let sizes = page_sizes(&f.output);
    assert_size(sizes[0], 160.0, 85.0);
    assert_size(sizes[1], 160.0, 85.0);
}

#[test]
fn test_crop_per_page() {
    let f = fixture(&[(200.0, 100.0), (200.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let rasterizer = BoxRasterizer {
        sizes: vec![PageSize::new(200.0, 100.0); 2],
        boxes: vec![
            vec![Rectangle::new(20.0, 10.0, 40.0, 20.0)],
            vec![Rectangle::new(50.0, 5.0, 130.0, 85.0)],
        ],
    };
    let options = CropOptions {
        per_page: true,
        dpi: 144.0,
        ..Default::default()
    };

    let mut writer = RecordingWriter::default();
    crop_pages(&source, &rasterizer, &mut writer, &options).expect("Failed to crop");

    assert_eq!(writer.log.len(), 6);
    assert_eq!(writer.log[0], Drawn::Page { size: PageSize::new(40.0, 20.0) });
    assert_eq!(writer.log[3], Drawn::Page { size: PageSize::new(130.0, 85.0) });

    // the content's top left corner lands on the output origin
    match &writer.log[1] {
        Drawn::Source { index, transform } => {
            assert_eq!(*index, 0);
            let (x, y) = transform.transform_point(20.0, 10.0);
            assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        }
        other => panic!("unexpected {:?}", other),
    }

    writer.finish().unwrap();
    assert!(writer.finished);
}

#[test]
fn test_crop_blank_page_is_left_alone() {
    let f = fixture(&[(200.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();
    let rasterizer = BoxRasterizer {
        sizes: vec![PageSize::new(200.0, 100.0)],
        boxes: vec![vec![]],
    };

    let mut writer = RecordingWriter::default();
    crop_pages(&source, &rasterizer, &mut writer, &CropOptions::default()).expect("Failed to crop");
    assert_eq!(writer.log[0], Drawn::Page { size: PageSize::new(200.0, 100.0) });
}

#[test]
fn test_crop_survives_render_failure_unless_strict() {
    let f = fixture(&[(200.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let mut writer = RecordingWriter::default();
    crop_pages(&source, &BrokenRasterizer, &mut writer, &CropOptions::default()).expect("Failed to crop");
    assert_eq!(writer.log[0], Drawn::Page { size: PageSize::new(200.0, 100.0) });

    let strict = CropOptions {
        strict: true,
        ..Default::default()
    };
    let result = crop_pages(&source, &BrokenRasterizer, &mut RecordingWriter::default(), &strict);
    assert!(matches!(result, Err(Error::RenderBackend(_))));
}

/// Two identical squares and a small one, on every page
fn squares_rasterizer(pages: usize) -> BoxRasterizer {
    BoxRasterizer {
        sizes: vec![PageSize::new(100.0, 100.0); pages],
        boxes: vec![
            vec![
                Rectangle::new(10.0, 10.0, 10.0, 10.0),
                Rectangle::new(60.0, 60.0, 10.0, 10.0),
                Rectangle::new(80.0, 10.0, 5.0, 5.0),
            ];
            pages
        ],
    }
}

#[test]
fn test_rasterize_chop_emits_regions_in_page_units() {
    let f = fixture(&[(100.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let options = RasterizeOptions {
        dpi: 144.0,
        chop: true,
        ..Default::default()
    };
    let mut writer = RecordingWriter::default();
    rasterize_pages(&source, &squares_rasterizer(1), &mut writer, &options).expect("Failed to rasterize");

    let images = writer.images();
    let rects: Vec<Rectangle> = images.iter().map(|(r, _)| *r).collect();
    assert_eq!(
        rects,
        vec![
            Rectangle::new(10.0, 10.0, 10.0, 10.0),
            Rectangle::new(80.0, 10.0, 5.0, 5.0),
            Rectangle::new(60.0, 60.0, 10.0, 10.0),
        ]
    );

    // identical squares share a hash
    assert_eq!(images[0].1, images[2].1);
    assert_ne!(images[0].1, images[1].1);
}

#[test]
fn test_rasterize_without_chop_draws_whole_page() {
    let f = fixture(&[(100.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let options = RasterizeOptions {
        dpi: 72.0,
        ..Default::default()
    };
    let mut writer = RecordingWriter::default();
    rasterize_pages(&source, &squares_rasterizer(1), &mut writer, &options).expect("Failed to rasterize");

    let images = writer.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].0, Rectangle::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_rasterize_dedups_images_across_pages() {
    let f = fixture(&[(100.0, 100.0), (100.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let options = RasterizeOptions {
        dpi: 72.0,
        chop: true,
        ..Default::default()
    };
    let mut writer = PdfWriter::new(&source, &f.output);
    rasterize_pages(&source, &squares_rasterizer(2), &mut writer, &options).expect("Failed to rasterize");

    // six regions, two distinct shapes
    assert_eq!(writer.image_count(), 2);
    writer.finish().expect("Failed to write");

    let doc = Document::load(&f.output).expect("Failed to load output");
    assert_eq!(doc.get_pages().len(), 2);
    let images = doc
        .objects
        .values()
        .filter(|o| match o {
            Object::Stream(s) => has_name(&s.dict, b"Subtype", b"Image") && has_name(&s.dict, b"ColorSpace", b"DeviceRGB"),
            _ => false,
        })
        .count();
    assert_eq!(images, 2);
}

#[test]
fn test_rasterize_keeps_original_page_when_rendering_fails() {
    let f = fixture(&[(100.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let mut writer = RecordingWriter::default();
    rasterize_pages(&source, &BrokenRasterizer, &mut writer, &RasterizeOptions::default())
        .expect("Failed to rasterize");

    assert_eq!(
        writer.log,
        vec![
            Drawn::Page { size: PageSize::new(100.0, 100.0) },
            Drawn::Source { index: 0, transform: AffineTransform::identity() },
            Drawn::End,
        ]
    );
}

#[test]
fn test_missing_input_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let result = pagefit_pdf(
        Path::new("nonexistent.pdf"),
        &temp_dir.path().join("output.pdf"),
        &PagefitOptions::default(),
    );
    assert!(matches!(result, Err(Error::FileNotFound(_))));
}

#[test]
fn test_source_page_handles() {
    let f = fixture(&[(612.0, 792.0), (612.0, 792.0), (612.0, 792.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let pages = source.pages().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages.iter().map(|p| p.number()).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_page_rotate_entry_is_honoured() {
    let f = fixture(&[(100.0, 200.0)]);
    set_page_rotation(&f.input, 90);

    let source = PdfDocument::load(&f.input).unwrap();
    assert_eq!(source.page_size(source.page(0).unwrap()).unwrap(), PageSize::new(200.0, 100.0));

    rotate_pdf(&f.input, &f.output, &RotateOptions { angle: 0.0 }).expect("Failed to rotate");
    assert_size(page_sizes(&f.output)[0], 200.0, 100.0);

    // the source's bottom left corner is shown at the top left
    let contents = page_contents(&f.output);
    assert!(contents[0].contains("0 -1 1 0 0 100 cm"), "{}", contents[0]);
}

#[test]
fn test_nup_two_pages_per_sheet() {
    let f = fixture(&[(100.0, 200.0), (100.0, 200.0), (100.0, 200.0)]);

    nup_pdf(&f.input, &f.output, &NupOptions::default()).expect("Failed to arrange pages");

    let sizes = page_sizes(&f.output);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], 200.0, 200.0);
    assert_size(sizes[1], 200.0, 200.0);

    let contents = page_contents(&f.output);
    assert_eq!(contents[0].matches(" Do").count(), 2);
    assert_eq!(contents[1].matches(" Do").count(), 1);
}

#[test]
fn test_nup_places_pages_in_cells() {
    let f = fixture(&[(100.0, 200.0), (100.0, 200.0), (200.0, 100.0)]);
    let source = PdfDocument::load(&f.input).unwrap();

    let options = NupOptions { grid: Some((2, 1)) };
    let mut writer = RecordingWriter::default();
    nup_pages(&source, &mut writer, &options).expect("Failed to arrange pages");

    assert_eq!(
        writer.log,
        vec![
            Drawn::Page { size: PageSize::new(200.0, 200.0) },
            Drawn::Source { index: 0, transform: AffineTransform::identity() },
            Drawn::Source { index: 1, transform: AffineTransform::translate(100.0, 0.0) },
            Drawn::End,
            // the next sheet is sized by its own first page
            Drawn::Page { size: PageSize::new(400.0, 100.0) },
            Drawn::Source { index: 2, transform: AffineTransform::identity() },
            Drawn::End,
        ]
    );
}

#[test]
fn test_overlay_draws_layers_over_matching_pages() {
    let f = fixture(&[(200.0, 100.0), (200.0, 100.0)]);
    let overlay = f.input.with_file_name("overlay.pdf");
    write_test_pdf(&overlay, &[(50.0, 50.0)], None);

    let options = OverlayOptions { offset: (10.0, 20.0) };
    overlay_pdf(&f.input, &[overlay], &f.output, &options).expect("Failed to overlay");

    let sizes = page_sizes(&f.output);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], 200.0, 100.0);
    assert_size(sizes[1], 200.0, 100.0);

    // the overlay only has one page
    let contents = page_contents(&f.output);
    assert_eq!(contents[0].matches(" Do").count(), 2);
    assert_eq!(contents[1].matches(" Do").count(), 1);
}

#[test]
fn test_overlay_shifts_overlay_pages() {
    let f = fixture(&[(200.0, 100.0)]);
    let overlay = f.input.with_file_name("overlay.pdf");
    write_test_pdf(&overlay, &[(50.0, 50.0)], None);

    let mut source = PdfDocument::load(&f.input).unwrap();
    let layer = source.import_pages(PdfDocument::load(&overlay).unwrap());

    let options = OverlayOptions { offset: (10.0, 20.0) };
    let mut writer = RecordingWriter::default();
    overlay_pages(&source, &[layer], &mut writer, &options).expect("Failed to overlay");

    assert_eq!(
        writer.log,
        vec![
            Drawn::Page { size: PageSize::new(200.0, 100.0) },
            Drawn::Source { index: 0, transform: AffineTransform::identity() },
            Drawn::Source { index: 0, transform: AffineTransform::translate(10.0, 20.0) },
            Drawn::End,
        ]
    );
}

#[test]
fn test_overlay_without_layers_is_rejected() {
    let f = fixture(&[(200.0, 100.0)]);
    let result = overlay_pdf(&f.input, &[], &f.output, &OverlayOptions::default());
    assert!(matches!(result, Err(Error::General(_))));
}
