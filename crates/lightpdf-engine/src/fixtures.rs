// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test documents built in memory with `lopdf`.

use std::io::Cursor;

use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Skeleton with a page tree and catalog; pages are added by the caller.
struct Builder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Builder {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn content(&mut self, operations: Vec<Operation>) -> ObjectId {
        let bytes = Content { operations }.encode().unwrap_or_default();
        self.doc.add_object(Stream::new(dictionary! {}, bytes))
    }

    fn page(&mut self, mut dict: lopdf::Dictionary) -> ObjectId {
        dict.set("Type", "Page");
        dict.set("Parent", self.pages_id);
        let id = self.doc.add_object(dict);
        self.kids.push(id.into());
        id
    }

    fn finish(mut self, pages_extra: lopdf::Dictionary) -> Vec<u8> {
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => self.kids,
        };
        for (key, value) in pages_extra.iter() {
            pages.set(key.clone(), value.clone());
        }
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog);
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

fn media_box(width: f32, height: f32) -> Object {
    vec![0.into(), 0.into(), width.into(), height.into()].into()
}

fn text_operations(text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// `n` Letter pages, each showing "alpha beta gamma" in Helvetica.
pub fn pdf_with_pages(n: usize) -> Vec<u8> {
    let mut builder = Builder::new();
    let font = builder.doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = builder.doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font },
    });
    for _ in 0..n {
        let contents = builder.content(text_operations("alpha beta gamma"));
        builder.page(dictionary! {
            "MediaBox" => media_box(612.0, 792.0),
            "Resources" => resources,
            "Contents" => contents,
        });
    }
    builder.finish(dictionary! {})
}

/// One blank page per entry, sized `(width, height)`.
pub fn pdf_with_page_sizes(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut builder = Builder::new();
    for &(width, height) in sizes {
        let contents = builder.content(Vec::new());
        builder.page(dictionary! {
            "MediaBox" => media_box(width, height),
            "Contents" => contents,
        });
    }
    builder.finish(dictionary! {})
}

/// A single Letter page drawing `operations` with the given resources.
pub fn pdf_with_content(operations: Vec<Operation>, resources: lopdf::Dictionary) -> Vec<u8> {
    let mut builder = Builder::new();
    let contents = builder.content(operations);
    builder.page(dictionary! {
        "MediaBox" => media_box(612.0, 792.0),
        "Resources" => resources,
        "Contents" => contents,
    });
    builder.finish(dictionary! {})
}

/// One Letter page drawing an uncompressed RGB image per entry, named
/// `Im0`, `Im1`, ... and stacked up the left edge.
pub fn pdf_with_images(sizes: &[(u32, u32)]) -> Vec<u8> {
    let mut builder = Builder::new();
    let mut xobjects = lopdf::Dictionary::new();
    let mut operations = Vec::new();
    let mut y = 0;
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 40, 200])
            .collect();
        let image = builder.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels,
        ));
        let name = format!("Im{index}");
        xobjects.set(name.as_bytes().to_vec(), image);
        operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (width as i64).into(),
                    0.into(),
                    0.into(),
                    (height as i64).into(),
                    0.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        y += height as i64;
    }
    let contents = builder.content(operations);
    builder.page(dictionary! {
        "MediaBox" => media_box(612.0, 792.0),
        "Resources" => dictionary! { "XObject" => xobjects },
        "Contents" => contents,
    });
    builder.finish(dictionary! {})
}

/// `n` pages whose MediaBox lives only on the page-tree root.
pub fn pdf_with_inherited_media_box(n: usize, (width, height): (f32, f32)) -> Vec<u8> {
    let mut builder = Builder::new();
    for _ in 0..n {
        let contents = builder.content(Vec::new());
        builder.page(dictionary! { "Contents" => contents });
    }
    builder.finish(dictionary! { "MediaBox" => media_box(width, height) })
}

/// `n` Letter pages whose `/Rotate` is inherited from the page-tree root.
pub fn pdf_with_inherited_rotation(n: usize, degrees: i64) -> Vec<u8> {
    let mut builder = Builder::new();
    for _ in 0..n {
        let contents = builder.content(Vec::new());
        builder.page(dictionary! { "Contents" => contents });
    }
    builder.finish(dictionary! {
        "MediaBox" => media_box(612.0, 792.0),
        "Rotate" => degrees,
    })
}

/// A single page whose document information dictionary carries a title and
/// author.
pub fn pdf_with_info(title: &str, author: &str) -> Vec<u8> {
    let mut doc = Document::load_mem(&pdf_with_pages(1)).unwrap();
    let info = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Author" => Object::string_literal(author),
        "Producer" => Object::string_literal("fixtures"),
    });
    doc.trailer.set("Info", info);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// An opaque PNG with a horizontal gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let gradient = RgbImage::from_fn(width, height, |x, _| Rgb([(x * 5 % 256) as u8, 90, 160]));
    let mut bytes = Vec::new();
    gradient
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
