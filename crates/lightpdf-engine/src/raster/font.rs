// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font resolution for the rasteriser. Glyph outlines come from the font
// program embedded in the document, or from an installed face standing in
// for one of the standard 14 fonts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use lopdf::{Dictionary, Document, Object};
use tracing::debug;
use ttf_parser::{Face, GlyphId};

use crate::pdf::handle::{number, resolve, resolve_dict};

/// Glyph space units per text space unit in `/Widths` and `/W`.
pub const GLYPH_UNITS: f32 = 1000.0;

/// How deep the font directory walk goes.
const MAX_DIR_DEPTH: usize = 6;

/// Lowercase file name -> path of every font file found on the system.
static FONT_FILES: OnceLock<HashMap<String, PathBuf>> = OnceLock::new();

/// Candidate file name -> loaded bytes, including misses.
static LOADED_FACES: OnceLock<Mutex<HashMap<&'static str, Option<Arc<Vec<u8>>>>>> =
    OnceLock::new();

/// A font as the rasteriser needs it: code decoding, advances and an
/// optional outline program.
#[derive(Debug, Clone)]
pub struct PdfFont {
    pub name: String,
    program: Option<Arc<Vec<u8>>>,
    embedded: bool,
    /// Type0 fonts use two-byte codes.
    two_byte: bool,
    first_char: u16,
    widths: Vec<f32>,
    cid_widths: HashMap<u16, f32>,
    default_width: f32,
}

impl PdfFont {
    pub fn load(document: &Document, dict: &Dictionary) -> Self {
        let name = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|obj| resolve(document, obj).as_name().ok())
            .map(|raw| strip_subset_prefix(&String::from_utf8_lossy(raw)).to_string())
            .unwrap_or_default();
        let two_byte = matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Type0"));

        let descendant = if two_byte {
            dict.get(b"DescendantFonts")
                .ok()
                .and_then(|obj| resolve(document, obj).as_array().ok())
                .and_then(|fonts| fonts.first())
                .map(|font| resolve_dict(document, font))
        } else {
            None
        };
        let described = descendant.as_ref().unwrap_or(dict);
        let embedded_program = described
            .get(b"FontDescriptor")
            .ok()
            .map(|obj| resolve_dict(document, obj))
            .and_then(|descriptor| embedded_program(document, &descriptor));
        let embedded = embedded_program.is_some();
        let program = embedded_program.or_else(|| {
            if two_byte {
                None
            } else {
                system_face(&name)
            }
        });

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|obj| number(resolve(document, obj)))
            .map_or(0, |value| value.max(0.0) as u16);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|obj| resolve(document, obj).as_array().ok())
            .map(|items| {
                items
                    .iter()
                    .map(|item| number(resolve(document, item)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let cid_widths = descendant
            .as_ref()
            .and_then(|font| font.get(b"W").ok())
            .and_then(|obj| resolve(document, obj).as_array().ok())
            .map(|items| parse_cid_widths(document, items))
            .unwrap_or_default();
        let default_width = descendant
            .as_ref()
            .and_then(|font| font.get(b"DW").ok())
            .and_then(|obj| number(resolve(document, obj)))
            .unwrap_or(GLYPH_UNITS);

        debug!(font = %name, embedded, has_outlines = program.is_some(), "Font loaded");
        Self {
            name,
            program,
            embedded,
            two_byte,
            first_char,
            widths,
            cid_widths,
            default_width,
        }
    }

    /// Outline program bytes, if any were found.
    pub fn program(&self) -> Option<&[u8]> {
        self.program.as_deref().map(Vec::as_slice)
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u16> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
                .collect()
        } else {
            bytes.iter().map(|b| u16::from(*b)).collect()
        }
    }

    /// Whether `code` is the single-byte space that word spacing applies to.
    pub fn is_word_space(&self, code: u16) -> bool {
        !self.two_byte && code == 32
    }

    /// Horizontal advance of `code` in glyph units.
    pub fn advance(&self, code: u16, face: Option<&Face<'_>>) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        let declared = code
            .checked_sub(self.first_char)
            .and_then(|offset| self.widths.get(usize::from(offset)))
            .copied()
            .filter(|width| *width > 0.0);
        if let Some(width) = declared {
            return width;
        }
        let from_face = face.and_then(|face| {
            let glyph = self.glyph(face, code)?;
            let advance = face.glyph_hor_advance(glyph)?;
            Some(f32::from(advance) * GLYPH_UNITS / f32::from(face.units_per_em().max(1)))
        });
        from_face.unwrap_or(if self.is_monospace() { 600.0 } else { 500.0 })
    }

    /// Glyph for `code` in `face`. Embedded CID fonts are assumed to map
    /// CIDs to glyph ids one to one.
    pub fn glyph(&self, face: &Face<'_>, code: u16) -> Option<GlyphId> {
        if self.two_byte {
            return self.embedded.then_some(GlyphId(code));
        }
        let ch = char::from(code as u8);
        face.glyph_index(ch)
            .or_else(|| char::from_u32(0xF000 + u32::from(code)).and_then(|c| face.glyph_index(c)))
    }

    fn is_monospace(&self) -> bool {
        self.name.contains("Courier")
    }
}

/// `ABCDEF+Helvetica` -> `Helvetica`.
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// TrueType or OpenType data from `/FontFile2` or `/FontFile3`.
fn embedded_program(document: &Document, descriptor: &Dictionary) -> Option<Arc<Vec<u8>>> {
    for key in [&b"FontFile2"[..], b"FontFile3"] {
        let Ok(obj) = descriptor.get(key) else {
            continue;
        };
        let Object::Stream(stream) = resolve(document, obj) else {
            continue;
        };
        let Ok(data) = stream.get_plain_content() else {
            continue;
        };
        if Face::parse(&data, 0).is_ok() {
            return Some(Arc::new(data));
        }
    }
    None
}

/// `[c [w1 w2 ...]]` and `[cfirst clast w]` runs of a CID font's `/W`.
fn parse_cid_widths(document: &Document, items: &[Object]) -> HashMap<u16, f32> {
    let mut widths = HashMap::new();
    let mut index = 0;
    while let Some(first) = items.get(index).and_then(|o| number(resolve(document, o))) {
        let first = first.max(0.0) as u32;
        match items.get(index + 1).map(|o| resolve(document, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    let cid = first + offset as u32;
                    if let (Ok(cid), Some(width)) =
                        (u16::try_from(cid), number(resolve(document, width)))
                    {
                        widths.insert(cid, width);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let width = items.get(index + 2).and_then(|o| number(resolve(document, o)));
                let (Some(last), Some(width)) = (number(last), width) else {
                    break;
                };
                let last = (last.max(0.0) as u32).min(u32::from(u16::MAX));
                for cid in first..=last {
                    if let Ok(cid) = u16::try_from(cid) {
                        widths.insert(cid, width);
                    }
                }
                index += 3;
            }
            None => break,
        }
    }
    widths
}

// -- Installed faces ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Sans,
    Serif,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

fn classify(name: &str) -> (Family, Style) {
    let family = if name.contains("Courier") || name.contains("Mono") {
        Family::Mono
    } else if name.contains("Times") || name.contains("Serif") || name.contains("Roman") {
        Family::Serif
    } else {
        Family::Sans
    };
    let bold = name.contains("Bold") || name.contains("Black") || name.contains("Heavy");
    let italic = name.contains("Italic") || name.contains("Oblique");
    let style = match (bold, italic) {
        (true, true) => Style::BoldItalic,
        (true, false) => Style::Bold,
        (false, true) => Style::Italic,
        (false, false) => Style::Regular,
    };
    (family, style)
}

/// Metric-compatible stand-ins, most faithful first.
fn candidates(family: Family, style: Style) -> &'static [&'static str] {
    match (family, style) {
        (Family::Sans, Style::Regular) => &[
            "LiberationSans-Regular.ttf",
            "Arimo-Regular.ttf",
            "arial.ttf",
            "DejaVuSans.ttf",
            "NotoSans-Regular.ttf",
            "FreeSans.ttf",
        ],
        (Family::Sans, Style::Bold) => &[
            "LiberationSans-Bold.ttf",
            "Arimo-Bold.ttf",
            "arialbd.ttf",
            "DejaVuSans-Bold.ttf",
            "NotoSans-Bold.ttf",
        ],
        (Family::Sans, Style::Italic) => &[
            "LiberationSans-Italic.ttf",
            "ariali.ttf",
            "DejaVuSans-Oblique.ttf",
            "NotoSans-Italic.ttf",
        ],
        (Family::Sans, Style::BoldItalic) => &[
            "LiberationSans-BoldItalic.ttf",
            "arialbi.ttf",
            "DejaVuSans-BoldOblique.ttf",
        ],
        (Family::Serif, Style::Regular) => &[
            "LiberationSerif-Regular.ttf",
            "Tinos-Regular.ttf",
            "times.ttf",
            "DejaVuSerif.ttf",
            "NotoSerif-Regular.ttf",
        ],
        (Family::Serif, Style::Bold) => &[
            "LiberationSerif-Bold.ttf",
            "timesbd.ttf",
            "DejaVuSerif-Bold.ttf",
        ],
        (Family::Serif, Style::Italic) => &[
            "LiberationSerif-Italic.ttf",
            "timesi.ttf",
            "DejaVuSerif-Italic.ttf",
        ],
        (Family::Serif, Style::BoldItalic) => &[
            "LiberationSerif-BoldItalic.ttf",
            "timesbi.ttf",
            "DejaVuSerif-BoldItalic.ttf",
        ],
        (Family::Mono, Style::Regular) => &[
            "LiberationMono-Regular.ttf",
            "Cousine-Regular.ttf",
            "cour.ttf",
            "DejaVuSansMono.ttf",
        ],
        (Family::Mono, Style::Bold) => &[
            "LiberationMono-Bold.ttf",
            "courbd.ttf",
            "DejaVuSansMono-Bold.ttf",
        ],
        (Family::Mono, Style::Italic) => &[
            "LiberationMono-Italic.ttf",
            "couri.ttf",
            "DejaVuSansMono-Oblique.ttf",
        ],
        (Family::Mono, Style::BoldItalic) => &[
            "LiberationMono-BoldItalic.ttf",
            "courbi.ttf",
            "DejaVuSansMono-BoldOblique.ttf",
        ],
    }
}

/// Find an installed face for a non-embedded font, falling back from the
/// styled variant to the regular one.
fn system_face(name: &str) -> Option<Arc<Vec<u8>>> {
    if name.contains("Symbol") || name.contains("Dingbats") {
        return None;
    }
    let (family, style) = classify(name);
    let regular = candidates(family, Style::Regular);
    let styled = candidates(family, style);
    let files = FONT_FILES.get_or_init(index_font_files);
    let cache = LOADED_FACES.get_or_init(|| Mutex::new(HashMap::new()));

    for candidate in styled.iter().chain(regular) {
        if let Ok(guard) = cache.lock() {
            if let Some(entry) = guard.get(candidate) {
                if entry.is_some() {
                    return entry.clone();
                }
                continue;
            }
        }
        let loaded = files
            .get(&candidate.to_ascii_lowercase())
            .and_then(|path| std::fs::read(path).ok())
            .filter(|bytes| Face::parse(bytes, 0).is_ok())
            .map(Arc::new);
        if let Ok(mut guard) = cache.lock() {
            guard.insert(*candidate, loaded.clone());
        }
        if loaded.is_some() {
            debug!(font = name, face = *candidate, "Using installed face");
            return loaded;
        }
    }
    None
}

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from(r"C:\Windows\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    dirs
}

fn index_font_files() -> HashMap<String, PathBuf> {
    let mut files = HashMap::new();
    for dir in font_dirs() {
        walk(&dir, 0, &mut files);
    }
    debug!(files = files.len(), "Indexed installed fonts");
    files
}

fn walk(dir: &Path, depth: usize, files: &mut HashMap<String, PathBuf>) {
    if depth > MAX_DIR_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, depth + 1, files);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let lower = name.to_ascii_lowercase();
            if lower.ends_with(".ttf") || lower.ends_with(".otf") {
                files.entry(lower).or_insert(path);
            }
        }
    }
}
