use fontdb::{Database, Family, ID, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Advance width of `text` in the first installed font of `font_family`, or
/// `None` when no matching system font exists.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

pub fn average_char_width(font_family: &str, font_size: f32) -> Option<f32> {
    if font_size <= 0.0 {
        return None;
    }
    let sample = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let width = measure_text_width(sample, font_size, font_family)?;
    Some(width / sample.chars().count() as f32)
}

struct TextMeasurer {
    db: Database,
    system_fonts_loaded: bool,
    faces: HashMap<String, Option<LoadedFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_fonts_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load(font_family);
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get(&key)?.as_ref()?;
        Some(face.width(&text.replace('\t', "    "), font_size))
    }

    fn load(&mut self, font_family: &str) -> Option<LoadedFace> {
        if !self.system_fonts_loaded {
            self.db.load_system_fonts();
            self.system_fonts_loaded = true;
        }
        let id = self.query(font_family)?;
        self.db
            .with_face_data(id, |data, index| LoadedFace::parse(data.to_vec(), index))
            .flatten()
    }

    fn query(&self, font_family: &str) -> Option<ID> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }
        self.db.query(&Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    }
}

/// Font bytes plus the ASCII advance table, so the common case never
/// re-parses the face.
struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii_advances: [u16; 128],
}

impl LoadedFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..128 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = f32::from(face.units_per_em().max(1));
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * 0.56;
        let face = if text.is_ascii() {
            None
        } else {
            Face::parse(&self.data, self.index).ok()
        };
        let mut width = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let advance = if ch.is_ascii() {
                Some(self.ascii_advances[ch as usize]).filter(|advance| *advance > 0)
            } else {
                face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                })
            };
            width += match advance {
                Some(advance) => f32::from(advance) * scale,
                None => fallback,
            };
        }
        width.max(0.0)
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}
