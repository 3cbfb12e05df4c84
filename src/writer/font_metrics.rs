//! Metrics of the fourteen standard PDF fonts.
//!
//! Widths are in 1000-unit glyph space for the printable ASCII range. Latin-1
//! letters with diacritics share the width of their base letter.

use super::font_manager::{FontDefinition, FontDescriptor, FontKind};
use std::collections::HashMap;

static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

static TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

static TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
    333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
    500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
];

static SYMBOL: [u16; 95] = [
    250, 333, 713, 500, 549, 833, 778, 439, 333, 333, 500, 549, 250, 549, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 549, 549, 549, 444,
    549, 722, 667, 722, 612, 611, 763, 603, 722, 333, 631, 722, 686, 889, 722, 722,
    768, 741, 556, 592, 611, 690, 439, 768, 645, 795, 611, 333, 863, 333, 658, 500,
    500, 631, 549, 549, 494, 439, 521, 411, 603, 329, 603, 549, 549, 576, 521, 549,
    549, 521, 549, 603, 439, 576, 713, 686, 493, 686, 494, 480, 200, 480, 549,
];

static ZAPF_DINGBATS: [u16; 95] = [
    278, 974, 961, 974, 980, 719, 789, 790, 791, 690, 960, 939, 549, 855, 911, 933,
    911, 945, 974, 755, 846, 762, 761, 571, 677, 763, 760, 759, 754, 494, 552, 537,
    577, 692, 786, 788, 788, 790, 793, 794, 816, 823, 789, 841, 823, 833, 816, 831,
    923, 744, 723, 749, 790, 792, 695, 776, 768, 792, 759, 707, 708, 682, 701, 826,
    815, 789, 789, 707, 687, 696, 689, 786, 787, 713, 791, 785, 791, 873, 761, 762,
    762, 759, 759, 892, 892, 788, 784, 438, 138, 277, 415, 392, 392, 668, 668,
];

/// PostScript name of a core font key such as `helveticaBI`.
pub fn core_font_name(key: &str) -> Option<&'static str> {
    let name = match key {
        "courier" => "Courier",
        "courierB" => "Courier-Bold",
        "courierI" => "Courier-Oblique",
        "courierBI" => "Courier-BoldOblique",
        "helvetica" => "Helvetica",
        "helveticaB" => "Helvetica-Bold",
        "helveticaI" => "Helvetica-Oblique",
        "helveticaBI" => "Helvetica-BoldOblique",
        "times" => "Times-Roman",
        "timesB" => "Times-Bold",
        "timesI" => "Times-Italic",
        "timesBI" => "Times-BoldItalic",
        "symbol" => "Symbol",
        "zapfdingbats" => "ZapfDingbats",
        _ => return None,
    };
    Some(name)
}

fn ascii_widths(name: &str) -> Option<&'static [u16; 95]> {
    match name {
        "Helvetica" | "Helvetica-Oblique" => Some(&HELVETICA),
        "Helvetica-Bold" | "Helvetica-BoldOblique" => Some(&HELVETICA_BOLD),
        "Times-Roman" => Some(&TIMES_ROMAN),
        "Times-Bold" => Some(&TIMES_BOLD),
        "Times-Italic" => Some(&TIMES_ITALIC),
        "Times-BoldItalic" => Some(&TIMES_BOLD_ITALIC),
        "Symbol" => Some(&SYMBOL),
        "ZapfDingbats" => Some(&ZAPF_DINGBATS),
        _ => None,
    }
}

/// ASCII letter sharing the advance width of a Latin-1 letter.
fn latin1_base(c: u32) -> Option<u8> {
    let base = match c {
        0xA0 => b' ',
        0xAD => b'-',
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD0 => b'D',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD7 | 0xF7 => b'+',
        0xD9..=0xDC => b'U',
        0xDD => b'Y',
        0xDE => b'P',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF0 | 0xF2..=0xF6 | 0xF8 => b'o',
        0xF1 => b'n',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        0xFE => b'p',
        _ => return None,
    };
    Some(base)
}

fn width_table(name: &str) -> HashMap<u32, u16> {
    let mut cw = HashMap::new();
    let fixed = name.starts_with("Courier");
    let ascii = ascii_widths(name);
    for c in 32u32..127 {
        let w = match ascii {
            Some(table) => table[(c - 32) as usize],
            None => 600,
        };
        cw.insert(c, w);
    }
    if name == "Symbol" || name == "ZapfDingbats" {
        return cw;
    }
    for c in 0xA0u32..=0xFF {
        if fixed {
            cw.insert(c, 600);
        } else if let Some(base) = latin1_base(c) {
            if let Some(w) = cw.get(&u32::from(base)).copied() {
                cw.insert(c, w);
            }
        }
    }
    cw
}

/// (ascent, descent, cap height, stem v, bbox)
fn descriptor_metrics(name: &str) -> (f64, f64, f64, f64, [i32; 4]) {
    match name {
        "Helvetica" | "Helvetica-Oblique" => (718.0, -207.0, 718.0, 88.0, [-166, -225, 1000, 931]),
        "Helvetica-Bold" | "Helvetica-BoldOblique" => {
            (718.0, -207.0, 718.0, 140.0, [-170, -228, 1003, 962])
        },
        "Times-Roman" | "Times-Italic" => (683.0, -217.0, 662.0, 84.0, [-168, -218, 1000, 898]),
        "Times-Bold" | "Times-BoldItalic" => (676.0, -205.0, 676.0, 139.0, [-168, -218, 1000, 935]),
        "Courier" | "Courier-Oblique" => (629.0, -157.0, 562.0, 51.0, [-23, -250, 715, 805]),
        "Courier-Bold" | "Courier-BoldOblique" => (626.0, -142.0, 562.0, 106.0, [-113, -250, 749, 801]),
        "Symbol" => (1010.0, -293.0, 1010.0, 85.0, [-180, -293, 1090, 1010]),
        _ => (820.0, -143.0, 700.0, 90.0, [-1, -143, 981, 820]),
    }
}

/// Built-in definition of a core font key such as `timesB`.
pub fn core_font(key: &str) -> Option<FontDefinition> {
    let name = core_font_name(key)?;
    let (ascent, descent, cap_height, stem_v, font_bbox) = descriptor_metrics(name);
    let symbolic = name == "Symbol" || name == "ZapfDingbats";
    let italic = name.contains("Oblique") || name.contains("Italic");
    let mut flags = if symbolic { 4 } else { 32 };
    if name.starts_with("Courier") {
        flags |= 1;
    }
    if italic {
        flags |= 64;
    }
    Some(FontDefinition {
        name: name.to_string(),
        kind: FontKind::Core,
        desc: FontDescriptor {
            ascent,
            descent,
            cap_height,
            flags,
            font_bbox,
            italic_angle: if italic { -12.0 } else { 0.0 },
            stem_v,
            missing_width: None,
        },
        up: -100.0,
        ut: 50.0,
        cw: width_table(name),
        enc: None,
        diff: None,
        program: None,
    })
}
