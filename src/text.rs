//! Text helpers for the device fonts
//!
//! The display fonts only carry ASCII glyphs, so player and team names are
//! transliterated on the way in.

use heapless::String;

/// Closest ASCII spelling of a Latin letter, if there is one
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'À'..='Å' | 'Ą' | 'Ă' | 'Ā' => "A",
        'à'..='å' | 'ą' | 'ă' | 'ā' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Č' => "C",
        'ç' | 'ć' | 'č' => "c",
        'Đ' | 'Ď' | 'Ð' => "D",
        'đ' | 'ď' | 'ð' => "d",
        'È'..='Ë' | 'Ę' | 'Ě' | 'Ē' | 'Ė' => "E",
        'è'..='ë' | 'ę' | 'ě' | 'ē' | 'ė' => "e",
        'Ğ' => "G",
        'ğ' => "g",
        'Ì'..='Ï' | 'İ' | 'Ī' => "I",
        'ì'..='ï' | 'ı' | 'ī' => "i",
        'Ł' | 'Ľ' | 'Ĺ' => "L",
        'ł' | 'ľ' | 'ĺ' => "l",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ñ' | 'ń' | 'ň' => "n",
        'Ò'..='Ö' | 'Ø' | 'Ő' | 'Ō' => "O",
        'ò'..='ö' | 'ø' | 'ő' | 'ō' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ř' | 'Ŕ' => "R",
        'ř' | 'ŕ' => "r",
        'Ś' | 'Š' | 'Ş' | 'Ș' => "S",
        'ś' | 'š' | 'ş' | 'ș' => "s",
        'ß' => "ss",
        'Ť' | 'Ț' | 'Ţ' => "T",
        'ť' | 'ț' | 'ţ' => "t",
        'Þ' => "Th",
        'þ' => "th",
        'Ù'..='Ü' | 'Ů' | 'Ű' | 'Ū' => "U",
        'ù'..='ü' | 'ů' | 'ű' | 'ū' => "u",
        'Ý' | 'Ÿ' => "Y",
        'ý' | 'ÿ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Transliterate `input` to ASCII, dropping anything without a spelling and
/// truncating at capacity
pub fn to_ascii<const N: usize>(input: &str) -> String<N> {
    let mut out = String::new();
    for c in input.chars() {
        let pushed = if c.is_ascii() {
            out.push(c).is_ok()
        } else if let Some(folded) = fold_char(c) {
            out.push_str(folded).is_ok()
        } else {
            true
        };
        if !pushed {
            break;
        }
    }
    out
}
