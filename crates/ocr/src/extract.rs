use std::sync::OnceLock;

use pantry_core::Quantity;
use regex::Regex;

use crate::types::ScannedItem;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Trailing price/quantity run: separators, an optional currency or unit-price
// marker, then digits with thousands/decimal separators.
re!(re_price_suffix, r"[\s,]*[¥￥@]?[\d,.]+$");
re!(re_all_digits, r"^\d+$");

/// Receipt boilerplate. A line containing any of these is never an item.
pub const IGNORE_KEYWORDS: [&str; 14] = [
    "合計",
    "小計",
    "税",
    "お預り",
    "お釣り",
    "クレジット",
    "ポイント",
    "レジ",
    "No.",
    "担当",
    "領収書",
    "店",
    "電話",
    "様",
];

const CURRENCY_GLYPHS: [char; 2] = ['¥', '￥'];
const MARKER_GLYPHS: [char; 2] = ['*', '※'];

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Turn raw receipt text into candidate grocery items.
    ///
    /// Every item gets the placeholder quantity; the user corrects quantities
    /// and dates in the draft before anything is stored. Text that yields
    /// nothing produces an empty list, never an error.
    pub fn extract(ocr_text: &str) -> Vec<ScannedItem> {
        ocr_text
            .lines()
            .filter_map(candidate_line)
            .filter_map(strip_price_suffix)
            .filter_map(emit_item)
            .collect()
    }
}

// ── Line filter ───────────────────────────────────────────────────────────────

fn candidate_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || IGNORE_KEYWORDS.iter().any(|k| line.contains(k)) {
        return None;
    }
    Some(line)
}

// ── Suffix stripper ───────────────────────────────────────────────────────────

fn strip_price_suffix(line: &str) -> Option<String> {
    if is_price_only(line) {
        return None;
    }
    let name = re_price_suffix().replace(line, "");
    let name: String = name.chars().filter(|c| !MARKER_GLYPHS.contains(c)).collect();
    Some(name.trim().to_string())
}

/// A bare price or count such as `¥1,280` or `3`.
fn is_price_only(line: &str) -> bool {
    let bare: String = line
        .chars()
        .filter(|c| !CURRENCY_GLYPHS.contains(c) && *c != ',' && *c != '.')
        .collect();
    re_all_digits().is_match(bare.trim())
}

// ── Item emitter ──────────────────────────────────────────────────────────────

fn emit_item(name: String) -> Option<ScannedItem> {
    // A single leftover character is stray punctuation, not a product.
    if name.chars().count() <= 1 {
        return None;
    }
    Some(ScannedItem {
        name,
        quantity: Quantity::placeholder(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        Extractor::extract(text).into_iter().map(|i| i.name).collect()
    }

    #[test]
    fn strips_yen_price() {
        assert_eq!(names("キャベツ ¥198"), ["キャベツ"]);
    }

    #[test]
    fn strips_fullwidth_yen_and_comma_price() {
        assert_eq!(names("和牛切り落とし ￥1,280"), ["和牛切り落とし"]);
    }

    #[test]
    fn strips_unit_price_marker() {
        assert_eq!(names("バナナ @98"), ["バナナ"]);
    }

    #[test]
    fn price_only_line_is_dropped() {
        assert!(names("¥1,280").is_empty());
        assert!(names("  3  ").is_empty());
        assert!(names("1.5").is_empty());
    }

    #[test]
    fn blacklisted_lines_are_dropped() {
        assert!(names("合計 ¥2,345").is_empty());
        assert!(names("キャベツ 合計").is_empty());
        assert!(names("(内消費税等 ¥173)").is_empty());
        assert!(names("レジNo.0012").is_empty());
        assert!(names("電話 03-1234-5678").is_empty());
    }

    #[test]
    fn markers_are_removed() {
        assert_eq!(names("*牛乳 ¥215"), ["牛乳"]);
        assert_eq!(names("※たまご 10個入 ¥248"), ["たまご 10個入"]);
    }

    #[test]
    fn single_character_names_are_excluded() {
        assert!(names("- ¥100").is_empty());
        assert!(names("* 120").is_empty());
        assert_eq!(names("卵 ¥120"), Vec::<String>::new());
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(Extractor::extract("").is_empty());
        assert!(Extractor::extract("\n\n   \n").is_empty());
    }

    #[test]
    fn placeholder_quantity_is_assigned() {
        let items = Extractor::extract("豆腐 ¥88");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Quantity::placeholder());
    }

    #[test]
    fn stripping_is_idempotent_on_clean_names() {
        let first = names("キャベツ ¥198\n豚バラ肉 ¥398\n2% milk");
        let second = names(&first.join("\n"));
        assert_eq!(first, second);
    }

    #[test]
    fn trailing_digits_in_names_are_over_trimmed() {
        // Greedy right-hand stripping; the user fixes these in the draft.
        assert_eq!(names("コーラ 500"), ["コーラ"]);
        assert_eq!(names("コーラ500"), ["コーラ"]);
        assert_eq!(names("2024年5月1日 18:32"), ["2024年5月1日 18:"]);
    }

    #[test]
    fn full_receipt() {
        let text = "\
スーパーマルエツ 新橋店
電話 03-0000-0000
*キャベツ ¥198
豚バラ肉 ¥398
¥1,280
牛乳 1,000ml ¥215

小計 ¥811
消費税 ¥64
合計 ¥875
お預り ¥1,000
お釣り ¥125";
        assert_eq!(names(text), ["キャベツ", "豚バラ肉", "牛乳 1,000ml"]);
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = Extractor::extract("!@#$%^&*()\n\0\x01\x02\n¥¥¥\n,,,");
    }
}
