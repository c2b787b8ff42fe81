//! Compiled matchers over the language-union keyword catalog.

use lazy_static::lazy_static;
use regex::{Match, Regex};
use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::keywords::{self, KeywordCategory};
use crate::models::receipt::Field;

/// Numeral: digits with separators and the letters OCR confuses with digits.
const NUMERAL: &str = r"\d(?:[\dOoIl.,]*[\dO])?";

/// Currency symbols and ISO codes accepted around amounts.
const CURRENCY: &str = r"(?:[€$£¥]|\b(?:EUR|USD|GBP|SEK|NOK|DKK|PLN|CHF|kr|zł)\b\.?)";

lazy_static! {
    pub static ref NUMERAL_PATTERN: Regex = Regex::new(NUMERAL).unwrap();

    pub static ref CURRENCY_PATTERN: Regex = Regex::new(&format!("(?i){}", CURRENCY)).unwrap();

    // Rate like "24%", "14 %", "25,5%"
    pub static ref PERCENT_PATTERN: Regex = Regex::new(
        r"(\d{1,2}(?:[.,]\d{1,2})?)\s?%"
    ).unwrap();

    // Tail of the text before a tax keyword that marks the tax as already
    // included in another figure ("Total incl. 24% VAT", "sis. ALV")
    pub static ref TAX_INCLUSION: Regex = Regex::new(
        r"(?i)\b(?:incl|inkl|including|inclusive|inklusive|inc|ink|sis|sisältää|dont|inclus|incluido|compreso)\b\.?\s*(?:\d{1,2}(?:[.,]\d{1,2})?\s?%\s*)?$"
    ).unwrap();

    pub static ref PATTERNS: PatternSet = PatternSet::build();
}

/// Keyword matcher plus labeled-amount pattern of one category.
#[derive(Debug)]
pub struct CategoryPatterns {
    pub keyword: Regex,
    /// Keyword, optional rate, optional separator, optional currency, numeral.
    pub labeled_amount: Regex,
}

/// All category matchers, compiled once.
#[derive(Debug)]
pub struct PatternSet {
    total: CategoryPatterns,
    subtotal: CategoryPatterns,
    tax: CategoryPatterns,
    item_header: Regex,
}

/// A keyword followed by its amount on one row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledAmount {
    pub keyword: String,
    pub rate: Option<Decimal>,
    pub amount: Decimal,
    /// Byte span of the amount numeral.
    pub amount_span: (usize, usize),
}

/// The summary field a row talks about.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabel {
    pub field: Field,
    pub keyword: String,
    pub span: (usize, usize),
}

/// Alternation over the keyword union: escaped, longest first, with inner
/// whitespace widened to `\s+`.
pub fn keyword_alternation(category: KeywordCategory) -> String {
    keywords::union(category)
        .into_iter()
        .map(|k| {
            k.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn keyword_matcher(category: KeywordCategory) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})\b", keyword_alternation(category))).unwrap()
}

fn labeled_amount_pattern(category: KeywordCategory) -> Regex {
    Regex::new(&format!(
        r"(?i)\b(?P<label>{})\b\s*(?:\(?\s*(?P<rate>\d{{1,2}}(?:[.,]\d{{1,2}})?)\s?%\s*\)?)?\s*[:=|\-]?\s*(?:{}\s*)?(?P<amount>{})",
        keyword_alternation(category),
        CURRENCY,
        NUMERAL,
    ))
    .unwrap()
}

impl CategoryPatterns {
    fn build(category: KeywordCategory) -> Self {
        Self {
            keyword: keyword_matcher(category),
            labeled_amount: labeled_amount_pattern(category),
        }
    }
}

impl PatternSet {
    fn build() -> Self {
        Self {
            total: CategoryPatterns::build(KeywordCategory::Total),
            subtotal: CategoryPatterns::build(KeywordCategory::Subtotal),
            tax: CategoryPatterns::build(KeywordCategory::Tax),
            item_header: keyword_matcher(KeywordCategory::ItemHeader),
        }
    }

    pub fn field(&self, field: Field) -> &CategoryPatterns {
        match field {
            Field::Total => &self.total,
            Field::Subtotal => &self.subtotal,
            Field::Tax => &self.tax,
        }
    }

    pub fn keyword(&self, category: KeywordCategory) -> &Regex {
        match category {
            KeywordCategory::Total => &self.total.keyword,
            KeywordCategory::Subtotal => &self.subtotal.keyword,
            KeywordCategory::Tax => &self.tax.keyword,
            KeywordCategory::ItemHeader => &self.item_header,
        }
    }

    /// Tax keywords that are not preceded by an inclusion marker.
    pub fn tax_keywords<'t>(&self, text: &'t str) -> Vec<Match<'t>> {
        self.tax
            .keyword
            .find_iter(text)
            .filter(|m| !TAX_INCLUSION.is_match(&text[..m.start()]))
            .collect()
    }

    /// Keyword occurrences of a category, with inclusion-marked tax mentions
    /// removed.
    pub fn keywords_of<'t>(&self, category: KeywordCategory, text: &'t str) -> Vec<Match<'t>> {
        match category {
            KeywordCategory::Tax => self.tax_keywords(text),
            other => self.keyword(other).find_iter(text).collect(),
        }
    }

    /// Distinct summary categories mentioned in the text.
    pub fn summary_categories(&self, text: &str) -> Vec<KeywordCategory> {
        KeywordCategory::SUMMARY
            .into_iter()
            .filter(|c| !self.keywords_of(*c, text).is_empty())
            .collect()
    }

    /// Number of item-table caption keywords in the text.
    pub fn item_keyword_count(&self, text: &str) -> usize {
        self.item_header.find_iter(text).count()
    }

    /// First labeled amount of a field on the text.
    ///
    /// Numerals directly followed by `%` are rates, never amounts, and tax
    /// labels preceded by an inclusion marker do not count.
    pub fn labeled(&self, field: Field, text: &str) -> Option<LabeledAmount> {
        for caps in self.field(field).labeled_amount.captures_iter(text) {
            let (Some(label), Some(amount)) = (caps.name("label"), caps.name("amount")) else {
                continue;
            };
            if text[amount.end()..].trim_start().starts_with('%') {
                continue;
            }
            if field == Field::Tax && TAX_INCLUSION.is_match(&text[..label.start()]) {
                continue;
            }
            let Some(value) = parse_amount(amount.as_str()).filter(|v| *v > Decimal::ZERO) else {
                continue;
            };
            let rate = caps.name("rate").and_then(|r| parse_amount(r.as_str()));
            return Some(LabeledAmount {
                keyword: label.as_str().to_string(),
                rate,
                amount: value,
                amount_span: (amount.start(), amount.end()),
            });
        }
        None
    }

    /// Decide which summary field a row is about.
    ///
    /// Subtotal keywords win outright ("Sub total" contains "total"). Between
    /// total and tax, the one with a labeled amount wins; otherwise the
    /// keyword occurring last.
    pub fn classify(&self, text: &str) -> Option<RowLabel> {
        if let Some(m) = self.subtotal.keyword.find(text) {
            return Some(RowLabel::new(Field::Subtotal, m));
        }

        let total = self.total.keyword.find_iter(text).last();
        let tax = self.tax_keywords(text).pop();

        match (total, tax) {
            (None, None) => None,
            (Some(t), None) => Some(RowLabel::new(Field::Total, t)),
            (None, Some(x)) => Some(RowLabel::new(Field::Tax, x)),
            (Some(t), Some(x)) => {
                let total_labeled = self.labeled(Field::Total, text).is_some();
                let tax_labeled = self.labeled(Field::Tax, text).is_some();
                let field = match (total_labeled, tax_labeled) {
                    (true, false) => Field::Total,
                    (false, true) => Field::Tax,
                    _ if t.start() > x.start() => Field::Total,
                    _ => Field::Tax,
                };
                let m = if field == Field::Total { t } else { x };
                Some(RowLabel::new(field, m))
            }
        }
    }
}

impl RowLabel {
    fn new(field: Field, m: Match<'_>) -> Self {
        Self {
            field,
            keyword: m.as_str().to_string(),
            span: (m.start(), m.end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dec;

    #[test]
    fn test_keyword_matchers_cover_languages() {
        let total = PATTERNS.keyword(KeywordCategory::Total);
        assert!(total.is_match("YHTEENSÄ: €15.60"));
        assert!(total.is_match("Grand   Total 9.99"));
        assert!(total.is_match("GESAMT 15,60"));
        assert!(!total.is_match("Totalizer"));

        let tax = PATTERNS.keyword(KeywordCategory::Tax);
        assert!(tax.is_match("MWST 24%"));
        assert!(tax.is_match("moms 25%"));
    }

    #[test]
    fn test_labeled_amount_with_rate() {
        let found = PATTERNS.labeled(Field::Tax, "VAT 24%: €3.02").unwrap();
        assert_eq!(found.amount, dec("3.02"));
        assert_eq!(found.rate, Some(dec("24")));

        let found = PATTERNS.labeled(Field::Tax, "ALV (14 %) = 1,06").unwrap();
        assert_eq!(found.amount, dec("1.06"));
    }

    #[test]
    fn test_labeled_amount_never_takes_rate() {
        assert_eq!(PATTERNS.labeled(Field::Tax, "VAT 24%"), None);
        assert_eq!(PATTERNS.labeled(Field::Total, "Total"), None);
    }

    #[test]
    fn test_labeled_amount_currency_codes() {
        let found = PATTERNS.labeled(Field::Total, "Totalt: 125,50 kr").unwrap();
        assert_eq!(found.amount, dec("125.50"));
        let found = PATTERNS.labeled(Field::Total, "TOTAL EUR 15.60").unwrap();
        assert_eq!(found.amount, dec("15.60"));
    }

    #[test]
    fn test_inclusion_marker_hides_tax() {
        assert!(PATTERNS.tax_keywords("Total incl. VAT 15.60").is_empty());
        assert!(PATTERNS.tax_keywords("Summe inkl. 19% MwSt").is_empty());
        assert_eq!(PATTERNS.tax_keywords("VAT 24% 3.02").len(), 1);
        assert_eq!(PATTERNS.labeled(Field::Tax, "Total incl. VAT 15.60"), None);
    }

    #[test]
    fn test_classify_rows() {
        let label = |t: &str| PATTERNS.classify(t).map(|l| l.field);

        assert_eq!(label("Sub total 12.58"), Some(Field::Subtotal));
        assert_eq!(label("Välisumma: €12.58"), Some(Field::Subtotal));
        assert_eq!(label("TOTAL: €15.60"), Some(Field::Total));
        assert_eq!(label("Total incl. VAT 15.60"), Some(Field::Total));
        assert_eq!(label("Total Tax: €4.30"), Some(Field::Tax));
        assert_eq!(label("ALV 24%: €3.02"), Some(Field::Tax));
        assert_eq!(label("Bread €2.50"), None);
    }
}
