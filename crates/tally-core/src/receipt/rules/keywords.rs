//! Multilingual keyword catalog.
//!
//! Static data only. Matchers are compiled from the union of every language
//! in [`super::patterns`], so the detected language never selects a branch.
//! Keywords are lowercase; internal whitespace matches any run of spaces.

use crate::models::receipt::Field;

/// Keyword categories recognized on receipt rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordCategory {
    Total,
    Subtotal,
    Tax,
    /// Column captions of item/product tables (quantity, description, ...).
    ItemHeader,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 4] = [
        KeywordCategory::Total,
        KeywordCategory::Subtotal,
        KeywordCategory::Tax,
        KeywordCategory::ItemHeader,
    ];

    /// Categories that label summary values.
    pub const SUMMARY: [KeywordCategory; 3] = [
        KeywordCategory::Total,
        KeywordCategory::Subtotal,
        KeywordCategory::Tax,
    ];
}

impl From<Field> for KeywordCategory {
    fn from(field: Field) -> Self {
        match field {
            Field::Total => KeywordCategory::Total,
            Field::Subtotal => KeywordCategory::Subtotal,
            Field::Tax => KeywordCategory::Tax,
        }
    }
}

/// Surface keywords of one language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageKeywords {
    /// ISO 639-1 code.
    pub language: &'static str,
    pub keywords: &'static [&'static str],
}

const fn lang(language: &'static str, keywords: &'static [&'static str]) -> LanguageKeywords {
    LanguageKeywords { language, keywords }
}

pub static TOTAL_KEYWORDS: &[LanguageKeywords] = &[
    lang(
        "en",
        &[
            "total",
            "grand total",
            "total due",
            "total amount",
            "amount due",
            "balance due",
            "to pay",
        ],
    ),
    lang("fi", &["yhteensä", "yhteensa", "summa", "maksettava", "loppusumma"]),
    lang("sv", &["totalt", "summa", "att betala", "totalbelopp"]),
    lang(
        "de",
        &["gesamt", "summe", "gesamtbetrag", "gesamtsumme", "endbetrag", "zu zahlen"],
    ),
    lang("fr", &["total", "total ttc", "montant total", "net à payer"]),
    lang("es", &["total", "importe total", "total a pagar"]),
    lang("it", &["totale", "importo totale", "totale complessivo"]),
    lang("nl", &["totaal", "te betalen"]),
    lang("pl", &["razem", "suma", "do zapłaty", "do zaplaty"]),
];

pub static SUBTOTAL_KEYWORDS: &[LanguageKeywords] = &[
    lang(
        "en",
        &[
            "subtotal",
            "sub total",
            "sub-total",
            "net amount",
            "net total",
            "total before tax",
        ],
    ),
    lang("fi", &["välisumma", "valisumma", "veroton", "veroton summa"]),
    lang("sv", &["delsumma", "netto", "exkl. moms", "exkl moms"]),
    lang(
        "de",
        &["zwischensumme", "netto", "nettobetrag", "nettosumme", "summe netto"],
    ),
    lang("fr", &["sous-total", "sous total", "total ht", "montant ht"]),
    lang("es", &["subtotal", "base imponible"]),
    lang("it", &["subtotale", "imponibile"]),
    lang("nl", &["subtotaal"]),
    lang("pl", &["netto", "wartość netto", "razem netto"]),
];

pub static TAX_KEYWORDS: &[LanguageKeywords] = &[
    lang("en", &["tax", "vat", "sales tax", "gst", "hst", "pst"]),
    lang("fi", &["alv", "arvonlisävero", "vero"]),
    lang("sv", &["moms", "mervärdesskatt"]),
    lang("de", &["mwst", "ust", "umsatzsteuer", "mehrwertsteuer"]),
    lang("fr", &["tva"]),
    lang("es", &["iva", "impuesto"]),
    lang("it", &["iva", "imposta"]),
    lang("nl", &["btw"]),
    lang("pl", &["vat", "podatek", "ptu"]),
];

pub static ITEM_HEADER_KEYWORDS: &[LanguageKeywords] = &[
    lang(
        "en",
        &[
            "qty",
            "quantity",
            "description",
            "item",
            "items",
            "unit price",
            "price",
            "amount",
            "pcs",
            "article",
        ],
    ),
    lang(
        "fi",
        &["määrä", "tuote", "tuotteet", "kuvaus", "kpl", "hinta", "yksikköhinta", "a-hinta"],
    ),
    lang(
        "sv",
        &["antal", "vara", "varor", "beskrivning", "st", "pris", "styckpris", "á-pris"],
    ),
    lang(
        "de",
        &["menge", "artikel", "beschreibung", "bezeichnung", "stk", "einzelpreis", "preis", "anzahl"],
    ),
    lang(
        "fr",
        &["qté", "quantité", "désignation", "description", "prix unitaire", "prix", "article"],
    ),
    lang(
        "es",
        &["cantidad", "descripción", "precio", "precio unitario", "artículo"],
    ),
    lang("it", &["quantità", "descrizione", "prezzo", "articolo"]),
    lang("nl", &["aantal", "omschrijving", "prijs", "artikel"]),
    lang("pl", &["ilość", "nazwa", "cena", "jm", "lp"]),
];

/// Per-language keyword table of a category.
pub fn catalog(category: KeywordCategory) -> &'static [LanguageKeywords] {
    match category {
        KeywordCategory::Total => TOTAL_KEYWORDS,
        KeywordCategory::Subtotal => SUBTOTAL_KEYWORDS,
        KeywordCategory::Tax => TAX_KEYWORDS,
        KeywordCategory::ItemHeader => ITEM_HEADER_KEYWORDS,
    }
}

/// Union of all languages' keywords for a category, deduplicated, longest
/// first so that alternation prefers "grand total" over "total".
pub fn union(category: KeywordCategory) -> Vec<&'static str> {
    let mut keywords: Vec<&'static str> = catalog(category)
        .iter()
        .flat_map(|l| l.keywords.iter().copied())
        .collect();
    keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    keywords.dedup();
    keywords
}
