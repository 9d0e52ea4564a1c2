// 🏗️ Extractor - price document lines → category / sub-category / item
//
// A line-by-line state machine. Each line is matched against an ordered
// table of named rules; the first rule that matches decides what the line
// is. The current category and sub-category are carried from one line to
// the next, so lines must be fed in document order.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::{title_case, CategoryRegistry, NewItem};
use crate::normalize::{normalize_currency, parse_decimal};

// ============================================================================
// PATTERNS
// ============================================================================

/// Uppercase phrase directly followed by "(", e.g. "SALMON (Salmo salar)".
const HEADER_PATTERN: &str = r"^([A-Z][A-Z ]+)\s*\(";

/// Marker every category header carries somewhere on the line.
const HEADER_MARKER: &str = "Price";

/// "12,50 In Stock", "7 On Request", "9,90 during" …
///
/// The token starts at the line start or after whitespace and takes every
/// digit, comma and dot before the availability phrase. Its shape is checked
/// separately against `PRICE_TOKEN_PATTERN`.
const PRICE_PATTERN: &str = r"(?i)(?:^|\s)([\d.,]*\d)\s+(In Stock|On Request|During)";

/// Shape a captured price token must have: integer part, optional `,dd`.
const PRICE_TOKEN_PATTERN: &str = r"^\d+(?:,\d{2})?$";

/// Lines with this character are table rows, never sub-category labels.
const COLUMN_SEPARATOR: char = '|';

/// Compiled regexes shared by every rule.
#[derive(Debug, Clone)]
pub struct LinePatterns {
    header: Regex,
    price: Regex,
    price_token: Regex,
}

impl LinePatterns {
    pub fn new() -> Result<Self> {
        Ok(LinePatterns {
            header: Regex::new(HEADER_PATTERN).context("Invalid category header pattern")?,
            price: Regex::new(PRICE_PATTERN).context("Invalid price pattern")?,
            price_token: Regex::new(PRICE_TOKEN_PATTERN).context("Invalid price token pattern")?,
        })
    }

    /// Value of a captured price token, `None` when it is malformed.
    pub fn price_value(&self, token: &str) -> Option<f64> {
        if !self.price_token.is_match(token) {
            return None;
        }
        parse_decimal(token)
    }

    pub fn has_price(&self, line: &str) -> bool {
        self.price.is_match(line)
    }
}

// ============================================================================
// LINE CLASSIFICATION
// ============================================================================

/// What a single line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineClass {
    /// Title-cased category name.
    CategoryHeader { name: String },
    /// Text before the price, the raw price token and the availability phrase.
    ProductRow {
        name: String,
        price_token: String,
        availability: String,
    },
    SubCategory { label: String },
    Ignored,
}

/// A named classification rule.
///
/// `matcher` gets the trimmed line and whether a category is active.
#[derive(Clone, Copy)]
pub struct LineRule {
    pub name: &'static str,
    matcher: fn(&LinePatterns, &str, bool) -> Option<LineClass>,
}

impl LineRule {
    pub fn apply(&self, patterns: &LinePatterns, line: &str, category_active: bool) -> Option<LineClass> {
        (self.matcher)(patterns, line, category_active)
    }
}

/// Classification rules in priority order. First match wins.
pub const RULES: [LineRule; 3] = [
    LineRule {
        name: "category-header",
        matcher: match_category_header,
    },
    LineRule {
        name: "product-row",
        matcher: match_product_row,
    },
    LineRule {
        name: "sub-category",
        matcher: match_sub_category,
    },
];

fn match_category_header(patterns: &LinePatterns, line: &str, _active: bool) -> Option<LineClass> {
    if !line.contains(HEADER_MARKER) {
        return None;
    }
    let caps = patterns.header.captures(line)?;
    let name = title_case(caps[1].trim());
    if name.is_empty() {
        return None;
    }
    Some(LineClass::CategoryHeader { name })
}

// Matches with or without an active category; orphan rows are dropped by
// the run, not here, so they never fall through to the sub-category rule.
fn match_product_row(patterns: &LinePatterns, line: &str, _active: bool) -> Option<LineClass> {
    let caps = patterns.price.captures(line)?;
    let token = caps.get(1)?;
    Some(LineClass::ProductRow {
        name: line[..token.start()].trim().to_string(),
        price_token: token.as_str().to_string(),
        availability: caps[2].to_string(),
    })
}

fn match_sub_category(patterns: &LinePatterns, line: &str, active: bool) -> Option<LineClass> {
    if !active || line.is_empty() || line.contains(COLUMN_SEPARATOR) || patterns.has_price(line) {
        return None;
    }
    Some(LineClass::SubCategory {
        label: line.to_string(),
    })
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCategory {
    pub name: String,
    pub items: Vec<NewItem>,
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub lines: usize,
    pub headers: usize,
    /// Headers that resolved to an already-registered category.
    pub repeated_headers: usize,
    pub sub_categories: usize,
    pub items: usize,
    /// Product rows seen before any category header.
    pub orphan_rows: usize,
    /// Product rows whose price token did not parse.
    pub skipped_rows: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCatalog {
    pub categories: Vec<ExtractedCategory>,
    pub stats: ExtractionStats,
}

impl ExtractedCatalog {
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Stateless configuration; each call to [`Extractor::extract`] starts a
/// fresh run with its own category registry.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: LinePatterns,
    default_currency: String,
}

impl Extractor {
    pub fn new(default_currency: impl Into<String>) -> Result<Self> {
        let default_currency = default_currency.into();
        Ok(Extractor {
            patterns: LinePatterns::new()?,
            default_currency: normalize_currency(&default_currency).unwrap_or(default_currency),
        })
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Classify one line on its own. Surrounding whitespace is ignored.
    pub fn classify(&self, line: &str, category_active: bool) -> LineClass {
        let line = line.trim();
        RULES
            .iter()
            .find_map(|rule| rule.apply(&self.patterns, line, category_active))
            .unwrap_or(LineClass::Ignored)
    }

    /// Name of the rule that claims `line`, for diagnostics.
    pub fn matching_rule(&self, line: &str, category_active: bool) -> Option<&'static str> {
        let line = line.trim();
        RULES
            .iter()
            .find(|rule| rule.apply(&self.patterns, line, category_active).is_some())
            .map(|rule| rule.name)
    }

    pub fn extract<I, S>(&self, lines: I) -> ExtractedCatalog
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut run = ExtractionRun::new(self);
        for line in lines {
            run.feed(line.as_ref());
        }
        run.finish()
    }
}

/// Mutable state of one pass over a document.
struct ExtractionRun<'e> {
    extractor: &'e Extractor,
    registry: CategoryRegistry,
    categories: Vec<ExtractedCategory>,
    current_category: Option<usize>,
    current_sub_category: String,
    stats: ExtractionStats,
}

impl<'e> ExtractionRun<'e> {
    fn new(extractor: &'e Extractor) -> Self {
        ExtractionRun {
            extractor,
            registry: CategoryRegistry::new(),
            categories: Vec::new(),
            current_category: None,
            current_sub_category: String::new(),
            stats: ExtractionStats::default(),
        }
    }

    fn feed(&mut self, raw: &str) {
        self.stats.lines += 1;
        let line_no = self.stats.lines;

        match self.extractor.classify(raw, self.current_category.is_some()) {
            LineClass::CategoryHeader { name } => {
                let (slot, created) = self.registry.resolve(&name, self.categories.len());
                if created {
                    self.categories.push(ExtractedCategory {
                        name,
                        items: Vec::new(),
                    });
                } else {
                    self.stats.repeated_headers += 1;
                }
                self.stats.headers += 1;
                self.current_category = Some(slot);
                self.current_sub_category.clear();
            }
            LineClass::ProductRow {
                name,
                price_token,
                availability,
            } => {
                let Some(slot) = self.current_category else {
                    debug!(line = line_no, "Product row outside any category, dropped");
                    self.stats.orphan_rows += 1;
                    return;
                };
                let Some(base_cost) = self.extractor.patterns.price_value(&price_token) else {
                    debug!(line = line_no, token = %price_token, "Unparsable price, line skipped");
                    self.stats.skipped_rows += 1;
                    return;
                };
                debug!(line = line_no, %name, base_cost, %availability, "Product row");
                self.categories[slot].items.push(NewItem::from_document(
                    name,
                    self.current_sub_category.clone(),
                    self.extractor.default_currency.clone(),
                    base_cost,
                ));
                self.stats.items += 1;
            }
            LineClass::SubCategory { label } => {
                self.current_sub_category = label;
                self.stats.sub_categories += 1;
            }
            LineClass::Ignored => {
                self.stats.ignored += 1;
            }
        }
    }

    fn finish(self) -> ExtractedCatalog {
        info!(
            lines = self.stats.lines,
            categories = self.categories.len(),
            items = self.stats.items,
            orphans = self.stats.orphan_rows,
            skipped = self.stats.skipped_rows,
            "Extraction finished"
        );
        ExtractedCatalog {
            categories: self.categories,
            stats: self.stats,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
