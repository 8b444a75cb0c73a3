//! Sorted, filterable detection result list.

use std::fmt::Write as _;

use serde::Serialize;

use crate::category::{category_style, CategoryStyle};
use crate::detect::DetectedObject;
use crate::geometry::confidence_percent;
use crate::present::filter::FilterState;

const BAR_WIDTH: usize = 10;

/// Visual emphasis of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    /// No selection active.
    Normal,
    /// The selected row: full opacity, strong shadow.
    Active,
    /// Another row is selected: dimmed, flat.
    Dimmed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryChip {
    pub name: String,
    pub active: bool,
    #[serde(skip)]
    pub style: &'static CategoryStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    /// Position in the service-returned array.
    pub original_index: usize,
    pub name: String,
    pub parent: String,
    pub confidence_percent: f64,
    pub emphasis: Emphasis,
    #[serde(skip)]
    pub style: &'static CategoryStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultListView {
    /// Distinct categories in first-seen order.
    pub categories: Vec<CategoryChip>,
    /// Visible rows, highest confidence first.
    pub rows: Vec<ResultRow>,
}

impl ResultListView {
    pub fn build(objects: &[DetectedObject], filter: &FilterState) -> Self {
        let mut categories: Vec<CategoryChip> = Vec::new();
        for object in objects {
            if !categories.iter().any(|chip| chip.name == object.parent) {
                categories.push(CategoryChip {
                    name: object.parent.clone(),
                    active: filter.active_category.as_deref() == Some(object.parent.as_str()),
                    style: category_style(&object.parent),
                });
            }
        }

        let rows = sorted_indices(objects)
            .into_iter()
            .filter(|&index| filter.matches_category(&objects[index].parent))
            .map(|index| {
                let object = &objects[index];
                let emphasis = match filter.active_object_index {
                    None => Emphasis::Normal,
                    Some(active) if active == index => Emphasis::Active,
                    Some(_) => Emphasis::Dimmed,
                };
                ResultRow {
                    original_index: index,
                    name: object.name.clone(),
                    parent: object.parent.clone(),
                    confidence_percent: confidence_percent(object.confidence),
                    emphasis,
                    style: category_style(&object.parent),
                }
            })
            .collect();

        Self { categories, rows }
    }

    /// The category bar is only worth showing with two or more categories.
    pub fn show_category_filter(&self) -> bool {
        self.categories.len() > 1
    }

    pub fn render_text(&self) -> String {
        let mut out = String::from("Detection Result\n");
        if self.show_category_filter() {
            let chips: Vec<String> = self
                .categories
                .iter()
                .map(|chip| {
                    if chip.active {
                        format!("[{} {}]", chip.style.glyph, chip.name)
                    } else {
                        format!(" {} {} ", chip.style.glyph, chip.name)
                    }
                })
                .collect();
            let _ = writeln!(out, "{}", chips.join(" "));
        }
        if self.rows.is_empty() {
            out.push_str("  (no objects)\n");
        }
        for row in &self.rows {
            let marker = match row.emphasis {
                Emphasis::Active => '>',
                Emphasis::Normal => ' ',
                Emphasis::Dimmed => '.',
            };
            let _ = writeln!(
                out,
                "{} #{:<3} {} {:<20} {:<12} {:>6.2}% {}",
                marker,
                row.original_index,
                row.style.glyph,
                row.name,
                row.parent,
                row.confidence_percent,
                confidence_bar(row.confidence_percent)
            );
        }
        out
    }
}

/// Original indices ordered by descending confidence.
///
/// The sort is stable, so equal confidences keep service order.
pub fn sorted_indices(objects: &[DetectedObject]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..objects.len()).collect();
    indices.sort_by(|&a, &b| objects[b].confidence.total_cmp(&objects[a].confidence));
    indices
}

fn confidence_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
