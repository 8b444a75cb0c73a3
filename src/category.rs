//! Category display table.
//!
//! The detection service tags each object with a parent category. Known categories
//! map to an icon and colour set; anything else uses `DEFAULT_CATEGORY_STYLE`.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryName {
    Human,
    Animal,
    Object,
    Furniture,
    Sport,
    Food,
    Electronic,
    Kitchenware,
    Accessory,
    Vehicle,
}

impl CategoryName {
    pub const ALL: [CategoryName; 10] = [
        CategoryName::Human,
        CategoryName::Animal,
        CategoryName::Object,
        CategoryName::Furniture,
        CategoryName::Sport,
        CategoryName::Food,
        CategoryName::Electronic,
        CategoryName::Kitchenware,
        CategoryName::Accessory,
        CategoryName::Vehicle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryName::Human => "human",
            CategoryName::Animal => "animal",
            CategoryName::Object => "object",
            CategoryName::Furniture => "furniture",
            CategoryName::Sport => "sport",
            CategoryName::Food => "food",
            CategoryName::Electronic => "electronic",
            CategoryName::Kitchenware => "kitchenware",
            CategoryName::Accessory => "accessory",
            CategoryName::Vehicle => "vehicle",
        }
    }

    pub fn style(&self) -> &'static CategoryStyle {
        match self {
            CategoryName::Human => &HUMAN,
            CategoryName::Animal => &ANIMAL,
            CategoryName::Object => &OBJECT,
            CategoryName::Furniture => &FURNITURE,
            CategoryName::Sport => &SPORT,
            CategoryName::Food => &FOOD,
            CategoryName::Electronic => &ELECTRONIC,
            CategoryName::Kitchenware => &KITCHENWARE,
            CategoryName::Accessory => &ACCESSORY,
            CategoryName::Vehicle => &VEHICLE,
        }
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        CategoryName::ALL
            .into_iter()
            .find(|name| name.as_str() == lowered)
            .ok_or_else(|| anyhow!("unknown category '{}'", s))
    }
}

/// Palette classes for the row text, the badge background and the box border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryColors {
    pub text: &'static str,
    pub bg: &'static str,
    pub border: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryStyle {
    /// Icon name.
    pub icon: &'static str,
    /// Single-character stand-in for the icon in terminal output.
    pub glyph: char,
    pub colors: CategoryColors,
    /// Border colour for drawn overlays.
    pub rgb: [u8; 3],
}

/// Palette classes for one colour token, e.g. `text-pink-400`.
macro_rules! palette {
    ($color:literal) => {
        CategoryColors {
            text: concat!("text-", $color),
            bg: concat!("bg-", $color),
            border: concat!("border-", $color),
        }
    };
}

const fn style(icon: &'static str, glyph: char, colors: CategoryColors, rgb: [u8; 3]) -> CategoryStyle {
    CategoryStyle {
        icon,
        glyph,
        colors,
        rgb,
    }
}

const PINK_400: [u8; 3] = [244, 114, 182];
const BLUE_500: [u8; 3] = [59, 130, 246];
const BLUE_400: [u8; 3] = [96, 165, 250];
const GREEN_500: [u8; 3] = [16, 185, 129];
const YELLOW_800: [u8; 3] = [146, 64, 14];
const YELLOW_400: [u8; 3] = [251, 191, 36];
const RED_500: [u8; 3] = [239, 68, 68];
const PURPLE_500: [u8; 3] = [139, 92, 246];
const GRAY_600: [u8; 3] = [75, 85, 99];

static HUMAN: CategoryStyle = style("user", 'H', palette!("pink-400"), PINK_400);
static ANIMAL: CategoryStyle = style("paw", 'A', palette!("blue-500"), BLUE_500);
static OBJECT: CategoryStyle = style("cube", 'O', palette!("green-500"), GREEN_500);
static FURNITURE: CategoryStyle = style("couch", 'F', palette!("yellow-800"), YELLOW_800);
static SPORT: CategoryStyle = style("basketball-ball", 'S', palette!("red-500"), RED_500);
static FOOD: CategoryStyle = style("hamburger", 'B', palette!("yellow-400"), YELLOW_400);
static ELECTRONIC: CategoryStyle = style("plug", 'E', palette!("purple-500"), PURPLE_500);
static KITCHENWARE: CategoryStyle = style("sink", 'K', palette!("blue-400"), BLUE_400);
// accessory reuses the sink icon
static ACCESSORY: CategoryStyle = style("sink", 'C', palette!("red-500"), RED_500);
static VEHICLE: CategoryStyle = style("car", 'V', palette!("red-500"), RED_500);

pub static DEFAULT_CATEGORY_STYLE: CategoryStyle = style("question", '?', palette!("gray-600"), GRAY_600);

/// Style for a parent category reported by the service.
pub fn category_style(parent: &str) -> &'static CategoryStyle {
    parent
        .parse::<CategoryName>()
        .map(|name| name.style())
        .unwrap_or(&DEFAULT_CATEGORY_STYLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_parse_case_insensitively() {
        assert_eq!("human".parse::<CategoryName>().unwrap(), CategoryName::Human);
        assert_eq!("Vehicle".parse::<CategoryName>().unwrap(), CategoryName::Vehicle);
        assert!("plant".parse::<CategoryName>().is_err());
    }

    #[test]
    fn unknown_category_falls_back_to_question_mark() {
        let style = category_style("plant");
        assert_eq!(style.icon, "question");
        assert_eq!(style.colors.border, "border-gray-600");
        assert_eq!(style, &DEFAULT_CATEGORY_STYLE);
    }

    #[test]
    fn every_category_has_a_distinct_style_entry() {
        for name in CategoryName::ALL {
            assert_eq!(name.to_string().parse::<CategoryName>().unwrap(), name);
            assert_ne!(name.style().icon, "question");
        }
        let human = category_style("human");
        assert_eq!(human.colors.text, "text-pink-400");
        assert_eq!(human.colors.bg, "bg-pink-400");
        assert_eq!(human.colors.border, "border-pink-400");
        assert_eq!(category_style("accessory").icon, "sink");
    }
}
