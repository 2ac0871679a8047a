use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PillarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThemeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriteriaId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssessmentItemId(pub u32);

impl fmt::Display for AssessmentItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three ESG macro-categories, keyed by their stable single-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PillarCode {
    #[serde(rename = "E")]
    Environmental,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "G")]
    Governance,
}

impl PillarCode {
    pub const fn ordered() -> [Self; 3] {
        [Self::Environmental, Self::Social, Self::Governance]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Environmental => "E",
            Self::Social => "S",
            Self::Governance => "G",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Environmental => "Ambiental",
            Self::Social => "Social",
            Self::Governance => "Governança",
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "E" => Some(Self::Environmental),
            "S" => Some(Self::Social),
            "G" => Some(Self::Governance),
            _ => None,
        }
    }
}

impl fmt::Display for PillarCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse implementation-cost estimate attached to remediation work in a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentLevel {
    Low,
    Medium,
    High,
}

impl InvestmentLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Baixo",
            Self::Medium => "Médio",
            Self::High => "Alto",
        }
    }

    /// Fallback for themes without an explicit tier, keyed off the theme's display name.
    pub fn infer_from_theme_name(name: &str) -> Self {
        if name.contains("Governança") || name.contains("Transparência") {
            Self::Low
        } else if name.contains("Energia") || name.contains("Mudanças climáticas") {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentItem {
    pub id: AssessmentItemId,
    pub question: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub id: CriteriaId,
    pub name: String,
    pub order: u32,
    pub items: Vec<AssessmentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    pub order: u32,
    /// Explicit investment tier; when absent the tier is inferred from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment: Option<InvestmentLevel>,
    pub criteria: Vec<Criteria>,
}

impl Theme {
    pub fn investment_level(&self) -> InvestmentLevel {
        self.investment
            .unwrap_or_else(|| InvestmentLevel::infer_from_theme_name(&self.name))
    }

    pub fn items(&self) -> impl Iterator<Item = &AssessmentItem> {
        self.criteria.iter().flat_map(|criteria| criteria.items.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: PillarId,
    pub code: PillarCode,
    pub name: String,
    pub description: String,
    pub themes: Vec<Theme>,
}

impl Pillar {
    pub fn items(&self) -> impl Iterator<Item = &AssessmentItem> {
        self.themes.iter().flat_map(Theme::items)
    }
}

/// Borrowed view of where an item sits in the tree.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub pillar: &'a Pillar,
    pub theme: &'a Theme,
    pub criteria: &'a Criteria,
    pub item: &'a AssessmentItem,
}
