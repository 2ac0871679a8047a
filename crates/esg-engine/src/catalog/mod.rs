//! Read-only ESG question catalog: pillars, themes, criteria and assessment items.
//!
//! The catalog is assembled once at boot, either from the built-in sample or from a
//! JSON question bank, and then shared behind an `Arc` by every service that needs to
//! resolve an item to its pillar or theme.

mod bank;
pub mod domain;
mod seed;

use std::collections::HashMap;

pub use bank::QuestionBankEntry;
pub use domain::{
    AssessmentItem, AssessmentItemId, Criteria, CriteriaId, InvestmentLevel, ItemContext, Pillar,
    PillarCode, PillarId, Theme, ThemeId,
};
pub use seed::sample_catalog;

/// Failures raised while assembling a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("assessment item {0} appears more than once")]
    DuplicateItem(AssessmentItemId),
    #[error("pillar {0} is declared more than once")]
    DuplicatePillar(PillarCode),
    #[error("pillar {0} has no definition")]
    MissingPillar(PillarCode),
    #[error("unknown pillar code '{0}'")]
    UnknownPillar(String),
    #[error("question bank entry {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
    #[error("unable to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
struct ItemPosition {
    pillar: usize,
    theme: usize,
    criteria: usize,
    item: usize,
}

/// Immutable catalog with an item index for constant-time lookups.
#[derive(Debug, Clone)]
pub struct Catalog {
    pillars: Vec<Pillar>,
    index: HashMap<AssessmentItemId, ItemPosition>,
}

impl Catalog {
    /// Validates the tree: every pillar code exactly once, item ids unique.
    pub fn new(mut pillars: Vec<Pillar>) -> Result<Self, CatalogError> {
        pillars.sort_by_key(|pillar| pillar.code);
        for pair in pillars.windows(2) {
            if pair[0].code == pair[1].code {
                return Err(CatalogError::DuplicatePillar(pair[0].code));
            }
        }
        for code in PillarCode::ordered() {
            if !pillars.iter().any(|pillar| pillar.code == code) {
                return Err(CatalogError::MissingPillar(code));
            }
        }

        let mut index = HashMap::new();
        for (p, pillar) in pillars.iter().enumerate() {
            for (t, theme) in pillar.themes.iter().enumerate() {
                for (c, criteria) in theme.criteria.iter().enumerate() {
                    for (i, item) in criteria.items.iter().enumerate() {
                        let position = ItemPosition {
                            pillar: p,
                            theme: t,
                            criteria: c,
                            item: i,
                        };
                        if index.insert(item.id, position).is_some() {
                            return Err(CatalogError::DuplicateItem(item.id));
                        }
                    }
                }
            }
        }

        Ok(Self { pillars, index })
    }

    /// Parses a JSON question bank keyed by pillar code.
    pub fn from_question_bank<R: std::io::Read>(reader: R) -> Result<Self, CatalogError> {
        bank::load(reader)
    }

    pub fn from_question_bank_path(path: &std::path::Path) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_question_bank(std::io::BufReader::new(file))
    }

    /// Pillars in E, S, G order.
    pub fn pillars(&self) -> &[Pillar] {
        &self.pillars
    }

    pub fn pillar(&self, code: PillarCode) -> Option<&Pillar> {
        self.pillars.iter().find(|pillar| pillar.code == code)
    }

    pub fn pillar_item_ids(&self, code: PillarCode) -> Vec<AssessmentItemId> {
        self.pillar(code)
            .map(|pillar| pillar.items().map(|item| item.id).collect())
            .unwrap_or_default()
    }

    pub fn context(&self, id: AssessmentItemId) -> Option<ItemContext<'_>> {
        let position = self.index.get(&id)?;
        let pillar = self.pillars.get(position.pillar)?;
        let theme = pillar.themes.get(position.theme)?;
        let criteria = theme.criteria.get(position.criteria)?;
        let item = criteria.items.get(position.item)?;
        Some(ItemContext {
            pillar,
            theme,
            criteria,
            item,
        })
    }

    pub fn pillar_of(&self, id: AssessmentItemId) -> Option<PillarCode> {
        self.context(id).map(|context| context.pillar.code)
    }

    pub fn contains(&self, id: AssessmentItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn item_count(&self) -> usize {
        self.index.len()
    }
}

/// Incrementally assembles a catalog, assigning sequential ids in insertion order.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    pillars: Vec<Pillar>,
    next_theme: u32,
    next_criteria: u32,
    next_item: u32,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pillar(
        mut self,
        code: PillarCode,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.ensure_pillar(code, name.into(), description.into());
        self
    }

    pub fn item(
        mut self,
        code: PillarCode,
        theme: &str,
        criteria: &str,
        question: impl Into<String>,
    ) -> Self {
        self.push_item(code, theme, None, criteria, question.into());
        self
    }

    pub(crate) fn push_item(
        &mut self,
        code: PillarCode,
        theme_name: &str,
        investment: Option<InvestmentLevel>,
        criteria_name: &str,
        question: String,
    ) -> AssessmentItemId {
        let pillar_index = self.ensure_pillar(code, code.label().to_string(), String::new());

        let theme_position = self.pillars[pillar_index]
            .themes
            .iter()
            .position(|theme| theme.name == theme_name);
        let theme_index = match theme_position {
            Some(index) => index,
            None => {
                self.next_theme += 1;
                let themes = &mut self.pillars[pillar_index].themes;
                let order = themes.len() as u32 + 1;
                themes.push(Theme {
                    id: ThemeId(self.next_theme),
                    name: theme_name.to_string(),
                    order,
                    investment,
                    criteria: Vec::new(),
                });
                themes.len() - 1
            }
        };

        let theme = &mut self.pillars[pillar_index].themes[theme_index];
        if theme.investment.is_none() {
            theme.investment = investment;
        }
        let criteria_index = match theme
            .criteria
            .iter()
            .position(|criteria| criteria.name == criteria_name)
        {
            Some(index) => index,
            None => {
                self.next_criteria += 1;
                let order = theme.criteria.len() as u32 + 1;
                theme.criteria.push(Criteria {
                    id: CriteriaId(self.next_criteria),
                    name: criteria_name.to_string(),
                    order,
                    items: Vec::new(),
                });
                theme.criteria.len() - 1
            }
        };

        self.next_item += 1;
        let id = AssessmentItemId(self.next_item);
        let items = &mut theme.criteria[criteria_index].items;
        let order = items.len() as u32 + 1;
        items.push(AssessmentItem {
            id,
            question,
            order,
        });
        id
    }

    fn ensure_pillar(&mut self, code: PillarCode, name: String, description: String) -> usize {
        if let Some(index) = self.pillars.iter().position(|pillar| pillar.code == code) {
            let pillar = &mut self.pillars[index];
            if pillar.description.is_empty() && !description.is_empty() {
                pillar.description = description;
            }
            if name != code.label() {
                pillar.name = name;
            }
            return index;
        }
        let id = PillarId(self.pillars.len() as u32 + 1);
        self.pillars.push(Pillar {
            id,
            code,
            name,
            description,
            themes: Vec::new(),
        });
        self.pillars.len() - 1
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        Catalog::new(self.pillars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Catalog {
        CatalogBuilder::new()
            .item(PillarCode::Environmental, "Energia", "Consumo", "Mede consumo?")
            .item(PillarCode::Environmental, "Energia", "Consumo", "Tem metas?")
            .item(PillarCode::Social, "Pessoas", "Saúde", "Tem CIPA?")
            .item(PillarCode::Governance, "Ética", "Código", "Tem código de conduta?")
            .build()
            .expect("catalog builds")
    }

    #[test]
    fn builder_assigns_sequential_ids_and_groups_themes() {
        let catalog = tiny();
        assert_eq!(catalog.item_count(), 4);
        let environmental = catalog.pillar(PillarCode::Environmental).expect("E exists");
        assert_eq!(environmental.themes.len(), 1);
        assert_eq!(environmental.themes[0].criteria[0].items.len(), 2);
        assert_eq!(
            catalog.pillar_item_ids(PillarCode::Environmental),
            vec![AssessmentItemId(1), AssessmentItemId(2)]
        );
    }

    #[test]
    fn context_resolves_pillar_and_theme() {
        let catalog = tiny();
        let context = catalog.context(AssessmentItemId(3)).expect("item 3 exists");
        assert_eq!(context.pillar.code, PillarCode::Social);
        assert_eq!(context.theme.name, "Pessoas");
        assert_eq!(context.item.question, "Tem CIPA?");
        assert!(catalog.context(AssessmentItemId(99)).is_none());
    }

    #[test]
    fn rejects_catalog_without_all_pillars() {
        let result = CatalogBuilder::new()
            .item(PillarCode::Environmental, "Energia", "Consumo", "Mede?")
            .item(PillarCode::Social, "Pessoas", "Saúde", "Tem CIPA?")
            .build();
        assert!(matches!(
            result,
            Err(CatalogError::MissingPillar(PillarCode::Governance))
        ));
    }

    #[test]
    fn rejects_duplicate_item_ids() {
        let mut pillars = tiny().pillars().to_vec();
        let duplicate = pillars[0].themes[0].criteria[0].items[0].clone();
        pillars[1].themes[0].criteria[0].items.push(duplicate);
        assert!(matches!(
            Catalog::new(pillars),
            Err(CatalogError::DuplicateItem(AssessmentItemId(1)))
        ));
    }
}
