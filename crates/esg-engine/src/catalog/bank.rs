use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;
use tracing::info;

use super::domain::{InvestmentLevel, PillarCode};
use super::{Catalog, CatalogBuilder, CatalogError};

#[derive(Debug, Deserialize)]
struct BankPillar {
    name: String,
    #[serde(default)]
    description: String,
    questions: Vec<QuestionBankEntry>,
}

/// One question as it appears in the bank file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBankEntry {
    pub theme: String,
    pub criteria: String,
    pub question: String,
    #[serde(default)]
    pub investment: Option<InvestmentLevel>,
}

pub(super) fn load<R: Read>(reader: R) -> Result<Catalog, CatalogError> {
    let raw: BTreeMap<String, BankPillar> = serde_json::from_reader(reader)?;

    let mut by_code = BTreeMap::new();
    for (key, pillar) in raw {
        let code = PillarCode::from_code(&key).ok_or(CatalogError::UnknownPillar(key))?;
        if by_code.insert(code, pillar).is_some() {
            return Err(CatalogError::DuplicatePillar(code));
        }
    }

    let mut builder = CatalogBuilder::new();
    for code in PillarCode::ordered() {
        let pillar = by_code.remove(&code).ok_or(CatalogError::MissingPillar(code))?;
        builder = builder.pillar(code, pillar.name, pillar.description);

        for (index, entry) in pillar.questions.into_iter().enumerate() {
            for (field, value) in [
                ("theme", &entry.theme),
                ("criteria", &entry.criteria),
                ("question", &entry.question),
            ] {
                if value.trim().is_empty() {
                    return Err(CatalogError::EmptyField { index, field });
                }
            }
            builder.push_item(
                code,
                entry.theme.trim(),
                entry.investment,
                entry.criteria.trim(),
                entry.question.trim().to_string(),
            );
        }
    }

    let catalog = builder.build()?;
    info!(items = catalog.item_count(), "question bank loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssessmentItemId;

    const BANK: &str = r#"{
        "E": {"name": "Ambiental", "questions": [
            {"theme": "Energia", "criteria": "Consumo", "question": "Monitora o consumo?"},
            {"theme": "Água", "criteria": "Reuso", "question": "Reutiliza água?", "investment": "high"}
        ]},
        "S": {"name": "Social", "questions": [
            {"theme": "Pessoas", "criteria": "Saúde", "question": "Possui CIPA?"}
        ]},
        "G": {"name": "Governança", "description": "Compliance", "questions": [
            {"theme": "Ética", "criteria": "Código", "question": "Tem código de conduta?"}
        ]}
    }"#;

    #[test]
    fn loads_bank_in_pillar_order() {
        let catalog = load(BANK.as_bytes()).expect("bank parses");
        assert_eq!(catalog.item_count(), 4);
        let governance = catalog.pillar(PillarCode::Governance).expect("G");
        assert_eq!(governance.description, "Compliance");
        assert_eq!(
            catalog.pillar_of(AssessmentItemId(3)),
            Some(PillarCode::Social)
        );
        let water = catalog.context(AssessmentItemId(2)).expect("item 2");
        assert_eq!(water.theme.investment_level(), InvestmentLevel::High);
    }

    #[test]
    fn rejects_unknown_pillar_keys() {
        let bank = r#"{"X": {"name": "Extra", "questions": []}}"#;
        match load(bank.as_bytes()) {
            Err(CatalogError::UnknownPillar(key)) => assert_eq!(key, "X"),
            other => panic!("expected unknown pillar, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_questions() {
        let bank = BANK.replace("Possui CIPA?", "  ");
        assert!(matches!(
            load(bank.as_bytes()),
            Err(CatalogError::EmptyField {
                index: 0,
                field: "question"
            })
        ));
    }
}
