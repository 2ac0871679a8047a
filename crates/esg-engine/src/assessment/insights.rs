use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::domain::{InsightId, OutputIds, ScoreCard};
use crate::catalog::{Catalog, PillarCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Critical,
    Attention,
    Excellent,
}

impl InsightCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Crítico",
            Self::Attention => "Atenção",
            Self::Excellent => "Excelente",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicInsight {
    pub id: InsightId,
    pub category: InsightCategory,
    pub category_label: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar: Option<PillarCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar_name: Option<String>,
}

fn whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

struct PillarCopy {
    critical: (&'static str, &'static str),
    attention: (&'static str, &'static str),
    excellent: (&'static str, &'static str),
}

fn pillar_copy(code: PillarCode) -> PillarCopy {
    match code {
        PillarCode::Environmental => PillarCopy {
            critical: (
                "Gestão Ambiental Urgente",
                "Implementação urgente de políticas ambientais necessária. Potencial de melhoria de até {gap} pontos no score ESG, com ações específicas de gestão de emissões, energia e resíduos.",
            ),
            attention: (
                "Políticas Ambientais Parciais",
                "Políticas ambientais parcialmente implementadas (score {score}). Recomendamos expansão das iniciativas com foco em eficiência energética e gestão de resíduos nos próximos 90 dias.",
            ),
            excellent: (
                "Destaque em Sustentabilidade Ambiental",
                "Parabéns! Suas práticas ambientais estão {lead}% acima da média. Continue investindo em inovação verde e economia circular.",
            ),
        },
        PillarCode::Social => PillarCopy {
            critical: (
                "Responsabilidade Social Crítica",
                "Score social de {score}. Implementação urgente de políticas sociais e de direitos humanos necessária, com foco em diversidade, saúde ocupacional e desenvolvimento de colaboradores.",
            ),
            attention: (
                "Diversidade e Inclusão",
                "Políticas de diversidade parcialmente implementadas (score {score}). Recomendamos expansão das iniciativas com foco em representatividade em cargos executivos.",
            ),
            excellent: (
                "Excelência em Responsabilidade Social",
                "Parabéns! Com score {score}, suas práticas sociais são referência. Continue investindo em bem-estar dos colaboradores e impacto comunitário.",
            ),
        },
        PillarCode::Governance => PillarCopy {
            critical: (
                "Governança e Compliance Urgente",
                "Score de governança de {score}. Implementação urgente de estruturas de governança e compliance necessária, com foco em transparência, ética e gestão de riscos.",
            ),
            attention: (
                "Governança em Desenvolvimento",
                "Estruturas de governança parcialmente implementadas (score {score}). Recomendamos fortalecimento de compliance e transparência.",
            ),
            excellent: (
                "Excelência em Governança",
                "Parabéns! Com score {score}, suas práticas de ética e transparência estão acima da média do mercado. Continue investindo em compliance e comunicação transparente.",
            ),
        },
    }
}

fn render(template: &str, score: Decimal) -> String {
    template
        .replace("{score}", &score.to_string())
        .replace("{gap}", &whole(Decimal::ONE_HUNDRED - score).to_string())
        .replace("{lead}", &whole(score - Decimal::from(70)).to_string())
}

fn insight(
    id: InsightId,
    category: InsightCategory,
    title: &str,
    description: String,
    pillar: Option<(PillarCode, String)>,
) -> StrategicInsight {
    let (pillar, pillar_name) = match pillar {
        Some((code, name)) => (Some(code), Some(name)),
        None => (None, None),
    };
    StrategicInsight {
        id,
        category,
        category_label: category.label().to_string(),
        title: title.to_string(),
        description,
        pillar,
        pillar_name,
    }
}

/// Classifies each pillar (<50 critical, <70 attention, >85 excellent, silent otherwise)
/// plus the overall score (<50 critical, >85 excellent).
pub fn generate_insights(
    scores: &ScoreCard,
    catalog: &Catalog,
    ids: &OutputIds,
) -> Vec<StrategicInsight> {
    let fifty = Decimal::from(50);
    let seventy = Decimal::from(70);
    let eighty_five = Decimal::from(85);

    let mut insights = Vec::new();
    for code in PillarCode::ordered() {
        let score = scores.pillar(code);
        let copy = pillar_copy(code);
        let (category, (title, template)) = if score < fifty {
            (InsightCategory::Critical, copy.critical)
        } else if score < seventy {
            (InsightCategory::Attention, copy.attention)
        } else if score > eighty_five {
            (InsightCategory::Excellent, copy.excellent)
        } else {
            continue;
        };
        let name = catalog
            .pillar(code)
            .map(|pillar| pillar.name.clone())
            .unwrap_or_else(|| code.label().to_string());
        insights.push(insight(
            ids.next_insight(),
            category,
            title,
            render(template, score),
            Some((code, name)),
        ));
    }

    if scores.overall < fifty {
        insights.push(insight(
            ids.next_insight(),
            InsightCategory::Critical,
            "Score ESG Crítico - Ação Urgente Necessária",
            format!(
                "Seu score ESG geral de {} está abaixo de 50, indicando necessidade urgente de implementação de práticas sustentáveis nos três pilares.",
                scores.overall
            ),
            None,
        ));
    } else if scores.overall > eighty_five {
        insights.push(insight(
            ids.next_insight(),
            InsightCategory::Excellent,
            "Empresa ESG Referência",
            format!(
                "Parabéns! Seu score ESG de {} pontos coloca sua empresa entre as líderes em sustentabilidade. Continue sendo exemplo para o mercado.",
                scores.overall
            ),
            None,
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;

    fn card(e: i64, s: i64, g: i64) -> ScoreCard {
        ScoreCard::from_pillars(Decimal::from(e), Decimal::from(s), Decimal::from(g))
    }

    fn categories(insights: &[StrategicInsight]) -> Vec<(Option<PillarCode>, InsightCategory)> {
        insights
            .iter()
            .map(|insight| (insight.pillar, insight.category))
            .collect()
    }

    #[test]
    fn classifies_each_pillar_and_overall() {
        let catalog = sample_catalog().expect("catalog");
        let insights = generate_insights(&card(30, 60, 90), &catalog, &OutputIds::default());
        assert_eq!(
            categories(&insights),
            vec![
                (Some(PillarCode::Environmental), InsightCategory::Critical),
                (Some(PillarCode::Social), InsightCategory::Attention),
                (Some(PillarCode::Governance), InsightCategory::Excellent),
            ]
        );
    }

    #[test]
    fn silent_band_generates_nothing() {
        let catalog = sample_catalog().expect("catalog");
        assert!(generate_insights(&card(70, 85, 80), &catalog, &OutputIds::default()).is_empty());
    }

    #[test]
    fn overall_rules_fire_independently() {
        let catalog = sample_catalog().expect("catalog");
        let ids = OutputIds::default();
        let low = generate_insights(&card(0, 0, 0), &catalog, &ids);
        assert_eq!(low.len(), 4);
        assert_eq!(low[3].pillar, None);
        assert_eq!(low[3].category, InsightCategory::Critical);

        let high = generate_insights(&card(100, 100, 100), &catalog, &ids);
        assert_eq!(high.len(), 4);
        assert_eq!(high[3].title, "Empresa ESG Referência");
        assert!(high[3].description.contains("100"));

        // One sequence across runs, so regenerated insights never reuse an id.
        let ids: Vec<u64> = low.iter().chain(&high).map(|insight| insight.id.0).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    }

    #[test]
    fn descriptions_carry_live_scores() {
        let catalog = sample_catalog().expect("catalog");
        let insights = generate_insights(&card(20, 75, 75), &catalog, &OutputIds::default());
        assert!(insights[0].description.contains("até 80 pontos"));
        assert_eq!(insights[0].pillar_name.as_deref(), Some("Ambiental"));
    }
}
