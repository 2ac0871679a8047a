use rust_decimal::Decimal;
use serde::Serialize;

use super::breakdown::PillarBreakdown;
use crate::assessment::{ScoreCard, ScoreLevel, TierView};
use crate::catalog::PillarCode;

const TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutiveSummary {
    pub overall_assessment: &'static str,
    pub certification_level: ScoreLevel,
    pub certification_name: &'static str,
    pub strongest_pillar: &'static str,
    pub strongest_pillar_score: Decimal,
    pub weakest_pillar: &'static str,
    pub weakest_pillar_score: Decimal,
    pub top_strengths: Vec<String>,
    pub top_weaknesses: Vec<String>,
    pub recommendation: String,
}

pub fn overall_assessment(score: Decimal) -> &'static str {
    if score >= Decimal::from(85) {
        "Sua empresa demonstra excelência em práticas ESG, sendo referência no mercado. Continue investindo em inovação sustentável e compartilhando boas práticas."
    } else if score >= Decimal::from(70) {
        "Sua empresa possui uma gestão ESG sólida com resultados consistentes. Há oportunidades de melhoria para atingir a excelência."
    } else if score >= Decimal::from(50) {
        "Sua empresa está no caminho certo com práticas ESG em desenvolvimento. É necessário intensificar os esforços para uma gestão mais integrada."
    } else if score >= Decimal::from(30) {
        "Sua empresa apresenta práticas ESG iniciais. Recomenda-se priorizar ações estruturantes nos pilares mais críticos."
    } else {
        "Sua empresa está no início da jornada ESG. É fundamental implementar políticas básicas e criar uma cultura de sustentabilidade."
    }
}

fn pillar_advice(code: PillarCode) -> &'static str {
    match code {
        PillarCode::Environmental => {
            "Implemente políticas de gestão ambiental, monitore indicadores de emissões, energia e resíduos."
        }
        PillarCode::Social => {
            "Fortaleça programas de diversidade, saúde ocupacional e engajamento com comunidades."
        }
        PillarCode::Governance => {
            "Estruture comitês de governança, políticas anticorrupção e mecanismos de transparência."
        }
    }
}

fn recommendation(overall: Decimal, weakest: PillarCode, weakest_score: Decimal) -> String {
    if overall < Decimal::from(50) {
        format!(
            "Priorize ações no pilar {} (score {}). {}",
            weakest.label(),
            weakest_score.normalize(),
            pillar_advice(weakest)
        )
    } else {
        format!(
            "Para atingir o próximo nível de certificação, foque em melhorar o pilar {}. {}",
            weakest.label(),
            pillar_advice(weakest)
        )
    }
}

fn labelled(
    breakdowns: &[PillarBreakdown],
    pick: fn(&PillarBreakdown) -> &[String],
) -> Vec<String> {
    breakdowns
        .iter()
        .flat_map(|pillar| {
            pick(pillar)
                .iter()
                .map(move |theme| format!("{theme} ({})", pillar.pillar_name))
        })
        .take(TOP_ITEMS)
        .collect()
}

pub fn executive_summary(
    scores: &ScoreCard,
    tier: TierView,
    breakdowns: &[PillarBreakdown],
) -> ExecutiveSummary {
    // Later pillars win ties on both ends.
    let mut strongest = PillarCode::Environmental;
    let mut weakest = PillarCode::Environmental;
    for code in PillarCode::ordered().into_iter().skip(1) {
        if scores.pillar(code) >= scores.pillar(strongest) {
            strongest = code;
        }
        if scores.pillar(code) <= scores.pillar(weakest) {
            weakest = code;
        }
    }

    ExecutiveSummary {
        overall_assessment: overall_assessment(scores.overall),
        certification_level: tier.level,
        certification_name: tier.label,
        strongest_pillar: strongest.label(),
        strongest_pillar_score: scores.pillar(strongest),
        weakest_pillar: weakest.label(),
        weakest_pillar_score: scores.pillar(weakest),
        top_strengths: labelled(breakdowns, |pillar| pillar.strengths.as_slice()),
        top_weaknesses: labelled(breakdowns, |pillar| pillar.weaknesses.as_slice()),
        recommendation: recommendation(scores.overall, weakest, scores.pillar(weakest)),
    }
}
