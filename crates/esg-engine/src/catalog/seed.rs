use super::domain::PillarCode;
use super::{Catalog, CatalogBuilder, CatalogError};

const ENVIRONMENTAL: &[(&str, &str, &str)] = &[
    (
        "Mudanças climáticas",
        "Emissões de GEE",
        "A empresa realiza inventário anual de emissões de gases de efeito estufa?",
    ),
    (
        "Mudanças climáticas",
        "Emissões de GEE",
        "Existem metas formais de redução de emissões com prazos definidos?",
    ),
    (
        "Eficiência em Energia",
        "Consumo energético",
        "O consumo de energia é monitorado por unidade produtiva?",
    ),
    (
        "Eficiência em Energia",
        "Fontes renováveis",
        "Parte da energia consumida provém de fontes renováveis?",
    ),
    (
        "Gestão de resíduos",
        "Resíduos sólidos",
        "Os resíduos são segregados e destinados a recicladores licenciados?",
    ),
    (
        "Gestão de resíduos",
        "Resíduos perigosos",
        "Há controle documentado da destinação de resíduos perigosos?",
    ),
];

const SOCIAL: &[(&str, &str, &str)] = &[
    (
        "Saúde e segurança",
        "Prevenção de acidentes",
        "A empresa mantém programa de prevenção de acidentes com indicadores acompanhados?",
    ),
    (
        "Saúde e segurança",
        "Bem-estar",
        "São oferecidas ações de saúde mental e qualidade de vida aos colaboradores?",
    ),
    (
        "Diversidade e inclusão",
        "Equidade",
        "Existe política de equidade salarial entre gêneros revisada periodicamente?",
    ),
    (
        "Diversidade e inclusão",
        "Contratação inclusiva",
        "O processo seletivo possui práticas para ampliar a diversidade?",
    ),
    (
        "Relacionamento com a comunidade",
        "Investimento social",
        "A empresa apoia projetos sociais na comunidade onde atua?",
    ),
    (
        "Relacionamento com a comunidade",
        "Canais de diálogo",
        "Há canal estruturado para receber demandas da comunidade local?",
    ),
];

const GOVERNANCE: &[(&str, &str, &str)] = &[
    (
        "Governança corporativa",
        "Estrutura decisória",
        "Existe conselho ou comitê com atribuições formalizadas?",
    ),
    (
        "Governança corporativa",
        "Gestão de riscos",
        "Os riscos ESG são mapeados e revisados pela alta gestão?",
    ),
    (
        "Ética e compliance",
        "Código de conduta",
        "A empresa possui código de conduta divulgado a todos os colaboradores?",
    ),
    (
        "Ética e compliance",
        "Canal de denúncias",
        "Há canal de denúncias independente com garantia de anonimato?",
    ),
    (
        "Transparência",
        "Relato",
        "A empresa publica relatório de sustentabilidade periodicamente?",
    ),
    (
        "Transparência",
        "Prestação de contas",
        "Os resultados ESG são comunicados às partes interessadas?",
    ),
];

/// Built-in catalog with six items per pillar. Item ids run 1..=6 for E, 7..=12 for S
/// and 13..=18 for G.
pub fn sample_catalog() -> Result<Catalog, CatalogError> {
    let mut builder = CatalogBuilder::new()
        .pillar(
            PillarCode::Environmental,
            "Ambiental",
            "Avalia práticas ambientais, climáticas e de sustentabilidade",
        )
        .pillar(
            PillarCode::Social,
            "Social",
            "Avalia práticas sociais, direitos humanos e responsabilidade social",
        )
        .pillar(
            PillarCode::Governance,
            "Governança",
            "Avalia governança corporativa, compliance e transparência",
        );

    for (code, rows) in [
        (PillarCode::Environmental, ENVIRONMENTAL),
        (PillarCode::Social, SOCIAL),
        (PillarCode::Governance, GOVERNANCE),
    ] {
        for (theme, criteria, question) in rows {
            builder.push_item(code, theme, None, criteria, (*question).to_string());
        }
    }

    builder.build()
}
