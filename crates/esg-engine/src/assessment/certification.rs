//! Two independent tier systems: the five-level score scale used everywhere scores are
//! shown, and the bronze/silver/gold badge stamped on certificates.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::CertificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreLevel {
    Critical,
    Attention,
    Good,
    VeryGood,
    Excellent,
}

impl ScoreLevel {
    /// Cascading half-open thresholds; the top bucket is unbounded.
    pub fn from_score(score: Decimal) -> Self {
        if score < Decimal::from(26) {
            Self::Critical
        } else if score < Decimal::from(51) {
            Self::Attention
        } else if score < Decimal::from(71) {
            Self::Good
        } else if score < Decimal::from(86) {
            Self::VeryGood
        } else {
            Self::Excellent
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Attention => "attention",
            Self::Good => "good",
            Self::VeryGood => "very-good",
            Self::Excellent => "excellent",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Crítico",
            Self::Attention => "Atenção",
            Self::Good => "Bom",
            Self::VeryGood => "Muito Bom",
            Self::Excellent => "Excelente",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierView {
    pub level: ScoreLevel,
    pub label: &'static str,
}

/// Tier lookup that needs no diagnosis context.
pub fn certification_level(score: Decimal) -> TierView {
    let level = ScoreLevel::from_score(score);
    TierView {
        level,
        label: level.label(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateBadge {
    pub level: BadgeLevel,
    pub name: &'static str,
    pub title: &'static str,
    pub message: &'static str,
}

/// Configurable bronze/silver/gold thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificationScheme {
    silver_from: Decimal,
    gold_from: Decimal,
}

impl Default for CertificationScheme {
    fn default() -> Self {
        Self {
            silver_from: Decimal::from(40),
            gold_from: Decimal::from(70),
        }
    }
}

impl From<&CertificationConfig> for CertificationScheme {
    fn from(config: &CertificationConfig) -> Self {
        Self {
            silver_from: config.silver_from,
            gold_from: config.gold_from,
        }
    }
}

impl CertificationScheme {
    pub fn badge_level(&self, score: Decimal) -> BadgeLevel {
        if score < self.silver_from {
            BadgeLevel::Bronze
        } else if score < self.gold_from {
            BadgeLevel::Silver
        } else {
            BadgeLevel::Gold
        }
    }

    pub fn badge(&self, score: Decimal) -> CertificateBadge {
        match self.badge_level(score) {
            BadgeLevel::Bronze => CertificateBadge {
                level: BadgeLevel::Bronze,
                name: "Compromisso ESG",
                title: "Fundamentos ESG",
                message: "Quem dá o primeiro passo na transformação sustentável.",
            },
            BadgeLevel::Silver => CertificateBadge {
                level: BadgeLevel::Silver,
                name: "Integração ESG",
                title: "Gestão ESG",
                message: "Quem transforma intenções em práticas consistentes.",
            },
            BadgeLevel::Gold => CertificateBadge {
                level: BadgeLevel::Gold,
                name: "Liderança ESG",
                title: "Excelência ESG",
                message: "Quem inspira o mercado e multiplica o impacto positivo.",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    #[test]
    fn tier_boundaries_are_exact() {
        let cases = [
            ("0", ScoreLevel::Critical),
            ("25.99", ScoreLevel::Critical),
            ("26.00", ScoreLevel::Attention),
            ("50.99", ScoreLevel::Attention),
            ("51.00", ScoreLevel::Good),
            ("70.99", ScoreLevel::Good),
            ("71.00", ScoreLevel::VeryGood),
            ("85.99", ScoreLevel::VeryGood),
            ("86.00", ScoreLevel::Excellent),
            ("100", ScoreLevel::Excellent),
        ];
        for (score, expected) in cases {
            assert_eq!(
                certification_level(dec(score)).level,
                expected,
                "score {score}"
            );
        }
    }

    #[test]
    fn tier_serializes_with_kebab_case_code() {
        let view = certification_level(dec("80"));
        let value = serde_json::to_value(view).expect("serializes");
        assert_eq!(value["level"], "very-good");
        assert_eq!(value["label"], "Muito Bom");
    }

    #[test]
    fn badges_follow_configured_thresholds() {
        let scheme = CertificationScheme::default();
        assert_eq!(scheme.badge_level(dec("39.99")), BadgeLevel::Bronze);
        assert_eq!(scheme.badge_level(dec("40")), BadgeLevel::Silver);
        assert_eq!(scheme.badge(dec("70")).name, "Liderança ESG");

        let strict = CertificationScheme::from(&CertificationConfig {
            silver_from: dec("60"),
            gold_from: dec("90"),
        });
        assert_eq!(strict.badge_level(dec("75")), BadgeLevel::Silver);
    }
}
