use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::data::types::PropertyType;

/// Month-of-year price pressure, January first
const SEASONAL_FACTORS: [f64; 12] = [
    1.05, 1.03, 1.0, 0.98, 0.97, 0.96, 0.98, 1.0, 1.02, 1.03, 1.05, 1.07,
];

const MIN_CONFIDENCE: f64 = 60.0;
const MAX_CONFIDENCE: f64 = 95.0;
const MAX_VOLATILITY: f64 = 0.5;
const NOISE_SPAN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub location: f64,
    pub property_type: f64,
    pub area: f64,
    pub market_trends: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            location: 0.35,
            property_type: 0.15,
            area: 0.20,
            market_trends: 0.30,
        }
    }
}

impl ModelWeights {
    pub fn total(&self) -> f64 {
        self.location + self.property_type + self.area + self.market_trends
    }
}

/// Macro indicators, all in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketIndicators {
    pub gdp_growth: f64,
    pub interest_rate: f64,
    pub inflation_rate: f64,
    pub population_growth: f64,
    pub construction_index: f64,
}

impl Default for MarketIndicators {
    /// Neutral economy: zero volatility
    fn default() -> Self {
        Self {
            gdp_growth: 3.0,
            interest_rate: 2.5,
            inflation_rate: 2.0,
            population_growth: 0.5,
            construction_index: 1.0,
        }
    }
}

impl MarketIndicators {
    pub fn volatility(&self) -> f64 {
        let score = (self.gdp_growth - 3.0).abs() * 0.3
            + (self.interest_rate - 2.5).abs() * 0.4
            + (self.inflation_rate - 2.0).abs() * 0.3;

        (score / 10.0).min(MAX_VOLATILITY)
    }

    pub fn trend_factor(&self) -> f64 {
        let economic_score = self.gdp_growth * 0.3
            + self.population_growth * 0.2
            + self.construction_index * 0.3
            - self.interest_rate * 0.2;

        1.0 + economic_score / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    /// Province key such as "bangkok" or "chiang mai"
    pub location: String,
    pub property_type: PropertyType,
    pub area_sq_m: f64,
    pub current_price: f64,
    #[serde(default)]
    pub indicators: MarketIndicators,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Period::ALL.into_iter().find(|p| p.as_str() == s)
    }

    fn growth(&self) -> f64 {
        match self {
            Period::ThreeMonths => 1.02,
            Period::SixMonths => 1.05,
            Period::OneYear => 1.08,
            Period::TwoYears => 1.15,
            Period::FiveYears => 1.35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorWeight {
    pub name: &'static str,
    pub weight: f64,
    pub impact: Impact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(total_risk: f64) -> Self {
        if total_risk < 0.2 {
            RiskLevel::Low
        } else if total_risk < 0.35 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn reasons(&self) -> [&'static str; 3] {
        match self {
            RiskLevel::Low => ["Stable market conditions", "Prime location", "Low volatility"],
            RiskLevel::Medium => [
                "Moderate market fluctuations",
                "Average location premium",
                "Standard volatility",
            ],
            RiskLevel::High => [
                "High market volatility",
                "Emerging location",
                "Economic uncertainty",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub reasons: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodForecast {
    pub period: Period,
    pub price: f64,
    pub confidence: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub predictions: Vec<PeriodForecast>,
    pub factors: Vec<FactorWeight>,
    pub risk: RiskAssessment,
}

/// Randomised price projection. Decorative: the estimate path never calls it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    pub weights: ModelWeights,
}

impl ForecastModel {
    /// Project `input` over `periods`. `month0` is the zero-based month used
    /// for the seasonal factor.
    pub fn forecast<R: Rng>(
        &self,
        input: &ForecastInput,
        periods: &[Period],
        month0: u32,
        rng: &mut R,
    ) -> Forecast {
        let location = normalize_location(&input.location);
        let volatility = input.indicators.volatility();

        // Everything except period, noise and confidence is shared across periods
        let base = input.current_price
            * location_multiplier(&location)
            * property_type_multiplier(input.property_type)
            * area_multiplier(input.area_sq_m)
            * input.indicators.trend_factor()
            * seasonal_factor(month0);

        let predictions = periods
            .iter()
            .enumerate()
            .map(|(i, period)| {
                let noise = 1.0 + (rng.gen::<f64>() - 0.5) * NOISE_SPAN;
                let confidence =
                    (MAX_CONFIDENCE - i as f64 * 5.0 - volatility * 10.0).max(MIN_CONFIDENCE);

                PeriodForecast {
                    period: *period,
                    price: base * period.growth() * noise,
                    confidence,
                    volatility,
                }
            })
            .collect();

        Forecast {
            predictions,
            factors: self.factors(input, &location),
            risk: assess_risk(&location, input.property_type, volatility),
        }
    }

    fn factors(&self, input: &ForecastInput, location: &str) -> Vec<FactorWeight> {
        vec![
            FactorWeight {
                name: "Location Premium",
                weight: self.weights.location,
                impact: classify(location_multiplier(location) > 1.0, Impact::Negative),
            },
            FactorWeight {
                name: "Property Type",
                weight: self.weights.property_type,
                impact: classify(
                    property_type_multiplier(input.property_type) > 1.0,
                    Impact::Neutral,
                ),
            },
            FactorWeight {
                name: "Size Factor",
                weight: self.weights.area,
                impact: classify(area_multiplier(input.area_sq_m) > 1.0, Impact::Negative),
            },
            FactorWeight {
                name: "Market Trends",
                weight: self.weights.market_trends,
                impact: classify(input.indicators.gdp_growth > 3.0, Impact::Neutral),
            },
        ]
    }

    /// New model with weights from simulated per-factor accuracies in [0.7, 1.0)
    pub fn retrain<R: Rng>(&self, samples: &[ForecastInput], rng: &mut R) -> ForecastModel {
        info!("Retraining forecast model on {} samples", samples.len());

        let mut accuracy = || rng.gen::<f64>() * 0.3 + 0.7;
        let raw = ModelWeights {
            location: accuracy(),
            property_type: accuracy(),
            area: accuracy(),
            market_trends: accuracy(),
        };
        let total = raw.total();

        let weights = ModelWeights {
            location: raw.location / total,
            property_type: raw.property_type / total,
            area: raw.area / total,
            market_trends: raw.market_trends / total,
        };

        info!(
            "Model retrained: location {:.3}, type {:.3}, area {:.3}, trends {:.3}",
            weights.location, weights.property_type, weights.area, weights.market_trends
        );

        ForecastModel { weights }
    }
}

/// Positive when the factor lifts the price, otherwise the factor's fallback
fn classify(lifts_price: bool, otherwise: Impact) -> Impact {
    if lifts_price {
        Impact::Positive
    } else {
        otherwise
    }
}

/// "Chiang Mai" -> "chiang_mai"
fn normalize_location(location: &str) -> String {
    location
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn location_multiplier(location: &str) -> f64 {
    match location {
        "bangkok" => 1.2,
        "nonthaburi" => 1.1,
        "pathum_thani" => 1.05,
        "samut_prakan" => 1.0,
        "chiang_mai" => 0.95,
        "phuket" => 1.15,
        _ => 1.0,
    }
}

fn property_type_multiplier(kind: PropertyType) -> f64 {
    match kind {
        PropertyType::Condo => 1.1,
        PropertyType::House => 1.05,
        PropertyType::Townhouse => 1.0,
        PropertyType::Apartment => 0.95,
        _ => 1.0,
    }
}

fn area_multiplier(area_sq_m: f64) -> f64 {
    if area_sq_m < 30.0 {
        0.9
    } else if area_sq_m < 50.0 {
        1.0
    } else if area_sq_m < 100.0 {
        1.1
    } else {
        1.2
    }
}

fn seasonal_factor(month0: u32) -> f64 {
    SEASONAL_FACTORS[(month0 % 12) as usize]
}

fn location_risk(location: &str) -> f64 {
    match location {
        "bangkok" => 0.1,
        "nonthaburi" => 0.15,
        "pathum_thani" => 0.2,
        "samut_prakan" => 0.25,
        "chiang_mai" => 0.3,
        "phuket" => 0.35,
        _ => 0.2,
    }
}

fn property_type_risk(kind: PropertyType) -> f64 {
    match kind {
        PropertyType::Condo => 0.2,
        PropertyType::House => 0.15,
        PropertyType::Townhouse => 0.18,
        PropertyType::Apartment => 0.25,
        _ => 0.2,
    }
}

fn assess_risk(location: &str, kind: PropertyType, volatility: f64) -> RiskAssessment {
    let score = (location_risk(location) + property_type_risk(kind) + volatility) / 2.0;
    let level = RiskLevel::from_score(score);

    RiskAssessment {
        level,
        score,
        reasons: level.reasons().to_vec(),
    }
}
