use serde::Serialize;

use crate::enrich::EnrichedPlayer;
use crate::ranking::{cmp_score_desc, round2};

/// Net transfers at which a 0%-owned player reaches even odds of moving.
const HALF_PROBABILITY_TRANSFERS: f64 = 40_000.0;
/// Widely owned players need proportionally more net movement.
const OWNERSHIP_DAMPING: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceDirection {
    Rise,
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PriceChangeBand {
    Possible,
    Likely,
    Imminent,
}

impl PriceChangeBand {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.8 {
            PriceChangeBand::Imminent
        } else if probability >= 0.5 {
            PriceChangeBand::Likely
        } else {
            PriceChangeBand::Possible
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceChangePrediction {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub price: f64,
    pub net_transfers: i64,
    pub direction: PriceDirection,
    pub probability: f64,
    pub band: PriceChangeBand,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceChangeForecast {
    pub rises: Vec<PriceChangePrediction>,
    pub falls: Vec<PriceChangePrediction>,
}

/// Probability in [0, 1) that a player with `net_transfers` and `ownership`
/// changes price tonight. Strictly increasing in `|net_transfers|`.
pub fn change_probability(net_transfers: i64, ownership: f64) -> f64 {
    let magnitude = net_transfers.unsigned_abs() as f64;
    if magnitude == 0.0 {
        return 0.0;
    }
    let scale =
        HALF_PROBABILITY_TRANSFERS * (1.0 + OWNERSHIP_DAMPING * ownership.clamp(0.0, 100.0));
    (magnitude / (magnitude + scale)).clamp(0.0, 1.0)
}

pub fn predict_price_changes(players: &[EnrichedPlayer]) -> PriceChangeForecast {
    let mut forecast = PriceChangeForecast::default();

    for player in players {
        let net = player.net_transfers();
        let direction = match net.signum() {
            1 => PriceDirection::Rise,
            -1 => PriceDirection::Fall,
            _ => continue,
        };
        let probability = change_probability(net, player.ownership);
        let row = PriceChangePrediction {
            player_id: player.id,
            web_name: player.display_name.clone(),
            team_short: player.team_short.clone(),
            price: player.price,
            net_transfers: net,
            direction,
            probability: round2(probability),
            band: PriceChangeBand::from_probability(probability),
        };
        match direction {
            PriceDirection::Rise => forecast.rises.push(row),
            PriceDirection::Fall => forecast.falls.push(row),
        }
    }

    for list in [&mut forecast.rises, &mut forecast.falls] {
        list.sort_by(|a, b| {
            cmp_score_desc(a.probability, b.probability)
                .then(b.net_transfers.unsigned_abs().cmp(&a.net_transfers.unsigned_abs()))
                .then(a.player_id.cmp(&b.player_id))
        });
    }
    forecast
}
