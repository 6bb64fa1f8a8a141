use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::types::PropertyRecord;

pub const DEFAULT_MIN_AREA: u32 = 0;
pub const DEFAULT_MAX_AREA: u32 = 1_000;
pub const DEFAULT_MIN_PRICE: u32 = 0;
pub const DEFAULT_MAX_PRICE: u32 = 1_000_000;

/// The criteria a listing has to meet to be reported.
///
/// Every check passes when the listing does not state the attribute: an unknown
/// value never excludes a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub min_area: u32,
    pub max_area: u32,
    pub min_price: u32,
    pub max_price: u32,
    #[serde(rename = "intermediate_floor")]
    pub require_intermediate_floor: bool,
    pub min_rooms: u32,
    pub min_balconies: u32,
    #[serde(rename = "need_box")]
    pub require_box: bool,
    #[serde(rename = "need_elevator")]
    pub require_elevator: bool,
}

impl Default for PropertyFilter {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            max_area: DEFAULT_MAX_AREA,
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            require_intermediate_floor: false,
            min_rooms: 0,
            min_balconies: 0,
            require_box: false,
            require_elevator: false,
        }
    }
}

fn within(value: Option<u32>, min: u32, max: u32) -> bool {
    value.is_none_or(|v| (min..=max).contains(&v))
}

fn at_least(value: Option<u32>, min: u32) -> bool {
    value.is_none_or(|v| v >= min)
}

fn required(enabled: bool, value: Option<bool>) -> bool {
    !enabled || value.unwrap_or(true)
}

impl PropertyFilter {
    pub fn evaluate(&self, record: &PropertyRecord) -> bool {
        within(record.area, self.min_area, self.max_area)
            && within(record.price, self.min_price, self.max_price)
            && self.matches_floor(record)
            && at_least(record.rooms, self.min_rooms)
            && at_least(record.balconies, self.min_balconies)
            && required(self.require_box, record.has_box)
            && required(self.require_elevator, record.has_elevator)
    }

    fn matches_floor(&self, record: &PropertyRecord) -> bool {
        if !self.require_intermediate_floor {
            return true;
        }
        match (record.floor, record.max_floor) {
            (Some(floor), Some(max_floor)) => floor < max_floor,
            _ => true,
        }
    }

    /// One line per criterion that differs from its default, in a fixed order.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.min_area != DEFAULT_MIN_AREA || self.max_area != DEFAULT_MAX_AREA {
            lines.push(format!(
                "Superficie compresa tra {} e {} mq",
                self.min_area, self.max_area
            ));
        }
        if self.min_price != DEFAULT_MIN_PRICE || self.max_price != DEFAULT_MAX_PRICE {
            lines.push(format!(
                "Prezzo compreso tra {} e {} €",
                self.min_price, self.max_price
            ));
        }
        if self.require_intermediate_floor {
            lines.push("Solo piani intermedi".to_string());
        }
        if self.min_rooms != 0 {
            lines.push(format!("Almeno {} locali", self.min_rooms));
        }
        if self.min_balconies != 0 {
            lines.push(format!("Almeno {} balconi", self.min_balconies));
        }
        if self.require_box {
            lines.push("Con garage/box".to_string());
        }
        if self.require_elevator {
            lines.push("Con ascensore".to_string());
        }

        lines
    }
}

impl Display for PropertyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filtro applicato:")?;
        let lines = self.describe();
        if lines.is_empty() {
            return writeln!(f, "  (nessuno)");
        }
        for line in lines {
            writeln!(f, "  - {}", line)?;
        }
        Ok(())
    }
}
