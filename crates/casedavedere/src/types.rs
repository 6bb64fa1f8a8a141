use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::coercion::{
    parse_balcony_count, parse_code, parse_floor, parse_integer, parse_tri_state,
};

/// The attributes a detail page can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    Code,
    Area,
    Price,
    Floor,
    MaxFloor,
    Rooms,
    Balconies,
    Box,
    Elevator,
}

/// One listing as extracted from its detail page.
///
/// Attributes start out unknown and are filled at most once: a later token for an
/// attribute that is already set is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyRecord {
    pub link: String,
    #[serde(skip)]
    pub fragment: String,
    pub code: Option<String>,
    pub area: Option<u32>,
    pub price: Option<u32>,
    pub floor: Option<u32>,
    pub max_floor: Option<u32>,
    pub rooms: Option<u32>,
    pub balconies: Option<u32>,
    pub has_box: Option<bool>,
    pub has_elevator: Option<bool>,
}

fn set_once<T>(slot: &mut Option<T>, value: impl FnOnce() -> Option<T>) {
    if slot.is_none() {
        *slot = value();
    }
}

impl PropertyRecord {
    pub fn new(link: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            fragment: fragment.into(),
            ..Default::default()
        }
    }

    /// Coerces `token` into `field`. Returns whether the field is set afterwards.
    pub fn apply(&mut self, field: ListingField, token: &str) -> bool {
        match field {
            ListingField::Code => {
                set_once(&mut self.code, || parse_code(token));
                self.code.is_some()
            }
            ListingField::Area => {
                set_once(&mut self.area, || parse_integer(token));
                self.area.is_some()
            }
            ListingField::Price => {
                set_once(&mut self.price, || parse_integer(token));
                self.price.is_some()
            }
            ListingField::Floor => {
                set_once(&mut self.floor, || parse_floor(token));
                self.floor.is_some()
            }
            ListingField::MaxFloor => {
                set_once(&mut self.max_floor, || parse_integer(token));
                self.max_floor.is_some()
            }
            ListingField::Rooms => {
                set_once(&mut self.rooms, || parse_integer(token));
                self.rooms.is_some()
            }
            ListingField::Balconies => {
                set_once(&mut self.balconies, || parse_balcony_count(token));
                self.balconies.is_some()
            }
            ListingField::Box => {
                set_once(&mut self.has_box, || parse_tri_state(token));
                self.has_box.is_some()
            }
            ListingField::Elevator => {
                set_once(&mut self.has_elevator, || parse_tri_state(token));
                self.has_elevator.is_some()
            }
        }
    }

    pub fn is_set(&self, field: ListingField) -> bool {
        match field {
            ListingField::Code => self.code.is_some(),
            ListingField::Area => self.area.is_some(),
            ListingField::Price => self.price.is_some(),
            ListingField::Floor => self.floor.is_some(),
            ListingField::MaxFloor => self.max_floor.is_some(),
            ListingField::Rooms => self.rooms.is_some(),
            ListingField::Balconies => self.balconies.is_some(),
            ListingField::Box => self.has_box.is_some(),
            ListingField::Elevator => self.has_elevator.is_some(),
        }
    }
}

fn or_unknown<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "?".to_string())
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "?",
    }
}

impl Display for PropertyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "┌─ {}",
            self.code.as_deref().unwrap_or("[no code]")
        )?;
        writeln!(f, "│  Link:      {}", self.link)?;
        writeln!(
            f,
            "│  Area:      {} m² · Price: {} €",
            or_unknown(&self.area),
            or_unknown(&self.price)
        )?;
        writeln!(
            f,
            "│  Floor:     {} of {} · Rooms: {} · Balconies: {}",
            or_unknown(&self.floor),
            or_unknown(&self.max_floor),
            or_unknown(&self.rooms),
            or_unknown(&self.balconies)
        )?;
        write!(
            f,
            "└─ Box: {} · Elevator: {}",
            yes_no(self.has_box),
            yes_no(self.has_elevator)
        )
    }
}

/// A municipality and its province, searched page by page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchArea {
    pub municipality: String,
    pub province: String,
}

impl SearchArea {
    pub fn new(municipality: impl Into<String>, province: impl Into<String>) -> Self {
        Self {
            municipality: municipality.into(),
            province: province.into(),
        }
    }

    pub fn slug(&self) -> String {
        format!("{}-{}", self.municipality, self.province)
    }
}

impl Display for SearchArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.municipality, self.province)
    }
}
