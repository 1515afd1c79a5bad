//! Typed entity records
//!
//! These are the in-memory representations of each squad file table. The
//! editor UI works with positional field lists, so every record can also be
//! flattened with [`Record::fields`] in the column order the UI expects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::SectionKind;

/// Numeric record ID. Tables are keyed by it; it prints as a decimal string.
pub type EntityId = u32;

/// One column of a record's positional view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// Ordered stat name -> value pairs
    Stats(Vec<(String, String)>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Stats(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

fn text(value: impl ToString) -> FieldValue {
    FieldValue::Text(value.to_string())
}

/// Common surface of every table's record type
pub trait Record {
    /// Table this record lives in
    const KIND: SectionKind;
    /// Column names of [`Record::fields`], in order
    const FIELD_NAMES: &'static [&'static str];

    fn fields(&self) -> Vec<FieldValue>;
}

/// National association
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub short_name: String,
    /// Three characters
    pub abbreviation: String,
    /// At most 8 bytes on disk
    pub confederation: String,
    /// At most 6 bytes on disk
    pub iso_code: String,
    pub level: u8,
    pub rating: u8,
    /// Three characters
    pub flag_code: String,
}

impl Country {
    pub const ABBREVIATION_LEN: usize = 3;
    pub const CONFEDERATION_LEN: usize = 8;
    pub const ISO_CODE_LEN: usize = 6;
    pub const FLAG_CODE_LEN: usize = 3;
}

impl Record for Country {
    const KIND: SectionKind = SectionKind::Countries;
    const FIELD_NAMES: &'static [&'static str] = &[
        "name",
        "short_name",
        "abbreviation",
        "confederation",
        "iso_code",
        "level",
        "rating",
        "flag_code",
    ];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(&self.short_name),
            text(&self.abbreviation),
            text(&self.confederation),
            text(&self.iso_code),
            text(self.level),
            text(self.rating),
            text(&self.flag_code),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub name: String,
    pub country: String,
    pub division: u8,
    pub team_count: u8,
    /// Trailing record bytes this codec does not interpret, kept verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<u8>,
}

impl Record for League {
    const KIND: SectionKind = SectionKind::Leagues;
    const FIELD_NAMES: &'static [&'static str] = &["name", "country", "division", "team_count"];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(&self.country),
            text(self.division),
            text(self.team_count),
        ]
    }
}

/// A club or national team.
///
/// Squad files store only the name. The league and rating columns are
/// editor-side values: they load as empty/zero and are not written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub ovr: u8,
    #[serde(default)]
    pub att: u8,
    #[serde(default)]
    pub mid: u8,
    #[serde(default)]
    pub def: u8,
}

impl Team {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Columns holding a value that a squad file cannot carry
    pub fn unstored_columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::new();
        if !self.league.is_empty() {
            columns.push("league");
        }
        for (name, value) in [("ovr", self.ovr), ("att", self.att), ("mid", self.mid), ("def", self.def)] {
            if value != 0 {
                columns.push(name);
            }
        }
        columns
    }
}

impl Record for Team {
    const KIND: SectionKind = SectionKind::Teams;
    const FIELD_NAMES: &'static [&'static str] = &["name", "league", "ovr", "att", "mid", "def"];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(&self.league),
            text(self.ovr),
            text(self.att),
            text(self.mid),
            text(self.def),
        ]
    }
}

/// Preferred foot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Foot {
    #[default]
    Right = 0,
    Left = 1,
}

impl Foot {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Foot::Right),
            1 => Some(Foot::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Foot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Foot::Right => "Right",
            Foot::Left => "Left",
        })
    }
}

/// The four stat groupings of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCategory {
    Attack,
    Midfield,
    Defense,
    Goalkeeping,
}

impl StatCategory {
    /// Stat table of the category, in the order the game lists them
    pub fn stat_names(self) -> &'static [&'static str] {
        match self {
            StatCategory::Attack => &["Finishing", "Shot Power", "Long Shots", "Volleys", "Penalties"],
            StatCategory::Midfield => &["Short Pass", "Vision", "Crossing", "Free Kick", "Curve"],
            StatCategory::Defense => &["Marking", "Standing Tackle", "Sliding Tackle"],
            StatCategory::Goalkeeping => &[
                "GK Diving",
                "GK Handling",
                "GK Kicking",
                "GK Positioning",
                "GK Reflexes",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: u8,
}

/// Ordered stat name -> value mapping. Names are unique; setting an
/// existing name updates it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Stat>", into = "Vec<Stat>")]
pub struct StatGroup {
    stats: Vec<Stat>,
}

impl From<Vec<Stat>> for StatGroup {
    fn from(stats: Vec<Stat>) -> Self {
        stats.into_iter().map(|s| (s.name, s.value)).collect()
    }
}

impl From<StatGroup> for Vec<Stat> {
    fn from(group: StatGroup) -> Self {
        group.stats
    }
}

impl StatGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category stat table with values assigned in table order; missing
    /// values are zero, surplus values are ignored
    pub fn from_table(category: StatCategory, values: &[u8]) -> Self {
        let stats = category
            .stat_names()
            .iter()
            .enumerate()
            .map(|(i, name)| Stat {
                name: (*name).to_owned(),
                value: values.get(i).copied().unwrap_or(0),
            })
            .collect();
        Self { stats }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.stats.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Update a stat in place, or append it if absent
    pub fn set(&mut self, name: &str, value: u8) {
        match self.stats.iter_mut().find(|s| s.name == name) {
            Some(stat) => stat.value = value,
            None => self.stats.push(Stat {
                name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stat> {
        self.stats.iter()
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Stats(
            self.stats
                .iter()
                .map(|s| (s.name.clone(), s.value.to_string()))
                .collect(),
        )
    }
}

impl FromIterator<(String, u8)> for StatGroup {
    fn from_iter<I: IntoIterator<Item = (String, u8)>>(iter: I) -> Self {
        let mut group = StatGroup::new();
        for (name, value) in iter {
            group.set(&name, value);
        }
        group
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub overall: u8,
    pub position: String,
    pub age: u8,
    pub team: String,
    pub nationality: String,
    /// Centimetres
    pub height: u16,
    /// Kilograms
    pub weight: u16,
    pub foot: Foot,
    pub league: String,
    pub attack: StatGroup,
    pub midfield: StatGroup,
    pub defense: StatGroup,
    pub goalkeeping: StatGroup,
}

impl Player {
    pub fn stats(&self, category: StatCategory) -> &StatGroup {
        match category {
            StatCategory::Attack => &self.attack,
            StatCategory::Midfield => &self.midfield,
            StatCategory::Defense => &self.defense,
            StatCategory::Goalkeeping => &self.goalkeeping,
        }
    }

    pub fn stats_mut(&mut self, category: StatCategory) -> &mut StatGroup {
        match category {
            StatCategory::Attack => &mut self.attack,
            StatCategory::Midfield => &mut self.midfield,
            StatCategory::Defense => &mut self.defense,
            StatCategory::Goalkeeping => &mut self.goalkeeping,
        }
    }
}

impl Record for Player {
    const KIND: SectionKind = SectionKind::Players;
    const FIELD_NAMES: &'static [&'static str] = &[
        "name",
        "ovr",
        "position",
        "age",
        "team",
        "nationality",
        "height",
        "weight",
        "foot",
        "league",
        "attack_stats",
        "midfield_stats",
        "defense_stats",
        "gk_stats",
    ];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(self.overall),
            text(&self.position),
            text(self.age),
            text(&self.team),
            text(&self.nationality),
            text(self.height),
            text(self.weight),
            text(self.foot),
            text(&self.league),
            self.attack.to_field(),
            self.midfield.to_field(),
            self.defense.to_field(),
            self.goalkeeping.to_field(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stadium {
    pub name: String,
    pub city: String,
    pub country: String,
    pub capacity: u32,
    pub team: String,
    /// Year of construction
    pub built: u16,
}

impl Record for Stadium {
    const KIND: SectionKind = SectionKind::Stadiums;
    const FIELD_NAMES: &'static [&'static str] =
        &["name", "city", "country", "capacity", "team", "built"];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(&self.city),
            text(&self.country),
            text(self.capacity),
            text(&self.team),
            text(self.built),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TournamentKind {
    #[default]
    Club = 0,
    National = 1,
}

impl TournamentKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TournamentKind::Club),
            1 => Some(TournamentKind::National),
            _ => None,
        }
    }
}

impl fmt::Display for TournamentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TournamentKind::Club => "Club",
            TournamentKind::National => "National",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub name: String,
    pub kind: TournamentKind,
    pub region: String,
    pub team_count: u16,
    /// Free text, e.g. "€20M"
    pub prize: String,
    pub champion: String,
}

impl Record for Tournament {
    const KIND: SectionKind = SectionKind::Tournaments;
    const FIELD_NAMES: &'static [&'static str] =
        &["name", "type", "region", "team_count", "prize", "champion"];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.name),
            text(self.kind),
            text(&self.region),
            text(self.team_count),
            text(&self.prize),
            text(&self.champion),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KitKind {
    #[default]
    Home = 0,
    Away = 1,
    Third = 2,
    Goalkeeper = 3,
}

impl KitKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(KitKind::Home),
            1 => Some(KitKind::Away),
            2 => Some(KitKind::Third),
            3 => Some(KitKind::Goalkeeper),
            _ => None,
        }
    }
}

impl fmt::Display for KitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KitKind::Home => "Home",
            KitKind::Away => "Away",
            KitKind::Third => "Third",
            KitKind::Goalkeeper => "Goalkeeper",
        })
    }
}

/// 24-bit colour, written as `#RRGGBB`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_bytes(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Rgb(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid colour {:?}, expected #RRGGBB", s));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("invalid colour {:?}, expected #RRGGBB", s))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<Rgb> for String {
    fn from(rgb: Rgb) -> Self {
        rgb.to_string()
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub team: String,
    /// e.g. "2024/25"
    pub season: String,
    pub kind: KitKind,
    pub color1: Rgb,
    pub color2: Rgb,
    pub brand: String,
    pub sponsor: String,
}

impl Record for Kit {
    const KIND: SectionKind = SectionKind::Kits;
    const FIELD_NAMES: &'static [&'static str] =
        &["team", "season", "type", "color1", "color2", "brand", "sponsor"];

    fn fields(&self) -> Vec<FieldValue> {
        vec![
            text(&self.team),
            text(&self.season),
            text(self.kind),
            text(self.color1),
            text(self.color2),
            text(&self.brand),
            text(&self.sponsor),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_fields_order() {
        let england = Country {
            name: "England".into(),
            short_name: "Eng".into(),
            abbreviation: "ENG".into(),
            confederation: "UEFA".into(),
            iso_code: "ENG".into(),
            level: 5,
            rating: 85,
            flag_code: "ENG".into(),
        };
        let fields: Vec<_> = england
            .fields()
            .iter()
            .map(|f| f.as_text().unwrap().to_owned())
            .collect();
        assert_eq!(
            fields,
            ["England", "Eng", "ENG", "UEFA", "ENG", "5", "85", "ENG"]
        );
        assert_eq!(Country::FIELD_NAMES.len(), fields.len());
    }

    #[test]
    fn test_player_fields_include_stats() {
        let mut player = Player {
            name: "Harry Kane".into(),
            overall: 90,
            position: "ST".into(),
            foot: Foot::Right,
            ..Player::default()
        };
        player.attack = StatGroup::from_table(StatCategory::Attack, &[94, 90, 87, 88, 92]);

        let fields = player.fields();
        assert_eq!(fields.len(), Player::FIELD_NAMES.len());
        assert_eq!(fields[8], FieldValue::from("Right"));
        match &fields[10] {
            FieldValue::Stats(stats) => {
                assert_eq!(stats[0], ("Finishing".to_owned(), "94".to_owned()));
                assert_eq!(stats.len(), 5);
            }
            other => panic!("expected stats, got {:?}", other),
        }
        assert_eq!(fields[13], FieldValue::Stats(Vec::new()));
    }

    #[test]
    fn test_stat_group_preserves_order() {
        let mut group: StatGroup = vec![("Vision".to_owned(), 80), ("Curve".to_owned(), 70)]
            .into_iter()
            .collect();
        group.set("Vision", 85);
        group.set("Crossing", 60);

        let names: Vec<_> = group.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Vision", "Curve", "Crossing"]);
        assert_eq!(group.get("Vision"), Some(85));
        assert_eq!(group.get("Marking"), None);
    }

    #[test]
    fn test_stat_table_fills_missing_with_zero() {
        let group = StatGroup::from_table(StatCategory::Defense, &[92]);
        assert_eq!(group.len(), 3);
        assert_eq!(group.get("Marking"), Some(92));
        assert_eq!(group.get("Sliding Tackle"), Some(0));
    }

    #[test]
    fn test_stat_group_json_merges_repeated_names() {
        let json = r#"[{"name":"Finishing","value":1},{"name":"Curve","value":5},{"name":"Finishing","value":2}]"#;
        let group: StatGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.get("Finishing"), Some(2));
        let names: Vec<&str> = group.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Finishing", "Curve"]);

        let back = serde_json::to_string(&group).unwrap();
        assert_eq!(back, r#"[{"name":"Finishing","value":2},{"name":"Curve","value":5}]"#);
    }

    #[test]
    fn test_team_unstored_columns() {
        let mut team = Team::named("Arsenal");
        assert!(team.unstored_columns().is_empty());
        team.league = "Premier League".into();
        team.att = 84;
        assert_eq!(team.unstored_columns(), vec!["league", "att"]);

        let parsed: Team = serde_json::from_str(r#"{"name":"Chelsea"}"#).unwrap();
        assert_eq!(parsed, Team::named("Chelsea"));
    }

    #[test]
    fn test_rgb_parse_and_display() {
        let red: Rgb = "#DA291C".parse().unwrap();
        assert_eq!(red, Rgb(0xDA, 0x29, 0x1C));
        assert_eq!(red.to_string(), "#DA291C");
        assert_eq!("ffffff".parse::<Rgb>().unwrap(), Rgb(255, 255, 255));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_enum_codes() {
        assert_eq!(Foot::from_code(1), Some(Foot::Left));
        assert_eq!(Foot::from_code(2), None);
        assert_eq!(TournamentKind::from_code(TournamentKind::National.code()), Some(TournamentKind::National));
        assert_eq!(KitKind::from_code(3), Some(KitKind::Goalkeeper));
        assert_eq!(KitKind::from_code(4), None);
    }
}
