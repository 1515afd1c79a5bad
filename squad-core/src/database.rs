//! In-memory squad database
//!
//! Seven keyed tables plus the format metadata (magic, version) they were
//! loaded with. A Database is plain data; reading and writing files lives in
//! [`crate::file`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::{Magic, SectionKind};
use crate::records::{
    Country, EntityId, Kit, League, Player, Record, Stadium, Team, Tournament,
};

/// Records of one table, keyed by ID. Iteration is in ascending ID order.
pub type Table<T> = BTreeMap<EntityId, T>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Format variant; `None` for a database that was never loaded
    #[serde(default)]
    pub magic: Option<Magic>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    countries: Table<Country>,
    #[serde(default)]
    leagues: Table<League>,
    #[serde(default)]
    teams: Table<Team>,
    #[serde(default)]
    players: Table<Player>,
    #[serde(default)]
    stadiums: Table<Stadium>,
    #[serde(default)]
    tournaments: Table<Tournament>,
    #[serde(default)]
    kits: Table<Kit>,
}

fn default_version() -> u32 {
    1
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic access to the table that holds a record type
pub trait Tabled: Record + Sized {
    fn table(db: &Database) -> &Table<Self>;
    fn table_mut(db: &mut Database) -> &mut Table<Self>;
}

macro_rules! tables {
    ($($ty:ty => $field:ident, $get:ident, $upsert:ident, $remove:ident;)*) => {
        $(
            impl Tabled for $ty {
                fn table(db: &Database) -> &Table<Self> {
                    &db.$field
                }

                fn table_mut(db: &mut Database) -> &mut Table<Self> {
                    &mut db.$field
                }
            }
        )*

        impl Database {
            $(
                pub fn $field(&self) -> &Table<$ty> {
                    &self.$field
                }

                pub fn $get(&self, id: EntityId) -> Option<&$ty> {
                    self.$field.get(&id)
                }

                /// Insert or replace a record, returning the one it replaced
                pub fn $upsert(&mut self, id: EntityId, record: $ty) -> Option<$ty> {
                    self.$field.insert(id, record)
                }

                pub fn $remove(&mut self, id: EntityId) -> Option<$ty> {
                    self.$field.remove(&id)
                }
            )*
        }
    };
}

tables! {
    Country => countries, country, upsert_country, remove_country;
    League => leagues, league, upsert_league, remove_league;
    Team => teams, team, upsert_team, remove_team;
    Player => players, player, upsert_player, remove_player;
    Stadium => stadiums, stadium, upsert_stadium, remove_stadium;
    Tournament => tournaments, tournament, upsert_tournament, remove_tournament;
    Kit => kits, kit, upsert_kit, remove_kit;
}

impl Database {
    /// Empty database with no format chosen yet
    pub fn new() -> Self {
        Self {
            magic: None,
            version: default_version(),
            countries: Table::new(),
            leagues: Table::new(),
            teams: Table::new(),
            players: Table::new(),
            stadiums: Table::new(),
            tournaments: Table::new(),
            kits: Table::new(),
        }
    }

    pub fn with_format(magic: Magic, version: u32) -> Self {
        Self {
            magic: Some(magic),
            version,
            ..Self::new()
        }
    }

    pub fn table<T: Tabled>(&self) -> &Table<T> {
        T::table(self)
    }

    pub fn table_mut<T: Tabled>(&mut self) -> &mut Table<T> {
        T::table_mut(self)
    }

    /// Number of records in one table
    pub fn len_of(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::Countries => self.countries.len(),
            SectionKind::Leagues => self.leagues.len(),
            SectionKind::Teams => self.teams.len(),
            SectionKind::Players => self.players.len(),
            SectionKind::Stadiums => self.stadiums.len(),
            SectionKind::Tournaments => self.tournaments.len(),
            SectionKind::Kits => self.kits.len(),
        }
    }

    pub fn record_count(&self) -> usize {
        SectionKind::ALL.iter().map(|&k| self.len_of(k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::records::{Foot, KitKind, Rgb, StatCategory, StatGroup, TournamentKind};

    pub fn england() -> Country {
        Country {
            name: "England".into(),
            short_name: "Eng".into(),
            abbreviation: "ENG".into(),
            confederation: "UEFA".into(),
            iso_code: "ENG".into(),
            level: 5,
            rating: 85,
            flag_code: "ENG".into(),
        }
    }

    pub fn player(name: &str, overall: u8) -> Player {
        Player {
            name: name.into(),
            overall,
            position: "ST".into(),
            age: 30,
            team: "Bayern Munich".into(),
            nationality: "England".into(),
            height: 188,
            weight: 86,
            foot: Foot::Right,
            league: "Bundesliga".into(),
            attack: StatGroup::from_table(StatCategory::Attack, &[94, 90, 87, 88, 92]),
            midfield: StatGroup::from_table(StatCategory::Midfield, &[85, 87, 77, 78, 82]),
            defense: StatGroup::from_table(StatCategory::Defense, &[52, 48, 42]),
            goalkeeping: StatGroup::from_table(StatCategory::Goalkeeping, &[11, 14, 12, 10, 15]),
        }
    }

    /// One record in every table, with non-ASCII text where the table allows it
    pub fn sample_database(magic: Magic) -> Database {
        let mut db = Database::with_format(magic, 3);
        db.upsert_country(1, england());
        db.upsert_country(
            54,
            Country {
                name: "España".into(),
                short_name: "Esp".into(),
                abbreviation: "ESP".into(),
                confederation: "UEFA".into(),
                iso_code: "ES".into(),
                level: 5,
                rating: 84,
                flag_code: "ESP".into(),
            },
        );
        db.upsert_league(
            13,
            League {
                name: "Premier League".into(),
                country: "England".into(),
                division: 1,
                team_count: 20,
                extra: vec![0xAA, 0x01],
            },
        );
        db.upsert_team(
            11,
            Team::named("Manchester United"),
        );
        db.upsert_team(
            243,
            Team::named("Atlético de Madrid"),
        );
        db.upsert_player(192448, player("Harry Kane", 90));
        let mut vini = player("Vinícius Jr.", 89);
        vini.position = "LW".into();
        vini.foot = Foot::Left;
        db.upsert_player(208722, vini);
        db.upsert_stadium(
            1,
            Stadium {
                name: "Old Trafford".into(),
                city: "Manchester".into(),
                country: "England".into(),
                capacity: 74_310,
                team: "Manchester United".into(),
                built: 1910,
            },
        );
        db.upsert_tournament(
            1,
            Tournament {
                name: "UEFA Champions League".into(),
                kind: TournamentKind::Club,
                region: "Europe".into(),
                team_count: 32,
                prize: "€20M".into(),
                champion: "Manchester City".into(),
            },
        );
        db.upsert_kit(
            7,
            Kit {
                team: "Manchester United".into(),
                season: "2024/25".into(),
                kind: KitKind::Home,
                color1: Rgb(0xDA, 0x29, 0x1C),
                color2: Rgb(0xFF, 0xFF, 0xFF),
                brand: "adidas".into(),
                sponsor: "Snapdragon".into(),
            },
        );
        db
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_new_database_is_empty() {
        let db = Database::new();
        assert!(db.is_empty());
        assert_eq!(db.magic, None);
        assert_eq!(db.version, 1);
        for kind in SectionKind::ALL {
            assert_eq!(db.len_of(kind), 0);
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut db = Database::new();
        assert!(db.upsert_country(1, england()).is_none());

        let mut renamed = england();
        renamed.rating = 90;
        let previous = db.upsert_country(1, renamed).unwrap();
        assert_eq!(previous.rating, 85);
        assert_eq!(db.countries().len(), 1);
        assert_eq!(db.country(1).unwrap().rating, 90);
    }

    #[test]
    fn test_remove() {
        let mut db = sample_database(Magic::Sqdf);
        let before = db.record_count();
        assert!(db.remove_team(11).is_some());
        assert!(db.remove_team(11).is_none());
        assert_eq!(db.record_count(), before - 1);
    }

    #[test]
    fn test_generic_table_access() {
        let mut db = sample_database(Magic::Fbch);
        assert_eq!(db.table::<Player>().len(), 2);
        db.table_mut::<Player>().clear();
        assert!(db.players().is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let db = sample_database(Magic::Sqd2);
        let json = serde_json::to_string(&db).unwrap();
        assert!(json.contains("\"SQD2\""));
        assert!(json.contains("#DA291C"));
        let back: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(back, db);
    }

    #[test]
    fn test_json_missing_tables_default_empty() {
        let db: Database = serde_json::from_str(r#"{"magic":"FBCH"}"#).unwrap();
        assert_eq!(db.magic, Some(Magic::Fbch));
        assert_eq!(db.version, 1);
        assert!(db.is_empty());
    }
}
