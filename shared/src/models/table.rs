//! Table Model (桌台)
//!
//! 一个桌台最多 8 个座位槽位，`seats` 决定其中前几个可见。
//! 锁字段 (`locked_by` / `locked_at`) 只是协作约定，数据库不做仲裁。

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::reservation::Reservation;

/// 最少座位数
pub const MIN_SEATS: u8 = 4;
/// 最多座位数
pub const MAX_SEATS: u8 = 8;
/// 座位槽位总数
pub const SEAT_SLOTS: usize = 8;

/// Table identity: numeric (SQL backends) or string (document stores)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TableId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for TableId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TableId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Seat slot key (`seat_1` .. `seat_8`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeatKey {
    #[serde(rename = "seat_1")]
    Seat1,
    #[serde(rename = "seat_2")]
    Seat2,
    #[serde(rename = "seat_3")]
    Seat3,
    #[serde(rename = "seat_4")]
    Seat4,
    #[serde(rename = "seat_5")]
    Seat5,
    #[serde(rename = "seat_6")]
    Seat6,
    #[serde(rename = "seat_7")]
    Seat7,
    #[serde(rename = "seat_8")]
    Seat8,
}

impl SeatKey {
    pub const ALL: [SeatKey; SEAT_SLOTS] = [
        SeatKey::Seat1,
        SeatKey::Seat2,
        SeatKey::Seat3,
        SeatKey::Seat4,
        SeatKey::Seat5,
        SeatKey::Seat6,
        SeatKey::Seat7,
        SeatKey::Seat8,
    ];

    /// Zero-based slot index
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Key for a zero-based slot index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Field name as stored in the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seat1 => "seat_1",
            Self::Seat2 => "seat_2",
            Self::Seat3 => "seat_3",
            Self::Seat4 => "seat_4",
            Self::Seat5 => "seat_5",
            Self::Seat6 => "seat_6",
            Self::Seat7 => "seat_7",
            Self::Seat8 => "seat_8",
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory lock state of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        /// Ephemeral editor id of the holder
        by: String,
        /// Lock time (ms since epoch), if the backend stored one
        at: Option<i64>,
    },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Whether `editor_id` holds this lock
    pub fn is_held_by(&self, editor_id: &str) -> bool {
        matches!(self, Self::Locked { by, .. } if by == editor_id)
    }
}

/// Table entity (桌台)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    /// 排序序号
    pub index: i64,
    pub name: String,
    pub active: bool,
    pub seats: u8,
    #[serde(default)]
    pub seat_1: String,
    #[serde(default)]
    pub seat_2: String,
    #[serde(default)]
    pub seat_3: String,
    #[serde(default)]
    pub seat_4: String,
    #[serde(default)]
    pub seat_5: String,
    #[serde(default)]
    pub seat_6: String,
    #[serde(default)]
    pub seat_7: String,
    #[serde(default)]
    pub seat_8: String,
    /// 锁持有者 (editor id)
    #[serde(default)]
    pub locked_by: Option<String>,
    /// 加锁时间 (ms)
    #[serde(default)]
    pub locked_at: Option<i64>,
}

impl Table {
    /// Build a stored table from a create payload and the id the backend assigned
    pub fn from_create(id: TableId, data: TableCreate) -> Self {
        let mut table = Self {
            id,
            index: data.index,
            name: data.name,
            active: data.active,
            seats: data.seats,
            seat_1: data.seat_1,
            seat_2: data.seat_2,
            seat_3: data.seat_3,
            seat_4: data.seat_4,
            seat_5: data.seat_5,
            seat_6: data.seat_6,
            seat_7: data.seat_7,
            seat_8: data.seat_8,
            locked_by: None,
            locked_at: None,
        };
        table.clamp_seats();
        table
    }

    pub fn seat(&self, key: SeatKey) -> &str {
        match key {
            SeatKey::Seat1 => &self.seat_1,
            SeatKey::Seat2 => &self.seat_2,
            SeatKey::Seat3 => &self.seat_3,
            SeatKey::Seat4 => &self.seat_4,
            SeatKey::Seat5 => &self.seat_5,
            SeatKey::Seat6 => &self.seat_6,
            SeatKey::Seat7 => &self.seat_7,
            SeatKey::Seat8 => &self.seat_8,
        }
    }

    pub fn set_seat(&mut self, key: SeatKey, name: impl Into<String>) {
        let slot = match key {
            SeatKey::Seat1 => &mut self.seat_1,
            SeatKey::Seat2 => &mut self.seat_2,
            SeatKey::Seat3 => &mut self.seat_3,
            SeatKey::Seat4 => &mut self.seat_4,
            SeatKey::Seat5 => &mut self.seat_5,
            SeatKey::Seat6 => &mut self.seat_6,
            SeatKey::Seat7 => &mut self.seat_7,
            SeatKey::Seat8 => &mut self.seat_8,
        };
        *slot = name.into();
    }

    /// Number of visible seat slots, always within [MIN_SEATS, MAX_SEATS]
    pub fn visible_seats(&self) -> u8 {
        self.seats.clamp(MIN_SEATS, MAX_SEATS)
    }

    /// Clamp a seat count that came from the backend into range
    pub fn clamp_seats(&mut self) {
        self.seats = self.visible_seats();
    }

    /// The first `seats` slot keys
    pub fn active_seat_keys(&self) -> impl Iterator<Item = SeatKey> + '_ {
        SeatKey::ALL.into_iter().take(self.visible_seats() as usize)
    }

    /// Visible slots with their occupant (possibly empty)
    pub fn seat_entries(&self) -> impl Iterator<Item = (SeatKey, &str)> + '_ {
        self.active_seat_keys().map(|key| (key, self.seat(key)))
    }

    /// Occupied visible seats
    pub fn occupied_seats(&self) -> usize {
        self.seat_entries()
            .filter(|(_, name)| !name.trim().is_empty())
            .count()
    }

    /// Free visible seats; hidden slots never count
    pub fn empty_seats(&self) -> usize {
        self.visible_seats() as usize - self.occupied_seats()
    }

    /// 增加座位 (上限 MAX_SEATS)，返回新的座位数
    pub fn increase_seats(&mut self) -> u8 {
        self.seats = (self.visible_seats() + 1).min(MAX_SEATS);
        self.seats
    }

    /// 减少座位 (下限 MIN_SEATS)，隐藏槽位中的姓名保留不删
    pub fn decrease_seats(&mut self) -> u8 {
        self.seats = self.visible_seats().saturating_sub(1).max(MIN_SEATS);
        self.seats
    }

    pub fn lock_state(&self) -> LockState {
        match &self.locked_by {
            Some(by) if !by.is_empty() => LockState::Locked {
                by: by.clone(),
                at: self.locked_at,
            },
            _ => LockState::Unlocked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state().is_locked()
    }

    /// Reservations of the visible, occupied seats
    pub fn reservations(&self) -> Vec<Reservation> {
        self.seat_entries()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(_, name)| Reservation {
                name: name.to_string(),
                table: self.name.clone(),
            })
            .collect()
    }
}

/// Create table payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCreate {
    pub index: i64,
    pub name: String,
    pub active: bool,
    pub seats: u8,
    pub seat_1: String,
    pub seat_2: String,
    pub seat_3: String,
    pub seat_4: String,
    pub seat_5: String,
    pub seat_6: String,
    pub seat_7: String,
    pub seat_8: String,
}

impl TableCreate {
    /// Empty active table with all eight seats visible
    pub fn new(index: i64, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            active: true,
            seats: MAX_SEATS,
            seat_1: String::new(),
            seat_2: String::new(),
            seat_3: String::new(),
            seat_4: String::new(),
            seat_5: String::new(),
            seat_6: String::new(),
            seat_7: String::new(),
            seat_8: String::new(),
        }
    }

    pub fn with_seats(mut self, seats: u8) -> Self {
        self.seats = seats.clamp(MIN_SEATS, MAX_SEATS);
        self
    }
}

/// Partial update payload
///
/// Lock fields are double options: `None` leaves the field alone,
/// `Some(None)` writes `null` and clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_7: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_8: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some"
    )]
    pub locked_by: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some"
    )]
    pub locked_at: Option<Option<i64>>,
}

/// Distinguishes an explicit `null` from a missing field
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl TablePatch {
    /// Take the lock for `editor_id` at `at_ms`
    pub fn lock(editor_id: impl Into<String>, at_ms: i64) -> Self {
        Self {
            locked_by: Some(Some(editor_id.into())),
            locked_at: Some(Some(at_ms)),
            ..Default::default()
        }
    }

    /// Clear the lock fields
    pub fn unlock() -> Self {
        Self {
            locked_by: Some(None),
            locked_at: Some(None),
            ..Default::default()
        }
    }

    /// Full edit write of a table's editable fields; also releases the lock
    pub fn from_table(table: &Table) -> Self {
        Self {
            index: Some(table.index),
            name: Some(table.name.clone()),
            active: Some(table.active),
            seats: Some(table.visible_seats()),
            seat_1: Some(table.seat_1.clone()),
            seat_2: Some(table.seat_2.clone()),
            seat_3: Some(table.seat_3.clone()),
            seat_4: Some(table.seat_4.clone()),
            seat_5: Some(table.seat_5.clone()),
            seat_6: Some(table.seat_6.clone()),
            seat_7: Some(table.seat_7.clone()),
            seat_8: Some(table.seat_8.clone()),
            ..Self::unlock()
        }
    }

    pub fn set_seat(&mut self, key: SeatKey, name: impl Into<String>) {
        let name = Some(name.into());
        match key {
            SeatKey::Seat1 => self.seat_1 = name,
            SeatKey::Seat2 => self.seat_2 = name,
            SeatKey::Seat3 => self.seat_3 = name,
            SeatKey::Seat4 => self.seat_4 = name,
            SeatKey::Seat5 => self.seat_5 = name,
            SeatKey::Seat6 => self.seat_6 = name,
            SeatKey::Seat7 => self.seat_7 = name,
            SeatKey::Seat8 => self.seat_8 = name,
        }
    }

    /// Whether the patch touches the lock fields at all
    pub fn touches_lock(&self) -> bool {
        self.locked_by.is_some() || self.locked_at.is_some()
    }

    /// Apply the patch to a stored table
    pub fn apply_to(&self, table: &mut Table) {
        if let Some(index) = self.index {
            table.index = index;
        }
        if let Some(name) = &self.name {
            table.name = name.clone();
        }
        if let Some(active) = self.active {
            table.active = active;
        }
        if let Some(seats) = self.seats {
            table.seats = seats.clamp(MIN_SEATS, MAX_SEATS);
        }
        let seats = [
            &self.seat_1,
            &self.seat_2,
            &self.seat_3,
            &self.seat_4,
            &self.seat_5,
            &self.seat_6,
            &self.seat_7,
            &self.seat_8,
        ];
        for (key, value) in SeatKey::ALL.into_iter().zip(seats) {
            if let Some(value) = value {
                table.set_seat(key, value.clone());
            }
        }
        if let Some(locked_by) = &self.locked_by {
            table.locked_by = locked_by.clone();
        }
        if let Some(locked_at) = self.locked_at {
            table.locked_at = locked_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_table() -> Table {
        let mut table = Table::from_create(TableId::from(1), TableCreate::new(1, "Tisch 1"));
        for (i, key) in SeatKey::ALL.into_iter().enumerate() {
            table.set_seat(key, format!("Gast Nummer{}", i + 1));
        }
        table
    }

    #[test]
    fn test_full_table_has_no_empty_seats() {
        let table = full_table();
        assert_eq!(table.seats, 8);
        assert_eq!(table.occupied_seats(), 8);
        assert_eq!(table.empty_seats(), 0);
    }

    #[test]
    fn test_decrease_keeps_hidden_occupants() {
        let mut table = full_table();
        for _ in 0..10 {
            table.decrease_seats();
        }
        assert_eq!(table.seats, MIN_SEATS);
        assert_eq!(table.active_seat_keys().count(), 4);
        assert_eq!(table.empty_seats(), 0);
        // 隐藏槽位的数据仍然存在
        assert_eq!(table.seat_8, "Gast Nummer8");
        assert_eq!(table.reservations().len(), 4);

        table.increase_seats();
        assert_eq!(table.reservations().len(), 5);
    }

    #[test]
    fn test_seat_count_never_leaves_range() {
        let mut table = Table::from_create(TableId::from(2), TableCreate::new(2, "Tisch 2"));
        for _ in 0..20 {
            let seats = table.increase_seats();
            assert!((MIN_SEATS..=MAX_SEATS).contains(&seats));
        }
        assert_eq!(table.seats, MAX_SEATS);
        for _ in 0..20 {
            let seats = table.decrease_seats();
            assert!((MIN_SEATS..=MAX_SEATS).contains(&seats));
        }
        assert_eq!(table.seats, MIN_SEATS);
    }

    #[test]
    fn test_out_of_range_seats_are_clamped() {
        let mut table = full_table();
        table.seats = 12;
        assert_eq!(table.visible_seats(), 8);
        table.seats = 1;
        assert_eq!(table.visible_seats(), 4);
        assert_eq!(table.increase_seats(), 5);
    }

    #[test]
    fn test_lock_state() {
        let mut table = full_table();
        assert_eq!(table.lock_state(), LockState::Unlocked);

        TablePatch::lock("_abc12345", 1_000).apply_to(&mut table);
        let state = table.lock_state();
        assert!(state.is_locked());
        assert!(state.is_held_by("_abc12345"));
        assert!(!state.is_held_by("_other"));

        TablePatch::unlock().apply_to(&mut table);
        assert_eq!(table.lock_state(), LockState::Unlocked);
        assert_eq!(table.locked_at, None);
    }

    #[test]
    fn test_patch_serializes_explicit_null_for_unlock() {
        let json = serde_json::to_value(TablePatch::unlock()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "locked_by": null, "locked_at": null })
        );

        let patch: TablePatch = serde_json::from_value(json).unwrap();
        assert_eq!(patch, TablePatch::unlock());

        let empty: TablePatch = serde_json::from_str("{}").unwrap();
        assert!(!empty.touches_lock());
    }

    #[test]
    fn test_from_table_releases_lock() {
        let mut table = full_table();
        TablePatch::lock("_abc12345", 1_000).apply_to(&mut table);
        let patch = TablePatch::from_table(&table);
        assert!(patch.touches_lock());
        patch.apply_to(&mut table);
        assert!(!table.is_locked());
        assert_eq!(table.seat_3, "Gast Nummer3");
    }

    #[test]
    fn test_table_id_untagged() {
        let numeric: TableId = serde_json::from_str("7").unwrap();
        assert_eq!(numeric, TableId::Number(7));
        let text: TableId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(text, TableId::Text("abc".into()));
        assert_eq!(text.to_string(), "abc");
    }
}
