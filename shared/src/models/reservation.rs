//! Reservation views
//!
//! 预订不单独存储，只是从桌台座位派生出来的视图，
//! 用于跨桌台的重名/相似姓名检查和按姓氏排序的名单。

use serde::{Deserialize, Serialize};

use super::table::Table;

/// A seat occupant and the table it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub name: String,
    /// Table name
    pub table: String,
}

/// Reservation with a last-name-first sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortableReservation {
    pub name: String,
    pub sortable_name: String,
    pub table: String,
}

impl From<Reservation> for SortableReservation {
    fn from(reservation: Reservation) -> Self {
        Self {
            sortable_name: sortable_name(&reservation.name),
            name: reservation.name,
            table: reservation.table,
        }
    }
}

/// "Anna Maria Schmidt" -> "schmidt anna maria"
pub fn sortable_name(name: &str) -> String {
    let mut words: Vec<&str> = name.split_whitespace().collect();
    let Some(last) = words.pop() else {
        return String::new();
    };
    let mut key = last.to_lowercase();
    for word in words {
        key.push(' ');
        key.push_str(&word.to_lowercase());
    }
    key
}

/// All reservations of active tables, ordered by last name
pub fn sorted_reservations(tables: &[Table]) -> Vec<SortableReservation> {
    let mut list: Vec<SortableReservation> = tables
        .iter()
        .filter(|table| table.active)
        .flat_map(Table::reservations)
        .map(SortableReservation::from)
        .collect();
    list.sort_by(|a, b| {
        a.sortable_name
            .cmp(&b.sortable_name)
            .then_with(|| a.table.cmp(&b.table))
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeatKey, TableCreate, TableId};

    #[test]
    fn test_sortable_name() {
        assert_eq!(sortable_name("Anna Maria Schmidt"), "schmidt anna maria");
        assert_eq!(sortable_name("  Max   Mustermann "), "mustermann max");
        assert_eq!(sortable_name("Solo"), "solo");
        assert_eq!(sortable_name("   "), "");
    }

    #[test]
    fn test_sorted_reservations_skips_inactive_tables() {
        let mut a = Table::from_create(TableId::from(1), TableCreate::new(1, "A"));
        a.set_seat(SeatKey::Seat1, "Zoe Adams");
        a.set_seat(SeatKey::Seat2, "Bob Zimmer");
        let mut b = Table::from_create(TableId::from(2), TableCreate::new(2, "B"));
        b.set_seat(SeatKey::Seat1, "Carl Becker");
        let mut c = Table::from_create(TableId::from(3), TableCreate::new(3, "C"));
        c.active = false;
        c.set_seat(SeatKey::Seat1, "Hidden Guest");

        let list = sorted_reservations(&[a, b, c]);
        let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zoe Adams", "Carl Becker", "Bob Zimmer"]);
        assert_eq!(list[1].table, "B");
    }
}
