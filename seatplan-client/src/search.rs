//! Search and highlight ranges

use std::ops::Range;

use shared::models::Table;

/// 少于 3 个字符不搜索
pub const MIN_SEARCH_LEN: usize = 3;

fn is_searchable(term: &str) -> bool {
    term.chars().count() >= MIN_SEARCH_LEN
}

/// Lowercase `text` char by char, remembering for every output byte
/// the byte range of the source char it came from
fn lowercase_with_sources(text: &str) -> (String, Vec<Range<usize>>) {
    let mut lowered = String::with_capacity(text.len());
    let mut sources = Vec::with_capacity(text.len());
    for (offset, ch) in text.char_indices() {
        let source = offset..offset + ch.len_utf8();
        for lower in ch.to_lowercase() {
            lowered.push(lower);
            sources.extend(std::iter::repeat_n(source.clone(), lower.len_utf8()));
        }
    }
    (lowered, sources)
}

/// Non-overlapping, case-insensitive matches of `term` in `text`
///
/// Ranges are byte offsets into the original `text`, also when lowercasing
/// changes the byte length (`ẞ` -> `ß`, `İ` -> `i̇`).
pub fn find_matches(text: &str, term: &str) -> Vec<Range<usize>> {
    if !is_searchable(term) {
        return Vec::new();
    }
    let (lowered, sources) = lowercase_with_sources(text);
    let (term, _) = lowercase_with_sources(term);

    let mut ranges = Vec::new();
    let mut start = 0;
    while let Some(pos) = lowered[start..].find(&term) {
        let begin = start + pos;
        let end = begin + term.len();
        ranges.push(sources[begin].start..sources[end - 1].end);
        start = end;
    }
    ranges
}

/// Tables whose name or a visible seat contains `term`
pub fn search_tables<'a>(tables: &'a [Table], term: &str) -> Vec<&'a Table> {
    if !is_searchable(term) {
        return Vec::new();
    }
    let term = term.to_lowercase();
    let hit = |text: &str| text.to_lowercase().contains(&term);

    tables
        .iter()
        .filter(|table| hit(&table.name) || table.seat_entries().any(|(_, name)| hit(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{SeatKey, TableCreate, TableId};

    #[test]
    fn test_find_matches() {
        assert_eq!(find_matches("Anna Annabell", "ann"), vec![0..3, 5..8]);
        assert_eq!(find_matches("aaaaaa", "aaa"), vec![0..3, 3..6]);
        assert!(find_matches("Anna", "an").is_empty());
        assert!(find_matches("Anna", "xyz").is_empty());
    }

    #[test]
    fn test_find_matches_maps_back_to_original_text() {
        // 'ẞ' 占 3 字节，小写 'ß' 占 2 字节
        let text = "GROẞE Straße";
        let ranges = find_matches(text, "straße");
        assert_eq!(ranges.len(), 1);
        assert_eq!(&text[ranges[0].clone()], "Straße");

        let ranges = find_matches(text, "groß");
        assert_eq!(&text[ranges[0].clone()], "GROẞ");

        // 'İ' 小写后变成两个字符
        let text = "İstanbul Allee";
        let ranges = find_matches(text, "allee");
        assert_eq!(&text[ranges[0].clone()], "Allee");
    }

    #[test]
    fn test_search_tables() {
        let mut a = Table::from_create(TableId::from(1), TableCreate::new(1, "Fenster"));
        a.set_seat(SeatKey::Seat1, "Max Mustermann");
        let mut b = Table::from_create(TableId::from(2), TableCreate::new(2, "Bar"));
        b.seats = 4;
        // 隐藏槽位不参与搜索
        b.set_seat(SeatKey::Seat6, "Erika Mustermann");

        let tables = vec![a, b];
        let found = search_tables(&tables, "MUSTER");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, TableId::from(1));

        let found = search_tables(&tables, "bar");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bar");
    }

    #[test]
    fn test_short_term_matches_nothing() {
        let table = Table::from_create(TableId::from(1), TableCreate::new(1, "Bar"));
        let tables = [table];
        assert!(search_tables(&tables, "ba").is_empty());
    }
}
