//! Groups [`Record`]s by category and by tag, plus the single group of all
//! records. Groups only reference records; nothing is copied.
//!
//! Within a group members are ordered by date, most recent first. The sort is
//! stable, so records sharing a date keep the order in which they were
//! encountered while walking the source tree.

use crate::record::{year_of, Record};
use std::collections::BTreeMap;

/// The key of the group containing every record.
pub const ALL: &str = "all";

/// A named, sorted collection of records sharing a grouping key.
#[derive(Clone, Debug)]
pub struct Group<'a> {
    pub key: String,
    pub members: Vec<&'a Record>,
}

/// The members of a [`Group`] published in a single year.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearBucket<'a> {
    pub year: &'a str,
    pub members: Vec<&'a Record>,
}

impl<'a> Group<'a> {
    /// Builds a group, sorting `members` by date (descending). Equal dates
    /// keep their relative order.
    pub fn new(key: &str, mut members: Vec<&'a Record>) -> Group<'a> {
        members.sort_by(|a, b| b.date.cmp(&a.date));
        Group {
            key: key.to_owned(),
            members,
        }
    }

    /// Re-groups the members by year, most recent year first. Since members
    /// are already sorted, each bucket is a run of consecutive members.
    pub fn year_buckets(&self) -> Vec<YearBucket<'a>> {
        let mut buckets: Vec<YearBucket<'a>> = Vec::new();
        for &record in &self.members {
            let year = year_of(&record.date);
            match buckets.last_mut() {
                Some(bucket) if bucket.year == year => bucket.members.push(record),
                _ => buckets.push(YearBucket {
                    year,
                    members: vec![record],
                }),
            }
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Every grouping of a build's records.
#[derive(Clone, Debug)]
pub struct Index<'a> {
    pub by_category: BTreeMap<String, Group<'a>>,
    pub by_tag: BTreeMap<String, Group<'a>>,
    pub all: Group<'a>,
}

/// Indexes `records`, which must be in encounter order. Each record lands in
/// exactly one category group, in one tag group per tag, and in the
/// [`ALL`] group.
pub fn index(records: &[Record]) -> Index<'_> {
    let mut categories: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    let mut tags: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();

    for record in records {
        categories
            .entry(record.category.as_str())
            .or_default()
            .push(record);
        for tag in &record.tags {
            tags.entry(tag.as_str()).or_default().push(record);
        }
    }

    Index {
        by_category: groups(categories),
        by_tag: groups(tags),
        all: Group::new(ALL, records.iter().collect()),
    }
}

fn groups<'a>(partition: BTreeMap<&str, Vec<&'a Record>>) -> BTreeMap<String, Group<'a>> {
    partition
        .into_iter()
        .map(|(key, members)| (key.to_owned(), Group::new(key, members)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::record;
    use pretty_assertions::assert_eq;

    fn titles(members: &[&Record]) -> Vec<String> {
        members.iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn test_sort_is_stable_and_date_descending() {
        let records = vec![
            record("Older", "2023/12/31", "blog", &[]),
            record("First", "2024/03/01", "blog", &[]),
            record("Second", "2024/03/01", "blog", &[]),
        ];
        let group = Group::new(ALL, records.iter().collect());
        assert_eq!(vec!["First", "Second", "Older"], titles(&group.members));
    }

    #[test]
    fn test_year_buckets_partition_members() {
        let records = vec![
            record("A", "2022/05/01", "blog", &[]),
            record("B", "2024/01/10", "blog", &[]),
            record("C", "2023/06/01", "blog", &[]),
            record("D", "2024/07/04", "blog", &[]),
            record("E", "2022/12/25", "blog", &[]),
        ];
        let group = Group::new(ALL, records.iter().collect());
        let buckets = group.year_buckets();

        let years: Vec<&str> = buckets.iter().map(|b| b.year).collect();
        assert_eq!(vec!["2024", "2023", "2022"], years);

        let concatenated: Vec<&Record> = buckets.iter().flat_map(|b| b.members.clone()).collect();
        assert_eq!(group.members, concatenated);

        for bucket in &buckets {
            assert!(bucket.members.iter().all(|r| r.year() == bucket.year));
        }
    }

    #[test]
    fn test_empty_group_has_no_buckets() {
        assert!(Group::new(ALL, Vec::new()).year_buckets().is_empty());
    }

    #[test]
    fn test_index() {
        let records = vec![
            record("Notes", "2023/06/01", "notes", &["a"]),
            record("Blog", "2024/01/10", "blog", &["a", "b"]),
            record("Untagged", "2022/01/01", "blog", &[]),
        ];
        let index = index(&records);

        assert_eq!(
            vec!["blog", "notes"],
            index.by_category.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            vec!["Blog", "Untagged"],
            titles(&index.by_category["blog"].members)
        );
        assert_eq!(vec!["Notes"], titles(&index.by_category["notes"].members));

        assert_eq!(vec!["a", "b"], index.by_tag.keys().collect::<Vec<_>>());
        assert_eq!(vec!["Blog", "Notes"], titles(&index.by_tag["a"].members));
        assert_eq!(vec!["Blog"], titles(&index.by_tag["b"].members));

        assert_eq!(
            vec!["Blog", "Notes", "Untagged"],
            titles(&index.all.members)
        );
        assert_eq!(ALL, index.all.key);
    }

    #[test]
    fn test_every_member_matches_its_group_key() {
        let records = vec![
            record("One", "2024/01/01", "blog", &["x", "y"]),
            record("Two", "2024/01/02", "notes", &["y"]),
        ];
        let index = index(&records);
        for (category, group) in &index.by_category {
            assert!(group.members.iter().all(|r| &r.category == category));
        }
        for (tag, group) in &index.by_tag {
            assert!(group.members.iter().all(|r| r.tags.contains(tag)));
        }
        let memberships: usize = index.by_tag.values().map(Group::len).sum();
        assert_eq!(3, memberships);
    }
}
