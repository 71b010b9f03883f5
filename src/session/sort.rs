//! Stable sorting of the full index by date, sender or subject.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{MboxError, Result};
use crate::model::mail::MessageRecord;

/// Field used for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    From,
    Subject,
}

impl SortField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::From => "from",
            Self::Subject => "subject",
        }
    }
}

impl FromStr for SortField {
    type Err = MboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "from" => Ok(Self::From),
            "subject" => Ok(Self::Subject),
            _ => Err(MboxError::UnknownSortField(s.trim().to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = MboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(MboxError::InvalidArgument(format!(
                "sort direction must be 'asc' or 'desc', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ascending",
            Self::Desc => "descending",
        })
    }
}

/// A permutation of `records` (as indices) ordered by `field`.
///
/// Records without a key (unparsed date, empty header) always come last,
/// in both directions. The sort is stable: equal keys keep file order.
pub fn sort_order(records: &[MessageRecord], field: SortField, direction: SortDirection) -> Vec<usize> {
    match field {
        SortField::Date => {
            let keys: Vec<_> = records.iter().map(|r| r.date.date().copied()).collect();
            order_by_keys(&keys, direction)
        }
        SortField::From => order_by_keys(&text_keys(records, MessageRecord::from), direction),
        SortField::Subject => order_by_keys(&text_keys(records, MessageRecord::subject), direction),
    }
}

/// Lowercased header values, `None` when empty.
fn text_keys(records: &[MessageRecord], get: fn(&MessageRecord) -> &str) -> Vec<Option<String>> {
    records
        .iter()
        .map(|r| {
            let v = get(r).trim();
            (!v.is_empty()).then(|| v.to_lowercase())
        })
        .collect()
}

fn order_by_keys<K: Ord>(keys: &[Option<K>], direction: SortDirection) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..keys.len()).collect();
    indices.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
        (Some(ka), Some(kb)) => direction.apply(ka.cmp(kb)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::{HeaderName, Headers, MailDate, NormalizedDate};
    use crate::parser::date::Strategy;
    use chrono::NaiveDate;

    fn record(index: usize, from: &str, subject: &str, day: Option<u32>) -> MessageRecord {
        let mut headers = Headers::default();
        headers.set(HeaderName::From, from);
        headers.set(HeaderName::Subject, subject);
        let date = match day {
            Some(d) => NormalizedDate::Parsed {
                date: MailDate::Day(NaiveDate::from_ymd_opt(2023, 1, d).unwrap()),
                strategy: Strategy::Iso8601,
            },
            None => NormalizedDate::Unparsed,
        };
        MessageRecord {
            index,
            offset: index as u64,
            length: 1,
            headers,
            date,
        }
    }

    fn sample() -> Vec<MessageRecord> {
        vec![
            record(0, "carol@x.org", "beta", Some(3)),
            record(1, "", "Alpha", None),
            record(2, "Alice@x.org", "", Some(1)),
            record(3, "bob@x.org", "alpha", Some(3)),
            record(4, "alice@x.org", "gamma", Some(2)),
        ]
    }

    #[test]
    fn test_date_unparsed_last_both_directions() {
        let records = sample();
        let asc = sort_order(&records, SortField::Date, SortDirection::Asc);
        let desc = sort_order(&records, SortField::Date, SortDirection::Desc);
        assert_eq!(asc, vec![2, 4, 0, 3, 1]);
        // Ties (0 and 3) keep file order in both directions
        assert_eq!(desc, vec![0, 3, 4, 2, 1]);
    }

    #[test]
    fn test_text_case_insensitive_and_empty_last() {
        let records = sample();
        assert_eq!(
            sort_order(&records, SortField::From, SortDirection::Asc),
            vec![2, 4, 3, 0, 1]
        );
        assert_eq!(
            sort_order(&records, SortField::Subject, SortDirection::Desc),
            vec![4, 0, 1, 3, 2]
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let records = sample();
        let once = sort_order(&records, SortField::Subject, SortDirection::Asc);
        let again = sort_order(&records, SortField::Subject, SortDirection::Asc);
        assert_eq!(once, again);
        assert_eq!(once, vec![1, 3, 0, 4, 2]);
    }

    #[test]
    fn test_parse_field_and_direction() {
        assert_eq!("DATE".parse::<SortField>().unwrap(), SortField::Date);
        assert!(matches!(
            "size".parse::<SortField>(),
            Err(MboxError::UnknownSortField(_))
        ));
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
