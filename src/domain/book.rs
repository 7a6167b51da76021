use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub type BookId = String;

/// Why a copy could not be moved in or out of circulation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError {
    #[error("copy count would overflow")]
    CountOverflow,

    #[error("borrower does not hold a copy")]
    BorrowerNotFound,
}

/// A lendable title tracked in the world state.
///
/// Serialized as a flat JSON object; the field names are the persisted
/// encoding and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "ID")]
    pub id: BookId,
    pub title: String,
    #[serde(rename = "numAvail")]
    pub num_avail: i64,
    #[serde(rename = "numBorrow")]
    pub num_borrow: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub borrowers: Vec<String>,
}

impl Book {
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        num_avail: i64,
        num_borrow: i64,
        borrowers: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            num_avail,
            num_borrow,
            borrowers,
        }
    }

    pub fn is_available(&self) -> bool {
        self.num_avail != 0
    }

    /// Remove one copy from circulation for good.
    pub fn sell_copy(&mut self) -> Result<(), CopyError> {
        self.num_avail = self
            .num_avail
            .checked_sub(1)
            .ok_or(CopyError::CountOverflow)?;
        Ok(())
    }

    /// Lend one copy to `borrower`. Duplicate borrowers are allowed.
    pub fn lend_to(&mut self, borrower: impl Into<String>) -> Result<(), CopyError> {
        let num_avail = self.num_avail.checked_sub(1);
        let num_borrow = self.num_borrow.checked_add(1);
        let (Some(num_avail), Some(num_borrow)) = (num_avail, num_borrow) else {
            return Err(CopyError::CountOverflow);
        };

        self.num_avail = num_avail;
        self.num_borrow = num_borrow;
        self.borrowers.push(borrower.into());
        Ok(())
    }

    /// Take back the first copy held by `borrower`.
    /// On error the book is left untouched.
    pub fn take_back_from(&mut self, borrower: &str) -> Result<(), CopyError> {
        let index =
            find_borrower(&self.borrowers, borrower).ok_or(CopyError::BorrowerNotFound)?;
        let num_avail = self.num_avail.checked_add(1);
        let num_borrow = self.num_borrow.checked_sub(1);
        let (Some(num_avail), Some(num_borrow)) = (num_avail, num_borrow) else {
            return Err(CopyError::CountOverflow);
        };

        self.borrowers.remove(index);
        self.num_avail = num_avail;
        self.num_borrow = num_borrow;
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Position of the first occurrence of `borrower`, if any.
pub fn find_borrower(borrowers: &[String], borrower: &str) -> Option<usize> {
    borrowers.iter().position(|b| b == borrower)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Book {
        Book::new("book1", "blue", 6, 1, vec!["human1".into()])
    }

    #[test]
    fn test_json_field_names() {
        let json = String::from_utf8(sample().to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"ID":"book1","title":"blue","numAvail":6,"numBorrow":1,"borrowers":["human1"]}"#
        );
    }

    #[test]
    fn test_null_borrowers_decode_as_empty() {
        let book =
            Book::from_json(br#"{"ID":"b","title":"t","numAvail":1,"numBorrow":0,"borrowers":null}"#)
                .unwrap();
        assert!(book.borrowers.is_empty());
    }

    #[test]
    fn test_find_borrower_returns_first_match() {
        let borrowers: Vec<String> = vec!["a".into(), "b".into(), "a".into()];
        assert_eq!(find_borrower(&borrowers, "a"), Some(0));
        assert_eq!(find_borrower(&borrowers, "b"), Some(1));
        assert_eq!(find_borrower(&borrowers, "c"), None);
    }

    #[test]
    fn test_lend_then_take_back() {
        let mut book = sample();
        book.lend_to("human9").unwrap();
        assert_eq!((book.num_avail, book.num_borrow), (5, 2));
        assert_eq!(book.borrowers, vec!["human1", "human9"]);

        book.take_back_from("human9").unwrap();
        assert_eq!(book, sample());
    }

    #[test]
    fn test_take_back_removes_only_first_duplicate() {
        let mut book = Book::new("b", "t", 0, 3, vec!["x".into(), "y".into(), "x".into()]);
        book.take_back_from("x").unwrap();
        assert_eq!(book.borrowers, vec!["y", "x"]);
        assert_eq!((book.num_avail, book.num_borrow), (1, 2));
    }

    #[test]
    fn test_take_back_unknown_borrower_is_noop() {
        let mut book = sample();
        assert_eq!(book.take_back_from("nobody"), Err(CopyError::BorrowerNotFound));
        assert_eq!(book, sample());
    }

    #[test]
    fn test_lend_at_count_limit_is_rejected() {
        let mut book = Book::new("big", "t", 1, i64::MAX, Vec::new());
        let before = book.clone();
        assert_eq!(book.lend_to("x"), Err(CopyError::CountOverflow));
        assert_eq!(book, before);
    }

    #[test]
    fn test_take_back_at_count_limit_is_rejected() {
        let mut book = Book::new("big", "t", i64::MAX, 1, vec!["x".into()]);
        let before = book.clone();
        assert_eq!(book.take_back_from("x"), Err(CopyError::CountOverflow));
        assert_eq!(book, before);
    }

    #[test]
    fn test_sell_copy_at_count_limit_is_rejected() {
        let mut book = Book::new("low", "t", i64::MIN, 0, Vec::new());
        assert_eq!(book.sell_copy(), Err(CopyError::CountOverflow));
        assert_eq!(book.num_avail, i64::MIN);

        let mut book = sample();
        book.sell_copy().unwrap();
        assert_eq!(book.num_avail, 5);
    }
}
