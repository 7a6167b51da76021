use tracing::{debug, info};

use crate::domain::{seed_catalog, Book, CopyError};
use crate::storage::{LedgerStore, SqliteStore, StateIterator};

use super::AppError;

/// Application service running the book lifecycle against a world-state store.
///
/// Each operation is one read followed by at most one write per key.
/// Isolation between concurrent invocations belongs to the store's host.
pub struct BookLedgerService<S> {
    store: S,
}

/// Lazy cursor over every book in the world state, in key order.
///
/// Decode or store failures abort the scan; the underlying range scan is
/// released before the error is returned.
pub struct BookScan {
    iter: Box<dyn StateIterator>,
}

impl BookScan {
    /// Next book, or `None` once the world state is exhausted.
    pub async fn next(&mut self) -> Result<Option<Book>, AppError> {
        let entry = match self.iter.next().await {
            Ok(entry) => entry,
            Err(err) => {
                self.abort().await;
                return Err(AppError::Store(err));
            }
        };

        match entry {
            Some(kv) => match Book::from_json(&kv.value) {
                Ok(book) => Ok(Some(book)),
                Err(err) => {
                    debug!(key = %kv.key, error = %err, "undecodable record in world state");
                    self.abort().await;
                    Err(AppError::Store(anyhow::Error::from(err).context(format!(
                        "failed to decode world state entry {}",
                        kv.key
                    ))))
                }
            },
            None => Ok(None),
        }
    }

    async fn abort(&mut self) {
        if let Err(err) = self.iter.close().await {
            debug!(error = %err, "failed to release range scan after error");
        }
    }

    /// Release the underlying range scan.
    pub async fn close(mut self) -> Result<(), AppError> {
        Ok(self.iter.close().await?)
    }
}

impl BookLedgerService<SqliteStore> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Ok(Self::new(store))
    }
}

impl<S: LedgerStore> BookLedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write the starting catalog, overwriting whatever is stored under
    /// those IDs. Not atomic across books: a failure leaves the earlier
    /// books written, and calling again completes the load.
    pub async fn init_ledger(&self) -> Result<(), AppError> {
        let catalog = seed_catalog();
        for book in &catalog {
            self.put_book(book).await?;
            debug!(book_id = %book.id, "seeded book");
        }
        info!(count = catalog.len(), "ledger initialized with seed catalog");
        Ok(())
    }

    /// Whether any value is stored under `id`. An empty value counts.
    pub async fn book_exists(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.store.get_state(id).await?.is_some())
    }

    /// Add a new book. The borrower list is not checked against `num_borrow`.
    pub async fn create_book(
        &self,
        id: &str,
        title: &str,
        num_avail: i64,
        num_borrow: i64,
        borrowers: Vec<String>,
    ) -> Result<Book, AppError> {
        if self.book_exists(id).await? {
            return Err(AppError::BookAlreadyExists(id.to_string()));
        }
        if num_avail < 0 || num_borrow < 0 {
            return Err(AppError::InvalidArgument(format!(
                "copy counts must not be negative (numAvail {}, numBorrow {})",
                num_avail, num_borrow
            )));
        }

        let book = Book::new(id, title, num_avail, num_borrow, borrowers);
        self.put_book(&book).await?;
        debug!(book_id = %id, num_avail, num_borrow, "book created");
        Ok(book)
    }

    pub async fn read_book(&self, id: &str) -> Result<Book, AppError> {
        let bytes = self
            .store
            .get_state(id)
            .await?
            .ok_or_else(|| AppError::BookNotFound(id.to_string()))?;
        Ok(Book::from_json(&bytes)?)
    }

    /// Replace every field of an existing book.
    pub async fn update_book(
        &self,
        id: &str,
        title: &str,
        num_avail: i64,
        num_borrow: i64,
        borrowers: Vec<String>,
    ) -> Result<Book, AppError> {
        if !self.book_exists(id).await? {
            return Err(AppError::BookNotFound(id.to_string()));
        }
        if borrowers.len() as i64 != num_borrow {
            return Err(AppError::InvalidArgument(format!(
                "number of borrowers does not match (numBorrow {}, {} borrowers)",
                num_borrow,
                borrowers.len()
            )));
        }

        let book = Book::new(id, title, num_avail, num_borrow, borrowers);
        self.put_book(&book).await?;
        debug!(book_id = %id, num_avail, num_borrow, "book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), AppError> {
        if !self.book_exists(id).await? {
            return Err(AppError::BookNotFound(id.to_string()));
        }
        self.store.del_state(id).await?;
        debug!(book_id = %id, "book deleted");
        Ok(())
    }

    /// Sell one available copy. Buyers are not tracked.
    pub async fn purchase_book(&self, id: &str) -> Result<Book, AppError> {
        let mut book = self.read_book(id).await?;
        if !book.is_available() {
            debug!(book_id = %id, "purchase rejected, no copies available");
            return Err(AppError::Unavailable(id.to_string()));
        }

        book.sell_copy().map_err(|err| copy_error(id, None, err))?;
        self.put_book(&book).await?;
        debug!(book_id = %id, num_avail = book.num_avail, "book purchased");
        Ok(book)
    }

    pub async fn borrow_book(&self, id: &str, borrower: &str) -> Result<Book, AppError> {
        let mut book = self.read_book(id).await?;
        if !book.is_available() {
            debug!(book_id = %id, borrower, "borrow rejected, no copies available");
            return Err(AppError::Unavailable(id.to_string()));
        }

        book.lend_to(borrower).map_err(|err| copy_error(id, Some(borrower), err))?;
        self.put_book(&book).await?;
        debug!(
            book_id = %id,
            borrower,
            num_avail = book.num_avail,
            num_borrow = book.num_borrow,
            "book borrowed"
        );
        Ok(book)
    }

    /// Take back the copy held by the first matching entry in `borrowers`.
    pub async fn return_book(&self, id: &str, borrower: &str) -> Result<Book, AppError> {
        let mut book = self.read_book(id).await?;
        if let Err(err) = book.take_back_from(borrower) {
            debug!(book_id = %id, borrower, error = %err, "return rejected");
            return Err(copy_error(id, Some(borrower), err));
        }

        self.put_book(&book).await?;
        debug!(
            book_id = %id,
            borrower,
            num_avail = book.num_avail,
            num_borrow = book.num_borrow,
            "book returned"
        );
        Ok(book)
    }

    /// Start a fresh scan over all books. Each call opens a new scan.
    pub async fn scan_books(&self) -> Result<BookScan, AppError> {
        let iter = self.store.get_state_by_range("", "").await?;
        Ok(BookScan { iter })
    }

    /// Every book in the world state. Fails as a whole if any record
    /// cannot be read or decoded.
    pub async fn list_all_books(&self) -> Result<Vec<Book>, AppError> {
        let mut scan = self.scan_books().await?;
        let mut books = Vec::new();

        let drained = loop {
            match scan.next().await {
                Ok(Some(book)) => books.push(book),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let closed = scan.close().await;

        drained?;
        closed?;
        Ok(books)
    }

    async fn put_book(&self, book: &Book) -> Result<(), AppError> {
        let bytes = book.to_json()?;
        self.store.put_state(&book.id, &bytes).await?;
        Ok(())
    }
}

fn copy_error(id: &str, borrower: Option<&str>, err: CopyError) -> AppError {
    match err {
        CopyError::CountOverflow => {
            AppError::InvalidArgument(format!("copy counts of book {} would overflow", id))
        }
        CopyError::BorrowerNotFound => AppError::BorrowerNotFound {
            id: id.to_string(),
            borrower: borrower.unwrap_or_default().to_string(),
        },
    }
}
