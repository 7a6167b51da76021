use super::Book;

/// The starting catalog written by ledger initialization.
pub fn seed_catalog() -> Vec<Book> {
    vec![
        Book::new("book1", "blue", 6, 1, borrowers(&["human1"])),
        Book::new("book2", "red", 5, 2, borrowers(&["human1", "human2"])),
        Book::new(
            "book3",
            "green",
            0,
            3,
            borrowers(&["human1", "human2", "human3"]),
        ),
        Book::new("book4", "yellow", 3, 2, borrowers(&["human1", "human4"])),
        Book::new("book5", "black", 2, 1, borrowers(&["human5"])),
        Book::new("book6", "white", 3, 0, Vec::new()),
    ]
}

fn borrowers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
