use chrono::{Duration, NaiveDate, NaiveDateTime};
use library_manager::console::Console;
use library_manager::item::repo::JsonFileRepository;
use library_manager::{Book, Library, LibraryError, User};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

fn scratch_dir(name: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time must be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("library-manager-flow-{name}-{unique}"))
}

fn repository(dir: &PathBuf) -> JsonFileRepository {
    JsonFileRepository::new(dir.join("books.json"), dir.join("users.json"))
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(10, 0, 0).unwrap()
}

#[test]
fn late_return_fine_survives_reopen() {
    let dir = scratch_dir("fine");
    let time = Rc::new(Cell::new(start()));
    let clock = {
        let time = time.clone();
        move || time.get()
    };

    let mut library = Library::open(repository(&dir))
        .expect("empty directory must open")
        .with_clock(clock);
    library.register_user(User::new("U1", "Alice")).unwrap();
    library.add_book(Book::new("978-0441013593", "Dune", "Herbert")).unwrap();
    library.borrow_book("978-0441013593", "U1", Some(0)).unwrap();

    time.set(start() + Duration::days(3));
    assert_eq!(library.return_book("978-0441013593", "U1").unwrap(), 15.0);
    drop(library);

    let mut reopened = Library::open(repository(&dir)).expect("saved files must reopen");
    assert_eq!(reopened.user("U1").unwrap().total_fine(), 15.0);
    assert!(!reopened.book("978-0441013593").unwrap().is_borrowed());

    assert!(matches!(reopened.remove_user("U1"), Err(LibraryError::UserHasFine { .. })));
    reopened.pay_fine("U1", 15.0).expect("exact payment must succeed");
    reopened.remove_user("U1").expect("settled user must be removable");

    let users = fs::read_to_string(dir.join("users.json")).expect("users file must exist");
    assert_eq!(users.trim(), "[]");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn saved_files_use_isbn_keys_and_iso_dates() {
    let dir = scratch_dir("format");
    let mut library = Library::open(repository(&dir))
        .expect("empty directory must open")
        .with_clock(start);
    library.register_user(User::new("U1", "Alice")).unwrap();
    library.add_book(Book::new("111", "Dune", "Herbert")).unwrap();
    library.borrow_book("111", "U1", None).unwrap();

    let books: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.join("books.json")).expect("books file must exist"),
    ).expect("books file must be json");
    assert_eq!(books[0]["isbn"], "111");
    assert_eq!(books[0]["is_borrowed"], true);
    assert_eq!(books[0]["borrowed_date"], "2025-03-01T10:00:00");
    assert_eq!(books[0]["due_date"], "2025-03-15T10:00:00");

    let users: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.join("users.json")).expect("users file must exist"),
    ).expect("users file must be json");
    assert_eq!(users[0]["user_id"], "U1");
    assert_eq!(users[0]["borrowed_books_isbns"][0], "111");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn console_session_persists_to_files() {
    let dir = scratch_dir("console");
    let mut library = Library::open(repository(&dir)).expect("empty directory must open");

    let script = "3\nAlice\nU1\n1\nDune\nHerbert\n111\n5\n111\nU1\n7\n6\n111\nU1\n2\n111\n13\n";
    let mut console = Console::new(script.as_bytes(), Vec::new());
    console.run(&mut library).expect("console must run");
    let output = String::from_utf8(console.into_output()).unwrap();

    assert!(output.contains("User registered."));
    assert!(output.contains("Book borrowed."));
    assert!(output.contains("Book returned."));
    assert!(output.contains("Book removed."));

    let reopened = Library::open(repository(&dir)).expect("saved files must reopen");
    assert_eq!(reopened.books().count(), 0);
    assert_eq!(reopened.users().count(), 1);

    let _ = fs::remove_dir_all(dir);
}
