use crate::item::{Book, LibraryRepository, User};
use crate::library::{Library, LibraryError};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::{BufRead, Write};
use tracing::{error, info};

/// 콘솔 메뉴 항목
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Menu {
    AddBook,
    RemoveBook,
    RegisterUser,
    RemoveUser,
    BorrowBook,
    ReturnBook,
    SearchBook,
    ShowAllBooks,
    ShowAllUsers,
    ShowUserBooks,
    PayFine,
    ShowOverdueBooks,
    Exit,
}

impl Menu {
    pub const ALL: [Menu; 13] = [
        Menu::AddBook,
        Menu::RemoveBook,
        Menu::RegisterUser,
        Menu::RemoveUser,
        Menu::BorrowBook,
        Menu::ReturnBook,
        Menu::SearchBook,
        Menu::ShowAllBooks,
        Menu::ShowAllUsers,
        Menu::ShowUserBooks,
        Menu::PayFine,
        Menu::ShowOverdueBooks,
        Menu::Exit,
    ];
}

impl TryFrom<&str> for Menu {
    type Error = ConsoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.trim().parse::<usize>().ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| Menu::ALL.get(i).copied())
            .ok_or_else(|| ConsoleError::InvalidChoice(value.trim().to_owned()))
    }
}

impl Display for Menu {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Menu::AddBook => "Add Book",
            Menu::RemoveBook => "Remove Book",
            Menu::RegisterUser => "Register User",
            Menu::RemoveUser => "Remove User",
            Menu::BorrowBook => "Borrow Book",
            Menu::ReturnBook => "Return Book",
            Menu::SearchBook => "Search Book",
            Menu::ShowAllBooks => "Show All Books",
            Menu::ShowAllUsers => "Show All Users",
            Menu::ShowUserBooks => "Show User Borrowed Books",
            Menu::PayFine => "Pay Fine",
            Menu::ShowOverdueBooks => "Show Overdue Books",
            Menu::Exit => "Exit",
        };
        write!(f, "{}", label)
    }
}

/// 콘솔 메뉴 처리 중 발생한 에러 열거
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("{0}")]
    Library(#[from] LibraryError),

    #[error("Console I/O failure: {0}")]
    Io(#[from] io::Error),

    /// 입력이 더 이상 없음
    #[error("End of input")]
    EndOfInput,
}

enum Flow {
    Continue,
    Exit,
}

/// 콘솔 메뉴 드라이버
///
/// 메뉴를 출력하고 입력 받은 항목에 따라 [`Library`]의 작업을 호출한 뒤 결과를 출력한다.
/// 한 단계에서 발생한 에러는 출력만 하고 다음 메뉴로 넘어가며, 출력 스트림 에러와 입력의 끝에서만 종료한다.
pub struct Console<I, O>
where
    I: BufRead,
    O: Write
{
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> Console<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> O {
        self.output
    }

    pub fn run<R: LibraryRepository>(&mut self, library: &mut Library<R>) -> io::Result<()> {
        loop {
            self.print_menu()?;

            match self.step(library) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(ConsoleError::EndOfInput) => {
                    writeln!(self.output)?;
                    break;
                }
                Err(ConsoleError::Io(e)) => return Err(e),
                Err(ConsoleError::Library(e)) if e.is_validation() => {
                    writeln!(self.output, "Failed: {}", e)?;
                }
                Err(e) => {
                    error!("메뉴 처리 중 에러가 발생했습니다. {}", e);
                    writeln!(self.output, "Error: {}", e)?;
                }
            }
        }

        writeln!(self.output, "Exiting...")?;
        info!("콘솔을 종료합니다.");
        Ok(())
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nLibrary Menu:")?;
        for (i, menu) in Menu::ALL.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, menu)?;
        }
        Ok(())
    }

    fn step<R: LibraryRepository>(&mut self, library: &mut Library<R>) -> Result<Flow, ConsoleError> {
        let choice = self.prompt("Enter choice: ")?;
        let menu = Menu::try_from(choice.as_str())?;

        match menu {
            Menu::AddBook => {
                let title = self.prompt("Title: ")?;
                let author = self.prompt("Author: ")?;
                let isbn = self.prompt("ISBN: ")?;
                library.add_book(Book::new(&isbn, &title, &author))?;
                writeln!(self.output, "Book added.")?;
            }
            Menu::RemoveBook => {
                let isbn = self.prompt("Enter ISBN to remove: ")?;
                library.remove_book(&isbn)?;
                writeln!(self.output, "Book removed.")?;
            }
            Menu::RegisterUser => {
                let name = self.prompt("User Name: ")?;
                let user_id = self.prompt("User ID: ")?;
                library.register_user(User::new(&user_id, &name))?;
                writeln!(self.output, "User registered.")?;
            }
            Menu::RemoveUser => {
                let user_id = self.prompt("User ID to remove: ")?;
                library.remove_user(&user_id)?;
                writeln!(self.output, "User removed.")?;
            }
            Menu::BorrowBook => {
                let isbn = self.prompt("ISBN: ")?;
                let user_id = self.prompt("User ID: ")?;
                let days = self.prompt(&format!("Days to return (default {}): ", library.policy().loan_days))?;
                let days = if days.is_empty() {
                    None
                } else {
                    Some(days.parse::<i64>().map_err(|_| ConsoleError::InvalidNumber(days.clone()))?)
                };

                let due = library.borrow_book(&isbn, &user_id, days)?;
                let title = library.book(&isbn).map(|b| b.title().to_owned()).unwrap_or(isbn);
                writeln!(self.output, "Book borrowed.")?;
                writeln!(self.output, "IMPORTANT NOTICE: '{}' must be returned by {}", title, due.format("%Y-%m-%d"))?;
                writeln!(self.output, "Late return will result in a fine of ${} per day!", library.policy().fine_per_day)?;
            }
            Menu::ReturnBook => {
                let isbn = self.prompt("ISBN: ")?;
                let user_id = self.prompt("User ID: ")?;
                let fine = library.return_book(&isbn, &user_id)?;
                writeln!(self.output, "Book returned.")?;
                if fine > 0.0 {
                    let total = library.user(&user_id).map(|u| u.total_fine()).unwrap_or(fine);
                    writeln!(self.output, "Late return fine: ${}", fine)?;
                    writeln!(self.output, "Total outstanding fine: ${}", total)?;
                    writeln!(self.output, "Please pay your fine at the library counter.")?;
                }
            }
            Menu::SearchBook => {
                let query = self.prompt("Search query: ")?;
                let results = library.search(&query);
                if results.is_empty() {
                    writeln!(self.output, "No books found.")?;
                } else {
                    writeln!(self.output, "Search Results:")?;
                    for book in results {
                        writeln!(self.output, "{}", book)?;
                    }
                }
            }
            Menu::ShowAllBooks => {
                let mut empty = true;
                for book in library.books() {
                    writeln!(self.output, "{}", book)?;
                    empty = false;
                }
                if empty {
                    writeln!(self.output, "No books in the library.")?;
                }
            }
            Menu::ShowAllUsers => {
                let mut empty = true;
                for user in library.users() {
                    writeln!(self.output, "{}", user)?;
                    empty = false;
                }
                if empty {
                    writeln!(self.output, "No registered users.")?;
                }
            }
            Menu::ShowUserBooks => {
                let user_id = self.prompt("User ID: ")?;
                let books = library.borrowed_books(&user_id)?;
                if books.is_empty() {
                    writeln!(self.output, "No books borrowed.")?;
                }
                for book in books {
                    writeln!(self.output, "{}", book)?;
                }
            }
            Menu::PayFine => {
                let user_id = self.prompt("User ID: ")?;
                let amount = self.prompt("Amount to pay: $")?;
                let amount = amount.parse::<f64>()
                    .map_err(|_| ConsoleError::InvalidNumber(amount.clone()))?;

                let remaining = library.pay_fine(&user_id, amount)?;
                writeln!(self.output, "Fine payment successful. Remaining fine: ${}", remaining)?;
            }
            Menu::ShowOverdueBooks => {
                let overdue = library.list_overdue_books();
                writeln!(self.output, "OVERDUE BOOKS:")?;
                if overdue.is_empty() {
                    writeln!(self.output, "No overdue books.")?;
                }
                for o in overdue {
                    writeln!(self.output, "{} - {} days overdue", o.book, o.days_overdue)?;
                }
            }
            Menu::Exit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }

    fn prompt(&mut self, label: &str) -> Result<String, ConsoleError> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ConsoleError::EndOfInput);
        }
        Ok(line.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::repo::MemoryRepository;

    fn run_script(library: &mut Library<MemoryRepository>, script: &str) -> String {
        let mut console = Console::new(script.as_bytes(), Vec::new());
        console.run(library).expect("console must not fail on in-memory streams");
        String::from_utf8(console.into_output()).expect("output must be utf-8")
    }

    fn library() -> Library<MemoryRepository> {
        Library::open(MemoryRepository::new()).expect("memory repository must open")
    }

    #[test]
    fn menu_choice_parses_numbers_in_range() {
        assert_eq!(Menu::try_from("1").unwrap(), Menu::AddBook);
        assert_eq!(Menu::try_from(" 13 ").unwrap(), Menu::Exit);
        assert!(Menu::try_from("0").is_err());
        assert!(Menu::try_from("14").is_err());
        assert!(Menu::try_from("abc").is_err());
    }

    #[test]
    fn invalid_choice_redisplays_menu() {
        let mut library = library();
        let output = run_script(&mut library, "99\n13\n");

        assert!(output.contains("Error: Invalid choice: 99"));
        assert_eq!(output.matches("Library Menu:").count(), 2);
        assert!(output.ends_with("Exiting...\n"));
    }

    #[test]
    fn add_and_search_book() {
        let mut library = library();
        let output = run_script(&mut library, "1\nDune\nHerbert\n111\n7\ndune\n13\n");

        assert!(output.contains("Book added."));
        assert!(output.contains("Title: Dune, Author: Herbert, ISBN: 111, Status: Available"));
    }

    #[test]
    fn duplicate_isbn_reports_failure_and_continues() {
        let mut library = library();
        let output = run_script(&mut library, "1\nDune\nHerbert\n111\n1\nOther\nSomeone\n111\n8\n13\n");

        assert!(output.contains("Failed: A book with ISBN 111 already exists"));
        assert_eq!(output.matches("Status: Available").count(), 1);
    }

    #[test]
    fn borrow_with_default_days_prints_notice() {
        let mut library = library();
        let script = "3\nAlice\nU1\n1\nDune\nHerbert\n111\n5\n111\nU1\n\n10\nU1\n13\n";
        let output = run_script(&mut library, script);

        assert!(output.contains("Book borrowed."));
        assert!(output.contains("IMPORTANT NOTICE: 'Dune' must be returned by"));
        assert!(output.contains("fine of $5 per day"));
        assert!(output.contains("Status: Borrowed, Due: "));
    }

    #[test]
    fn huge_loan_period_is_refused_and_loop_continues() {
        let mut library = library();
        let script = "3\nAlice\nU1\n1\nDune\nHerbert\n111\n5\n111\nU1\n1000000000\n8\n13\n";
        let output = run_script(&mut library, script);

        assert!(output.contains("Failed: Invalid loan period: 1000000000 day(s)"));
        assert!(!output.contains("Book borrowed."));
        assert!(output.contains("Status: Available"));
        assert!(output.ends_with("Exiting...\n"));
        assert!(!library.book("111").expect("book must remain").is_borrowed());
    }

    #[test]
    fn non_numeric_amount_is_reported() {
        let mut library = library();
        let output = run_script(&mut library, "3\nAlice\nU1\n11\nU1\nlots\n13\n");

        assert!(output.contains("Error: Invalid number: lots"));
        assert!(output.ends_with("Exiting...\n"));
    }

    #[test]
    fn end_of_input_exits_cleanly() {
        let mut library = library();
        let output = run_script(&mut library, "9\n");

        assert!(output.contains("No registered users."));
        assert!(output.ends_with("Exiting...\n"));
    }
}
