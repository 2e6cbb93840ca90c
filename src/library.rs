use crate::item::{Book, Clock, LibraryRepository, Loan, StorageError, SystemClock, User, DEFAULT_FINE_PER_DAY, DEFAULT_LOAN_DAYS};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// 도서관 작업 중 발생한 에러 열거
///
/// [`LibraryError::Storage`]를 제외한 모든 에러는 작업의 전제 조건을 만족하지 못한 경우로, 이때 도서관의 상태는 변경되지 않는다.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("A book with ISBN {0} already exists")]
    DuplicateBook(String),

    #[error("User ID {0} already exists")]
    DuplicateUser(String),

    #[error("No book with ISBN {0}")]
    BookNotFound(String),

    #[error("No user with ID {0}")]
    UserNotFound(String),

    #[error("Book {0} is currently borrowed")]
    BookBorrowed(String),

    #[error("Book {isbn} is not borrowed by user {user_id}")]
    BookNotBorrowedByUser { isbn: String, user_id: String },

    #[error("User {user_id} still has {count} borrowed book(s)")]
    UserHasBorrowedBooks { user_id: String, count: usize },

    #[error("User {user_id} has an outstanding fine of ${fine}")]
    UserHasFine { user_id: String, fine: f64 },

    #[error("Payment of ${requested} exceeds the outstanding fine of ${balance}")]
    FineExceedsBalance { requested: f64, balance: f64 },

    #[error("Invalid payment amount: {0}")]
    InvalidAmount(f64),

    #[error("Invalid loan period: {0} day(s)")]
    InvalidLoanPeriod(i64),

    /// 변경된 상태를 저장소에 기록하지 못함. 메모리의 상태는 되돌리지 않는다.
    #[error("Failed to persist library state: {0}")]
    Storage(#[from] StorageError),
}

impl LibraryError {
    /// 저장소 실패가 아닌 검증 실패 여부
    pub fn is_validation(&self) -> bool {
        !matches!(self, LibraryError::Storage(_))
    }
}

/// 대출 정책
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanPolicy {
    /// 대출 기간을 따로 지정하지 않았을 때 사용할 기본 대출 기간 (일)
    pub loan_days: i64,

    /// 연체 1일당 연체료
    pub fine_per_day: f64,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_days: DEFAULT_LOAN_DAYS,
            fine_per_day: DEFAULT_FINE_PER_DAY,
        }
    }
}

/// 연체 도서와 연체 일수
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overdue<'a> {
    pub book: &'a Book,
    pub days_overdue: i64,
}

/// 도서관
///
/// 도서(ISBN 기준)와 이용자(ID 기준)를 메모리에 보관하며 유일한 원본 데이터로 취급한다.
/// 상태를 변경하는 모든 작업은 반환 전에 전체 목록을 저장소에 다시 기록한다.
pub struct Library<R>
where
    R: LibraryRepository
{
    books: BTreeMap<String, Book>,
    users: BTreeMap<String, User>,
    repository: R,
    clock: Box<dyn Clock>,
    policy: LoanPolicy,
}

impl<R: LibraryRepository> Library<R> {

    /// 저장소에서 도서와 이용자를 읽어 도서관을 연다.
    /// 같은 키를 가진 레코드가 여러 개라면 마지막 레코드가 남는다.
    pub fn open(repository: R) -> Result<Self, LibraryError> {
        let (books, users) = repository.load()?;

        let mut book_map = BTreeMap::new();
        for book in books {
            if let Some(prev) = book_map.insert(book.isbn().to_owned(), book) {
                warn!("중복된 ISBN의 도서를 덮어 씁니다. (ISBN: {})", prev.isbn());
            }
        }

        let mut user_map = BTreeMap::new();
        for user in users {
            if let Some(prev) = user_map.insert(user.id().to_owned(), user) {
                warn!("중복된 ID의 이용자를 덮어 씁니다. (ID: {})", prev.id());
            }
        }

        info!("도서관을 열었습니다. (도서: {}권, 이용자: {}명)", book_map.len(), user_map.len());
        Ok(Self {
            books: book_map,
            users: user_map,
            repository,
            clock: Box::new(SystemClock),
            policy: LoanPolicy::default(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_policy(mut self, policy: LoanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> LoanPolicy {
        self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn book(&self, isbn: &str) -> Option<&Book> {
        self.books.get(isbn)
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn available_books(&self) -> impl Iterator<Item = &Book> {
        self.books.values().filter(|b| !b.is_borrowed())
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn add_book(&mut self, book: Book) -> Result<(), LibraryError> {
        if self.books.contains_key(book.isbn()) {
            return Err(rejected(LibraryError::DuplicateBook(book.isbn().to_owned())));
        }

        info!("도서를 추가했습니다. (ISBN: {}, 제목: {})", book.isbn(), book.title());
        self.books.insert(book.isbn().to_owned(), book);
        self.persist()
    }

    /// 대출 중이 아닌 도서만 삭제할 수 있다.
    pub fn remove_book(&mut self, isbn: &str) -> Result<(), LibraryError> {
        match self.books.get(isbn) {
            None => return Err(rejected(LibraryError::BookNotFound(isbn.to_owned()))),
            Some(book) if book.is_borrowed() => {
                return Err(rejected(LibraryError::BookBorrowed(isbn.to_owned())));
            }
            Some(_) => {}
        }

        self.books.remove(isbn);
        info!("도서를 삭제했습니다. (ISBN: {})", isbn);
        self.persist()
    }

    pub fn register_user(&mut self, user: User) -> Result<(), LibraryError> {
        if self.users.contains_key(user.id()) {
            return Err(rejected(LibraryError::DuplicateUser(user.id().to_owned())));
        }

        info!("이용자를 등록했습니다. (ID: {}, 이름: {})", user.id(), user.name());
        self.users.insert(user.id().to_owned(), user);
        self.persist()
    }

    /// 대출 중인 도서와 연체료가 모두 없는 이용자만 삭제할 수 있다.
    pub fn remove_user(&mut self, user_id: &str) -> Result<(), LibraryError> {
        let user = self.users.get(user_id)
            .ok_or_else(|| rejected(LibraryError::UserNotFound(user_id.to_owned())))?;

        if !user.borrowed_isbns().is_empty() {
            return Err(rejected(LibraryError::UserHasBorrowedBooks {
                user_id: user_id.to_owned(),
                count: user.borrowed_isbns().len(),
            }));
        }
        if user.total_fine() != 0.0 {
            return Err(rejected(LibraryError::UserHasFine {
                user_id: user_id.to_owned(),
                fine: user.total_fine(),
            }));
        }

        self.users.remove(user_id);
        info!("이용자를 삭제했습니다. (ID: {})", user_id);
        self.persist()
    }

    /// 도서를 대출하고 반납 예정일을 반환한다.
    /// `loan_days`가 [`None`]이면 [`LoanPolicy::loan_days`]를 사용한다.
    pub fn borrow_book(&mut self, isbn: &str, user_id: &str, loan_days: Option<i64>) -> Result<NaiveDateTime, LibraryError> {
        let loan_days = loan_days.unwrap_or(self.policy.loan_days);
        let loan = Loan::starting(self.clock.now(), loan_days)
            .ok_or_else(|| rejected(LibraryError::InvalidLoanPeriod(loan_days)))?;

        let book = self.books.get_mut(isbn)
            .ok_or_else(|| rejected(LibraryError::BookNotFound(isbn.to_owned())))?;
        let user = self.users.get_mut(user_id)
            .ok_or_else(|| rejected(LibraryError::UserNotFound(user_id.to_owned())))?;

        if !book.start_loan(loan) {
            return Err(rejected(LibraryError::BookBorrowed(isbn.to_owned())));
        }
        user.add_borrowed(isbn);

        let due = loan.due_date();
        info!("도서를 대출했습니다. (ISBN: {}, 이용자: {}, 반납 예정일: {})", isbn, user_id, due);
        self.persist()?;
        Ok(due)
    }

    /// 도서를 반납하고 부과된 연체료를 반환한다. 기한 내 반납이면 0을 반환한다.
    /// 연체료는 이용자의 연체료 잔액에 더해진다.
    pub fn return_book(&mut self, isbn: &str, user_id: &str) -> Result<f64, LibraryError> {
        let now = self.clock.now();
        let fine_per_day = self.policy.fine_per_day;

        let book = self.books.get_mut(isbn)
            .ok_or_else(|| rejected(LibraryError::BookNotFound(isbn.to_owned())))?;
        let user = self.users.get_mut(user_id)
            .ok_or_else(|| rejected(LibraryError::UserNotFound(user_id.to_owned())))?;

        let not_borrowed = || LibraryError::BookNotBorrowedByUser {
            isbn: isbn.to_owned(),
            user_id: user_id.to_owned(),
        };
        if !user.has_borrowed(isbn) {
            return Err(rejected(not_borrowed()));
        }
        let fine = book.return_at(now, fine_per_day)
            .ok_or_else(|| rejected(not_borrowed()))?;

        user.remove_borrowed(isbn);
        if fine > 0.0 {
            user.add_fine(fine);
            info!("연체 도서가 반납되었습니다. (ISBN: {}, 이용자: {}, 연체료: {}, 누적 연체료: {})", isbn, user_id, fine, user.total_fine());
        } else {
            info!("도서가 반납되었습니다. (ISBN: {}, 이용자: {})", isbn, user_id);
        }

        self.persist()?;
        Ok(fine)
    }

    /// 연체료를 납부하고 남은 연체료를 반환한다.
    pub fn pay_fine(&mut self, user_id: &str, amount: f64) -> Result<f64, LibraryError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(rejected(LibraryError::InvalidAmount(amount)));
        }

        let user = self.users.get_mut(user_id)
            .ok_or_else(|| rejected(LibraryError::UserNotFound(user_id.to_owned())))?;

        let balance = user.total_fine();
        if !user.pay_fine(amount) {
            return Err(rejected(LibraryError::FineExceedsBalance { requested: amount, balance }));
        }

        let remaining = user.total_fine();
        info!("연체료를 납부했습니다. (이용자: {}, 납부액: {}, 잔액: {})", user_id, amount, remaining);
        self.persist()?;
        Ok(remaining)
    }

    /// 제목, 저자, ISBN에 검색어가 포함된 도서를 ISBN 순으로 반환한다.
    pub fn search(&self, query: &str) -> Vec<&Book> {
        self.books.values()
            .filter(|b| b.matches(query))
            .collect()
    }

    /// 이용자가 대출 중인 도서 목록
    pub fn borrowed_books(&self, user_id: &str) -> Result<Vec<&Book>, LibraryError> {
        let user = self.users.get(user_id)
            .ok_or_else(|| LibraryError::UserNotFound(user_id.to_owned()))?;

        Ok(user.borrowed_isbns().iter()
            .filter_map(|isbn| {
                let book = self.books.get(isbn);
                if book.is_none() {
                    warn!("이용자가 대출한 도서가 목록에 없습니다. (이용자: {}, ISBN: {})", user_id, isbn);
                }
                book
            })
            .collect())
    }

    /// 반납 예정일이 현재 시각보다 이전인 대출 도서와 연체 일수를 반환한다.
    pub fn list_overdue_books(&self) -> Vec<Overdue<'_>> {
        let now = self.clock.now();
        self.books.values()
            .filter_map(|book| {
                let loan = book.loan()?;
                if loan.due_date() >= now {
                    return None;
                }

                let days_overdue = loan.days_late(now);
                warn!("연체 중인 도서입니다. (ISBN: {}, 연체 일수: {})", book.isbn(), days_overdue);
                Some(Overdue { book, days_overdue })
            })
            .collect()
    }

    fn persist(&mut self) -> Result<(), LibraryError> {
        let books: Vec<&Book> = self.books.values().collect();
        let users: Vec<&User> = self.users.values().collect();

        self.repository.save(&books, &users)
            .map_err(|e| {
                error!("도서관 상태를 저장하지 못했습니다. {}", e);
                LibraryError::Storage(e)
            })
    }
}

fn rejected(e: LibraryError) -> LibraryError {
    debug!("요청이 거부되었습니다. {}", e);
    e
}
