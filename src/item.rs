pub mod repo;

use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// 기본 대출 기간 (일)
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// 연체 1일당 부과되는 기본 연체료
pub const DEFAULT_FINE_PER_DAY: f64 = 5.0;

/// 저장소 입출력 중 발생한 에러 열거
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 파일을 읽거나 쓰지 못함
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 저장된 JSON을 해석하지 못함
    #[error("Malformed data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 저장할 데이터를 JSON으로 변환하지 못함
    #[error("Cannot serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 테스트 등에서 의도적으로 발생시킨 실패
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// 현재 시각을 제공하는 트레이트
/// 대출일, 반납 예정일, 연체료 계산은 모두 이 트레이트로 얻은 시각을 기준으로 한다.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

impl<T> Clock for T where T: Fn() -> NaiveDateTime {
    fn now(&self) -> NaiveDateTime {
        self()
    }
}

/// 로컬 시스템 시각
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// 대출 정보
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Loan {
    borrowed_date: NaiveDateTime,
    due_date: NaiveDateTime,
}

impl Loan {
    pub fn new(borrowed_date: NaiveDateTime, due_date: NaiveDateTime) -> Self {
        Self { borrowed_date, due_date }
    }

    /// `now`부터 `loan_days`일 동안의 대출을 만든다.
    /// 대출 기간이 음수이거나 반납 예정일이 표현 가능한 날짜 범위를 벗어나면 [`None`]을 반환한다.
    pub fn starting(now: NaiveDateTime, loan_days: i64) -> Option<Self> {
        if loan_days < 0 {
            return None;
        }

        let due_date = Duration::try_days(loan_days)
            .and_then(|d| now.checked_add_signed(d))?;
        Some(Self::new(now, due_date))
    }

    pub fn borrowed_date(&self) -> NaiveDateTime {
        self.borrowed_date
    }

    pub fn due_date(&self) -> NaiveDateTime {
        self.due_date
    }

    /// `now` 기준으로 반납 예정일로부터 지난 일수를 반환한다.
    /// 하루가 채 지나지 않은 시간은 버리며, 반납 예정일 이전이면 0을 반환한다.
    pub fn days_late(&self, now: NaiveDateTime) -> i64 {
        (now - self.due_date).num_days().max(0)
    }
}

/// 도서
///
/// 대출 여부는 [`Loan`]의 존재 여부로 결정 되므로 대출 중인 도서는 항상 대출일과 반납 예정일을 가진다.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    isbn: String,
    title: String,
    author: String,
    loan: Option<Loan>,
}

impl Book {
    pub fn new(isbn: &str, title: &str, author: &str) -> Self {
        Self {
            isbn: isbn.to_owned(),
            title: title.to_owned(),
            author: author.to_owned(),
            loan: None,
        }
    }

    /// 저장소에서 읽어온 값으로 도서를 복원한다.
    pub fn restore(isbn: String, title: String, author: String, loan: Option<Loan>) -> Self {
        Self { isbn, title, author, loan }
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn loan(&self) -> Option<&Loan> {
        self.loan.as_ref()
    }

    pub fn is_borrowed(&self) -> bool {
        self.loan.is_some()
    }

    pub fn borrowed_date(&self) -> Option<NaiveDateTime> {
        self.loan.map(|l| l.borrowed_date)
    }

    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.loan.map(|l| l.due_date)
    }

    /// 현재 시각 기준으로 도서를 대출한다. [`Book::borrow_at`] 참고
    pub fn borrow(&mut self, loan_days: i64) -> bool {
        self.borrow_at(SystemClock.now(), loan_days)
    }

    /// 현재 시각 기준으로 기본 연체료를 적용해 반납한다. [`Book::return_at`] 참고
    pub fn return_book(&mut self) -> Option<f64> {
        self.return_at(SystemClock.now(), DEFAULT_FINE_PER_DAY)
    }

    /// 도서를 `loan_days`일 동안 대출한다.
    /// 이미 대출 중이거나 대출 기간이 유효하지 않으면 상태를 바꾸지 않고 `false`를 반환한다.
    pub fn borrow_at(&mut self, now: NaiveDateTime, loan_days: i64) -> bool {
        match Loan::starting(now, loan_days) {
            Some(loan) => self.start_loan(loan),
            None => false,
        }
    }

    /// 이미 계산된 대출 정보로 도서를 대출한다. 대출 중인 도서는 `false`를 반환한다.
    pub fn start_loan(&mut self, loan: Loan) -> bool {
        if self.loan.is_some() {
            return false;
        }

        self.loan = Some(loan);
        true
    }

    /// 도서를 반납하고 연체료를 계산한다.
    /// 대출 중이 아닌 도서는 [`None`]을 반환하며, 대출 중이었다면 연체 일수 × `fine_per_day`를 반환한다.
    pub fn return_at(&mut self, now: NaiveDateTime, fine_per_day: f64) -> Option<f64> {
        let loan = self.loan.take()?;
        Some(loan.days_late(now) as f64 * fine_per_day)
    }

    /// 검색어가 제목, 저자, ISBN 중 하나에 포함 되는지 확인한다. 대소문자는 구분하지 않는다.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.author.to_lowercase().contains(&query)
            || self.isbn.to_lowercase().contains(&query)
    }
}

impl Display for Book {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = if self.is_borrowed() { "Borrowed" } else { "Available" };
        write!(f, "Title: {}, Author: {}, ISBN: {}, Status: {}", self.title, self.author, self.isbn, status)?;
        if let Some(due) = self.due_date() {
            write!(f, ", Due: {}", due.format("%Y-%m-%d"))?;
        }
        Ok(())
    }
}

/// 도서관 이용자
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: String,
    name: String,
    borrowed_isbns: BTreeSet<String>,
    total_fine: f64,
}

impl User {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            borrowed_isbns: BTreeSet::new(),
            total_fine: 0.0,
        }
    }

    /// 저장소에서 읽어온 값으로 이용자를 복원한다. 음수 연체료는 0으로 맞춘다.
    pub fn restore(id: String, name: String, borrowed_isbns: BTreeSet<String>, total_fine: f64) -> Self {
        Self {
            id,
            name,
            borrowed_isbns,
            total_fine: round_cents(total_fine.max(0.0)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn borrowed_isbns(&self) -> &BTreeSet<String> {
        &self.borrowed_isbns
    }

    pub fn has_borrowed(&self, isbn: &str) -> bool {
        self.borrowed_isbns.contains(isbn)
    }

    pub fn total_fine(&self) -> f64 {
        self.total_fine
    }

    pub fn add_borrowed(&mut self, isbn: &str) {
        self.borrowed_isbns.insert(isbn.to_owned());
    }

    pub fn remove_borrowed(&mut self, isbn: &str) {
        self.borrowed_isbns.remove(isbn);
    }

    pub fn add_fine(&mut self, amount: f64) {
        self.total_fine = round_cents(self.total_fine + amount);
    }

    /// 연체료를 납부한다. 납부 금액이 남은 연체료보다 크면 `false`를 반환하고 잔액은 그대로 둔다.
    /// 금액은 센트 단위로 반올림하여 비교한다.
    pub fn pay_fine(&mut self, amount: f64) -> bool {
        let amount = round_cents(amount);
        if amount > self.total_fine {
            return false;
        }

        self.total_fine = round_cents(self.total_fine - amount);
        true
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "User: {} (ID: {}), Borrowed Books: {}", self.name, self.id, self.borrowed_isbns.len())?;
        if self.total_fine > 0.0 {
            write!(f, ", Fine: ${}", self.total_fine)?;
        }
        Ok(())
    }
}

/// 도서관 데이터 저장소
/// 도서와 이용자 목록 전체를 한번에 읽고 쓴다.
pub trait LibraryRepository {

    /// 저장된 도서와 이용자를 모두 읽어온다. 저장된 데이터가 없다면 빈 목록을 반환한다.
    fn load(&self) -> Result<(Vec<Book>, Vec<User>), StorageError>;

    /// 전달 받은 도서와 이용자 목록으로 저장소 전체를 덮어 쓴다.
    fn save(&mut self, books: &[&Book], users: &[&User]) -> Result<(), StorageError>;
}
