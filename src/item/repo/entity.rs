use crate::item::{Book, Loan, User};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// 도서 파일에 저장되는 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntity {
    pub title: String,
    pub author: String,

    // 제목으로 도서를 구분하던 이전 파일에는 ISBN이 없다.
    #[serde(default)]
    pub isbn: Option<String>,

    #[serde(default)]
    pub is_borrowed: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub borrowed_date: Option<NaiveDateTime>,
}

impl BookEntity {
    pub fn from_domain(book: &Book) -> Self {
        Self {
            title: book.title().to_owned(),
            author: book.author().to_owned(),
            isbn: Some(book.isbn().to_owned()),
            is_borrowed: book.is_borrowed(),
            due_date: book.due_date(),
            borrowed_date: book.borrowed_date(),
        }
    }

    /// ISBN이 없는 레코드는 제목을 키로 사용한다.
    pub fn to_domain(self) -> Book {
        let isbn = self.isbn.unwrap_or_else(|| self.title.clone());

        let loan = match (self.is_borrowed, self.due_date) {
            (true, Some(due)) => Some(Loan::new(self.borrowed_date.unwrap_or(due), due)),
            (true, None) => {
                warn!("반납 예정일이 없는 대출 도서는 대출 가능 상태로 읽습니다. (ISBN: {})", isbn);
                None
            }
            (false, Some(_)) => {
                warn!("대출 중이 아닌 도서의 반납 예정일은 무시합니다. (ISBN: {})", isbn);
                None
            }
            (false, None) => None,
        };

        Book::restore(isbn, self.title, self.author, loan)
    }
}

/// 이용자 파일에 저장되는 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub name: String,
    pub user_id: String,

    #[serde(default, alias = "borrowed_books")]
    pub borrowed_books_isbns: Vec<String>,

    #[serde(default)]
    pub total_fine: f64,
}

impl UserEntity {
    pub fn from_domain(user: &User) -> Self {
        Self {
            name: user.name().to_owned(),
            user_id: user.id().to_owned(),
            borrowed_books_isbns: user.borrowed_isbns().iter().cloned().collect(),
            total_fine: user.total_fine(),
        }
    }

    pub fn to_domain(self) -> User {
        let borrowed: BTreeSet<String> = self.borrowed_books_isbns.into_iter().collect();
        User::restore(self.user_id, self.name, borrowed, self.total_fine)
    }
}
