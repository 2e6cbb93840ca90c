use crate::item::{Book, LibraryRepository, StorageError, User};

/// 프로세스 메모리에 마지막으로 저장된 상태만 보관하는 저장소
///
/// 파일을 남기지 않아야 하는 실행(`--dry-run`)이나 테스트에서 사용한다.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    books: Vec<Book>,
    users: Vec<User>,
    save_count: usize,
    fail_saves: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(books: Vec<Book>, users: Vec<User>) -> Self {
        Self { books, users, ..Self::default() }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// 성공한 저장 횟수
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// `true`로 설정하면 이후의 모든 저장이 실패한다.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }
}

impl LibraryRepository for MemoryRepository {
    fn load(&self) -> Result<(Vec<Book>, Vec<User>), StorageError> {
        Ok((self.books.clone(), self.users.clone()))
    }

    fn save(&mut self, books: &[&Book], users: &[&User]) -> Result<(), StorageError> {
        if self.fail_saves {
            return Err(StorageError::Unavailable("memory repository is set to fail".to_owned()));
        }

        self.books = books.iter().map(|b| (*b).clone()).collect();
        self.users = users.iter().map(|u| (*u).clone()).collect();
        self.save_count += 1;
        Ok(())
    }
}
