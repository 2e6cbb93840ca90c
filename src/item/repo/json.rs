use crate::item::repo::entity::{BookEntity, UserEntity};
use crate::item::{Book, LibraryRepository, StorageError, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 도서와 이용자를 각각 하나의 JSON 배열 파일로 저장하는 저장소
///
/// 저장할 때마다 두 파일 전체를 다시 쓴다.
/// 파일이 없으면 빈 목록으로 취급하며, 형식이 잘못된 파일은 [`StorageError::Parse`]를 반환한다.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    books_file: PathBuf,
    users_file: PathBuf,
}

impl JsonFileRepository {
    pub fn new(books_file: impl Into<PathBuf>, users_file: impl Into<PathBuf>) -> Self {
        Self {
            books_file: books_file.into(),
            users_file: users_file.into(),
        }
    }

    pub fn books_file(&self) -> &Path {
        &self.books_file
    }

    pub fn users_file(&self) -> &Path {
        &self.users_file
    }
}

impl LibraryRepository for JsonFileRepository {
    fn load(&self) -> Result<(Vec<Book>, Vec<User>), StorageError> {
        let books: Vec<Book> = read_records::<BookEntity>(&self.books_file)?
            .into_iter()
            .map(|entity| entity.to_domain())
            .collect();

        let users: Vec<User> = read_records::<UserEntity>(&self.users_file)?
            .into_iter()
            .map(|entity| entity.to_domain())
            .collect();

        debug!("{}권의 도서와 {}명의 이용자를 읽었습니다.", books.len(), users.len());
        Ok((books, users))
    }

    fn save(&mut self, books: &[&Book], users: &[&User]) -> Result<(), StorageError> {
        let books: Vec<BookEntity> = books.iter().map(|b| BookEntity::from_domain(b)).collect();
        let users: Vec<UserEntity> = users.iter().map(|u| UserEntity::from_domain(u)).collect();

        write_records(&self.books_file, &books)?;
        write_records(&self.users_file, &users)?;

        debug!("{}권의 도서와 {}명의 이용자를 저장했습니다.", books.len(), users.len());
        Ok(())
    }
}

fn read_records<T>(path: &Path) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned
{
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} 파일이 없어 빈 목록으로 시작합니다.", path.display());
            return Ok(vec![]);
        }
        Err(source) => return Err(StorageError::Io { path: path.to_path_buf(), source }),
    };

    serde_json::from_str(&text)
        .map_err(|source| StorageError::Parse { path: path.to_path_buf(), source })
}

fn write_records<T>(path: &Path, records: &[T]) -> Result<(), StorageError>
where
    T: Serialize
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
    }

    let text = serde_json::to_string_pretty(records)
        .map_err(|source| StorageError::Serialize { path: path.to_path_buf(), source })?;

    fs::write(path, text)
        .map_err(|source| StorageError::Io { path: path.to_path_buf(), source })
}
