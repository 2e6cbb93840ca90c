use crate::item::{DEFAULT_FINE_PER_DAY, DEFAULT_LOAN_DAYS};
use crate::library::LoanPolicy;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub mod logging;

/// 실행 환경에 따라 .env 파일을 로드한다.
pub fn load_dotenv() {
    let env_filename = env::var("RUN_MODE")
        .map(|env| format!(".env.{}", env))
        .unwrap_or_else(|_| ".env".into());

    dotenvy::from_filename(env_filename).ok();
}

/// 도서, 이용자 파일 위치
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    books_file: PathBuf,
    users_file: PathBuf,
}

impl Storage {
    pub fn books_file(&self) -> &PathBuf {
        &self.books_file
    }

    pub fn users_file(&self) -> &PathBuf {
        &self.users_file
    }

    pub fn set_books_file(&mut self, path: PathBuf) {
        self.books_file = path;
    }

    pub fn set_users_file(&mut self, path: PathBuf) {
        self.users_file = path;
    }
}

/// 대출 정책 설정
#[derive(Debug, Clone, Deserialize)]
pub struct Loan {
    default_days: i64,
    fine_per_day: f64,
}

impl Loan {
    pub fn default_days(&self) -> i64 {
        self.default_days
    }

    pub fn fine_per_day(&self) -> f64 {
        self.fine_per_day
    }

    pub fn set_default_days(&mut self, days: i64) {
        self.default_days = days;
    }

    pub fn to_policy(&self) -> LoanPolicy {
        LoanPolicy {
            loan_days: self.default_days,
            fine_per_day: self.fine_per_day,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    storage: Storage,
    loan: Loan,
    logger: logging::Config,
}

impl AppConfig {
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn loan(&self) -> &Loan {
        &self.loan
    }

    pub fn loan_mut(&mut self) -> &mut Loan {
        &mut self.loan
    }

    pub fn logger(&self) -> &logging::Config {
        &self.logger
    }
}

/// 설정을 읽어온다.
///
/// 기본값 위에 `config/{RUN_MODE}.json` 파일(없으면 무시), `LIBRARY_` 접두사의 환경 변수 순서로 덮어 쓴다.
/// 환경 변수의 섹션 구분자는 `__`로 예를 들어 `LIBRARY_LOAN__FINE_PER_DAY=2.5` 와 같이 사용한다.
pub fn load_config() -> Result<AppConfig, config::ConfigError> {
    let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let config = config::Config::builder()
        .set_default("storage.books_file", "books.json")?
        .set_default("storage.users_file", "users.json")?
        .set_default("loan.default_days", DEFAULT_LOAN_DAYS)?
        .set_default("loan.fine_per_day", DEFAULT_FINE_PER_DAY)?
        .set_default("logger.dir", "logs")?
        .set_default("logger.name", "library")?
        .add_source(config::File::with_name(&format!("config/{}.json", env)).required(false))
        .add_source(config::Environment::with_prefix("LIBRARY").prefix_separator("_").separator("__"))
        .build()?;

    config.try_deserialize()
}
