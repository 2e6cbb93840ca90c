use clap::Parser;
use library_manager::configs;
use library_manager::console::Console;
use library_manager::item::repo::{JsonFileRepository, MemoryRepository};
use library_manager::item::LibraryRepository;
use library_manager::library::Library;
use std::error::Error;
use std::io;
use std::path::PathBuf;

/// 도서 대출 관리 콘솔
#[derive(Debug, Parser)]
#[command(version, about = "Console manager for a small library's books, users and loans")]
struct Cli {
    /// 도서 JSON 파일 경로
    #[arg(long)]
    books: Option<PathBuf>,

    /// 이용자 JSON 파일 경로
    #[arg(long)]
    users: Option<PathBuf>,

    /// 기본 대출 기간 (일)
    #[arg(long)]
    loan_days: Option<i64>,

    /// 로그 파일을 남기지 않는다.
    #[arg(long)]
    no_log: bool,

    /// 파일을 읽기만 하고 변경 사항은 저장하지 않는다.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    configs::load_dotenv();
    let mut config = configs::load_config()?;
    if let Some(books) = cli.books {
        config.storage_mut().set_books_file(books);
    }
    if let Some(users) = cli.users {
        config.storage_mut().set_users_file(users);
    }
    if let Some(days) = cli.loan_days {
        config.loan_mut().set_default_days(days);
    }

    let _guard = if cli.no_log {
        None
    } else {
        Some(configs::logging::set_global_logging_config(config.logger())?)
    };

    let repository = JsonFileRepository::new(config.storage().books_file(), config.storage().users_file());
    let policy = config.loan().to_policy();

    if cli.dry_run {
        let (books, users) = repository.load()?;
        let library = Library::open(MemoryRepository::with_data(books, users))?.with_policy(policy);
        run_console(library)?;
    } else {
        let library = Library::open(repository)?.with_policy(policy);
        run_console(library)?;
    }

    Ok(())
}

fn run_console<R: LibraryRepository>(mut library: Library<R>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());

    println!("Welcome to the Library Management System!");
    console.run(&mut library)
}
