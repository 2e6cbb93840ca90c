use serde::Deserialize;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::LocalTime;

/// 로깅 설정 중 발생한 에러 열거
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown log rotation \"{0}\", expected DAILY, HOURLY, MINUTELY or NEVER")]
    UnknownRotation(String),

    #[error("Unknown log level \"{0}\", expected TRACE, DEBUG, INFO, WARN or ERROR")]
    UnknownLevel(String),

    #[error("Cannot create log file appender: {0}")]
    Appender(#[from] rolling::InitError),

    #[error("Cannot install global subscriber: {0}")]
    Subscriber(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    dir: String,
    name: String,

    /// 최대 로그 파일 개수로 로그 파일이 설정한 개수보다 커질 경우 기존의 로그파일들은 삭제 된다.
    /// 설정 되지 않을 시 로그 파일은 삭제 되지 않는다.
    keep: Option<usize>,

    /// 파일에 출력할 로그의 레벨로 지정된 로그 레벨 이상만 로깅된다.
    /// 설정하지 않을시 기본값은 DEBUG로 설정 된다.
    ///
    /// 이 값은 [`tracing::Level`]로 변환 됨으로 자세한 사항은 해당 파일을 확인
    level: Option<String>,

    /// 로깅 파일이 분리 되는 기간으로 .log 파일 하나 당 설정된 기간 동안 로그가 기록 된다.
    /// 설정 되지 않을시 기본값은 DAILY로 설정된다.
    ///
    /// 이 값은 [`rolling::Rotation`]으로 변환 됨으로 자세한 사항은 해당 파일을 확인
    rotation: Option<String>
}

impl Config {
    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 전역 로깅 설정을 한다.
///
/// 표준 출력은 콘솔 메뉴가 사용하므로 로그는 JSON 형식으로 파일에만 기록한다.
/// 반환된 [`WorkerGuard`]가 해제되면 남은 로그가 파일로 쓰이지 않으므로 프로그램 종료 시까지 보관해야 한다.
pub fn set_global_logging_config(c: &Config) -> Result<WorkerGuard, Error> {
    let rotation = match &c.rotation {
        Some(rotation) => parse_rotation(rotation)?,
        None => rolling::Rotation::DAILY,
    };
    let level = match &c.level {
        Some(level) => parse_level(level)?,
        None => tracing::Level::DEBUG,
    };

    let mut file_appender = rolling::RollingFileAppender::builder()
        .filename_prefix(c.name.clone())
        .filename_suffix("log")
        .rotation(rotation);

    if let Some(keep) = c.keep {
        file_appender = file_appender.max_log_files(keep);
    }

    let file_appender = file_appender.build(c.dir.clone())?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_timer(LocalTime::new(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]")))
        .with_writer(non_blocking)
        .with_max_level(level)
        .try_init()
        .map_err(|e| Error::Subscriber(e.to_string()))?;

    Ok(guard)
}

fn parse_rotation(s: &str) -> Result<rolling::Rotation, Error> {
    match s.to_uppercase().as_str() {
        "DAILY" => Ok(rolling::Rotation::DAILY),
        "HOURLY" => Ok(rolling::Rotation::HOURLY),
        "MINUTELY" => Ok(rolling::Rotation::MINUTELY),
        "NEVER" => Ok(rolling::Rotation::NEVER),
        _ => Err(Error::UnknownRotation(s.to_owned()))
    }
}

fn parse_level(l: &str) -> Result<tracing::Level, Error> {
    match l.to_uppercase().as_str() {
        "TRACE" => Ok(tracing::Level::TRACE),
        "DEBUG" => Ok(tracing::Level::DEBUG),
        "INFO" => Ok(tracing::Level::INFO),
        "WARN" => Ok(tracing::Level::WARN),
        "ERROR" => Ok(tracing::Level::ERROR),
        _ => Err(Error::UnknownLevel(l.to_owned()))
    }
}
